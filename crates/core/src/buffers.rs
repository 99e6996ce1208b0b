//! Working memory for a render session
//!
//! One `BufferManager` owns every buffer the pipeline stages read and write:
//!
//! - transformed vertices (one per input vertex)
//! - assembled triangles (one per index triple, culled ones included)
//! - row bands of the live triangles, and one fragment count per band
//! - the fragment buffer, sized exactly to the frame's fragment count
//! - the packed depth/color buffer
//!
//! Buffers grow on demand and are kept between frames; nothing is freed until
//! [`BufferManager::teardown`].

use crate::error::RasterError;
use crate::graphics::AtomicZBuffer;
use crate::logging::{log, LogCategory, LogLevel};
use crate::pipeline::assembly::Triangle;
use crate::pipeline::raster::{Band, Fragment};
use crate::pipeline::vertex::TransformedVertex;
use std::mem::size_of;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferState {
    #[default]
    Uninitialized,
    Ready,
    Released,
}

pub struct BufferManager {
    width: u32,
    height: u32,
    max_fragments: usize,
    state: BufferState,

    pub(crate) transformed: Vec<TransformedVertex>,
    pub(crate) triangles: Vec<Triangle>,
    pub(crate) bands: Vec<Band>,
    pub(crate) fragment_counts: Vec<usize>,
    pub(crate) fragments: Vec<Fragment>,
    pub(crate) zbuffer: AtomicZBuffer,
}

/// Set `buffer` to exactly `len` elements, reserving fallibly when it grows
fn fit<T: Clone + Default>(buffer: &mut Vec<T>, len: usize, name: &'static str) -> Result<(), RasterError> {
    if len > buffer.capacity() {
        buffer
            .try_reserve_exact(len - buffer.len())
            .map_err(|_| RasterError::allocation(name, len))?;
    }
    buffer.resize(len, T::default());
    Ok(())
}

impl BufferManager {
    /// Empty manager; nothing is allocated until [`initialize`](Self::initialize)
    pub fn new(max_fragments: usize) -> Self {
        Self {
            width: 0,
            height: 0,
            max_fragments,
            state: BufferState::Uninitialized,
            transformed: Vec::new(),
            triangles: Vec::new(),
            bands: Vec::new(),
            fragment_counts: Vec::new(),
            fragments: Vec::new(),
            zbuffer: AtomicZBuffer::default(),
        }
    }

    /// Allocate every buffer for a `width` x `height` image
    pub fn initialize(
        &mut self,
        width: u32,
        height: u32,
        max_vertices: usize,
        max_triangles: usize,
    ) -> Result<(), RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::allocation("depth/color", 0));
        }

        self.zbuffer.resize(width, height, 0)?;
        self.width = width;
        self.height = height;
        self.ensure_capacity(max_vertices, max_triangles)?;
        self.state = BufferState::Ready;

        log(LogCategory::Buffers, LogLevel::Info, || {
            format!(
                "Initialized {}x{} for {} vertices, {} triangles ({} bytes)",
                width,
                height,
                max_vertices,
                max_triangles,
                self.allocated_bytes()
            )
        });
        Ok(())
    }

    /// Change the image size; depth and color are reset to the far plane
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RasterError> {
        if width == 0 || height == 0 {
            return Err(RasterError::allocation("depth/color", 0));
        }
        self.zbuffer.resize(width, height, 0)?;
        self.width = width;
        self.height = height;
        log(LogCategory::Buffers, LogLevel::Debug, || {
            format!("Resized to {}x{}", width, height)
        });
        Ok(())
    }

    /// Size the geometry buffers for a mesh of `vertices` and `triangles`
    pub fn ensure_capacity(&mut self, vertices: usize, triangles: usize) -> Result<(), RasterError> {
        let grows = vertices > self.transformed.capacity() || triangles > self.triangles.capacity();

        fit(&mut self.transformed, vertices, "transformed vertex")?;
        fit(&mut self.triangles, triangles, "primitive")?;

        if grows {
            log(LogCategory::Buffers, LogLevel::Debug, || {
                format!("Geometry buffers grown to {} vertices, {} triangles", vertices, triangles)
            });
        }
        Ok(())
    }

    /// Size the band list and its fragment counts to `count` bands
    pub fn reserve_bands(&mut self, count: usize) -> Result<(), RasterError> {
        fit(&mut self.bands, count, "band")?;
        fit(&mut self.fragment_counts, count, "fragment count")
    }

    /// Size the fragment buffer to exactly `count` fragments
    pub fn reserve_fragments(&mut self, count: usize) -> Result<(), RasterError> {
        if count > self.max_fragments {
            log(LogCategory::Buffers, LogLevel::Error, || {
                format!(
                    "Frame needs {} fragments, budget is {}",
                    count, self.max_fragments
                )
            });
            return Err(RasterError::allocation("fragment", count));
        }
        fit(&mut self.fragments, count, "fragment")
    }

    /// Clear depth to the far plane and color to `background`
    pub fn reset(&mut self, background: u32) {
        self.zbuffer.clear(background);
    }

    /// Release every buffer; later calls do nothing
    pub fn teardown(&mut self) {
        if self.state != BufferState::Ready {
            return;
        }
        let released = self.allocated_bytes();

        self.transformed = Vec::new();
        self.triangles = Vec::new();
        self.bands = Vec::new();
        self.fragment_counts = Vec::new();
        self.fragments = Vec::new();
        self.zbuffer.release();
        self.width = 0;
        self.height = 0;
        self.state = BufferState::Released;

        log(LogCategory::Buffers, LogLevel::Info, || {
            format!("Released {} bytes", released)
        });
    }

    pub fn is_initialized(&self) -> bool {
        self.state == BufferState::Ready
    }

    pub fn state(&self) -> BufferState {
        self.state
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes currently reserved across all buffers
    pub fn allocated_bytes(&self) -> usize {
        self.transformed.capacity() * size_of::<TransformedVertex>()
            + self.triangles.capacity() * size_of::<Triangle>()
            + self.bands.capacity() * size_of::<Band>()
            + self.fragment_counts.capacity() * size_of::<usize>()
            + self.fragments.capacity() * size_of::<Fragment>()
            + self.zbuffer.width() as usize * self.zbuffer.height() as usize * size_of::<u64>()
    }
}
