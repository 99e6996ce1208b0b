//! Frame orchestration
//!
//! [`Rasterizer`] drives one frame through the stages in order. Every stage is
//! a parallel pass that returns only after all of its work is done, so the
//! next stage always sees complete input.

pub mod assembly;
pub mod output;
pub mod raster;
pub mod resolve;
pub mod vertex;

use crate::buffers::BufferManager;
use crate::camera::{Camera, CameraMatrices};
use crate::config::PipelineConfig;
use crate::error::RasterError;
use crate::graphics::AtomicZBuffer;
use crate::logging::{log, LogCategory, LogLevel};
use crate::mesh::{FlatMesh, Mesh};
use crate::types::Frame;
use assembly::{CullReason, Triangle};
use resolve::Shader;
use serde::Serialize;
use std::time::Instant;

/// Triangles discarded during assembly, by reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CullCounts {
    pub invalid_index: usize,
    pub behind_camera: usize,
    pub guard_band: usize,
    pub degenerate: usize,
    pub back_facing: usize,
    pub offscreen: usize,
}

impl CullCounts {
    pub fn tally(triangles: &[Triangle]) -> Self {
        let mut counts = Self::default();
        for reason in triangles.iter().filter_map(|t| t.culled) {
            match reason {
                CullReason::InvalidIndex => counts.invalid_index += 1,
                CullReason::BehindCamera => counts.behind_camera += 1,
                CullReason::GuardBand => counts.guard_band += 1,
                CullReason::Degenerate => counts.degenerate += 1,
                CullReason::BackFacing => counts.back_facing += 1,
                CullReason::Offscreen => counts.offscreen += 1,
            }
        }
        counts
    }

    pub fn total(&self) -> usize {
        self.invalid_index
            + self.behind_camera
            + self.guard_band
            + self.degenerate
            + self.back_facing
            + self.offscreen
    }
}

/// What one frame did
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RenderStats {
    pub frame: u64,
    pub vertices: usize,
    pub triangles: usize,
    pub culled: CullCounts,
    /// Fragments written to the fragment buffer and resolved
    pub fragments: usize,
    /// Covered pixels dropped for depth outside [0, 1]
    pub depth_clipped: usize,
}

/// Software rasterizer with buffers retained across frames
pub struct Rasterizer {
    config: PipelineConfig,
    buffers: BufferManager,
    frames_rendered: u64,
}

impl Rasterizer {
    pub fn new(config: PipelineConfig) -> Self {
        let buffers = BufferManager::new(config.max_fragments);
        Self {
            config,
            buffers,
            frames_rendered: 0,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Provision buffers up front instead of on the first frame
    pub fn initialize(
        &mut self,
        width: u32,
        height: u32,
        max_vertices: usize,
        max_triangles: usize,
    ) -> Result<(), RasterError> {
        self.buffers
            .initialize(width, height, max_vertices, max_triangles)
    }

    /// Change the output size for subsequent frames
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), RasterError> {
        if self.buffers.is_initialized() {
            self.buffers.resize(width, height)
        } else {
            self.buffers.initialize(width, height, 0, 0)
        }
    }

    /// Render `mesh` as seen by `camera` into `target`
    pub fn render(
        &mut self,
        target: &mut Frame,
        mesh: &Mesh,
        camera: &Camera,
    ) -> Result<RenderStats, RasterError> {
        let matrices = camera.matrices(target.width, target.height);
        self.run(target, self.frames_rendered, mesh, &matrices)
    }

    /// Render with explicit matrices
    ///
    /// With [`CameraMatrices::IDENTITY`] vertex positions are taken as clip
    /// coordinates directly.
    pub fn render_with_matrices(
        &mut self,
        target: &mut Frame,
        mesh: &Mesh,
        matrices: &CameraMatrices,
    ) -> Result<RenderStats, RasterError> {
        self.run(target, self.frames_rendered, mesh, matrices)
    }

    /// Flat-buffer entry point
    ///
    /// `frame_index` is reported back in the stats and tags this frame's logs.
    pub fn rasterize_core(
        &mut self,
        target: &mut Frame,
        frame_index: u64,
        mesh: FlatMesh<'_>,
        camera: &Camera,
    ) -> Result<RenderStats, RasterError> {
        let mesh = Mesh::from_flat(&mesh);
        let matrices = camera.matrices(target.width, target.height);
        self.run(target, frame_index, &mesh, &matrices)
    }

    /// Write the last successfully rendered frame as packed RGBA bytes
    ///
    /// A frame that fails before resolution (bad target, fragment budget)
    /// leaves the previous frame in place; a resize clears it to background.
    pub fn emit_rgba8(&self, out: &mut [u8], width: u32, height: u32) -> Result<(), RasterError> {
        output::emit_rgba8(&self.buffers.zbuffer, out, width, height)
    }

    /// Release every retained buffer; safe to call more than once
    pub fn teardown(&mut self) {
        self.buffers.teardown();
    }

    pub fn is_initialized(&self) -> bool {
        self.buffers.is_initialized()
    }

    /// Resolved depth and color of the last frame
    pub fn zbuffer(&self) -> &AtomicZBuffer {
        &self.buffers.zbuffer
    }

    pub fn frames_rendered(&self) -> u64 {
        self.frames_rendered
    }

    /// Provision on first use, otherwise reject targets of the wrong size
    fn prepare_target(&mut self, target: &Frame, mesh: &Mesh) -> Result<(), RasterError> {
        if !self.buffers.is_initialized() {
            self.buffers.initialize(
                target.width,
                target.height,
                mesh.vertices.len(),
                mesh.triangle_count(),
            )?;
        }

        let expected_len = self.buffers.width() as usize * self.buffers.height() as usize;
        if target.width != self.buffers.width()
            || target.height != self.buffers.height()
            || target.pixels.len() != expected_len
        {
            return Err(RasterError::InvalidTarget {
                expected_width: self.buffers.width(),
                expected_height: self.buffers.height(),
                actual_width: target.width,
                actual_height: target.height,
            });
        }
        Ok(())
    }

    fn run(
        &mut self,
        target: &mut Frame,
        frame: u64,
        mesh: &Mesh,
        matrices: &CameraMatrices,
    ) -> Result<RenderStats, RasterError> {
        let start = Instant::now();
        self.prepare_target(target, mesh)?;

        let (width, height) = (target.width, target.height);
        let workers = self.config.worker_count();
        let triangle_count = mesh.triangle_count();

        self.buffers
            .ensure_capacity(mesh.vertices.len(), triangle_count)?;

        let buffers = &mut self.buffers;

        vertex::transform_vertices(
            &mesh.vertices,
            matrices,
            width,
            height,
            &mut buffers.transformed,
            workers,
        );

        assembly::assemble_triangles(
            &buffers.transformed,
            &mesh.indices,
            width,
            height,
            self.config.cull_mode,
            &mut buffers.triangles,
            workers,
        );
        let culled = CullCounts::tally(&buffers.triangles);
        log(LogCategory::Geometry, LogLevel::Debug, || {
            format!(
                "Frame {}: {} vertices, {} triangles, {} culled {:?}",
                frame,
                mesh.vertices.len(),
                triangle_count,
                culled.total(),
                culled
            )
        });

        buffers.reserve_bands(raster::band_count(&buffers.triangles))?;
        raster::fill_bands(&buffers.triangles, &mut buffers.bands);
        let depth_clipped = raster::count_fragments(
            &buffers.triangles,
            &buffers.bands,
            &mut buffers.fragment_counts,
            workers,
        );
        let fragment_count: usize = buffers.fragment_counts.iter().sum();
        buffers.reserve_fragments(fragment_count)?;

        // the previous frame's depth and color survive every failure above
        buffers.reset(self.config.background_argb());
        raster::emit_fragments(
            &buffers.triangles,
            &buffers.bands,
            &buffers.fragment_counts,
            &mut buffers.fragments,
            self.config.perspective_correct,
            workers,
        );
        log(LogCategory::Raster, LogLevel::Debug, || {
            format!(
                "Frame {}: {} fragments in {} bands, {} depth-clipped",
                frame,
                fragment_count,
                buffers.bands.len(),
                depth_clipped
            )
        });

        let shader = Shader::from_config(&self.config);
        resolve::resolve_fragments(&buffers.fragments, &buffers.zbuffer, &shader, workers);
        log(LogCategory::Resolve, LogLevel::Trace, || {
            format!("Frame {}: resolved with {:?} shading", frame, shader.mode)
        });

        output::emit(&buffers.zbuffer, target, workers)?;

        self.frames_rendered += 1;
        log(LogCategory::Output, LogLevel::Trace, || {
            format!(
                "Frame {} written ({}x{}) in {:?}",
                frame,
                width,
                height,
                start.elapsed()
            )
        });

        Ok(RenderStats {
            frame,
            vertices: mesh.vertices.len(),
            triangles: triangle_count,
            culled,
            fragments: fragment_count,
            depth_clipped,
        })
    }
}
