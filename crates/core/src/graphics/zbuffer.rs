//! Atomic depth/color buffer for order-independent hidden surface removal
//!
//! Every pixel is a single `AtomicU64` cell holding its depth and color
//! together:
//!
//! ```text
//! 63              32 31               0
//! +-----------------+-----------------+
//! |   depth bits    |  color ARGB8888 |
//! +-----------------+-----------------+
//! ```
//!
//! Depths live in [0, 1] and non-negative IEEE floats order the same way as
//! their bit patterns, so "nearer fragment wins" is a plain `fetch_min` on the
//! packed key. Compare and write happen in one atomic step; concurrent
//! fragments can never leave a depth from one and a color from another.
//! Equal depths fall through to the color half: the smaller ARGB value wins,
//! independent of submission order.
//!
//! # Usage
//!
//! ```
//! use raster_core::graphics::AtomicZBuffer;
//!
//! let mut zbuffer = AtomicZBuffer::new(320, 240, 0xFF000000).unwrap();
//!
//! // Shared borrow: safe to call from many threads at once
//! if zbuffer.test_and_update(100, 100, 0.5, 0xFFFF0000) {
//!     // this fragment was nearest at the time of the update
//! }
//! assert_eq!(zbuffer.color(100, 100), Some(0xFFFF0000));
//!
//! zbuffer.clear(0xFF000000); // exclusive borrow, back to the far plane
//! ```

use crate::error::RasterError;
use std::sync::atomic::{AtomicU64, Ordering};

/// Depth bits of an untouched pixel; farther than any depth in [0, 1]
pub const FAR_DEPTH_BITS: u32 = u32::MAX;

/// Map a depth in [0, 1] to bits whose integer order matches depth order
#[inline]
pub fn encode_depth(depth: f32) -> u32 {
    if depth.is_nan() {
        FAR_DEPTH_BITS
    } else if depth <= 0.0 {
        // also folds -0.0 onto +0.0
        0
    } else {
        depth.to_bits()
    }
}

#[inline]
fn pack(depth_bits: u32, color: u32) -> u64 {
    ((depth_bits as u64) << 32) | color as u64
}

#[inline]
fn unpack(cell: u64) -> (u32, u32) {
    ((cell >> 32) as u32, cell as u32)
}

/// Per-pixel depth and color resolved with a single atomic per fragment
pub struct AtomicZBuffer {
    width: u32,
    height: u32,

    /// Row-major: index = y * width + x
    cells: Vec<AtomicU64>,
}

impl AtomicZBuffer {
    /// Allocate a buffer with every pixel at the far plane and `background` color
    pub fn new(width: u32, height: u32, background: u32) -> Result<Self, RasterError> {
        let mut zbuffer = Self {
            width: 0,
            height: 0,
            cells: Vec::new(),
        };
        zbuffer.resize(width, height, background)?;
        Ok(zbuffer)
    }

    /// Reset every pixel to the far plane and `background` color
    ///
    /// Requires exclusive access, so no fragment can be mid-update.
    pub fn clear(&mut self, background: u32) {
        let cleared = pack(FAR_DEPTH_BITS, background);
        for cell in &mut self.cells {
            *cell.get_mut() = cleared;
        }
    }

    /// Resize to new dimensions; contents are reset to the far plane
    pub fn resize(&mut self, width: u32, height: u32, background: u32) -> Result<(), RasterError> {
        let size = width as usize * height as usize;
        let cleared = pack(FAR_DEPTH_BITS, background);

        let mut cells = Vec::new();
        cells
            .try_reserve_exact(size)
            .map_err(|_| RasterError::allocation("depth/color", size))?;
        cells.extend((0..size).map(|_| AtomicU64::new(cleared)));

        self.cells = cells;
        self.width = width;
        self.height = height;
        Ok(())
    }

    /// Drop the backing storage
    pub fn release(&mut self) {
        self.cells = Vec::new();
        self.width = 0;
        self.height = 0;
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn is_allocated(&self) -> bool {
        !self.cells.is_empty()
    }

    /// Nearest-wins update of one pixel
    ///
    /// Returns `true` if this fragment is now the stored one. Out-of-bounds
    /// coordinates never pass.
    #[inline]
    pub fn test_and_update(&self, x: u32, y: u32, depth: f32, color: u32) -> bool {
        if x >= self.width || y >= self.height {
            return false;
        }
        let idx = y as usize * self.width as usize + x as usize;
        let key = pack(encode_depth(depth), color);
        // stage barriers (scope joins) order these against clear and readback
        let previous = self.cells[idx].fetch_min(key, Ordering::Relaxed);
        key < previous
    }

    /// Depth stored at a pixel, `None` if untouched this frame or out of bounds
    pub fn depth(&self, x: u32, y: u32) -> Option<f32> {
        let (depth_bits, _) = unpack(self.load(x, y)?);
        if depth_bits == FAR_DEPTH_BITS {
            None
        } else {
            Some(f32::from_bits(depth_bits))
        }
    }

    /// Color stored at a pixel (background if untouched)
    pub fn color(&self, x: u32, y: u32) -> Option<u32> {
        self.load(x, y).map(|cell| unpack(cell).1)
    }

    /// Color of the cell at row-major `index`
    #[inline]
    pub fn color_at(&self, index: usize) -> Option<u32> {
        self.cells
            .get(index)
            .map(|cell| unpack(cell.load(Ordering::Relaxed)).1)
    }

    fn load(&self, x: u32, y: u32) -> Option<u64> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let idx = y as usize * self.width as usize + x as usize;
        self.cells.get(idx).map(|cell| cell.load(Ordering::Relaxed))
    }
}

impl Default for AtomicZBuffer {
    fn default() -> Self {
        Self {
            width: 0,
            height: 0,
            cells: Vec::new(),
        }
    }
}
