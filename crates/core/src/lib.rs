//! Data-parallel software rasterization pipeline.
//!
//! A frame runs through six stages, each a full barrier before the next:
//!
//! ```text
//! BufferManager (provision)
//!   -> vertex transform -> primitive assembly -> rasterization (count, reset, emit)
//!   -> depth resolution & shading -> frame output
//! ```
//!
//! The entry point is [`Rasterizer`]. Working buffers live for the whole
//! render session and are released by [`Rasterizer::teardown`].
//!
//! ```
//! use glam::Vec3;
//! use raster_core::{Camera, Mesh, PipelineConfig, Rasterizer, Vertex};
//! use raster_core::types::Frame;
//!
//! let mesh = Mesh::new(
//!     vec![
//!         Vertex::new(Vec3::new(-0.5, -0.5, 0.0), Vec3::ONE, Vec3::Z),
//!         Vertex::new(Vec3::new(0.5, -0.5, 0.0), Vec3::ONE, Vec3::Z),
//!         Vertex::new(Vec3::new(0.0, 0.5, 0.0), Vec3::ONE, Vec3::Z),
//!     ],
//!     vec![0, 1, 2],
//! );
//! let camera = Camera::looking_at(Vec3::new(0.0, 0.0, 2.0), Vec3::ZERO);
//!
//! let mut rasterizer = Rasterizer::new(PipelineConfig::default());
//! let mut frame = Frame::new(64, 64);
//! let stats = rasterizer.render(&mut frame, &mesh, &camera).unwrap();
//! assert!(stats.fragments > 0);
//! rasterizer.teardown();
//! ```

pub mod buffers;
pub mod camera;
pub mod config;
pub mod error;
pub mod graphics;
pub mod logging;
pub mod mesh;
pub mod parallel;
pub mod pipeline;

pub mod types {
    use serde::{Deserialize, Serialize};

    /// Packed ARGB8888 image (0xAARRGGBB), row-major, row 0 at the top.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Frame {
        pub width: u32,
        pub height: u32,
        pub pixels: Vec<u32>,
    }

    impl Frame {
        pub fn new(width: u32, height: u32) -> Self {
            Self {
                width,
                height,
                pixels: vec![0; width as usize * height as usize],
            }
        }

        /// Pixel at (x, y), `None` outside the image
        pub fn get(&self, x: u32, y: u32) -> Option<u32> {
            if x >= self.width || y >= self.height {
                return None;
            }
            self.pixels.get((y * self.width + x) as usize).copied()
        }
    }
}

pub use camera::Camera;
pub use config::{CullMode, PipelineConfig, ShadingMode};
pub use error::RasterError;
pub use mesh::{FlatMesh, Mesh, Vertex};
pub use pipeline::{CullCounts, Rasterizer, RenderStats};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_initialization() {
        let f = types::Frame::new(10, 10);
        assert_eq!(f.pixels.len(), 100);
        assert_eq!(f.width, 10);
        assert_eq!(f.height, 10);
    }

    #[test]
    fn frame_get_bounds() {
        let mut f = types::Frame::new(4, 3);
        f.pixels[2 * 4 + 3] = 0xFF112233;
        assert_eq!(f.get(3, 2), Some(0xFF112233));
        assert_eq!(f.get(4, 0), None);
        assert_eq!(f.get(0, 3), None);
    }

    #[test]
    fn frame_serializes_to_json() {
        let f = types::Frame::new(2, 1);
        let s = serde_json::to_string(&f).expect("serialize");
        let back: types::Frame = serde_json::from_str(&s).expect("deserialize");
        assert_eq!(back.width, 2);
        assert_eq!(back.pixels, vec![0, 0]);
    }
}
