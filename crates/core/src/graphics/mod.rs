//! Pixel-level building blocks shared by the pipeline stages
//!
//! Color packing lives in [`color`], the atomic depth/color buffer that
//! resolves overlapping fragments lives in [`zbuffer`].

pub mod color;
pub mod zbuffer;

pub use color::ColorOps;
pub use zbuffer::{AtomicZBuffer, FAR_DEPTH_BITS};
