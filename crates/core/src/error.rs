//! Error types surfaced by the pipeline.
//!
//! Only whole-frame failures are errors. Degenerate or invisible triangles are
//! culled and counted in [`RenderStats`](crate::RenderStats) instead.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RasterError {
    /// A working buffer could not be provisioned; the frame is abandoned.
    #[error("Failed to allocate {buffer} buffer ({requested} elements)")]
    Allocation {
        buffer: &'static str,
        requested: usize,
    },

    /// The output image does not match the configured resolution.
    /// Raised before anything is written.
    #[error(
        "Output target is {actual_width}x{actual_height}, expected {expected_width}x{expected_height}"
    )]
    InvalidTarget {
        expected_width: u32,
        expected_height: u32,
        actual_width: u32,
        actual_height: u32,
    },

    #[error("Failed to read pipeline config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid pipeline config: {0}")]
    Config(#[from] serde_json::Error),
}

impl RasterError {
    pub(crate) fn allocation(buffer: &'static str, requested: usize) -> Self {
        RasterError::Allocation { buffer, requested }
    }
}
