//! Frame output: resolved depth/color buffer to caller-owned images

use crate::error::RasterError;
use crate::graphics::{AtomicZBuffer, ColorOps};
use crate::logging::{log, LogCategory, LogLevel};
use crate::parallel;
use crate::types::Frame;

fn check_target(
    zbuffer: &AtomicZBuffer,
    width: u32,
    height: u32,
    len: usize,
    bytes_per_pixel: usize,
) -> Result<(), RasterError> {
    let expected = zbuffer.width() as usize * zbuffer.height() as usize * bytes_per_pixel;
    if width != zbuffer.width() || height != zbuffer.height() || len != expected {
        log(LogCategory::Output, LogLevel::Error, || {
            format!(
                "Target is {}x{} ({} elements), framebuffer is {}x{}",
                width,
                height,
                len,
                zbuffer.width(),
                zbuffer.height()
            )
        });
        return Err(RasterError::InvalidTarget {
            expected_width: zbuffer.width(),
            expected_height: zbuffer.height(),
            actual_width: width,
            actual_height: height,
        });
    }
    Ok(())
}

/// Copy the resolved colors into `frame`, one ARGB8888 pixel per cell
pub fn emit(zbuffer: &AtomicZBuffer, frame: &mut Frame, workers: usize) -> Result<(), RasterError> {
    check_target(zbuffer, frame.width, frame.height, frame.pixels.len(), 1)?;

    parallel::for_each_mut(&mut frame.pixels, workers, |i, pixel| {
        if let Some(color) = zbuffer.color_at(i) {
            *pixel = color;
        }
    });
    Ok(())
}

/// Write the resolved colors as packed RGBA bytes
pub fn emit_rgba8(
    zbuffer: &AtomicZBuffer,
    out: &mut [u8],
    width: u32,
    height: u32,
) -> Result<(), RasterError> {
    check_target(zbuffer, width, height, out.len(), 4)?;

    for (i, rgba) in out.chunks_exact_mut(4).enumerate() {
        if let Some(color) = zbuffer.color_at(i) {
            rgba.copy_from_slice(&ColorOps::to_rgba8(color));
        }
    }
    Ok(())
}
