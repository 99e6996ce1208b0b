//! Color conversion utilities
//!
//! Shaded colors are computed as linear floats in [0, 1] and stored as packed
//! ARGB8888 (0xAARRGGBB) so a pixel's color fits in half of a 64-bit
//! depth/color cell.

use glam::Vec3;

/// Color operation utilities
pub struct ColorOps;

impl ColorOps {
    /// Quantize a float channel in [0, 1] to a byte, clamping out-of-range input
    ///
    /// NaN maps to 0.
    #[inline]
    pub fn quantize(channel: f32) -> u8 {
        if channel.is_nan() {
            return 0;
        }
        (channel.clamp(0.0, 1.0) * 255.0).round() as u8
    }

    /// Pack an RGB float color into opaque ARGB8888
    ///
    /// # Example
    ///
    /// ```
    /// use glam::Vec3;
    /// use raster_core::graphics::ColorOps;
    ///
    /// assert_eq!(ColorOps::pack_rgb(Vec3::new(1.0, 0.0, 0.0)), 0xFFFF0000);
    /// ```
    #[inline]
    pub fn pack_rgb(color: Vec3) -> u32 {
        Self::from_rgb(
            Self::quantize(color.x),
            Self::quantize(color.y),
            Self::quantize(color.z),
        )
    }

    /// Convert ARGB8888 to RGBA byte order, as written into RGBA8 targets
    #[inline]
    pub fn to_rgba8(color: u32) -> [u8; 4] {
        [
            Self::red(color),
            Self::green(color),
            Self::blue(color),
            Self::alpha(color),
        ]
    }

    /// Convert RGBA bytes (config and CLI representation) to ARGB8888
    #[inline]
    pub fn from_rgba8(rgba: [u8; 4]) -> u32 {
        Self::from_argb(rgba[3], rgba[0], rgba[1], rgba[2])
    }

    /// Extract red channel from ARGB color
    #[inline]
    pub fn red(color: u32) -> u8 {
        ((color >> 16) & 0xFF) as u8
    }

    /// Extract green channel from ARGB color
    #[inline]
    pub fn green(color: u32) -> u8 {
        ((color >> 8) & 0xFF) as u8
    }

    /// Extract blue channel from ARGB color
    #[inline]
    pub fn blue(color: u32) -> u8 {
        (color & 0xFF) as u8
    }

    /// Extract alpha channel from ARGB color
    #[inline]
    pub fn alpha(color: u32) -> u8 {
        ((color >> 24) & 0xFF) as u8
    }

    /// Construct ARGB color from components
    #[inline]
    pub fn from_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
        ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
    }

    /// Construct RGB color with full alpha
    #[inline]
    pub fn from_rgb(r: u8, g: u8, b: u8) -> u32 {
        0xFF000000 | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
    }
}
