//! Primitive assembly: index list to screen-space triangles
//!
//! Screen positions are snapped to a fixed-point grid with
//! [`SUBPIXEL_BITS`] fractional bits. Edge functions are evaluated on that
//! grid with exact integer math, so two triangles sharing an edge agree
//! bit-for-bit on which side of it every pixel center lies.

use crate::config::CullMode;
use crate::parallel;
use crate::pipeline::vertex::TransformedVertex;

pub const SUBPIXEL_BITS: u32 = 8;
pub const SUBPIXEL_ONE: i64 = 1 << SUBPIXEL_BITS;
pub const SUBPIXEL_HALF: i64 = SUBPIXEL_ONE / 2;

/// Largest screen coordinate magnitude, in pixels, accepted for rasterization
///
/// Keeps every edge-function product within `i64`.
pub const GUARD_BAND_PX: f32 = (1 << 20) as f32;

/// Why a triangle contributes no fragments
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CullReason {
    /// An index is outside the vertex buffer
    InvalidIndex,
    /// A vertex has w <= 0
    BehindCamera,
    /// A vertex lies outside the fixed-point guard band
    GuardBand,
    /// Zero signed area
    Degenerate,
    /// Clockwise in NDC while back-face culling is on
    BackFacing,
    /// Bounding box misses the image
    Offscreen,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Facing {
    /// Counter-clockwise in normalized device coordinates
    #[default]
    Front,
    Back,
}

/// Inclusive pixel rectangle
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PixelRect {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

/// One assembled primitive
///
/// For live triangles `vertices` and `fixed` are in canonical order: clockwise
/// on screen, which makes `area` positive.
#[derive(Debug, Clone, Copy, Default)]
pub struct Triangle {
    pub vertices: [TransformedVertex; 3],
    /// Snapped screen positions in 1/[`SUBPIXEL_ONE`] pixel units
    pub fixed: [[i64; 2]; 3],
    /// Twice the screen-space area in fixed-point units squared
    pub area: i64,
    /// Area before reordering; its sign gives the input winding
    pub signed_area: i64,
    pub facing: Facing,
    pub bounds: PixelRect,
    pub culled: Option<CullReason>,
}

impl Triangle {
    pub fn is_live(&self) -> bool {
        self.culled.is_none()
    }

    fn culled(reason: CullReason) -> Self {
        Self {
            culled: Some(reason),
            ..Default::default()
        }
    }
}

/// Snap a pixel coordinate to the sub-pixel grid
#[inline]
pub fn to_fixed(v: f32) -> i64 {
    (v as f64 * SUBPIXEL_ONE as f64).round() as i64
}

/// Edge function of `a -> b` evaluated at `p`: twice the signed area of (a, b, p)
#[inline]
pub fn edge(a: [i64; 2], b: [i64; 2], p: [i64; 2]) -> i64 {
    (b[0] - a[0]) * (p[1] - a[1]) - (b[1] - a[1]) * (p[0] - a[0])
}

/// Top-left fill rule for an edge of a clockwise-on-screen triangle (y down)
///
/// Top edge: horizontal, pointing right. Left edge: pointing up.
#[inline]
pub fn is_top_left(a: [i64; 2], b: [i64; 2]) -> bool {
    let dx = b[0] - a[0];
    let dy = b[1] - a[1];
    (dy == 0 && dx > 0) || dy < 0
}

fn ceil_div(a: i64, b: i64) -> i64 {
    -((-a).div_euclid(b))
}

/// Pixels whose centers can fall inside the fixed-point triangle, clamped to
/// the image. `None` if that set is empty.
fn pixel_bounds(fixed: &[[i64; 2]; 3], width: u32, height: u32) -> Option<PixelRect> {
    let min_fx = fixed.iter().map(|p| p[0]).min()?;
    let max_fx = fixed.iter().map(|p| p[0]).max()?;
    let min_fy = fixed.iter().map(|p| p[1]).min()?;
    let max_fy = fixed.iter().map(|p| p[1]).max()?;

    // pixel x has its center at x * ONE + HALF
    let min_x = ceil_div(min_fx - SUBPIXEL_HALF, SUBPIXEL_ONE).max(0);
    let max_x = (max_fx - SUBPIXEL_HALF)
        .div_euclid(SUBPIXEL_ONE)
        .min(width as i64 - 1);
    let min_y = ceil_div(min_fy - SUBPIXEL_HALF, SUBPIXEL_ONE).max(0);
    let max_y = (max_fy - SUBPIXEL_HALF)
        .div_euclid(SUBPIXEL_ONE)
        .min(height as i64 - 1);

    if min_x > max_x || min_y > max_y {
        return None;
    }
    Some(PixelRect {
        min_x: min_x as u32,
        min_y: min_y as u32,
        max_x: max_x as u32,
        max_y: max_y as u32,
    })
}

fn in_guard_band(v: &TransformedVertex) -> bool {
    v.screen.x.abs() <= GUARD_BAND_PX && v.screen.y.abs() <= GUARD_BAND_PX
}

/// Assemble the triangle made of `corners` (three indices into `transformed`)
pub fn assemble_triangle(
    transformed: &[TransformedVertex],
    corners: [u32; 3],
    width: u32,
    height: u32,
    cull_mode: CullMode,
) -> Triangle {
    let mut vertices = [TransformedVertex::default(); 3];
    for (slot, &index) in vertices.iter_mut().zip(corners.iter()) {
        match transformed.get(index as usize) {
            Some(v) => *slot = *v,
            None => return Triangle::culled(CullReason::InvalidIndex),
        }
    }

    if vertices.iter().any(|v| !v.valid) {
        return Triangle::culled(CullReason::BehindCamera);
    }
    // NaN screen coordinates fail this check too
    if !vertices.iter().all(in_guard_band) {
        return Triangle::culled(CullReason::GuardBand);
    }

    let mut fixed = vertices.map(|v| [to_fixed(v.screen.x), to_fixed(v.screen.y)]);
    let signed_area = edge(fixed[0], fixed[1], fixed[2]);
    if signed_area == 0 {
        return Triangle::culled(CullReason::Degenerate);
    }

    // y points down on screen, so counter-clockwise in NDC is negative here
    let facing = if signed_area < 0 {
        Facing::Front
    } else {
        Facing::Back
    };
    if cull_mode == CullMode::Back && facing == Facing::Back {
        return Triangle::culled(CullReason::BackFacing);
    }

    if signed_area < 0 {
        vertices.swap(1, 2);
        fixed.swap(1, 2);
    }

    let Some(bounds) = pixel_bounds(&fixed, width, height) else {
        return Triangle::culled(CullReason::Offscreen);
    };

    Triangle {
        vertices,
        fixed,
        area: signed_area.abs(),
        signed_area,
        facing,
        bounds,
        culled: None,
    }
}

/// Assemble every whole triangle of `indices` into `out` (one slot per triangle)
pub fn assemble_triangles(
    transformed: &[TransformedVertex],
    indices: &[u32],
    width: u32,
    height: u32,
    cull_mode: CullMode,
    out: &mut [Triangle],
    workers: usize,
) {
    parallel::for_each_mut(out, workers, |i, slot| {
        let corners = [indices[i * 3], indices[i * 3 + 1], indices[i * 3 + 2]];
        *slot = assemble_triangle(transformed, corners, width, height, cull_mode);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn screen_vertex(x: f32, y: f32) -> TransformedVertex {
        TransformedVertex {
            screen: Vec2::new(x, y),
            inv_w: 1.0,
            valid: true,
            ..Default::default()
        }
    }

    #[test]
    fn test_edge_function_sign() {
        let a = [0, 0];
        let b = [SUBPIXEL_ONE, 0];
        // y down: a point below the rightward edge is on the positive side
        assert!(edge(a, b, [0, SUBPIXEL_ONE]) > 0);
        assert!(edge(a, b, [0, -SUBPIXEL_ONE]) < 0);
        assert_eq!(edge(a, b, [5 * SUBPIXEL_ONE, 0]), 0);
    }

    #[test]
    fn test_top_left_classification() {
        let o = [0, 0];
        let right = [SUBPIXEL_ONE, 0];
        let up = [0, -SUBPIXEL_ONE];
        let down = [0, SUBPIXEL_ONE];

        assert!(is_top_left(o, right));
        assert!(!is_top_left(right, o));
        assert!(is_top_left(o, up));
        assert!(!is_top_left(o, down));
    }

    #[test]
    fn test_clockwise_triangle_is_back_facing_and_kept() {
        // clockwise on screen (y down)
        let verts = [
            screen_vertex(1.0, 1.0),
            screen_vertex(9.0, 1.0),
            screen_vertex(1.0, 9.0),
        ];
        let tri = assemble_triangle(&verts, [0, 1, 2], 16, 16, CullMode::None);
        assert!(tri.is_live());
        assert_eq!(tri.facing, Facing::Back);
        assert!(tri.area > 0);
        assert_eq!(tri.area, tri.signed_area);

        let culled = assemble_triangle(&verts, [0, 1, 2], 16, 16, CullMode::Back);
        assert_eq!(culled.culled, Some(CullReason::BackFacing));
    }

    #[test]
    fn test_counter_clockwise_is_reordered() {
        let verts = [
            screen_vertex(1.0, 1.0),
            screen_vertex(1.0, 9.0),
            screen_vertex(9.0, 1.0),
        ];
        let tri = assemble_triangle(&verts, [0, 1, 2], 16, 16, CullMode::Back);
        assert!(tri.is_live());
        assert_eq!(tri.facing, Facing::Front);
        assert!(tri.signed_area < 0);
        assert_eq!(tri.area, -tri.signed_area);
        assert!(edge(tri.fixed[0], tri.fixed[1], tri.fixed[2]) > 0);
        assert_eq!(tri.vertices[1].screen, Vec2::new(9.0, 1.0));
    }

    #[test]
    fn test_bounds_clamped_to_image() {
        let verts = [
            screen_vertex(-10.0, -10.0),
            screen_vertex(30.0, -10.0),
            screen_vertex(-10.0, 30.0),
        ];
        let tri = assemble_triangle(&verts, [0, 1, 2], 16, 8, CullMode::None);
        assert_eq!(
            tri.bounds,
            PixelRect {
                min_x: 0,
                min_y: 0,
                max_x: 15,
                max_y: 7
            }
        );
    }

    #[test]
    fn test_bounds_use_pixel_centers() {
        // spans x in [1.6, 4.4]: centers 2.5 and 3.5 only
        let verts = [
            screen_vertex(1.6, 1.0),
            screen_vertex(4.4, 1.0),
            screen_vertex(1.6, 3.0),
        ];
        let tri = assemble_triangle(&verts, [0, 1, 2], 16, 16, CullMode::None);
        assert_eq!(tri.bounds.min_x, 2);
        assert_eq!(tri.bounds.max_x, 3);
        assert_eq!(tri.bounds.min_y, 1);
        assert_eq!(tri.bounds.max_y, 2);
    }

    #[test]
    fn test_cull_reasons() {
        let mut verts = vec![
            screen_vertex(1.0, 1.0),
            screen_vertex(5.0, 1.0),
            screen_vertex(9.0, 1.0),
            screen_vertex(1.0, 5.0),
            screen_vertex(-50.0, -50.0),
            screen_vertex(-40.0, -50.0),
            screen_vertex(-50.0, -40.0),
            screen_vertex(2.0e7, 0.0),
        ];
        verts.push(TransformedVertex {
            valid: false,
            ..screen_vertex(2.0, 2.0)
        });

        let cull = |c: [u32; 3]| assemble_triangle(&verts, c, 16, 16, CullMode::None).culled;

        assert_eq!(cull([0, 1, 99]), Some(CullReason::InvalidIndex));
        assert_eq!(cull([0, 8, 3]), Some(CullReason::BehindCamera));
        assert_eq!(cull([0, 7, 3]), Some(CullReason::GuardBand));
        assert_eq!(cull([0, 1, 2]), Some(CullReason::Degenerate));
        assert_eq!(cull([0, 0, 3]), Some(CullReason::Degenerate));
        assert_eq!(cull([4, 5, 6]), Some(CullReason::Offscreen));
        assert_eq!(cull([0, 1, 3]), None);
    }

    #[test]
    fn test_assemble_triangles_keeps_slot_per_triangle() {
        let verts = vec![
            screen_vertex(1.0, 1.0),
            screen_vertex(9.0, 1.0),
            screen_vertex(1.0, 9.0),
        ];
        let indices = [0, 1, 2, 0, 0, 0, 2, 1, 0];
        let mut out = vec![Triangle::default(); 3];

        assemble_triangles(&verts, &indices, 16, 16, CullMode::None, &mut out, 2);

        assert!(out[0].is_live());
        assert_eq!(out[1].culled, Some(CullReason::Degenerate));
        assert!(out[2].is_live());
        assert_eq!(out[2].facing, Facing::Front);
    }
}
