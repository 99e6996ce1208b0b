//! Rasterization: triangles to fragments
//!
//! Coverage is decided per pixel center with three integer edge functions,
//! stepped incrementally across the triangle's bounding box. A pixel is
//! covered when every edge function is positive, or zero on a top-left edge;
//! adjacent triangles therefore never both claim, nor both miss, a pixel on
//! their shared edge.
//!
//! Work is split by pixels, not by triangles: every live triangle's bounding
//! box is cut into bands of [`BAND_ROWS`] rows, and each band is one unit of
//! work. Fragments are produced in two passes so the fragment buffer is
//! exactly as large as the frame needs:
//!
//! ```text
//! count pass:  band i -> counts[i]             (parallel)
//! split:       fragments -> [counts[0]][counts[1]]...  (disjoint slices)
//! emit pass:   band i -> its own slice          (parallel)
//! ```

use crate::parallel;
use crate::pipeline::assembly::{edge, is_top_left, Triangle, SUBPIXEL_HALF, SUBPIXEL_ONE};
use glam::Vec3;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Bounding-box rows per unit of rasterization work
pub const BAND_ROWS: u32 = 8;

/// Rows `min_y..=max_y` of one triangle's bounding box
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Band {
    /// Index of the triangle in the primitive buffer
    pub triangle: u32,
    pub min_y: u32,
    pub max_y: u32,
}

/// Candidate contribution of one triangle to one pixel
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Fragment {
    pub x: u32,
    pub y: u32,
    pub depth: f32,
    pub color: Vec3,
    /// Interpolated, not renormalized
    pub normal: Vec3,
    /// Index of the source triangle in the primitive buffer
    pub triangle: u32,
}

/// Visit every covered pixel of a live triangle with its barycentric weights
///
/// Weights are `(w0, w1, w2) / area`, where `w_i` is the edge function of the
/// edge opposite vertex `i`.
pub fn for_each_covered<F>(tri: &Triangle, visit: F)
where
    F: FnMut(u32, u32, [f32; 3]),
{
    for_each_covered_in_rows(tri, tri.bounds.min_y, tri.bounds.max_y, visit);
}

/// [`for_each_covered`] restricted to rows `min_y..=max_y`
pub fn for_each_covered_in_rows<F>(tri: &Triangle, min_y: u32, max_y: u32, mut visit: F)
where
    F: FnMut(u32, u32, [f32; 3]),
{
    if !tri.is_live() {
        return;
    }
    let bounds = tri.bounds;
    let min_y = min_y.max(bounds.min_y);
    let max_y = max_y.min(bounds.max_y);
    if min_y > max_y {
        return;
    }

    let [v0, v1, v2] = tri.fixed;
    let edges = [(v1, v2), (v2, v0), (v0, v1)];
    let bias = edges.map(|(a, b)| if is_top_left(a, b) { 0 } else { -1 });
    let step_x = edges.map(|(a, b)| -(b[1] - a[1]) * SUBPIXEL_ONE);
    let step_y = edges.map(|(a, b)| (b[0] - a[0]) * SUBPIXEL_ONE);

    let origin = [
        bounds.min_x as i64 * SUBPIXEL_ONE + SUBPIXEL_HALF,
        min_y as i64 * SUBPIXEL_ONE + SUBPIXEL_HALF,
    ];
    let mut row = edges.map(|(a, b)| edge(a, b, origin));
    let inv_area = 1.0 / tri.area as f64;

    for y in min_y..=max_y {
        let mut w = row;
        for x in bounds.min_x..=bounds.max_x {
            if w[0] + bias[0] >= 0 && w[1] + bias[1] >= 0 && w[2] + bias[2] >= 0 {
                visit(x, y, w.map(|wi| (wi as f64 * inv_area) as f32));
            }
            for i in 0..3 {
                w[i] += step_x[i];
            }
        }
        for i in 0..3 {
            row[i] += step_y[i];
        }
    }
}

/// Screen-space linear depth; `None` outside the [0, 1] depth range
#[inline]
fn interpolate_depth(tri: &Triangle, weights: [f32; 3]) -> Option<f32> {
    let [a, b, c] = &tri.vertices;
    let depth = weights[0] * a.depth + weights[1] * b.depth + weights[2] * c.depth;
    (0.0..=1.0).contains(&depth).then_some(depth)
}

/// Attribute weights, optionally corrected for perspective with 1/w
#[inline]
fn attribute_weights(tri: &Triangle, weights: [f32; 3], perspective_correct: bool) -> [f32; 3] {
    if !perspective_correct {
        return weights;
    }
    let [a, b, c] = &tri.vertices;
    let scaled = [
        weights[0] * a.inv_w,
        weights[1] * b.inv_w,
        weights[2] * c.inv_w,
    ];
    let sum = scaled[0] + scaled[1] + scaled[2];
    if sum > 0.0 {
        scaled.map(|s| s / sum)
    } else {
        weights
    }
}

/// Build the fragment for a covered pixel, `None` if clipped by depth range
pub fn shade_sample(
    tri: &Triangle,
    triangle: u32,
    x: u32,
    y: u32,
    weights: [f32; 3],
    perspective_correct: bool,
) -> Option<Fragment> {
    let depth = interpolate_depth(tri, weights)?;
    let [wa, wb, wc] = attribute_weights(tri, weights, perspective_correct);
    let [a, b, c] = &tri.vertices;

    Some(Fragment {
        x,
        y,
        depth,
        color: a.color * wa + b.color * wb + c.color * wc,
        normal: a.normal * wa + b.normal * wb + c.normal * wc,
        triangle,
    })
}

fn bands_of(tri: &Triangle) -> u32 {
    if tri.is_live() {
        (tri.bounds.max_y - tri.bounds.min_y) / BAND_ROWS + 1
    } else {
        0
    }
}

/// Number of bands the live triangles are cut into
pub fn band_count(triangles: &[Triangle]) -> usize {
    triangles.iter().map(|t| bands_of(t) as usize).sum()
}

/// Cut every live triangle into bands, triangle-major, top to bottom
///
/// `bands.len()` must equal [`band_count`].
pub fn fill_bands(triangles: &[Triangle], bands: &mut [Band]) {
    let mut slots = bands.iter_mut();
    for (i, tri) in triangles.iter().enumerate() {
        for b in 0..bands_of(tri) {
            let Some(slot) = slots.next() else {
                return;
            };
            let min_y = tri.bounds.min_y + b * BAND_ROWS;
            *slot = Band {
                triangle: i as u32,
                min_y,
                max_y: (min_y + BAND_ROWS - 1).min(tri.bounds.max_y),
            };
        }
    }
}

/// Count pass: fragments each band will emit
///
/// Returns how many covered pixels were dropped for falling outside the
/// depth range.
pub fn count_fragments(
    triangles: &[Triangle],
    bands: &[Band],
    counts: &mut [usize],
    workers: usize,
) -> usize {
    let depth_clipped = AtomicUsize::new(0);

    parallel::for_each_mut_grained(counts, workers, 1, |i, count| {
        let band = bands[i];
        let tri = &triangles[band.triangle as usize];
        let mut emitted = 0;
        let mut clipped = 0;
        for_each_covered_in_rows(tri, band.min_y, band.max_y, |_, _, weights| {
            if interpolate_depth(tri, weights).is_some() {
                emitted += 1;
            } else {
                clipped += 1;
            }
        });
        *count = emitted;
        if clipped > 0 {
            depth_clipped.fetch_add(clipped, Ordering::Relaxed);
        }
    });

    depth_clipped.into_inner()
}

/// Emit pass: every band fills its own slice of `fragments`
///
/// `fragments.len()` must equal the sum of `counts` from the count pass.
pub fn emit_fragments(
    triangles: &[Triangle],
    bands: &[Band],
    counts: &[usize],
    fragments: &mut [Fragment],
    perspective_correct: bool,
    workers: usize,
) {
    let mut jobs: Vec<(Band, &mut [Fragment])> = Vec::new();
    let mut rest = fragments;
    for (band, &count) in bands.iter().zip(counts) {
        if count == 0 {
            continue;
        }
        let len = count.min(rest.len());
        let (slice, tail) = std::mem::take(&mut rest).split_at_mut(len);
        rest = tail;
        jobs.push((*band, slice));
    }

    parallel::for_each_mut_grained(&mut jobs, workers, 1, |_, (band, out)| {
        let tri = &triangles[band.triangle as usize];
        let mut written = 0;
        for_each_covered_in_rows(tri, band.min_y, band.max_y, |x, y, weights| {
            if written == out.len() {
                return;
            }
            if let Some(fragment) = shade_sample(tri, band.triangle, x, y, weights, perspective_correct) {
                out[written] = fragment;
                written += 1;
            }
        });
    });
}
