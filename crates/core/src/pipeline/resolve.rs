//! Depth resolution and shading
//!
//! Every fragment is shaded and then offered to the depth/color buffer. The
//! buffer's packed atomic min makes the result independent of the order in
//! which fragments arrive, so this stage needs no sorting and no locks.

use crate::config::{PipelineConfig, ShadingMode};
use crate::graphics::{AtomicZBuffer, ColorOps};
use crate::parallel;
use crate::pipeline::raster::Fragment;
use glam::Vec3;

/// Per-frame shading parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Shader {
    pub mode: ShadingMode,
    /// Unit vector towards the light
    pub light: Vec3,
    pub ambient: f32,
}

impl Shader {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            mode: config.shading,
            light: config.light(),
            ambient: config.ambient,
        }
    }

    /// Final ARGB8888 color of a fragment
    #[inline]
    pub fn shade(&self, fragment: &Fragment) -> u32 {
        let color = match self.mode {
            ShadingMode::VertexColor => fragment.color,
            ShadingMode::Lambert => match fragment.normal.try_normalize() {
                Some(n) => {
                    let intensity = (self.ambient + n.dot(self.light).max(0.0)).clamp(0.0, 1.0);
                    fragment.color * intensity
                }
                // no usable normal: leave the surface unlit
                None => fragment.color,
            },
            ShadingMode::Normals => fragment.normal.normalize_or_zero() * 0.5 + Vec3::splat(0.5),
        };
        ColorOps::pack_rgb(color)
    }
}

/// Shade every fragment and resolve it against `zbuffer`
pub fn resolve_fragments(
    fragments: &[Fragment],
    zbuffer: &AtomicZBuffer,
    shader: &Shader,
    workers: usize,
) {
    parallel::for_each(fragments, workers, |_, fragment| {
        let color = shader.shade(fragment);
        zbuffer.test_and_update(fragment.x, fragment.y, fragment.depth, color);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    const BG: u32 = 0xFF000000;

    fn fragment(x: u32, y: u32, depth: f32, color: Vec3) -> Fragment {
        Fragment {
            x,
            y,
            depth,
            color,
            normal: Vec3::Z,
            triangle: 0,
        }
    }

    fn shader(mode: ShadingMode) -> Shader {
        Shader {
            mode,
            light: Vec3::Z,
            ambient: 0.1,
        }
    }

    #[test]
    fn test_vertex_color_shading() {
        let f = fragment(0, 0, 0.5, Vec3::new(1.0, 0.5, 0.0));
        assert_eq!(shader(ShadingMode::VertexColor).shade(&f), 0xFFFF8000);
    }

    #[test]
    fn test_lambert_shading() {
        let mut f = fragment(0, 0, 0.5, Vec3::ONE);
        // facing the light: 0.1 + 1.0 clamps to full intensity
        assert_eq!(shader(ShadingMode::Lambert).shade(&f), 0xFFFFFFFF);

        // facing away: ambient only
        f.normal = -Vec3::Z;
        let c = shader(ShadingMode::Lambert).shade(&f);
        assert_eq!(ColorOps::red(c), ColorOps::quantize(0.1));

        // interpolated normals are renormalized before lighting
        f.normal = Vec3::new(0.0, 0.0, 0.25);
        assert_eq!(shader(ShadingMode::Lambert).shade(&f), 0xFFFFFFFF);
    }

    #[test]
    fn test_lambert_zero_normal_is_unlit() {
        let mut f = fragment(0, 0, 0.5, Vec3::new(0.0, 1.0, 0.0));
        f.normal = Vec3::ZERO;
        assert_eq!(shader(ShadingMode::Lambert).shade(&f), 0xFF00FF00);
    }

    #[test]
    fn test_normal_visualization() {
        let f = fragment(0, 0, 0.5, Vec3::ZERO);
        assert_eq!(shader(ShadingMode::Normals).shade(&f), 0xFF8080FF);
    }

    #[test]
    fn test_nearest_fragment_wins() {
        let zbuffer = AtomicZBuffer::new(2, 1, BG).unwrap();
        let fragments = [
            fragment(0, 0, 0.7, Vec3::new(0.0, 0.0, 1.0)),
            fragment(0, 0, 0.3, Vec3::new(1.0, 0.0, 0.0)),
            fragment(0, 0, 0.5, Vec3::new(0.0, 1.0, 0.0)),
        ];
        resolve_fragments(&fragments, &zbuffer, &shader(ShadingMode::VertexColor), 1);

        assert_eq!(zbuffer.color(0, 0), Some(0xFFFF0000));
        assert_eq!(zbuffer.depth(0, 0), Some(0.3));
        assert_eq!(zbuffer.color(1, 0), Some(BG));
    }

    #[test]
    fn test_resolution_is_order_independent() {
        let colors = [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::new(0.0, 0.0, 1.0),
            Vec3::new(1.0, 1.0, 0.0),
        ];
        // several fragments per pixel, including exact depth ties
        let mut fragments = Vec::new();
        for i in 0..4096u32 {
            let depth = [0.25, 0.5, 0.25, 0.75][(i % 4) as usize];
            fragments.push(fragment(i % 16, (i / 16) % 16, depth, colors[(i % 7 % 4) as usize]));
        }
        let mut reversed = fragments.clone();
        reversed.reverse();

        let shader = shader(ShadingMode::VertexColor);
        let forward = AtomicZBuffer::new(16, 16, BG).unwrap();
        let backward = AtomicZBuffer::new(16, 16, BG).unwrap();
        resolve_fragments(&fragments, &forward, &shader, 8);
        resolve_fragments(&reversed, &backward, &shader, 3);

        for y in 0..16 {
            for x in 0..16 {
                assert_eq!(forward.color(x, y), backward.color(x, y));
                assert_eq!(forward.depth(x, y), backward.depth(x, y));
            }
        }
    }
}
