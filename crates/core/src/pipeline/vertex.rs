//! Vertex stage: model space to screen space, one unit of work per vertex

use crate::camera::CameraMatrices;
use crate::mesh::Vertex;
use crate::parallel;
use glam::{Mat3, Mat4, Vec2, Vec3, Vec4};

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TransformedVertex {
    pub clip: Vec4,
    /// Pixel coordinates, origin at the top-left corner of the image
    pub screen: Vec2,
    /// 0 at the near plane, 1 at the far plane
    pub depth: f32,
    pub inv_w: f32,
    pub color: Vec3,
    /// World-space normal, normalized (zero if the input normal was zero)
    pub normal: Vec3,
    /// `false` when the vertex is on or behind the camera plane (w <= 0)
    pub valid: bool,
}

/// Transform a single vertex
///
/// `x = (ndc.x * 0.5 + 0.5) * width`, `y = (1 - (ndc.y * 0.5 + 0.5)) * height`:
/// NDC +Y points up, pixel rows count down from the top.
pub fn transform_vertex(
    vertex: &Vertex,
    mvp: &Mat4,
    normal_matrix: &Mat3,
    width: u32,
    height: u32,
) -> TransformedVertex {
    let clip = *mvp * vertex.position.extend(1.0);
    let normal = (*normal_matrix * vertex.normal).normalize_or_zero();

    if clip.w <= 0.0 || !clip.w.is_finite() {
        return TransformedVertex {
            clip,
            color: vertex.color,
            normal,
            valid: false,
            ..Default::default()
        };
    }

    let inv_w = 1.0 / clip.w;
    let ndc = clip.truncate() * inv_w;
    let screen = Vec2::new(
        (ndc.x * 0.5 + 0.5) * width as f32,
        (1.0 - (ndc.y * 0.5 + 0.5)) * height as f32,
    );

    TransformedVertex {
        clip,
        screen,
        depth: ndc.z,
        inv_w,
        color: vertex.color,
        normal,
        valid: true,
    }
}

/// Transform every vertex into `out`, index-aligned with `vertices`
pub fn transform_vertices(
    vertices: &[Vertex],
    matrices: &CameraMatrices,
    width: u32,
    height: u32,
    out: &mut [TransformedVertex],
    workers: usize,
) {
    let mvp = matrices.model_view_projection();
    let normal_matrix = matrices.normal_matrix();

    parallel::for_each_mut(out, workers, |i, slot| {
        *slot = transform_vertex(&vertices[i], &mvp, &normal_matrix, width, height);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::camera::Camera;

    fn vertex(x: f32, y: f32, z: f32) -> Vertex {
        Vertex::new(Vec3::new(x, y, z), Vec3::new(0.2, 0.4, 0.6), Vec3::Z)
    }

    #[test]
    fn test_ndc_to_pixels_with_y_flip() {
        let identity = CameraMatrices::IDENTITY;
        let mvp = identity.model_view_projection();
        let nm = identity.normal_matrix();

        let top_left = transform_vertex(&vertex(-1.0, 1.0, 0.5), &mvp, &nm, 64, 32);
        assert!(top_left.valid);
        assert_eq!(top_left.screen, Vec2::new(0.0, 0.0));
        assert_eq!(top_left.depth, 0.5);

        let bottom_right = transform_vertex(&vertex(1.0, -1.0, 0.0), &mvp, &nm, 64, 32);
        assert_eq!(bottom_right.screen, Vec2::new(64.0, 32.0));

        let center = transform_vertex(&vertex(0.0, 0.0, 0.0), &mvp, &nm, 64, 32);
        assert_eq!(center.screen, Vec2::new(32.0, 16.0));
    }

    #[test]
    fn test_attributes_carried_through() {
        let identity = CameraMatrices::IDENTITY;
        let v = transform_vertex(
            &vertex(0.0, 0.0, 0.0),
            &identity.model_view_projection(),
            &identity.normal_matrix(),
            8,
            8,
        );
        assert_eq!(v.color, Vec3::new(0.2, 0.4, 0.6));
        assert_eq!(v.normal, Vec3::Z);
        assert_eq!(v.inv_w, 1.0);
    }

    #[test]
    fn test_vertex_behind_camera_is_invalid() {
        let camera = Camera::looking_at(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO);
        let m = camera.matrices(64, 64);
        let v = transform_vertex(
            &vertex(0.0, 0.0, 6.0),
            &m.model_view_projection(),
            &m.normal_matrix(),
            64,
            64,
        );
        assert!(!v.valid);
    }

    #[test]
    fn test_transform_vertices_is_index_aligned() {
        let vertices: Vec<Vertex> = (0..1000)
            .map(|i| vertex(i as f32 / 1000.0, 0.0, 0.5))
            .collect();
        let mut out = vec![TransformedVertex::default(); vertices.len()];

        transform_vertices(&vertices, &CameraMatrices::IDENTITY, 100, 100, &mut out, 4);

        for (i, v) in out.iter().enumerate() {
            let expected = (i as f32 / 1000.0 * 0.5 + 0.5) * 100.0;
            assert!((v.screen.x - expected).abs() < 1e-3);
            assert!(v.valid);
        }
    }
}
