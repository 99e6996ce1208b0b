//! Built-in scenes, stored the way meshes arrive from outside: flat arrays

use clap::ValueEnum;
use glam::{Mat4, Vec3};
use raster_core::{Camera, FlatMesh};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SceneKind {
    /// One triangle with red, green and blue corners
    Triangle,
    /// A red quad in front of a larger blue one
    Quad,
    /// A unit cube with one color per face, spinning from frame to frame
    Cube,
}

#[derive(Debug, Default, Clone)]
pub struct Scene {
    pub positions: Vec<f32>,
    pub colors: Vec<f32>,
    pub normals: Vec<f32>,
    pub indices: Vec<u32>,
}

impl Scene {
    pub fn build(kind: SceneKind) -> Self {
        match kind {
            SceneKind::Triangle => Self::triangle(),
            SceneKind::Quad => Self::quads(),
            SceneKind::Cube => Self::cube(),
        }
    }

    pub fn flat(&self) -> FlatMesh<'_> {
        FlatMesh {
            positions: &self.positions,
            colors: &self.colors,
            indices: &self.indices,
            normals: &self.normals,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn push_vertex(&mut self, position: Vec3, color: Vec3, normal: Vec3) -> u32 {
        let index = self.vertex_count() as u32;
        self.positions.extend_from_slice(&position.to_array());
        self.colors.extend_from_slice(&color.to_array());
        self.normals.extend_from_slice(&normal.to_array());
        index
    }

    /// Quad spanned by `u` and `v` around `center`; counter-clockwise seen
    /// from the side `u x v` points to
    fn push_quad(&mut self, center: Vec3, u: Vec3, v: Vec3, color: Vec3) {
        let normal = u.cross(v).normalize_or_zero();
        let base = self.push_vertex(center - u - v, color, normal);
        self.push_vertex(center + u - v, color, normal);
        self.push_vertex(center + u + v, color, normal);
        self.push_vertex(center - u + v, color, normal);
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    fn triangle() -> Self {
        let mut scene = Self::default();
        let a = scene.push_vertex(Vec3::new(-0.8, -0.6, 0.0), Vec3::X, Vec3::Z);
        let b = scene.push_vertex(Vec3::new(0.8, -0.6, 0.0), Vec3::Y, Vec3::Z);
        let c = scene.push_vertex(Vec3::new(0.0, 0.8, 0.0), Vec3::Z, Vec3::Z);
        scene.indices.extend_from_slice(&[a, b, c]);
        scene
    }

    fn quads() -> Self {
        let mut scene = Self::default();
        scene.push_quad(Vec3::new(0.2, 0.1, 0.0), Vec3::X * 0.5, Vec3::Y * 0.5, Vec3::X);
        scene.push_quad(Vec3::new(-0.2, -0.1, -0.5), Vec3::X * 0.8, Vec3::Y * 0.8, Vec3::Z);
        scene
    }

    fn cube() -> Self {
        let faces = [
            (Vec3::X, Vec3::Y, Vec3::Z, Vec3::new(1.0, 0.2, 0.2)),
            (-Vec3::X, Vec3::Z, Vec3::Y, Vec3::new(0.2, 1.0, 1.0)),
            (Vec3::Y, Vec3::Z, Vec3::X, Vec3::new(0.2, 1.0, 0.2)),
            (-Vec3::Y, Vec3::X, Vec3::Z, Vec3::new(1.0, 0.2, 1.0)),
            (Vec3::Z, Vec3::X, Vec3::Y, Vec3::new(0.2, 0.2, 1.0)),
            (-Vec3::Z, Vec3::Y, Vec3::X, Vec3::new(1.0, 1.0, 0.2)),
        ];
        let mut scene = Self::default();
        for (normal, u, v, color) in faces {
            scene.push_quad(normal * 0.5, u * 0.5, v * 0.5, color);
        }
        scene
    }
}

/// Camera for `frame`; the cube turns a little every frame
pub fn camera_for(kind: SceneKind, frame: u64) -> Camera {
    match kind {
        SceneKind::Triangle | SceneKind::Quad => {
            Camera::looking_at(Vec3::new(0.0, 0.0, 2.5), Vec3::ZERO)
        }
        SceneKind::Cube => Camera {
            model: Mat4::from_rotation_y(frame as f32 * 0.3) * Mat4::from_rotation_x(0.4),
            ..Camera::looking_at(Vec3::new(1.5, 1.2, 2.5), Vec3::ZERO)
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scene_buffers_are_matched() {
        for kind in [SceneKind::Triangle, SceneKind::Quad, SceneKind::Cube] {
            let scene = Scene::build(kind);
            assert_eq!(scene.positions.len(), scene.colors.len());
            assert_eq!(scene.positions.len(), scene.normals.len());
            assert_eq!(scene.indices.len() % 3, 0);
            assert!(scene
                .indices
                .iter()
                .all(|&i| (i as usize) < scene.vertex_count()));
        }
    }

    #[test]
    fn test_cube_faces_point_outward() {
        let scene = Scene::build(SceneKind::Cube);
        assert_eq!(scene.triangle_count(), 12);

        for tri in scene.indices.chunks_exact(3) {
            let p = |i: u32| Vec3::from_slice(&scene.positions[i as usize * 3..i as usize * 3 + 3]);
            let n = Vec3::from_slice(&scene.normals[tri[0] as usize * 3..tri[0] as usize * 3 + 3]);
            let winding = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
            assert!(winding.dot(n) > 0.0);
            assert!(p(tri[0]).dot(n) > 0.0);
        }
    }
}
