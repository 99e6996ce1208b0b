//! Camera descriptor and the matrices the vertex stage consumes
//!
//! Projections map the view frustum to clip space with z in [0, w], so after
//! the perspective divide depth runs from 0 at the near plane to 1 at the far
//! plane.

use glam::{Mat3, Mat4, Vec3};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    /// Vertical field of view in degrees
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    /// Model transform applied to the mesh before viewing
    pub model: Mat4,
}

impl Camera {
    /// Camera at `position` looking at `target`, +Y up, 45° field of view
    pub fn looking_at(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            ..Default::default()
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn projection_matrix(&self, aspect: f32) -> Mat4 {
        Mat4::perspective_rh(self.fov_y_degrees.to_radians(), aspect, self.near, self.far)
    }

    /// Matrices for a viewport of `width` x `height` pixels
    pub fn matrices(&self, width: u32, height: u32) -> CameraMatrices {
        let aspect = width.max(1) as f32 / height.max(1) as f32;
        CameraMatrices {
            model: self.model,
            view: self.view_matrix(),
            projection: self.projection_matrix(aspect),
        }
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 0.0, 3.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            fov_y_degrees: 45.0,
            near: 0.1,
            far: 100.0,
            model: Mat4::IDENTITY,
        }
    }
}

/// Model, view and projection transforms for one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraMatrices {
    pub model: Mat4,
    pub view: Mat4,
    pub projection: Mat4,
}

impl CameraMatrices {
    /// All identity: positions are given directly in clip space with w = 1
    pub const IDENTITY: Self = Self {
        model: Mat4::IDENTITY,
        view: Mat4::IDENTITY,
        projection: Mat4::IDENTITY,
    };

    pub fn model_view_projection(&self) -> Mat4 {
        self.projection * self.view * self.model
    }

    /// Inverse-transpose of the model matrix, for transforming normals
    pub fn normal_matrix(&self) -> Mat3 {
        Mat3::from_mat4(self.model).inverse().transpose()
    }
}
