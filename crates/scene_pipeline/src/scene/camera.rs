//! Perspective cameras viewing a scene
//!
//! View-projection follows P × X × V, where X converts the Y-up view space to
//! Vulkan's clip conventions.

use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};

/// Perspective camera
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    /// Camera position in world space
    pub position: Vec3,
    /// Point the camera looks at
    pub target: Vec3,
    /// Up vector
    pub up: Vec3,
    /// Vertical field of view in radians
    pub fov: f32,
    /// Width / height
    pub aspect: f32,
    /// Near plane distance
    pub near: f32,
    /// Far plane distance
    pub far: f32,
}

impl Camera {
    /// Perspective camera looking at the origin with +Y up
    pub fn perspective(position: Vec3, fov_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Self {
            position,
            target: Vec3::zeros(),
            up: Vec3::y(),
            fov: utils::deg_to_rad(fov_degrees),
            aspect,
            near,
            far,
        }
    }

    /// Point the camera at a target
    pub fn look_at(&mut self, target: Vec3, up: Vec3) {
        self.target = target;
        self.up = up;
        log::trace!("Camera looking at {:?}", target);
    }

    /// Change the aspect ratio
    pub fn set_aspect_ratio(&mut self, aspect: f32) {
        if (self.aspect - aspect).abs() > 0.01 {
            log::debug!("Camera aspect ratio changed: {:.3} -> {:.3}", self.aspect, aspect);
        }
        self.aspect = aspect;
    }

    /// World to view space
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.target, self.up)
    }

    /// View to clip space
    pub fn projection_matrix(&self) -> Mat4 {
        Mat4::perspective(self.fov, self.aspect, self.near, self.far)
    }

    /// World to clip space
    pub fn view_projection(&self) -> Mat4 {
        self.projection_matrix() * Mat4::vulkan_coordinate_transform() * self.view_matrix()
    }

    /// Camera-space distance to a world-space point
    pub fn distance_to(&self, point: Vec3) -> f32 {
        (point - self.position).norm()
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self::perspective(Vec3::new(0.0, 0.0, 10.0), 60.0, 16.0 / 9.0, 0.1, 1000.0)
    }
}
