//! Local transforms of scene entities

use nalgebra::{Rotation3, Unit};
use crate::foundation::math::{Mat4, Vec3};

/// Position, axis-angle rotation and scale of an entity relative to its parent
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    /// Translation
    pub position: Vec3,
    /// Rotation axis; a zero axis means no rotation
    pub axis: Vec3,
    /// Rotation angle in radians
    pub angle: f32,
    /// Per-axis scale
    pub scale: Vec3,
}

impl Transform {
    /// Identity transform
    pub fn identity() -> Self {
        Self {
            position: Vec3::zeros(),
            axis: Vec3::zeros(),
            angle: 0.0,
            scale: Vec3::new(1.0, 1.0, 1.0),
        }
    }

    /// Identity rotation and scale at a position
    pub fn from_position(position: Vec3) -> Self {
        Self { position, ..Self::identity() }
    }

    /// Set the rotation
    pub fn with_rotation(mut self, axis: Vec3, angle: f32) -> Self {
        self.axis = axis;
        self.angle = angle;
        self
    }

    /// Set the scale
    pub fn with_scale(mut self, scale: Vec3) -> Self {
        self.scale = scale;
        self
    }

    /// Model matrix: translate * rotate * scale
    ///
    /// Computed on every call.
    pub fn model_matrix(&self) -> Mat4 {
        let translation = Mat4::new_translation(&self.position);
        let rotation = Unit::try_new(self.axis, f32::EPSILON)
            .map_or_else(Mat4::identity, |axis| Rotation3::from_axis_angle(&axis, self.angle).to_homogeneous());
        let scale = Mat4::new_nonuniform_scaling(&self.scale);
        translation * rotation * scale
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
