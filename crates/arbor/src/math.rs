//! Math types and glam re-exports.
//!
//! [glam](https://docs.rs/glam) types are re-exported so callers don't need
//! their own dependency on it. [`Transform`] is the decomposed form of a local
//! matrix stored in a transform hierarchy.

pub use glam::{Mat4, Quat, Vec3};

use serde::{Deserialize, Serialize};

/// Translation, rotation and scale of one node relative to its parent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self {
            translation: Vec3::new(x, y, z),
            ..Self::IDENTITY
        }
    }

    /// Decompose an affine matrix. Shear is lost.
    pub fn from_matrix(matrix: Mat4) -> Self {
        let (scale, rotation, translation) = matrix.to_scale_rotation_translation();
        Self {
            translation,
            rotation,
            scale,
        }
    }

    pub fn with_rotation(mut self, rotation: Quat) -> Self {
        self.rotation = rotation;
        self
    }

    /// Return a copy with uniform scale applied.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = Vec3::splat(scale);
        self
    }

    /// The local matrix: scale, then rotate, then translate.
    pub fn matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_matrix() {
        assert_eq!(Transform::default().matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn translation_lands_in_last_column() {
        let m = Transform::from_xyz(1.0, 2.0, 3.0).matrix();
        assert_eq!(m.col(3).truncate(), Vec3::new(1.0, 2.0, 3.0));
    }

    #[test]
    fn scale_applies_before_translation() {
        let m = Transform::from_xyz(10.0, 0.0, 0.0).with_scale(2.0).matrix();
        let p = m.transform_point3(Vec3::new(1.0, 0.0, 0.0));
        assert!((p - Vec3::new(12.0, 0.0, 0.0)).length() < 1e-5);
    }

    #[test]
    fn decomposes_matrix() {
        let t = Transform::from_xyz(4.0, -1.0, 0.5)
            .with_rotation(Quat::from_rotation_z(0.5))
            .with_scale(3.0);
        let back = Transform::from_matrix(t.matrix());
        assert!((back.translation - t.translation).length() < 1e-4);
        assert!((back.scale - t.scale).length() < 1e-4);
        assert!(back.rotation.abs_diff_eq(t.rotation, 1e-4));
    }
}
