//! Transform components read by the proxy cache and written by integration.

use glam::{Mat4, Quat, Vec3};

/// Local-space transform. Stores position, rotation, and scale separately.
///
/// Physics treats every body as a root entity: integration writes this
/// component and [`sync_transforms`](crate::physics::rigid_body::sync_transforms)
/// copies it into [`GlobalTransform`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    /// Create an identity transform.
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }

    /// Create a transform from a position.
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    /// Create a transform from a position and a rotation.
    pub fn from_position_rotation(position: Vec3, rotation: Quat) -> Self {
        Self {
            position,
            rotation,
            scale: Vec3::ONE,
        }
    }

    /// Convert to a 4x4 matrix (translation * rotation * scale).
    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.position)
    }

    /// Decompose a 4x4 matrix into a Transform.
    ///
    /// Assumes an affine matrix without shear.
    pub fn from_matrix(mat: Mat4) -> Self {
        let (scale, rotation, position) = mat.to_scale_rotation_translation();
        Self {
            position,
            rotation,
            scale,
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

/// World-space transform matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlobalTransform(pub Mat4);

impl GlobalTransform {
    /// Build the world matrix for a root transform.
    pub fn from_transform(transform: &Transform) -> Self {
        Self(transform.to_matrix())
    }

    /// World-space origin of the entity.
    #[inline]
    pub fn translation(&self) -> Vec3 {
        self.0.w_axis.truncate()
    }

    /// Rotation part, with scale removed.
    pub fn rotation(&self) -> Quat {
        let (_, rotation, _) = self.0.to_scale_rotation_translation();
        rotation
    }
}

impl Default for GlobalTransform {
    fn default() -> Self {
        Self(Mat4::IDENTITY)
    }
}

impl From<Transform> for GlobalTransform {
    fn from(transform: Transform) -> Self {
        Self::from_transform(&transform)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let t = Transform::identity();
        assert_eq!(t.position, Vec3::ZERO);
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.scale, Vec3::ONE);
        assert_eq!(t.to_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_to_matrix_roundtrip() {
        let original = Transform {
            position: Vec3::new(1.0, 2.0, 3.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_4),
            scale: Vec3::new(2.0, 1.5, 0.5),
        };

        let recovered = Transform::from_matrix(original.to_matrix());

        let eps = 1e-5;
        assert!((original.position - recovered.position).length() < eps);
        // Quaternion can be negated and still represent the same rotation
        let dot = original.rotation.dot(recovered.rotation).abs();
        assert!((dot - 1.0).abs() < eps);
        assert!((original.scale - recovered.scale).length() < eps);
    }

    #[test]
    fn test_global_transform_translation() {
        let t = Transform::from_position_rotation(
            Vec3::new(4.0, -1.0, 2.0),
            Quat::from_rotation_z(1.0),
        );
        let global = GlobalTransform::from(t);
        assert!((global.translation() - t.position).length() < 1e-6);
        assert!(global.rotation().dot(t.rotation).abs() > 1.0 - 1e-5);
    }
}
