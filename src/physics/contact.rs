//! Contact data produced by the narrow phase.

use glam::{Mat4, Vec3};

/// A single contact between two shapes.
///
/// `normal` points from shape A toward shape B. Local points are expressed
/// in each entity's own space so the manifold can track them as bodies move.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    /// Deepest point of shape A inside B, in world space.
    pub world_point_a: Vec3,
    /// Deepest point of shape B inside A, in world space.
    pub world_point_b: Vec3,
    pub local_point_a: Vec3,
    pub local_point_b: Vec3,
    /// Unit contact normal (from A to B).
    pub normal: Vec3,
    /// Penetration depth; zero when just touching.
    pub depth: f32,
}

impl Contact {
    /// Build a contact from world points, deriving the local points from
    /// each shape's world matrix.
    pub fn from_world(
        world_point_a: Vec3,
        world_point_b: Vec3,
        normal: Vec3,
        depth: f32,
        transform_a: &Mat4,
        transform_b: &Mat4,
    ) -> Self {
        Self {
            world_point_a,
            world_point_b,
            local_point_a: transform_a.inverse().transform_point3(world_point_a),
            local_point_b: transform_b.inverse().transform_point3(world_point_b),
            normal,
            depth,
        }
    }

    /// Same contact seen from the other shape.
    pub fn flipped(&self) -> Self {
        Self {
            world_point_a: self.world_point_b,
            world_point_b: self.world_point_a,
            local_point_a: self.local_point_b,
            local_point_b: self.local_point_a,
            normal: -self.normal,
            depth: self.depth,
        }
    }

    /// Midpoint between the two world points.
    #[inline]
    pub fn midpoint(&self) -> Vec3 {
        (self.world_point_a + self.world_point_b) * 0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flipped_swaps_sides() {
        let contact = Contact {
            world_point_a: Vec3::X,
            world_point_b: Vec3::ZERO,
            local_point_a: Vec3::new(-1.0, 0.0, 0.0),
            local_point_b: Vec3::new(1.0, 0.0, 0.0),
            normal: Vec3::X,
            depth: 1.0,
        };
        let flipped = contact.flipped();
        assert_eq!(flipped.world_point_a, Vec3::ZERO);
        assert_eq!(flipped.local_point_b, Vec3::new(-1.0, 0.0, 0.0));
        assert_eq!(flipped.normal, -Vec3::X);
        assert_eq!(flipped.depth, 1.0);
        assert_eq!(flipped.flipped(), contact);
    }

    #[test]
    fn test_from_world_local_points() {
        let a = Mat4::from_translation(Vec3::new(2.0, 0.0, 0.0));
        let b = Mat4::from_translation(Vec3::new(4.0, 0.0, 0.0));
        let contact = Contact::from_world(
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::X,
            0.0,
            &a,
            &b,
        );
        assert!((contact.local_point_a - Vec3::X).length() < 1e-6);
        assert!((contact.local_point_b + Vec3::X).length() < 1e-6);
    }
}
