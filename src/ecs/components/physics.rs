//! Physics components for ECS entities.

use std::sync::Arc;

use glam::{Mat3, Quat, Vec3};

use crate::physics::collider::{BoundingSphere, Triangle};

/// Rigid body type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigidBodyType {
    /// Affected by forces and collisions.
    Dynamic,
    /// Immovable.
    Static,
    /// Position controlled by user, but affects dynamic bodies.
    Kinematic,
}

/// World axis selector for freedom masks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }
}

/// Dynamic state of a simulated entity.
///
/// Mutated only by the solver and by explicit impulse calls.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsBody {
    pub body_type: RigidBodyType,
    /// Zero for static and kinematic bodies.
    pub inverse_mass: f32,
    /// Diagonal of the local-space inertia tensor.
    pub inertia: Vec3,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Linear drag coefficient, per second (default: 0.01).
    pub linear_drag: f32,
    /// Angular drag coefficient, per second (default: 0.01).
    pub angular_drag: f32,
    /// Coefficient of restitution (0.0 - 1.0).
    pub restitution: f32,
    /// Friction coefficient (0.0 - 1.0).
    pub friction: f32,
    /// Gravity scale (default: 1.0).
    pub gravity_scale: f32,
    /// Per-axis translation mask: 1.0 = free, 0.0 = locked.
    pub linear_freedom: Vec3,
    /// Per-axis rotation mask: 1.0 = free, 0.0 = locked.
    pub angular_freedom: Vec3,
    /// Consecutive steps spent below the sleep threshold.
    pub sleep_counter: u32,
    pub awake: bool,
}

impl PhysicsBody {
    /// Create a new dynamic rigid body with the given mass.
    pub fn new_dynamic(mass: f32) -> Self {
        let inverse_mass = if mass > 0.0 { 1.0 / mass } else { 0.0 };
        Self {
            body_type: RigidBodyType::Dynamic,
            inverse_mass,
            // Unit sphere approximation
            inertia: Vec3::splat(mass),
            linear_drag: 0.01,
            angular_drag: 0.01,
            gravity_scale: 1.0,
            ..Self::immovable(RigidBodyType::Dynamic)
        }
    }

    /// Create a new static rigid body.
    pub fn new_static() -> Self {
        Self::immovable(RigidBodyType::Static)
    }

    /// Create a new kinematic rigid body.
    pub fn new_kinematic() -> Self {
        Self::immovable(RigidBodyType::Kinematic)
    }

    fn immovable(body_type: RigidBodyType) -> Self {
        Self {
            body_type,
            inverse_mass: 0.0,
            inertia: Vec3::ZERO,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            linear_drag: 0.0,
            angular_drag: 0.0,
            restitution: 0.3,
            friction: 0.5,
            gravity_scale: 0.0,
            linear_freedom: Vec3::ONE,
            angular_freedom: Vec3::ONE,
            sleep_counter: 0,
            awake: true,
        }
    }

    /// Replace the diagonal inertia tensor.
    pub fn with_inertia(mut self, inertia: Vec3) -> Self {
        self.inertia = inertia;
        self
    }

    /// Solid sphere inertia for the body's current mass.
    pub fn with_sphere_inertia(self, radius: f32) -> Self {
        let i = 0.4 * self.mass() * radius * radius;
        self.with_inertia(Vec3::splat(i))
    }

    /// Solid box inertia for the body's current mass.
    pub fn with_box_inertia(self, half_extents: Vec3) -> Self {
        let size = half_extents * 2.0;
        let sq = size * size;
        let k = self.mass() / 12.0;
        self.with_inertia(Vec3::new(sq.y + sq.z, sq.x + sq.z, sq.x + sq.y) * k)
    }

    pub fn with_drag(mut self, linear: f32, angular: f32) -> Self {
        self.linear_drag = linear;
        self.angular_drag = angular;
        self
    }

    pub fn with_velocity(mut self, linear: Vec3) -> Self {
        self.linear_velocity = linear;
        self
    }

    /// Prevent translation along a world axis.
    pub fn lock_translation(mut self, axis: Axis) -> Self {
        self.linear_freedom[axis.index()] = 0.0;
        self
    }

    /// Prevent rotation about a world axis.
    pub fn lock_rotation(mut self, axis: Axis) -> Self {
        self.angular_freedom[axis.index()] = 0.0;
        self
    }

    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.body_type == RigidBodyType::Dynamic
    }

    #[inline]
    pub fn is_sleeping(&self) -> bool {
        !self.awake
    }

    /// Awake dynamic body: the only kind the solver moves.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.awake && self.is_dynamic()
    }

    pub fn mass(&self) -> f32 {
        if self.inverse_mass > 0.0 {
            1.0 / self.inverse_mass
        } else {
            0.0
        }
    }

    /// Combined linear and angular speed, compared against the sleep epsilon.
    /// Kinematic body with nonzero velocity. It can wake what it touches.
    pub fn is_moving_kinematic(&self) -> bool {
        self.body_type == RigidBodyType::Kinematic && self.speed() > 0.0
    }

    pub fn speed(&self) -> f32 {
        self.linear_velocity.length() + self.angular_velocity.length()
    }

    /// Per-axis inverse mass with the translation mask applied.
    pub fn inverse_mass_vector(&self) -> Vec3 {
        if self.is_dynamic() {
            self.linear_freedom * self.inverse_mass
        } else {
            Vec3::ZERO
        }
    }

    /// World-space inverse inertia with the rotation mask applied.
    pub fn inverse_inertia_world(&self, rotation: Quat) -> Mat3 {
        if !self.is_dynamic() {
            return Mat3::ZERO;
        }
        let inv_local = Vec3::new(
            if self.inertia.x > 0.0 { 1.0 / self.inertia.x } else { 0.0 },
            if self.inertia.y > 0.0 { 1.0 / self.inertia.y } else { 0.0 },
            if self.inertia.z > 0.0 { 1.0 / self.inertia.z } else { 0.0 },
        );
        let r = Mat3::from_quat(rotation);
        let mask = Mat3::from_diagonal(self.angular_freedom);
        mask * r * Mat3::from_diagonal(inv_local) * r.transpose() * mask
    }

    /// Apply a linear impulse through the center of mass. Wakes the body.
    pub fn apply_impulse(&mut self, impulse: Vec3) {
        if !self.is_dynamic() {
            return;
        }
        self.linear_velocity += impulse * self.inverse_mass_vector();
        self.wake();
    }

    /// Apply an angular impulse given in world space. Wakes the body.
    pub fn apply_angular_impulse(&mut self, impulse: Vec3, rotation: Quat) {
        if !self.is_dynamic() {
            return;
        }
        self.angular_velocity += self.inverse_inertia_world(rotation) * impulse;
        self.wake();
    }

    /// Mark the body awake and restart its inactivity count.
    pub fn wake(&mut self) {
        self.awake = true;
        self.sleep_counter = 0;
    }
}

/// Read-only vertex view shared with the asset store.
pub type HullVertices = Arc<[Vec3]>;

/// Convex collision volume in the entity's local space.
#[derive(Debug, Clone)]
pub enum ColliderVolume {
    Sphere {
        center: Vec3,
        radius: f32,
    },
    Box {
        center: Vec3,
        half_extents: Vec3,
        max_extent: f32,
    },
    Capsule {
        a: Vec3,
        b: Vec3,
        radius: f32,
        max_extent: f32,
    },
    Hull {
        vertices: HullVertices,
        /// Local AABB (min, max) of the vertices.
        extents: (Vec3, Vec3),
        max_extent: f32,
    },
}

impl ColliderVolume {
    pub fn sphere(radius: f32) -> Self {
        Self::Sphere {
            center: Vec3::ZERO,
            radius,
        }
    }

    pub fn sphere_at(center: Vec3, radius: f32) -> Self {
        Self::Sphere { center, radius }
    }

    pub fn cuboid(half_extents: Vec3) -> Self {
        Self::cuboid_at(Vec3::ZERO, half_extents)
    }

    pub fn cuboid_at(center: Vec3, half_extents: Vec3) -> Self {
        Self::Box {
            center,
            half_extents,
            max_extent: half_extents.length(),
        }
    }

    /// Capsule around the segment `a`-`b`.
    pub fn capsule(a: Vec3, b: Vec3, radius: f32) -> Self {
        Self::Capsule {
            a,
            b,
            radius,
            max_extent: (b - a).length() * 0.5 + radius,
        }
    }

    /// Convex hull over a shared vertex buffer.
    pub fn hull(vertices: HullVertices) -> Self {
        let (min, max) = vertices.iter().fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(min, max), v| (min.min(*v), max.max(*v)),
        );
        let (min, max) = if vertices.is_empty() {
            (Vec3::ZERO, Vec3::ZERO)
        } else {
            (min, max)
        };
        let center = (min + max) * 0.5;
        let max_extent = vertices
            .iter()
            .map(|v| v.distance(center))
            .fold(0.0, f32::max);
        Self::Hull {
            vertices,
            extents: (min, max),
            max_extent,
        }
    }

    /// Local-space center the bounding estimate is taken around.
    pub fn local_center(&self) -> Vec3 {
        match self {
            Self::Sphere { center, .. } | Self::Box { center, .. } => *center,
            Self::Capsule { a, b, .. } => (*a + *b) * 0.5,
            Self::Hull { extents, .. } => (extents.0 + extents.1) * 0.5,
        }
    }

    /// Local-space bounding radius around [`local_center`](Self::local_center).
    pub fn max_extent(&self) -> f32 {
        match self {
            Self::Sphere { radius, .. } => *radius,
            Self::Box { max_extent, .. }
            | Self::Capsule { max_extent, .. }
            | Self::Hull { max_extent, .. } => *max_extent,
        }
    }
}

/// Convex collision component.
#[derive(Debug, Clone)]
pub struct Collider {
    pub volume: ColliderVolume,
    /// If true, generates collision events but no physics response.
    pub is_trigger: bool,
}

impl Collider {
    pub fn solid(volume: ColliderVolume) -> Self {
        Self {
            volume,
            is_trigger: false,
        }
    }

    pub fn trigger(volume: ColliderVolume) -> Self {
        Self {
            volume,
            is_trigger: true,
        }
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self::solid(ColliderVolume::sphere(0.5))
    }
}

/// Static concave triangle soup in local space.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    pub triangles: Vec<Triangle>,
    pub bounds: BoundingSphere,
}

impl TriangleMesh {
    pub fn new(triangles: Vec<Triangle>) -> Self {
        let bounds = BoundingSphere::from_points(triangles.iter().flat_map(|t| t.vertices()));
        Self { triangles, bounds }
    }

    /// Build from an indexed vertex buffer. Incomplete trailing triangles are ignored.
    pub fn from_indexed(vertices: &[Vec3], indices: &[u32]) -> Self {
        let triangles = indices
            .chunks_exact(3)
            .filter_map(|tri| {
                let a = *vertices.get(tri[0] as usize)?;
                let b = *vertices.get(tri[1] as usize)?;
                let c = *vertices.get(tri[2] as usize)?;
                Some(Triangle::new(a, b, c))
            })
            .collect();
        Self::new(triangles)
    }
}

/// Concave collision component. Only valid on immovable entities; attach it
/// through [`PhysicsWorld::attach_mesh_collider`](crate::physics::PhysicsWorld::attach_mesh_collider).
#[derive(Debug, Clone)]
pub struct ConcaveCollider {
    pub mesh: Arc<TriangleMesh>,
}
