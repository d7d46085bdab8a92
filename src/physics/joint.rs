//! Ball-socket joints between pairs of bodies.

use glam::Vec3;
use hecs::Entity;
use slotmap::{new_key_type, SlotMap};
use tracing::warn;

use crate::ecs::components::physics::PhysicsBody;
use crate::error::PhysicsError;

new_key_type! {
    /// Handle to a joint stored in [`Joints`].
    pub struct JointId;
}

/// Keeps an anchor point on each body coincident.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    pub entity_a: Entity,
    pub entity_b: Entity,
    /// Anchor in the local space of `entity_a`.
    pub anchor_a: Vec3,
    /// Anchor in the local space of `entity_b`.
    pub anchor_b: Vec3,
    /// Fraction of the anchor separation corrected per second, times the step rate.
    pub bias_factor: f32,
    /// Constraint softness. Zero is rigid.
    pub softness: f32,
    /// Impulse accumulated last step, used for warm starting.
    pub accumulated_impulse: Vec3,
}

impl Joint {
    pub fn ball_socket(entity_a: Entity, entity_b: Entity, anchor_a: Vec3, anchor_b: Vec3) -> Self {
        Self {
            entity_a,
            entity_b,
            anchor_a,
            anchor_b,
            bias_factor: 0.2,
            softness: 0.0,
            accumulated_impulse: Vec3::ZERO,
        }
    }

    pub fn with_softness(mut self, softness: f32) -> Self {
        self.softness = softness;
        self
    }

    pub fn with_bias_factor(mut self, bias_factor: f32) -> Self {
        self.bias_factor = bias_factor;
        self
    }

    #[inline]
    pub fn involves(&self, entity: Entity) -> bool {
        self.entity_a == entity || self.entity_b == entity
    }
}

/// Joint storage with stable handles.
#[derive(Debug, Default, Clone)]
pub struct Joints {
    joints: SlotMap<JointId, Joint>,
}

impl Joints {
    pub fn new() -> Self {
        Self::default()
    }

    /// Connect `a` and `b` with a ball-socket joint.
    pub fn add(
        &mut self,
        world: &hecs::World,
        a: Entity,
        b: Entity,
        anchor_a: Vec3,
        anchor_b: Vec3,
    ) -> Result<JointId, PhysicsError> {
        self.add_joint(world, Joint::ball_socket(a, b, anchor_a, anchor_b))
    }

    /// Insert a prepared joint. Both entities must carry a [`PhysicsBody`].
    pub fn add_joint(&mut self, world: &hecs::World, joint: Joint) -> Result<JointId, PhysicsError> {
        if let Err(err) = check_joint(world, &joint) {
            warn!("Rejected joint: {}", err);
            return Err(err);
        }
        Ok(self.joints.insert(joint))
    }

    pub fn remove(&mut self, id: JointId) -> Option<Joint> {
        self.joints.remove(id)
    }

    /// Remove every joint attached to `entity`. Returns how many were removed.
    pub fn remove_involving(&mut self, entity: Entity) -> usize {
        let before = self.joints.len();
        self.joints.retain(|_, joint| !joint.involves(entity));
        before - self.joints.len()
    }

    pub fn get(&self, id: JointId) -> Option<&Joint> {
        self.joints.get(id)
    }

    pub fn get_mut(&mut self, id: JointId) -> Option<&mut Joint> {
        self.joints.get_mut(id)
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (JointId, &Joint)> {
        self.joints.iter()
    }

    /// Check that every joint still connects two bodies.
    pub fn validate(&self, world: &hecs::World) -> Result<(), PhysicsError> {
        self.joints
            .values()
            .try_for_each(|joint| check_joint(world, joint))
    }

    pub fn clear(&mut self) {
        self.joints.clear();
    }
}

fn check_joint(world: &hecs::World, joint: &Joint) -> Result<(), PhysicsError> {
    for entity in [joint.entity_a, joint.entity_b] {
        if !world.contains(entity) {
            return Err(PhysicsError::NoSuchEntity(entity));
        }
        if world.get::<&PhysicsBody>(entity).is_err() {
            return Err(PhysicsError::MissingBody(entity));
        }
    }
    Ok(())
}
