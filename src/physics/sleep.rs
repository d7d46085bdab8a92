//! Body deactivation.
//!
//! A dynamic body that stays slower than `sleep_epsilon` for `sleep_frames`
//! consecutive steps is put to sleep: it keeps its place but is skipped by
//! the broad phase, the solver and integration until something wakes it.

use hecs::Entity;
use tracing::debug;

use crate::ecs::components::physics::PhysicsBody;

use super::config::PhysicsConfig;
use super::joint::Joints;
use super::manifold::ManifoldCache;

/// Advance the inactivity counter. Returns `true` if the body just fell asleep.
pub fn update_sleep(body: &mut PhysicsBody, config: &PhysicsConfig) -> bool {
    if config.sleep_frames == 0 || !body.is_active() {
        return false;
    }

    if body.speed() >= config.sleep_epsilon {
        body.sleep_counter = 0;
        return false;
    }

    body.sleep_counter += 1;
    if body.sleep_counter < config.sleep_frames {
        return false;
    }

    body.awake = false;
    body.linear_velocity = glam::Vec3::ZERO;
    body.angular_velocity = glam::Vec3::ZERO;
    true
}

/// Wake a sleeping body. Returns `true` if it was asleep.
pub fn wake_body(world: &mut hecs::World, entity: Entity) -> bool {
    match world.get::<&mut PhysicsBody>(entity) {
        Ok(mut body) if body.is_dynamic() && body.is_sleeping() => {
            body.wake();
            debug!("Woke body {:?}", entity);
            true
        }
        _ => false,
    }
}

/// Wake sleeping bodies that are touched by something in motion.
///
/// Returns the number of bodies woken.
pub fn wake_touching(world: &mut hecs::World, manifolds: &ManifoldCache) -> usize {
    let pairs = manifolds
        .iter()
        .filter(|m| !m.trigger)
        .map(|m| (m.entity_a, m.entity_b));
    wake_pairs(world, pairs)
}

/// Wake sleeping bodies whose joint partner is in motion.
///
/// Returns the number of bodies woken.
pub fn wake_jointed(world: &mut hecs::World, joints: &Joints) -> usize {
    let pairs = joints.iter().map(|(_, j)| (j.entity_a, j.entity_b));
    wake_pairs(world, pairs)
}

fn wake_pairs(world: &mut hecs::World, pairs: impl Iterator<Item = (Entity, Entity)>) -> usize {
    let mut to_wake: Vec<Entity> = Vec::new();
    for (a, b) in pairs {
        if is_sleeping(world, a) && disturbs(world, b) {
            to_wake.push(a);
        }
        if is_sleeping(world, b) && disturbs(world, a) {
            to_wake.push(b);
        }
    }

    to_wake
        .into_iter()
        .filter(|entity| wake_body(world, *entity))
        .count()
}

fn is_sleeping(world: &hecs::World, entity: Entity) -> bool {
    world
        .get::<&PhysicsBody>(entity)
        .is_ok_and(|body| body.is_dynamic() && body.is_sleeping())
}

/// Awake dynamic bodies and moving kinematic ones can wake what they touch.
fn disturbs(world: &hecs::World, entity: Entity) -> bool {
    world.get::<&PhysicsBody>(entity).is_ok_and(|body| {
        body.is_active() || body.is_moving_kinematic()
    })
}
