//! Rigid body integration functions.

use glam::{Quat, Vec3};
use tracing::debug;

use crate::ecs::components::physics::PhysicsBody;
use crate::ecs::components::transform::{GlobalTransform, Transform};

use super::config::PhysicsConfig;
use super::sleep::update_sleep;

/// Outcome of integrating one body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrationResult {
    /// Position and orientation advanced.
    Integrated,
    /// Static, kinematic or sleeping: left untouched.
    Ignored,
    /// Advanced, then put to sleep.
    PutToSleep,
}

/// Tally of one [`integrate_positions`] pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IntegrationSummary {
    pub integrated: usize,
    pub ignored: usize,
    pub put_to_sleep: usize,
}

impl IntegrationSummary {
    fn record(&mut self, result: IntegrationResult) {
        match result {
            IntegrationResult::Integrated => self.integrated += 1,
            IntegrationResult::Ignored => self.ignored += 1,
            IntegrationResult::PutToSleep => self.put_to_sleep += 1,
        }
    }
}

/// Apply gravity and drag to every awake dynamic body's velocity.
pub fn integrate_forces(world: &mut hecs::World, gravity: Vec3, dt: f32) {
    for (_, body) in world.query_mut::<&mut PhysicsBody>() {
        if !body.is_active() {
            continue;
        }

        body.linear_velocity += gravity * body.gravity_scale * dt * body.linear_freedom;

        body.linear_velocity *= (1.0 - body.linear_drag * dt).max(0.0);
        body.angular_velocity *= (1.0 - body.angular_drag * dt).max(0.0);
    }
}

/// Advance one body by its velocity: p += v * dt, q += 0.5 * omega * q * dt.
pub fn integrate_body(
    body: &mut PhysicsBody,
    transform: &mut Transform,
    dt: f32,
    config: &PhysicsConfig,
) -> IntegrationResult {
    if !body.is_active() {
        return IntegrationResult::Ignored;
    }

    body.linear_velocity = (body.linear_velocity * body.linear_freedom)
        .clamp_length_max(config.max_linear_speed);
    body.angular_velocity *= body.angular_freedom;

    transform.position += body.linear_velocity * dt;

    let omega = body.angular_velocity;
    if omega.length_squared() > 1e-10 {
        let omega_quat = Quat::from_xyzw(omega.x, omega.y, omega.z, 0.0);
        let q_dot = omega_quat * transform.rotation * 0.5;
        transform.rotation = Quat::from_xyzw(
            transform.rotation.x + q_dot.x * dt,
            transform.rotation.y + q_dot.y * dt,
            transform.rotation.z + q_dot.z * dt,
            transform.rotation.w + q_dot.w * dt,
        )
        .normalize();
    }

    if update_sleep(body, config) {
        IntegrationResult::PutToSleep
    } else {
        IntegrationResult::Integrated
    }
}

/// Integrate every body that has a [`Transform`].
pub fn integrate_positions(
    world: &mut hecs::World,
    dt: f32,
    config: &PhysicsConfig,
) -> IntegrationSummary {
    let mut summary = IntegrationSummary::default();
    for (entity, (body, transform)) in world.query_mut::<(&mut PhysicsBody, &mut Transform)>() {
        let result = integrate_body(body, transform, dt, config);
        if result == IntegrationResult::PutToSleep {
            debug!("Body {:?} fell asleep", entity);
        }
        summary.record(result);
    }
    summary
}

/// Copy every [`Transform`] into its [`GlobalTransform`].
pub fn sync_transforms(world: &mut hecs::World) {
    for (_, (transform, global)) in world.query_mut::<(&Transform, &mut GlobalTransform)>() {
        global.0 = transform.to_matrix();
    }
}
