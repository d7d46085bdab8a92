//! Sequential impulse constraint solver.
//!
//! Bodies touched by a constraint are copied into a dense [`SolverBody`]
//! array (slot 0 stands for everything immovable), constraints are prepared
//! once per step, warm started from last step's impulses and relaxed with a
//! fixed number of Gauss-Seidel passes. Velocities and accumulated impulses
//! are written back at the end.

use std::collections::HashMap;

use glam::{Mat3, Vec3};
use hecs::Entity;

use crate::ecs::components::physics::PhysicsBody;
use crate::ecs::components::transform::GlobalTransform;

use super::config::PhysicsConfig;
use super::entity_matrix;
use super::joint::{JointId, Joints};
use super::manifold::ManifoldCache;

/// Approach speed above which restitution kicks in.
const RESTITUTION_THRESHOLD: f32 = 1.0;

/// Cached body data for solver calculations.
#[derive(Debug, Clone)]
struct SolverBody {
    entity: Option<Entity>,
    position: Vec3,
    inv_mass: Vec3,
    inv_inertia: Mat3,
    linear_velocity: Vec3,
    angular_velocity: Vec3,
    restitution: f32,
    friction: f32,
}

impl SolverBody {
    fn fixed() -> Self {
        Self {
            entity: None,
            position: Vec3::ZERO,
            inv_mass: Vec3::ZERO,
            inv_inertia: Mat3::ZERO,
            linear_velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            restitution: 0.0,
            friction: 0.5,
        }
    }

    fn from_body(entity: Entity, body: &PhysicsBody, transform: Option<&GlobalTransform>) -> Self {
        let (position, rotation) = transform
            .map(|t| (t.translation(), t.rotation()))
            .unwrap_or((Vec3::ZERO, glam::Quat::IDENTITY));
        let active = body.is_active();
        Self {
            entity: Some(entity),
            position,
            inv_mass: if active {
                body.inverse_mass_vector()
            } else {
                Vec3::ZERO
            },
            inv_inertia: if active {
                body.inverse_inertia_world(rotation)
            } else {
                Mat3::ZERO
            },
            linear_velocity: if body.is_sleeping() {
                Vec3::ZERO
            } else {
                body.linear_velocity
            },
            angular_velocity: if body.is_sleeping() {
                Vec3::ZERO
            } else {
                body.angular_velocity
            },
            restitution: body.restitution,
            friction: body.friction,
        }
    }

    #[inline]
    fn velocity_at(&self, r: Vec3) -> Vec3 {
        self.linear_velocity + self.angular_velocity.cross(r)
    }

    #[inline]
    fn is_movable(&self) -> bool {
        self.inv_mass != Vec3::ZERO
    }
}

/// One manifold point prepared for solving.
#[derive(Debug, Clone)]
struct ContactConstraint {
    manifold: usize,
    point: usize,
    body_a: usize,
    body_b: usize,
    normal: Vec3,
    tangents: [Vec3; 2],
    r_a: Vec3,
    r_b: Vec3,
    normal_mass: f32,
    tangent_mass: [f32; 2],
    /// Target separation velocity from position error and restitution.
    bias: f32,
    friction: f32,
    normal_impulse: f32,
    tangent_impulse: [f32; 2],
}

/// One ball-socket joint prepared for solving.
#[derive(Debug, Clone)]
struct JointConstraint {
    id: JointId,
    body_a: usize,
    body_b: usize,
    r_a: Vec3,
    r_b: Vec3,
    /// Inverse of the softened effective mass matrix.
    mass: Mat3,
    bias: Vec3,
    softness: f32,
    impulse: Vec3,
}

/// Sequential impulse solver for contacts and joints.
///
/// Buffers are kept between steps to avoid reallocating.
#[derive(Debug, Default)]
pub struct ContactSolver {
    bodies: Vec<SolverBody>,
    lookup: HashMap<Entity, usize>,
    contacts: Vec<ContactConstraint>,
    joints: Vec<JointConstraint>,
}

impl ContactSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Solve every non-trigger manifold and every joint for one step.
    ///
    /// Returns the number of constraints solved.
    pub fn solve(
        &mut self,
        world: &mut hecs::World,
        manifolds: &mut ManifoldCache,
        joints: &mut Joints,
        dt: f32,
        config: &PhysicsConfig,
    ) -> usize {
        self.prepare(world, manifolds, joints, dt, config);
        let count = self.contacts.len() + self.joints.len();
        if count == 0 {
            return 0;
        }

        if config.warm_start {
            self.warm_start(config.warm_start_factor);
        }
        for _ in 0..config.solver_iterations {
            for i in 0..self.joints.len() {
                self.solve_joint(i);
            }
            for i in 0..self.contacts.len() {
                self.solve_contact(i);
            }
        }

        self.store(world, manifolds, joints);
        count
    }

    fn prepare(
        &mut self,
        world: &hecs::World,
        manifolds: &ManifoldCache,
        joints: &Joints,
        dt: f32,
        config: &PhysicsConfig,
    ) {
        self.bodies.clear();
        self.lookup.clear();
        self.contacts.clear();
        self.joints.clear();
        self.bodies.push(SolverBody::fixed());

        let inv_dt = if dt > 0.0 { 1.0 / dt } else { 0.0 };

        for (m, manifold) in manifolds.as_slice().iter().enumerate() {
            if manifold.trigger || manifold.is_empty() {
                continue;
            }
            let body_a = self.slot(world, manifold.entity_a);
            let body_b = self.slot(world, manifold.entity_b);
            if !self.bodies[body_a].is_movable() && !self.bodies[body_b].is_movable() {
                continue;
            }

            let deepest = manifold.deepest_index();
            let (a, b) = (&self.bodies[body_a], &self.bodies[body_b]);
            let friction = (a.friction + b.friction) * 0.5;
            let restitution = (a.restitution + b.restitution) * 0.5;

            for (p, point) in manifold.points().iter().enumerate() {
                let contact = &point.contact;
                let normal = contact.normal;
                let r_a = contact.world_point_a - a.position;
                let r_b = contact.world_point_b - b.position;
                let tangents = {
                    let (t1, t2) = normal.any_orthonormal_pair();
                    [t1, t2]
                };

                let normal_mass = inverse_or_zero(effective_mass(a, b, r_a, r_b, normal));
                let tangent_mass = tangents.map(|t| inverse_or_zero(effective_mass(a, b, r_a, r_b, t)));

                let mut bias = 0.0;
                if deepest == Some(p) {
                    bias = config.baumgarte * inv_dt
                        * (contact.depth - config.penetration_slop).max(0.0);
                }
                let approach = (b.velocity_at(r_b) - a.velocity_at(r_a)).dot(normal);
                if -approach > RESTITUTION_THRESHOLD {
                    bias = bias.max(-restitution * approach);
                }

                self.contacts.push(ContactConstraint {
                    manifold: m,
                    point: p,
                    body_a,
                    body_b,
                    normal,
                    tangents,
                    r_a,
                    r_b,
                    normal_mass,
                    tangent_mass,
                    bias,
                    friction,
                    normal_impulse: point.normal_impulse,
                    tangent_impulse: point.tangent_impulse,
                });
            }
        }

        for (id, joint) in joints.iter() {
            let body_a = self.slot(world, joint.entity_a);
            let body_b = self.slot(world, joint.entity_b);
            let (a, b) = (&self.bodies[body_a], &self.bodies[body_b]);
            if !a.is_movable() && !b.is_movable() {
                continue;
            }

            let anchor_a = world_point(world, joint.entity_a, joint.anchor_a);
            let anchor_b = world_point(world, joint.entity_b, joint.anchor_b);
            let r_a = anchor_a - a.position;
            let r_b = anchor_b - b.position;

            let k = Mat3::from_diagonal(a.inv_mass + b.inv_mass)
                - skew(r_a) * a.inv_inertia * skew(r_a)
                - skew(r_b) * b.inv_inertia * skew(r_b)
                + Mat3::from_diagonal(Vec3::splat(joint.softness));
            if k.determinant().abs() < f32::EPSILON {
                continue;
            }

            self.joints.push(JointConstraint {
                id,
                body_a,
                body_b,
                r_a,
                r_b,
                mass: k.inverse(),
                bias: -joint.bias_factor * inv_dt * (anchor_b - anchor_a),
                softness: joint.softness,
                impulse: joint.accumulated_impulse,
            });
        }
    }

    /// Index of `entity` in the body array, adding it on first use.
    fn slot(&mut self, world: &hecs::World, entity: Entity) -> usize {
        if let Some(&index) = self.lookup.get(&entity) {
            return index;
        }
        let index = match world.get::<&PhysicsBody>(entity) {
            Ok(body) => {
                let transform = entity_matrix(world, entity).map(GlobalTransform);
                self.bodies
                    .push(SolverBody::from_body(entity, &body, transform.as_ref()));
                self.bodies.len() - 1
            }
            // Colliders without a body and static meshes never move
            Err(_) => 0,
        };
        self.lookup.insert(entity, index);
        index
    }

    fn warm_start(&mut self, factor: f32) {
        for i in 0..self.contacts.len() {
            let c = &mut self.contacts[i];
            c.normal_impulse *= factor;
            c.tangent_impulse[0] *= factor;
            c.tangent_impulse[1] *= factor;
            let impulse = c.normal * c.normal_impulse
                + c.tangents[0] * c.tangent_impulse[0]
                + c.tangents[1] * c.tangent_impulse[1];
            let (a, b, r_a, r_b) = (c.body_a, c.body_b, c.r_a, c.r_b);
            apply_impulse(&mut self.bodies, a, b, impulse, r_a, r_b);
        }
        for i in 0..self.joints.len() {
            let j = &mut self.joints[i];
            j.impulse *= factor;
            let (a, b, impulse, r_a, r_b) = (j.body_a, j.body_b, j.impulse, j.r_a, j.r_b);
            apply_impulse(&mut self.bodies, a, b, impulse, r_a, r_b);
        }
    }

    fn solve_contact(&mut self, index: usize) {
        let c = &self.contacts[index];
        let (ia, ib, r_a, r_b, normal) = (c.body_a, c.body_b, c.r_a, c.r_b, c.normal);

        // Normal impulse
        let relative_velocity = self.bodies[ib].velocity_at(r_b) - self.bodies[ia].velocity_at(r_a);
        let contact_velocity = relative_velocity.dot(normal);
        let lambda = c.normal_mass * (c.bias - contact_velocity);

        // Clamp accumulated normal impulse
        let old_impulse = c.normal_impulse;
        let new_impulse = (old_impulse + lambda).max(0.0);
        self.contacts[index].normal_impulse = new_impulse;
        apply_impulse(&mut self.bodies, ia, ib, normal * (new_impulse - old_impulse), r_a, r_b);

        // Friction, re-reading velocities after the normal impulse
        for k in 0..2 {
            let c = &self.contacts[index];
            let tangent = c.tangents[k];
            let relative_velocity =
                self.bodies[ib].velocity_at(r_b) - self.bodies[ia].velocity_at(r_a);
            let lambda = -c.tangent_mass[k] * relative_velocity.dot(tangent);

            // Coulomb friction: |Jt| <= mu * |Jn|
            let max_friction = c.friction * c.normal_impulse;
            let old_impulse = c.tangent_impulse[k];
            let new_impulse = (old_impulse + lambda).clamp(-max_friction, max_friction);
            self.contacts[index].tangent_impulse[k] = new_impulse;
            apply_impulse(&mut self.bodies, ia, ib, tangent * (new_impulse - old_impulse), r_a, r_b);
        }
    }

    fn solve_joint(&mut self, index: usize) {
        let j = &self.joints[index];
        let (ia, ib, r_a, r_b) = (j.body_a, j.body_b, j.r_a, j.r_b);

        let relative_velocity = self.bodies[ib].velocity_at(r_b) - self.bodies[ia].velocity_at(r_a);
        let impulse = j.mass * (j.bias - relative_velocity - j.impulse * j.softness);

        self.joints[index].impulse += impulse;
        apply_impulse(&mut self.bodies, ia, ib, impulse, r_a, r_b);
    }

    fn store(&self, world: &mut hecs::World, manifolds: &mut ManifoldCache, joints: &mut Joints) {
        for body in self.bodies.iter().filter(|b| b.is_movable()) {
            let Some(entity) = body.entity else {
                continue;
            };
            if let Ok(mut rb) = world.get::<&mut PhysicsBody>(entity) {
                rb.linear_velocity = body.linear_velocity;
                rb.angular_velocity = body.angular_velocity;
            }
        }

        let slice = manifolds.as_mut_slice();
        for c in &self.contacts {
            if let Some(point) = slice
                .get_mut(c.manifold)
                .and_then(|m| m.points_mut().get_mut(c.point))
            {
                point.normal_impulse = c.normal_impulse;
                point.tangent_impulse = c.tangent_impulse;
            }
        }

        for j in &self.joints {
            if let Some(joint) = joints.get_mut(j.id) {
                joint.accumulated_impulse = j.impulse;
            }
        }
    }
}

/// Apply an impulse to both bodies: `-impulse` on A, `+impulse` on B.
fn apply_impulse(bodies: &mut [SolverBody], a: usize, b: usize, impulse: Vec3, r_a: Vec3, r_b: Vec3) {
    let body = &mut bodies[a];
    body.linear_velocity -= impulse * body.inv_mass;
    body.angular_velocity -= body.inv_inertia * r_a.cross(impulse);

    let body = &mut bodies[b];
    body.linear_velocity += impulse * body.inv_mass;
    body.angular_velocity += body.inv_inertia * r_b.cross(impulse);
}

/// Scalar inverse effective mass along `direction`.
fn effective_mass(a: &SolverBody, b: &SolverBody, r_a: Vec3, r_b: Vec3, direction: Vec3) -> f32 {
    let r_a_cross = r_a.cross(direction);
    let r_b_cross = r_b.cross(direction);
    (a.inv_mass * direction).dot(direction)
        + (b.inv_mass * direction).dot(direction)
        + (a.inv_inertia * r_a_cross).dot(r_a_cross)
        + (b.inv_inertia * r_b_cross).dot(r_b_cross)
}

#[inline]
fn inverse_or_zero(k: f32) -> f32 {
    if k > 0.0 {
        1.0 / k
    } else {
        0.0
    }
}

/// Cross-product matrix: `skew(r) * v == r.cross(v)`.
fn skew(r: Vec3) -> Mat3 {
    Mat3::from_cols(
        Vec3::new(0.0, r.z, -r.y),
        Vec3::new(-r.z, 0.0, r.x),
        Vec3::new(r.y, -r.x, 0.0),
    )
}

fn world_point(world: &hecs::World, entity: Entity, local: Vec3) -> Vec3 {
    entity_matrix(world, entity).map_or(local, |m| m.transform_point3(local))
}
