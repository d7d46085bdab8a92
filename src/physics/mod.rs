//! Collision detection and rigid body contact pipeline.
//!
//! # Architecture
//!
//! Each fixed step runs these stages in order:
//!
//! 1. Rebuild collider proxies
//! 2. Broad phase (all-pairs sphere test, static mesh partition)
//! 3. Narrow phase (GJK/EPA)
//! 4. Update persistent manifolds, emit collision events, wake touched bodies
//! 5. Apply gravity and drag, solve contacts and joints (sequential impulse)
//! 6. Integrate positions, update sleep
//! 7. Synchronize transforms

pub mod broadphase;
pub mod collider;
pub mod config;
pub mod contact;
pub mod joint;
pub mod manifold;
pub mod narrowphase;
pub mod partition;
pub mod picking;
pub mod polytope;
pub mod proxy;
pub mod rigid_body;
pub mod schedule;
pub mod sleep;
pub mod solver;

use std::sync::Arc;

use glam::{Mat4, Vec3};
use hecs::Entity;
use tracing::{debug, warn};

use crate::ecs::components::physics::{ConcaveCollider, PhysicsBody, TriangleMesh};
use crate::ecs::components::transform::{GlobalTransform, Transform};
use crate::error::PhysicsError;

pub use self::config::{InteractionMatrix, PairKind, PhysicsConfig};

use self::broadphase::{AllPairs, BroadPhase, BroadPhasePairs, CandidatePair, PairTarget};
use self::contact::Contact;
use self::joint::{Joint, JointId, Joints};
use self::manifold::{CollisionEvent, ManifoldCache};
use self::narrowphase::NarrowPhase;
use self::partition::{body_is_immovable, StaticPartition};
use self::proxy::ProxyCache;
use self::rigid_body::IntegrationSummary;
use self::schedule::PhysicsStage;
use self::solver::ContactSolver;

/// Narrow-phase output waiting for the manifold stage.
#[derive(Debug, Clone, Copy)]
struct PendingContact {
    entity_a: Entity,
    entity_b: Entity,
    contact: Contact,
    trigger: bool,
}

/// The main physics world managing simulation state.
///
/// Components live in the caller's `hecs::World`; this type owns the caches
/// built from them and is passed the world explicitly at every step.
pub struct PhysicsWorld {
    config: PhysicsConfig,
    accumulator: f64,
    proxies: ProxyCache,
    broadphase: AllPairs,
    partition: StaticPartition,
    pairs: BroadPhasePairs,
    narrowphase: NarrowPhase,
    pending: Vec<PendingContact>,
    manifolds: ManifoldCache,
    solver: ContactSolver,
    joints: Joints,
    events: Vec<CollisionEvent>,
    last_integration: IntegrationSummary,
}

impl PhysicsWorld {
    /// Create a new physics world with the given configuration.
    pub fn new(config: PhysicsConfig) -> Result<Self, PhysicsError> {
        config.validate()?;
        Ok(Self {
            accumulator: 0.0,
            proxies: ProxyCache::new(),
            broadphase: AllPairs::from_config(&config),
            partition: StaticPartition::new(&config),
            pairs: BroadPhasePairs::default(),
            narrowphase: NarrowPhase::from_config(&config),
            pending: Vec::new(),
            manifolds: ManifoldCache::new(),
            solver: ContactSolver::new(),
            joints: Joints::new(),
            events: Vec::new(),
            last_integration: IntegrationSummary::default(),
            config,
        })
    }

    pub fn config(&self) -> &PhysicsConfig {
        &self.config
    }

    /// Step the physics simulation forward by `delta_time` seconds.
    ///
    /// Uses a fixed timestep accumulator to ensure deterministic simulation.
    /// Returns the number of fixed steps taken. Events from all of them are
    /// available through [`events`](Self::events) until the next call.
    pub fn step(&mut self, world: &mut hecs::World, delta_time: f64) -> Result<u32, PhysicsError> {
        self.events.clear();
        self.accumulator += delta_time;

        let mut substeps = 0u32;
        while self.accumulator >= self.config.fixed_timestep && substeps < self.config.max_substeps
        {
            self.fixed_step(world, self.config.fixed_timestep as f32)?;
            self.accumulator -= self.config.fixed_timestep;
            substeps += 1;
        }

        // Clamp accumulator to avoid spiral of death
        if self.accumulator > self.config.fixed_timestep * self.config.max_substeps as f64 {
            self.accumulator = 0.0;
        }

        Ok(substeps)
    }

    /// Run every stage once with time step `dt`.
    ///
    /// Fails before touching any state if a joint lost one of its bodies.
    pub fn fixed_step(&mut self, world: &mut hecs::World, dt: f32) -> Result<(), PhysicsError> {
        for stage in PhysicsStage::ALL {
            self.run_stage(stage, world, dt)?;
        }
        debug!(
            "Physics step: {} proxies, {} pairs, {} manifolds, {} integrated",
            self.proxies.len(),
            self.pairs.len(),
            self.manifolds.len(),
            self.last_integration.integrated
        );
        Ok(())
    }

    /// Execute a single stage, as scheduled by a job from
    /// [`schedule::build_jobs`].
    pub fn run_stage(
        &mut self,
        stage: PhysicsStage,
        world: &mut hecs::World,
        dt: f32,
    ) -> Result<(), PhysicsError> {
        match stage {
            PhysicsStage::UpdateProxies => {
                self.joints.validate(world)?;
                self.proxies.update(world);
            }
            PhysicsStage::BroadPhase => self.broad_phase(),
            PhysicsStage::NarrowPhase => self.narrow_phase(world),
            PhysicsStage::Manifolds => self.update_manifolds(world),
            PhysicsStage::Solve => {
                rigid_body::integrate_forces(world, self.config.gravity, dt);
                self.solver.solve(
                    world,
                    &mut self.manifolds,
                    &mut self.joints,
                    dt,
                    &self.config,
                );
            }
            PhysicsStage::Integrate => {
                self.last_integration = rigid_body::integrate_positions(world, dt, &self.config);
            }
            PhysicsStage::SyncTransforms => rigid_body::sync_transforms(world),
        }
        Ok(())
    }

    fn broad_phase(&mut self) {
        self.pairs.clear();
        self.broadphase
            .collect_pairs(self.proxies.proxies(), &mut self.pairs);
        self.partition.locate(self.proxies.proxies_mut());
        self.partition
            .collect_pairs(self.proxies.proxies(), &mut self.pairs);
    }

    fn narrow_phase(&mut self, world: &hecs::World) {
        self.pending.clear();
        let tagged = self
            .pairs
            .physics
            .iter()
            .map(|pair| (pair, false))
            .chain(self.pairs.triggers.iter().map(|pair| (pair, true)));

        for (&CandidatePair { proxy, other }, trigger) in tagged {
            let proxies = self.proxies.proxies();
            let Some(a) = proxies.get(proxy) else {
                continue;
            };
            let (entity_b, contact) = match other {
                PairTarget::Proxy(j) => {
                    let Some(b) = proxies.get(j) else {
                        continue;
                    };
                    (b.id, self.narrowphase.contact(&a.shape(), &b.shape()))
                }
                PairTarget::Mesh(mesh) => {
                    let mesh_transform = world_matrix(world, mesh);
                    let triangles = self.partition.candidates(mesh, &a.estimate);
                    (
                        mesh,
                        self.narrowphase
                            .mesh_contact(&a.shape(), &mesh_transform, triangles),
                    )
                }
            };

            if let Some(contact) = contact {
                self.pending.push(PendingContact {
                    entity_a: a.id,
                    entity_b,
                    contact,
                    trigger,
                });
            }
        }
    }

    fn update_manifolds(&mut self, world: &mut hecs::World) {
        self.manifolds.begin_step(world);
        for pending in &self.pending {
            self.manifolds.add_contact(
                pending.entity_a,
                pending.entity_b,
                pending.contact,
                pending.trigger,
            );
        }

        // Resting pairs the broad phase skipped stay tracked
        {
            let world: &hecs::World = world;
            self.manifolds
                .keep_alive(|m| is_inactive(world, m.entity_a) && is_inactive(world, m.entity_b));
        }

        self.manifolds.end_step(&mut self.events);
        sleep::wake_touching(world, &self.manifolds);
        sleep::wake_jointed(world, &self.joints);
    }

    /// Rebuild the static partition from every [`ConcaveCollider`] in `world`.
    pub fn rebuild_static(&mut self, world: &hecs::World) -> Result<(), PhysicsError> {
        self.partition = StaticPartition::build(world, &self.config)?;
        Ok(())
    }

    /// Attach a concave mesh to an immovable entity and register it with the
    /// static partition.
    pub fn attach_mesh_collider(
        &mut self,
        world: &mut hecs::World,
        entity: Entity,
        mesh: Arc<TriangleMesh>,
    ) -> Result<(), PhysicsError> {
        if !world.contains(entity) {
            return Err(PhysicsError::NoSuchEntity(entity));
        }
        let immovable = {
            let body = world.get::<&PhysicsBody>(entity).ok();
            body_is_immovable(body.as_deref())
        };
        if !immovable {
            warn!("Rejected mesh collider on movable entity {:?}", entity);
            return Err(PhysicsError::MeshOnMovableEntity(entity));
        }

        let transform = world_matrix(world, entity);
        world
            .insert_one(entity, ConcaveCollider { mesh: mesh.clone() })
            .map_err(|_| PhysicsError::NoSuchEntity(entity))?;
        self.partition.insert(entity, &mesh, &transform);
        Ok(())
    }

    /// Remove an entity's concave mesh. Returns `false` if it had none.
    pub fn detach_mesh_collider(&mut self, world: &mut hecs::World, entity: Entity) -> bool {
        let had_component = world.remove_one::<ConcaveCollider>(entity).is_ok();
        let registered = self.partition.remove(entity);
        self.manifolds.remove_entity(entity);
        had_component || registered
    }

    /// Forget cached state for a collider that was removed from `entity`.
    pub fn on_collider_removed(&mut self, entity: Entity) {
        self.proxies.remove(entity);
        self.partition.remove(entity);
        self.manifolds.remove_entity(entity);
    }

    /// Forget everything referencing `entity`, joints included.
    ///
    /// Call before or right after despawning it.
    pub fn on_entity_destroyed(&mut self, entity: Entity) {
        self.on_collider_removed(entity);
        let removed = self.joints.remove_involving(entity);
        if removed > 0 {
            debug!("Removed {} joints of destroyed entity {:?}", removed, entity);
        }
    }

    pub fn add_joint(
        &mut self,
        world: &hecs::World,
        a: Entity,
        b: Entity,
        anchor_a: Vec3,
        anchor_b: Vec3,
    ) -> Result<JointId, PhysicsError> {
        self.joints.add(world, a, b, anchor_a, anchor_b)
    }

    pub fn remove_joint(&mut self, id: JointId) -> Option<Joint> {
        self.joints.remove(id)
    }

    pub fn joints(&self) -> &Joints {
        &self.joints
    }

    pub fn joints_mut(&mut self) -> &mut Joints {
        &mut self.joints
    }

    /// Collision events from the last [`step`](Self::step).
    pub fn events(&self) -> &[CollisionEvent] {
        &self.events
    }

    /// Take the pending events, leaving the list empty.
    pub fn drain_events(&mut self) -> std::vec::Drain<'_, CollisionEvent> {
        self.events.drain(..)
    }

    pub fn manifolds(&self) -> &ManifoldCache {
        &self.manifolds
    }

    pub fn proxies(&self) -> &ProxyCache {
        &self.proxies
    }

    pub fn partition(&self) -> &StaticPartition {
        &self.partition
    }

    /// Integration tally of the last fixed step.
    pub fn last_integration(&self) -> IntegrationSummary {
        self.last_integration
    }

    /// Apply a linear impulse to a body, waking it.
    pub fn apply_impulse(
        &mut self,
        world: &mut hecs::World,
        entity: Entity,
        impulse: Vec3,
    ) -> Result<(), PhysicsError> {
        if !world.contains(entity) {
            return Err(PhysicsError::NoSuchEntity(entity));
        }
        let mut body = world
            .get::<&mut PhysicsBody>(entity)
            .map_err(|_| PhysicsError::MissingBody(entity))?;
        body.apply_impulse(impulse);
        Ok(())
    }

    /// Wake a sleeping body. Returns `true` if it was asleep.
    pub fn wake(&mut self, world: &mut hecs::World, entity: Entity) -> bool {
        sleep::wake_body(world, entity)
    }
}

/// World matrix of an entity, from [`GlobalTransform`] or [`Transform`].
fn world_matrix(world: &hecs::World, entity: Entity) -> Mat4 {
    entity_matrix(world, entity).unwrap_or(Mat4::IDENTITY)
}

/// World matrix from [`GlobalTransform`], falling back to [`Transform`].
/// `None` if the entity carries neither.
pub(crate) fn entity_matrix(world: &hecs::World, entity: Entity) -> Option<Mat4> {
    if let Ok(global) = world.get::<&GlobalTransform>(entity) {
        return Some(global.0);
    }
    world.get::<&Transform>(entity).ok().map(|t| t.to_matrix())
}

/// Existing entity without an awake dynamic body.
fn is_inactive(world: &hecs::World, entity: Entity) -> bool {
    world.contains(entity)
        && world
            .get::<&PhysicsBody>(entity)
            .map_or(true, |body| !body.is_active())
}
