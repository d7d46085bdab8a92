//! Rein Physics
//!
//! Collision detection and rigid body contact resolution over a `hecs` world.
//!
//! # Architecture
//!
//! The library is organized into layers:
//!
//! 1. **ecs** - Components read and written by the pipeline (transforms, bodies, colliders)
//! 2. **physics** - Proxy cache, broad phase, GJK/EPA narrow phase, manifolds,
//!    sequential impulse solver, sleep, scheduling and picking
//! 3. **error** - Domain errors surfaced by the pipeline
//!
//! # Example
//!
//! ```no_run
//! use rein_physics::ecs::prelude::*;
//! use rein_physics::glam::Vec3;
//! use rein_physics::{PhysicsConfig, PhysicsWorld};
//!
//! let mut world = hecs::World::new();
//! let mut physics = PhysicsWorld::new(PhysicsConfig::default())?;
//!
//! let start = Transform::from_position(Vec3::new(0.0, 5.0, 0.0));
//! world.spawn((
//!     start,
//!     GlobalTransform::from(start),
//!     PhysicsBody::new_dynamic(1.0).with_sphere_inertia(0.5),
//!     Collider::solid(ColliderVolume::sphere(0.5)),
//! ));
//!
//! physics.step(&mut world, 1.0 / 60.0)?;
//! for event in physics.events() {
//!     println!("{:?}", event);
//! }
//! # Ok::<(), rein_physics::PhysicsError>(())
//! ```

pub mod ecs;
pub mod error;
pub mod physics;

pub use error::PhysicsError;
pub use physics::{InteractionMatrix, PairKind, PhysicsConfig, PhysicsWorld};

pub use physics::manifold::{CollisionEvent, CollisionEventKind};
pub use physics::schedule::{build_jobs, EnginePhase, PhysicsJob, PhysicsStage};

// Re-export math and ECS crates so callers match our versions
pub use glam;
pub use hecs;
