//! Error types for the physics pipeline.

use hecs::Entity;

/// Errors raised by pipeline operations.
///
/// Numerical non-convergence is never reported here; the narrow phase
/// accepts its best approximation instead.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum PhysicsError {
    /// A concave mesh collider was attached to an entity that can move.
    #[error("concave mesh collider attached to movable entity {0:?}")]
    MeshOnMovableEntity(Entity),

    /// An operation required a `PhysicsBody` the entity does not carry.
    #[error("entity {0:?} has no PhysicsBody")]
    MissingBody(Entity),

    /// The entity is not alive in the world.
    #[error("entity {0:?} does not exist")]
    NoSuchEntity(Entity),

    /// A configuration value is out of range.
    #[error("invalid physics configuration: {0}")]
    InvalidConfig(String),
}
