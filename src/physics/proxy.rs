//! Per-step snapshot of every collidable entity.
//!
//! Proxies are rebuilt from scratch each step and never outlive it. The broad
//! and narrow phases only ever read proxies, so they can be shared freely once
//! [`ProxyCache::update`] has run.

use glam::Mat4;
use hecs::Entity;

use crate::ecs::components::physics::{Collider, ColliderVolume, PhysicsBody};
use crate::ecs::components::transform::{GlobalTransform, Transform};

use super::collider::{BoundingSphere, TransformedVolume};

/// How a proxy takes part in collisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Interaction {
    /// Query-only volume without a body.
    None,
    /// Reports overlaps, never pushes back.
    Trigger,
    /// Generates solved contacts.
    Solid,
}

impl Interaction {
    #[inline]
    pub(crate) fn index(self) -> usize {
        match self {
            Interaction::None => 0,
            Interaction::Trigger => 1,
            Interaction::Solid => 2,
        }
    }

    /// Classify a collider from its trigger flag and body.
    pub fn classify(collider: &Collider, body: Option<&PhysicsBody>) -> Self {
        if collider.is_trigger {
            Interaction::Trigger
        } else if body.is_some() {
            Interaction::Solid
        } else {
            Interaction::None
        }
    }
}

/// Immutable snapshot of one collider for the current step.
#[derive(Debug, Clone)]
pub struct Proxy {
    /// World matrix at the start of the step.
    pub transform: Mat4,
    pub volume: ColliderVolume,
    /// Cheap world-space bound for broad-phase rejection.
    pub estimate: BoundingSphere,
    pub id: Entity,
    pub interaction: Interaction,
    /// Entity carries a dynamic body.
    pub movable: bool,
    /// Entity carries a sleeping body.
    pub asleep: bool,
    /// Entity carries a kinematic body that is moving.
    pub pushing: bool,
    /// Static partition node the proxy fits in entirely, written by
    /// [`StaticPartition::locate`](super::partition::StaticPartition::locate).
    pub spatial_data: Option<u32>,
}

impl Proxy {
    /// Support-mapped shape placed in the world.
    #[inline]
    pub fn shape(&self) -> TransformedVolume<'_> {
        TransformedVolume::new(&self.volume, self.transform)
    }

    /// Awake dynamic body: the only kind that can start a new contact.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.movable && !self.asleep
    }

    /// Moving kinematic proxy against a sleeping dynamic one: worth a
    /// contact so the sleeper can be woken.
    #[inline]
    pub fn can_wake(&self, other: &Proxy) -> bool {
        self.pushing && other.movable && other.asleep
    }
}

/// Owns the proxy list for the current step.
#[derive(Debug, Default)]
pub struct ProxyCache {
    proxies: Vec<Proxy>,
}

impl ProxyCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild one proxy per entity carrying a [`Collider`].
    ///
    /// The world matrix comes from [`GlobalTransform`], falling back to
    /// [`Transform`] and then identity. Proxies are ordered by entity id so
    /// downstream passes see a stable order.
    pub fn update(&mut self, world: &hecs::World) {
        self.proxies.clear();

        let mut query = world.query::<(
            &Collider,
            Option<&GlobalTransform>,
            Option<&Transform>,
            Option<&PhysicsBody>,
        )>();
        for (entity, (collider, global, local, body)) in query.iter() {
            let transform = match (global, local) {
                (Some(global), _) => global.0,
                (None, Some(local)) => local.to_matrix(),
                (None, None) => Mat4::IDENTITY,
            };
            self.proxies.push(Proxy {
                transform,
                volume: collider.volume.clone(),
                estimate: collider.volume.bounding_sphere(&transform),
                id: entity,
                interaction: Interaction::classify(collider, body),
                movable: body.is_some_and(|b| b.is_dynamic()),
                asleep: body.is_some_and(|b| b.is_sleeping()),
                pushing: body.is_some_and(|b| b.is_moving_kinematic()),
                spatial_data: None,
            });
        }

        self.proxies.sort_unstable_by_key(|p| p.id.id());
    }

    /// Drop the proxy of a detached collider without waiting for the next update.
    pub fn remove(&mut self, entity: Entity) {
        self.proxies.retain(|p| p.id != entity);
    }

    pub fn clear(&mut self) {
        self.proxies.clear();
    }

    #[inline]
    pub fn proxies(&self) -> &[Proxy] {
        &self.proxies
    }

    #[inline]
    pub fn proxies_mut(&mut self) -> &mut [Proxy] {
        &mut self.proxies
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Proxy> {
        self.proxies.get(index)
    }

    /// Index of the proxy belonging to `entity`.
    pub fn find(&self, entity: Entity) -> Option<usize> {
        self.proxies.iter().position(|p| p.id == entity)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.proxies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.proxies.is_empty()
    }
}
