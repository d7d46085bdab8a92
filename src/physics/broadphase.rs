//! Broadphase collision detection using bounding-sphere overlap tests.

use hecs::Entity;

use super::config::{InteractionMatrix, PairKind, PhysicsConfig};
use super::proxy::{Interaction, Proxy};

/// The second half of a candidate pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairTarget {
    /// Another proxy, by index into the proxy list.
    Proxy(usize),
    /// A static triangle mesh entity held by the partition.
    Mesh(Entity),
}

/// A proxy that may be touching `other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidatePair {
    /// Index into the proxy list.
    pub proxy: usize,
    pub other: PairTarget,
}

/// Broad-phase output, split by how the pair is handled downstream.
#[derive(Debug, Default, Clone)]
pub struct BroadPhasePairs {
    /// Pairs whose contacts are solved.
    pub physics: Vec<CandidatePair>,
    /// Pairs that only report overlap.
    pub triggers: Vec<CandidatePair>,
}

impl BroadPhasePairs {
    pub fn clear(&mut self) {
        self.physics.clear();
        self.triggers.clear();
    }

    /// Route a pair into the list matching `kind`. Ignored pairs are dropped.
    #[inline]
    pub fn push(&mut self, kind: PairKind, pair: CandidatePair) {
        match kind {
            PairKind::Physics => self.physics.push(pair),
            PairKind::Trigger => self.triggers.push(pair),
            PairKind::Ignore => {}
        }
    }

    pub fn len(&self) -> usize {
        self.physics.len() + self.triggers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.physics.is_empty() && self.triggers.is_empty()
    }
}

/// A pair-finding strategy over this step's proxies.
pub trait BroadPhase {
    /// Append every candidate pair to `out`. Does not clear `out`.
    fn collect_pairs(&self, proxies: &[Proxy], out: &mut BroadPhasePairs);
}

/// O(n^2) pair-wise bounding-sphere test for dynamic geometry.
#[derive(Debug, Clone)]
pub struct AllPairs {
    interactions: InteractionMatrix,
    skip_inactive_pairs: bool,
}

impl Default for AllPairs {
    fn default() -> Self {
        Self::new(InteractionMatrix::default(), true)
    }
}

impl AllPairs {
    pub fn new(interactions: InteractionMatrix, skip_inactive_pairs: bool) -> Self {
        Self {
            interactions,
            skip_inactive_pairs,
        }
    }

    pub fn from_config(config: &PhysicsConfig) -> Self {
        Self::new(config.interactions, config.skip_inactive_pairs)
    }

    /// Classify a proxy pair, or `Ignore` if it should never be tested.
    #[inline]
    fn pair_kind(&self, a: &Proxy, b: &Proxy) -> PairKind {
        if a.interaction == Interaction::None && b.interaction == Interaction::None {
            return PairKind::Ignore;
        }
        // Sleeping and static bodies cannot start a contact on their own
        if self.skip_inactive_pairs
            && !a.is_active()
            && !b.is_active()
            && !a.can_wake(b)
            && !b.can_wake(a)
        {
            return PairKind::Ignore;
        }
        self.interactions.classify(a.interaction, b.interaction)
    }
}

impl BroadPhase for AllPairs {
    fn collect_pairs(&self, proxies: &[Proxy], out: &mut BroadPhasePairs) {
        for i in 0..proxies.len() {
            for j in (i + 1)..proxies.len() {
                let (a, b) = (&proxies[i], &proxies[j]);

                let kind = self.pair_kind(a, b);
                if kind == PairKind::Ignore {
                    continue;
                }

                if a.estimate.intersects(&b.estimate) {
                    out.push(
                        kind,
                        CandidatePair {
                            proxy: i,
                            other: PairTarget::Proxy(j),
                        },
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::{Collider, ColliderVolume, PhysicsBody};
    use crate::ecs::components::transform::{GlobalTransform, Transform};
    use crate::physics::proxy::ProxyCache;
    use glam::Vec3;

    fn spawn_sphere(
        world: &mut hecs::World,
        position: Vec3,
        radius: f32,
        body: PhysicsBody,
        collider: fn(ColliderVolume) -> Collider,
    ) -> hecs::Entity {
        world.spawn((
            GlobalTransform::from(Transform::from_position(position)),
            collider(ColliderVolume::sphere(radius)),
            body,
        ))
    }

    fn collect(world: &hecs::World, broadphase: &AllPairs) -> BroadPhasePairs {
        let mut cache = ProxyCache::new();
        cache.update(world);
        let mut pairs = BroadPhasePairs::default();
        broadphase.collect_pairs(cache.proxies(), &mut pairs);
        pairs
    }

    #[test]
    fn test_broadphase_overlapping() {
        let mut world = hecs::World::new();
        spawn_sphere(&mut world, Vec3::ZERO, 1.0, PhysicsBody::new_dynamic(1.0), Collider::solid);
        spawn_sphere(&mut world, Vec3::X, 1.0, PhysicsBody::new_dynamic(1.0), Collider::solid);

        let pairs = collect(&world, &AllPairs::default());
        assert_eq!(pairs.physics.len(), 1);
        assert!(pairs.triggers.is_empty());
    }

    #[test]
    fn test_broadphase_no_overlap() {
        let mut world = hecs::World::new();
        spawn_sphere(&mut world, Vec3::ZERO, 0.5, PhysicsBody::new_dynamic(1.0), Collider::solid);
        spawn_sphere(
            &mut world,
            Vec3::new(10.0, 0.0, 0.0),
            0.5,
            PhysicsBody::new_dynamic(1.0),
            Collider::solid,
        );

        let pairs = collect(&world, &AllPairs::default());
        assert!(pairs.is_empty());
    }

    #[test]
    fn test_broadphase_completeness_at_boundary() {
        let broadphase = AllPairs::default();
        for (distance, expected) in [(1.99, 1), (2.0, 1), (2.01, 0)] {
            let mut world = hecs::World::new();
            spawn_sphere(&mut world, Vec3::ZERO, 1.0, PhysicsBody::new_dynamic(1.0), Collider::solid);
            spawn_sphere(
                &mut world,
                Vec3::new(distance, 0.0, 0.0),
                1.0,
                PhysicsBody::new_dynamic(1.0),
                Collider::solid,
            );
            let pairs = collect(&world, &broadphase);
            assert_eq!(pairs.physics.len(), expected, "distance = {}", distance);
        }
    }

    #[test]
    fn test_broadphase_static_static_skipped() {
        let mut world = hecs::World::new();
        spawn_sphere(&mut world, Vec3::ZERO, 1.0, PhysicsBody::new_static(), Collider::solid);
        spawn_sphere(&mut world, Vec3::ZERO, 1.0, PhysicsBody::new_static(), Collider::solid);

        let pairs = collect(&world, &AllPairs::default());
        assert!(pairs.is_empty());

        let pairs = collect(&world, &AllPairs::new(InteractionMatrix::default(), false));
        assert_eq!(pairs.physics.len(), 1);
    }

    #[test]
    fn test_broadphase_sleeping_pair_skipped() {
        let mut world = hecs::World::new();
        let mut asleep = PhysicsBody::new_dynamic(1.0);
        asleep.awake = false;
        spawn_sphere(&mut world, Vec3::ZERO, 1.0, asleep.clone(), Collider::solid);
        spawn_sphere(&mut world, Vec3::X, 1.0, asleep, Collider::solid);
        assert!(collect(&world, &AllPairs::default()).is_empty());

        // An awake body touching a sleeping one is still reported
        spawn_sphere(&mut world, Vec3::Y, 1.0, PhysicsBody::new_dynamic(1.0), Collider::solid);
        assert_eq!(collect(&world, &AllPairs::default()).physics.len(), 2);
    }

    #[test]
    fn test_broadphase_trigger_routing() {
        let mut world = hecs::World::new();
        spawn_sphere(&mut world, Vec3::ZERO, 1.0, PhysicsBody::new_dynamic(1.0), Collider::solid);
        spawn_sphere(&mut world, Vec3::X, 1.0, PhysicsBody::new_static(), Collider::trigger);

        let pairs = collect(&world, &AllPairs::default());
        assert!(pairs.physics.is_empty());
        assert_eq!(pairs.triggers.len(), 1);
    }

    #[test]
    fn test_broadphase_query_only_volumes_ignored() {
        let mut world = hecs::World::new();
        world.spawn((GlobalTransform::default(), Collider::solid(ColliderVolume::sphere(1.0))));
        world.spawn((GlobalTransform::default(), Collider::solid(ColliderVolume::sphere(1.0))));

        let pairs = collect(&world, &AllPairs::new(InteractionMatrix::default(), false));
        assert!(pairs.is_empty());
    }
}
