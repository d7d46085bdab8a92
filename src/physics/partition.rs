//! Binary space partition over static triangle meshes.
//!
//! The tree starts as a single leaf. A leaf holding more than
//! `leaf_capacity` meshes is split by a plane through the average mesh center,
//! oriented along the dominant spread of those centers, until the node budget
//! runs out. Meshes straddling a plane are stored on both sides. Removal never
//! rebalances.

use std::collections::HashMap;

use glam::{Mat3, Mat4, Vec3};
use hecs::Entity;
use tracing::{debug, info};

use crate::ecs::components::physics::{ConcaveCollider, PhysicsBody, RigidBodyType, TriangleMesh};
use crate::ecs::components::transform::{GlobalTransform, Transform};
use crate::error::PhysicsError;

use super::broadphase::{BroadPhase, BroadPhasePairs, CandidatePair, PairTarget};
use super::collider::{BoundingSphere, Triangle};
use super::config::{InteractionMatrix, PairKind, PhysicsConfig};
use super::proxy::{Interaction, Proxy};

/// Plane classification tolerance.
const PLANE_EPSILON: f32 = 1e-4;

/// Power iteration steps for the principal axis.
const POWER_ITERATIONS: usize = 16;

/// Splitting plane, `normal . p + distance = 0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Plane {
    /// Unit normal.
    pub normal: Vec3,
    pub distance: f32,
}

/// Which side of a plane a bounding sphere lies on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Halfspace {
    Positive,
    Negative,
    Straddling,
}

impl Plane {
    /// Plane through `point` with unit `normal`.
    pub fn from_point_normal(point: Vec3, normal: Vec3) -> Self {
        Self {
            normal,
            distance: -normal.dot(point),
        }
    }

    /// Positive = in front (same side as normal), Negative = behind.
    #[inline]
    pub fn signed_distance(&self, point: Vec3) -> f32 {
        self.normal.dot(point) + self.distance
    }

    /// Classify a sphere. Spheres within the tolerance of the plane straddle it.
    #[inline]
    pub fn classify(&self, sphere: &BoundingSphere) -> Halfspace {
        let d = self.signed_distance(sphere.center);
        let reach = sphere.radius + PLANE_EPSILON;
        if d > reach {
            Halfspace::Positive
        } else if d < -reach {
            Halfspace::Negative
        } else {
            Halfspace::Straddling
        }
    }

    /// Principal-axis plane through the mean of `points`.
    ///
    /// Returns `None` when the points have no measurable spread.
    pub fn principal(points: &[Vec3]) -> Option<Self> {
        if points.len() < 2 {
            return None;
        }
        let mean = points.iter().copied().sum::<Vec3>() / points.len() as f32;

        let mut covariance = Mat3::ZERO;
        for p in points {
            let d = *p - mean;
            covariance += Mat3::from_cols(d * d.x, d * d.y, d * d.z);
        }
        covariance *= 1.0 / points.len() as f32;

        // Seed with the axis of largest variance so power iteration never
        // starts orthogonal to the answer
        let diagonal = Vec3::new(covariance.x_axis.x, covariance.y_axis.y, covariance.z_axis.z);
        if diagonal.max_element() < PLANE_EPSILON {
            return None;
        }
        let mut axis = if diagonal.x >= diagonal.y && diagonal.x >= diagonal.z {
            Vec3::X
        } else if diagonal.y >= diagonal.z {
            Vec3::Y
        } else {
            Vec3::Z
        };
        for _ in 0..POWER_ITERATIONS {
            let next = (covariance * axis).normalize_or_zero();
            if next == Vec3::ZERO {
                break;
            }
            axis = next;
        }

        Some(Self::from_point_normal(mean, axis))
    }
}

#[derive(Debug, Clone)]
enum PartitionNode {
    Leaf { meshes: Vec<Entity> },
    Inner { plane: Plane, children: [u32; 2] },
}

/// A mesh placed in the world.
#[derive(Debug, Clone)]
struct MeshEntry {
    bounds: BoundingSphere,
    /// World-space triangles with their bounds.
    triangles: Vec<(Triangle, BoundingSphere)>,
}

/// Static mesh BSP.
#[derive(Debug, Clone)]
pub struct StaticPartition {
    nodes: Vec<PartitionNode>,
    meshes: HashMap<Entity, MeshEntry>,
    leaf_capacity: usize,
    max_nodes: usize,
    interactions: InteractionMatrix,
    skip_inactive_pairs: bool,
}

impl Default for StaticPartition {
    fn default() -> Self {
        Self::new(&PhysicsConfig::default())
    }
}

impl StaticPartition {
    /// Empty partition: a single leaf.
    pub fn new(config: &PhysicsConfig) -> Self {
        Self {
            nodes: vec![PartitionNode::Leaf { meshes: Vec::new() }],
            meshes: HashMap::new(),
            leaf_capacity: config.partition_leaf_capacity.max(1),
            max_nodes: config.partition_max_nodes.max(1),
            interactions: config.interactions,
            skip_inactive_pairs: config.skip_inactive_pairs,
        }
    }

    /// Build from every entity carrying a [`ConcaveCollider`].
    ///
    /// Fails without building anything if one of them can move.
    pub fn build(world: &hecs::World, config: &PhysicsConfig) -> Result<Self, PhysicsError> {
        let mut partition = Self::new(config);

        let mut query = world.query::<(
            &ConcaveCollider,
            Option<&GlobalTransform>,
            Option<&Transform>,
            Option<&PhysicsBody>,
        )>();
        let mut found: Vec<(Entity, std::sync::Arc<TriangleMesh>, Mat4)> = Vec::new();
        for (entity, (concave, global, local, body)) in query.iter() {
            if !body_is_immovable(body) {
                return Err(PhysicsError::MeshOnMovableEntity(entity));
            }
            let transform = match (global, local) {
                (Some(global), _) => global.0,
                (None, Some(local)) => local.to_matrix(),
                (None, None) => Mat4::IDENTITY,
            };
            found.push((entity, concave.mesh.clone(), transform));
        }
        found.sort_unstable_by_key(|(entity, _, _)| entity.id());

        for (entity, mesh, transform) in &found {
            partition.insert(*entity, mesh, transform);
        }

        info!(
            "Built static partition: {} meshes, {} nodes",
            partition.mesh_count(),
            partition.node_count()
        );
        Ok(partition)
    }

    /// Add or replace a mesh, splitting the leaves it lands in when they overflow.
    pub fn insert(&mut self, entity: Entity, mesh: &TriangleMesh, transform: &Mat4) {
        if self.meshes.contains_key(&entity) {
            self.remove(entity);
        }

        let triangles = mesh
            .triangles
            .iter()
            .map(|t| {
                let world = t.transformed(transform);
                (world, world.bounding_sphere())
            })
            .collect();
        let bounds = mesh.bounds.transformed(transform);
        self.meshes.insert(entity, MeshEntry { bounds, triangles });

        self.insert_at(0, entity, bounds);
    }

    fn insert_at(&mut self, node: u32, entity: Entity, bounds: BoundingSphere) {
        let mut stack = vec![node];
        while let Some(index) = stack.pop() {
            let overflow = match &mut self.nodes[index as usize] {
                PartitionNode::Inner { plane, children } => {
                    match plane.classify(&bounds) {
                        Halfspace::Positive => stack.push(children[0]),
                        Halfspace::Negative => stack.push(children[1]),
                        Halfspace::Straddling => stack.extend_from_slice(&children[..]),
                    }
                    false
                }
                PartitionNode::Leaf { meshes } => {
                    meshes.push(entity);
                    meshes.len() > self.leaf_capacity
                }
            };
            if overflow {
                self.split(index);
            }
        }
    }

    /// Turn an overflowing leaf into an inner node if a useful plane exists.
    fn split(&mut self, index: u32) {
        if self.nodes.len() + 2 > self.max_nodes {
            return;
        }
        let members = match &self.nodes[index as usize] {
            PartitionNode::Leaf { meshes } => meshes.clone(),
            PartitionNode::Inner { .. } => return,
        };

        let centers: Vec<Vec3> = members
            .iter()
            .filter_map(|e| self.meshes.get(e))
            .map(|m| m.bounds.center)
            .collect();
        let Some(plane) = Plane::principal(&centers) else {
            return;
        };

        let mut positive = Vec::new();
        let mut negative = Vec::new();
        for entity in &members {
            let Some(entry) = self.meshes.get(entity) else {
                continue;
            };
            match plane.classify(&entry.bounds) {
                Halfspace::Positive => positive.push(*entity),
                Halfspace::Negative => negative.push(*entity),
                Halfspace::Straddling => {
                    positive.push(*entity);
                    negative.push(*entity);
                }
            }
        }

        // A plane that sends everything to one side separates nothing
        if positive.len() == members.len() || negative.len() == members.len() {
            debug!("Rejected degenerate partition split at node {}", index);
            return;
        }

        let first = self.nodes.len() as u32;
        let overflow = [
            positive.len() > self.leaf_capacity,
            negative.len() > self.leaf_capacity,
        ];
        self.nodes.push(PartitionNode::Leaf { meshes: positive });
        self.nodes.push(PartitionNode::Leaf { meshes: negative });
        self.nodes[index as usize] = PartitionNode::Inner {
            plane,
            children: [first, first + 1],
        };

        for (offset, overflowing) in overflow.into_iter().enumerate() {
            if overflowing {
                self.split(first + offset as u32);
            }
        }
    }

    /// Forget a mesh. The tree shape is left as is.
    pub fn remove(&mut self, entity: Entity) -> bool {
        if self.meshes.remove(&entity).is_none() {
            return false;
        }
        for node in &mut self.nodes {
            if let PartitionNode::Leaf { meshes } = node {
                meshes.retain(|e| *e != entity);
            }
        }
        true
    }

    /// Record in each proxy the deepest node whose region contains it entirely.
    pub fn locate(&self, proxies: &mut [Proxy]) {
        for proxy in proxies {
            proxy.spatial_data = Some(self.deepest_containing(&proxy.estimate));
        }
    }

    fn deepest_containing(&self, sphere: &BoundingSphere) -> u32 {
        let mut index = 0u32;
        loop {
            match &self.nodes[index as usize] {
                PartitionNode::Inner { plane, children } => match plane.classify(sphere) {
                    Halfspace::Positive => index = children[0],
                    Halfspace::Negative => index = children[1],
                    Halfspace::Straddling => return index,
                },
                PartitionNode::Leaf { .. } => return index,
            }
        }
    }

    /// Collect meshes whose bounds touch `sphere`, descending from `start`
    /// (the root when `None`). Each mesh is reported once.
    pub fn query(&self, sphere: &BoundingSphere, start: Option<u32>, out: &mut Vec<Entity>) {
        let start = start
            .filter(|s| (*s as usize) < self.nodes.len())
            .unwrap_or(0);
        let mut stack = vec![start];
        while let Some(index) = stack.pop() {
            match &self.nodes[index as usize] {
                PartitionNode::Inner { plane, children } => match plane.classify(sphere) {
                    Halfspace::Positive => stack.push(children[0]),
                    Halfspace::Negative => stack.push(children[1]),
                    Halfspace::Straddling => stack.extend_from_slice(&children[..]),
                },
                PartitionNode::Leaf { meshes } => {
                    for entity in meshes {
                        if out.contains(entity) {
                            continue;
                        }
                        let touches = self
                            .meshes
                            .get(entity)
                            .is_some_and(|m| m.bounds.intersects(sphere));
                        if touches {
                            out.push(*entity);
                        }
                    }
                }
            }
        }
    }

    /// World-space triangles of `entity` whose bounds touch `sphere`.
    pub fn candidates<'a>(
        &'a self,
        entity: Entity,
        sphere: &'a BoundingSphere,
    ) -> impl Iterator<Item = &'a Triangle> + 'a {
        self.meshes
            .get(&entity)
            .into_iter()
            .flat_map(|m| m.triangles.iter())
            .filter(move |(_, bounds)| bounds.intersects(sphere))
            .map(|(triangle, _)| triangle)
    }

    pub fn contains(&self, entity: Entity) -> bool {
        self.meshes.contains_key(&entity)
    }

    pub fn mesh_count(&self) -> usize {
        self.meshes.len()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.meshes.is_empty()
    }
}

impl BroadPhase for StaticPartition {
    fn collect_pairs(&self, proxies: &[Proxy], out: &mut BroadPhasePairs) {
        if self.is_empty() {
            return;
        }
        let mut hits = Vec::new();
        for (index, proxy) in proxies.iter().enumerate() {
            if self.skip_inactive_pairs && !proxy.is_active() {
                continue;
            }
            let kind = self.interactions.classify(proxy.interaction, Interaction::Solid);
            if kind == PairKind::Ignore {
                continue;
            }
            hits.clear();
            self.query(&proxy.estimate, proxy.spatial_data, &mut hits);
            for mesh in &hits {
                if *mesh == proxy.id {
                    continue;
                }
                out.push(
                    kind,
                    CandidatePair {
                        proxy: index,
                        other: PairTarget::Mesh(*mesh),
                    },
                );
            }
        }
    }
}

/// Static or body-less entities may carry concave meshes.
pub(crate) fn body_is_immovable(body: Option<&PhysicsBody>) -> bool {
    !matches!(body, Some(b) if b.body_type != RigidBodyType::Static)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::{Collider, ColliderVolume};
    use crate::physics::proxy::ProxyCache;
    use std::sync::Arc;

    fn quad(size: f32) -> TriangleMesh {
        let vertices = [
            Vec3::new(-size, 0.0, -size),
            Vec3::new(size, 0.0, -size),
            Vec3::new(size, 0.0, size),
            Vec3::new(-size, 0.0, size),
        ];
        TriangleMesh::from_indexed(&vertices, &[0, 2, 1, 0, 3, 2])
    }

    fn spawn_quad(world: &mut hecs::World, position: Vec3) -> Entity {
        world.spawn((
            GlobalTransform::from(Transform::from_position(position)),
            ConcaveCollider {
                mesh: Arc::new(quad(1.0)),
            },
        ))
    }

    #[test]
    fn test_plane_classify() {
        let plane = Plane::from_point_normal(Vec3::ZERO, Vec3::X);
        let pos = BoundingSphere::new(Vec3::new(2.0, 0.0, 0.0), 1.0);
        let neg = BoundingSphere::new(Vec3::new(-2.0, 0.0, 0.0), 1.0);
        let mid = BoundingSphere::new(Vec3::new(0.5, 0.0, 0.0), 1.0);
        assert_eq!(plane.classify(&pos), Halfspace::Positive);
        assert_eq!(plane.classify(&neg), Halfspace::Negative);
        assert_eq!(plane.classify(&mid), Halfspace::Straddling);
    }

    #[test]
    fn test_principal_axis_follows_spread() {
        let points = [
            Vec3::new(-10.0, 0.0, 0.1),
            Vec3::new(-3.0, 0.1, 0.0),
            Vec3::new(4.0, -0.1, 0.0),
            Vec3::new(9.0, 0.0, -0.1),
        ];
        let plane = Plane::principal(&points).unwrap();
        assert!(plane.normal.x.abs() > 0.99);
        assert!(Plane::principal(&[Vec3::ONE, Vec3::ONE]).is_none());
    }

    #[test]
    fn test_splits_after_capacity() {
        let mut world = hecs::World::new();
        for i in 0..4 {
            spawn_quad(&mut world, Vec3::new(i as f32 * 10.0, 0.0, 0.0));
        }
        let partition = StaticPartition::build(&world, &PhysicsConfig::default()).unwrap();
        assert_eq!(partition.mesh_count(), 4);
        assert_eq!(partition.node_count(), 3);
    }

    #[test]
    fn test_node_budget_respected() {
        let mut world = hecs::World::new();
        for i in 0..64 {
            spawn_quad(&mut world, Vec3::new(i as f32 * 5.0, 0.0, (i % 7) as f32 * 5.0));
        }
        let partition = StaticPartition::build(&world, &PhysicsConfig::default()).unwrap();
        assert!(partition.node_count() <= 15);
        assert_eq!(partition.mesh_count(), 64);
    }

    #[test]
    fn test_coincident_meshes_do_not_split() {
        let mut world = hecs::World::new();
        for _ in 0..5 {
            spawn_quad(&mut world, Vec3::ZERO);
        }
        let partition = StaticPartition::build(&world, &PhysicsConfig::default()).unwrap();
        assert_eq!(partition.node_count(), 1);
    }

    #[test]
    fn test_query_finds_only_nearby_meshes() {
        let mut world = hecs::World::new();
        let meshes: Vec<Entity> = (0..8)
            .map(|i| spawn_quad(&mut world, Vec3::new(i as f32 * 10.0, 0.0, 0.0)))
            .collect();
        let partition = StaticPartition::build(&world, &PhysicsConfig::default()).unwrap();

        let mut hits = Vec::new();
        partition.query(&BoundingSphere::new(Vec3::new(30.0, 0.5, 0.0), 1.0), None, &mut hits);
        assert_eq!(hits, vec![meshes[3]]);

        hits.clear();
        partition.query(&BoundingSphere::new(Vec3::new(35.0, 0.5, 0.0), 0.5), None, &mut hits);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_straddling_mesh_reported_once() {
        let mut world = hecs::World::new();
        for i in 0..4 {
            spawn_quad(&mut world, Vec3::new(i as f32 * 3.0, 0.0, 0.0));
        }
        let big = world.spawn((
            GlobalTransform::from(Transform::from_position(Vec3::new(4.5, 0.0, 0.0))),
            ConcaveCollider {
                mesh: Arc::new(quad(20.0)),
            },
        ));
        let partition = StaticPartition::build(&world, &PhysicsConfig::default()).unwrap();

        let mut hits = Vec::new();
        partition.query(&BoundingSphere::new(Vec3::new(4.5, 0.0, 0.0), 30.0), None, &mut hits);
        assert_eq!(hits.iter().filter(|e| **e == big).count(), 1);
        assert_eq!(hits.len(), 5);
    }

    #[test]
    fn test_remove_without_rebalance() {
        let mut world = hecs::World::new();
        let meshes: Vec<Entity> = (0..4)
            .map(|i| spawn_quad(&mut world, Vec3::new(i as f32 * 10.0, 0.0, 0.0)))
            .collect();
        let mut partition = StaticPartition::build(&world, &PhysicsConfig::default()).unwrap();
        let nodes = partition.node_count();

        assert!(partition.remove(meshes[0]));
        assert!(!partition.remove(meshes[0]));
        assert_eq!(partition.node_count(), nodes);

        let mut hits = Vec::new();
        partition.query(&BoundingSphere::new(Vec3::ZERO, 2.0), None, &mut hits);
        assert!(hits.is_empty());
    }

    #[test]
    fn test_build_rejects_movable_mesh() {
        let mut world = hecs::World::new();
        let entity = world.spawn((
            GlobalTransform::default(),
            ConcaveCollider {
                mesh: Arc::new(quad(1.0)),
            },
            PhysicsBody::new_dynamic(1.0),
        ));
        let result = StaticPartition::build(&world, &PhysicsConfig::default());
        assert_eq!(result.err(), Some(PhysicsError::MeshOnMovableEntity(entity)));
    }

    #[test]
    fn test_locate_then_pairs() {
        let mut world = hecs::World::new();
        let meshes: Vec<Entity> = (0..6)
            .map(|i| spawn_quad(&mut world, Vec3::new(i as f32 * 10.0, 0.0, 0.0)))
            .collect();
        let ball = world.spawn((
            GlobalTransform::from(Transform::from_position(Vec3::new(50.0, 0.3, 0.0))),
            Collider::solid(ColliderVolume::sphere(0.5)),
            PhysicsBody::new_dynamic(1.0),
        ));
        let partition = StaticPartition::build(&world, &PhysicsConfig::default()).unwrap();

        let mut cache = ProxyCache::new();
        cache.update(&world);
        partition.locate(cache.proxies_mut());
        assert!(cache.proxies()[0].spatial_data.is_some());

        let mut pairs = BroadPhasePairs::default();
        partition.collect_pairs(cache.proxies(), &mut pairs);
        assert_eq!(pairs.physics.len(), 1);
        assert_eq!(cache.proxies()[pairs.physics[0].proxy].id, ball);
        assert_eq!(pairs.physics[0].other, PairTarget::Mesh(meshes[5]));

        let sphere = cache.proxies()[0].estimate;
        assert_eq!(partition.candidates(meshes[5], &sphere).count(), 2);
        assert_eq!(partition.candidates(meshes[0], &sphere).count(), 0);
    }
}
