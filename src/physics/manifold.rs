//! Persistent contact manifolds, one per touching entity pair.
//!
//! A manifold keeps up to [`MANIFOLD_CAPACITY`] points across steps. Every
//! step starts by marking all manifolds [`ManifoldState::Stale`] and
//! re-projecting their points from the bodies' current transforms; pairs that
//! produce a contact again become `Persisting`, new pairs are `New`, and
//! whatever is still stale at the end of the step is dropped.

use std::collections::HashMap;

use arrayvec::ArrayVec;
use glam::{Mat4, Vec3};
use hecs::Entity;

use super::contact::Contact;
use super::entity_matrix;

/// Points tracked per manifold.
pub const MANIFOLD_CAPACITY: usize = 4;

/// Distance under which a new contact is treated as an existing point, and
/// beyond which a tracked point is discarded.
pub const CONTACT_BREAKING_THRESHOLD: f32 = 0.02;

/// Lifecycle of a manifold within the current step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifoldState {
    /// Created this step.
    New,
    /// Existed last step and received a contact this step.
    Persisting,
    /// Not refreshed yet this step.
    Stale,
}

/// A tracked contact with the impulses accumulated on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ManifoldPoint {
    pub contact: Contact,
    /// Accumulated normal impulse.
    pub normal_impulse: f32,
    /// Accumulated tangent impulses (two friction directions).
    pub tangent_impulse: [f32; 2],
}

impl ManifoldPoint {
    pub fn new(contact: Contact) -> Self {
        Self {
            contact,
            normal_impulse: 0.0,
            tangent_impulse: [0.0; 2],
        }
    }
}

/// Contact points between two entities. The normal of every point runs
/// from `entity_a` toward `entity_b`.
#[derive(Debug, Clone)]
pub struct Manifold {
    pub entity_a: Entity,
    pub entity_b: Entity,
    pub state: ManifoldState,
    /// Steps survived since creation.
    pub age: u32,
    /// Trigger manifolds are reported but never solved.
    pub trigger: bool,
    points: ArrayVec<ManifoldPoint, MANIFOLD_CAPACITY>,
}

impl Manifold {
    pub fn new(entity_a: Entity, entity_b: Entity, trigger: bool) -> Self {
        Self {
            entity_a,
            entity_b,
            state: ManifoldState::New,
            age: 0,
            trigger,
            points: ArrayVec::new(),
        }
    }

    #[inline]
    pub fn points(&self) -> &[ManifoldPoint] {
        &self.points
    }

    #[inline]
    pub fn points_mut(&mut self) -> &mut [ManifoldPoint] {
        &mut self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Insert a contact and return the slot it landed in.
    ///
    /// A contact close to a tracked point replaces it and inherits its
    /// impulses. Otherwise it is appended, or once the manifold is full it
    /// replaces the slot that leaves the largest contact area.
    pub fn add_contact(&mut self, contact: Contact) -> usize {
        if let Some(slot) = self.matching_point(&contact) {
            self.points[slot].contact = contact;
            return slot;
        }

        if !self.points.is_full() {
            self.points.push(ManifoldPoint::new(contact));
            return self.points.len() - 1;
        }

        let slot = self.replacement_slot(&contact);
        self.points[slot] = ManifoldPoint::new(contact);
        slot
    }

    fn matching_point(&self, contact: &Contact) -> Option<usize> {
        let threshold_sq = CONTACT_BREAKING_THRESHOLD * CONTACT_BREAKING_THRESHOLD;
        self.points
            .iter()
            .enumerate()
            .map(|(i, p)| {
                (
                    i,
                    p.contact
                        .world_point_a
                        .distance_squared(contact.world_point_a),
                )
            })
            .filter(|(_, d)| *d < threshold_sq)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(i, _)| i)
    }

    /// Slot whose replacement by `candidate` yields the largest area.
    ///
    /// Ties go to the lowest slot. When no slot beats the current area,
    /// slot 0 is overwritten.
    pub fn replacement_slot(&self, candidate: &Contact) -> usize {
        let mut points: [Vec3; MANIFOLD_CAPACITY] = [Vec3::ZERO; MANIFOLD_CAPACITY];
        for (dst, p) in points.iter_mut().zip(&self.points) {
            *dst = p.contact.world_point_a;
        }

        let mut best_area = quad_area(&points);
        let mut best_slot = 0;
        for slot in 0..self.points.len() {
            let mut trial = points;
            trial[slot] = candidate.world_point_a;
            let area = quad_area(&trial);
            if area > best_area {
                best_area = area;
                best_slot = slot;
            }
        }
        best_slot
    }

    /// Contact with the largest depth. Earlier slots win ties.
    pub fn deepest_contact(&self) -> Option<&Contact> {
        self.deepest_index().map(|i| &self.points[i].contact)
    }

    pub(crate) fn deepest_index(&self) -> Option<usize> {
        let mut best: Option<(usize, f32)> = None;
        for (i, p) in self.points.iter().enumerate() {
            if best.map_or(true, |(_, depth)| p.contact.depth > depth) {
                best = Some((i, p.contact.depth));
            }
        }
        best.map(|(i, _)| i)
    }

    /// Re-project the local points through the current transforms and drop
    /// those that separated or slid past the breaking threshold.
    pub fn refresh(&mut self, transform_a: &Mat4, transform_b: &Mat4) {
        let threshold = CONTACT_BREAKING_THRESHOLD;
        self.points.retain(|p| {
            let c = &mut p.contact;
            c.world_point_a = transform_a.transform_point3(c.local_point_a);
            c.world_point_b = transform_b.transform_point3(c.local_point_b);
            let offset = c.world_point_a - c.world_point_b;
            c.depth = offset.dot(c.normal);
            if c.depth < -threshold {
                return false;
            }
            let drift = offset - c.normal * c.depth;
            drift.length_squared() <= threshold * threshold
        });
    }
}

/// Area of four points taken as a quadrilateral: half the largest cross
/// product over the three ways to pair them into diagonals.
pub fn quad_area(p: &[Vec3; 4]) -> f32 {
    let a = (p[0] - p[2]).cross(p[1] - p[3]).length_squared();
    let b = (p[0] - p[1]).cross(p[2] - p[3]).length_squared();
    let c = (p[0] - p[3]).cross(p[1] - p[2]).length_squared();
    0.5 * a.max(b).max(c).sqrt()
}

/// What happened to a pair this step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollisionEventKind {
    Begin,
    Stay,
    End,
}

/// Collision notification delivered after each step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionEvent {
    pub kind: CollisionEventKind,
    pub entity_a: Entity,
    pub entity_b: Entity,
    pub trigger: bool,
}

/// Order-independent key for an entity pair.
fn pair_key(a: Entity, b: Entity) -> (Entity, Entity) {
    if a.to_bits() <= b.to_bits() {
        (a, b)
    } else {
        (b, a)
    }
}

/// All live manifolds, in creation order.
#[derive(Debug, Default)]
pub struct ManifoldCache {
    manifolds: Vec<Manifold>,
    index: HashMap<(Entity, Entity), usize>,
}

impl ManifoldCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark every manifold stale and re-project its points.
    ///
    /// An entity that lost its transform keeps no points.
    pub fn begin_step(&mut self, world: &hecs::World) {
        for manifold in &mut self.manifolds {
            manifold.state = ManifoldState::Stale;
            let transform_a = entity_matrix(world, manifold.entity_a);
            let transform_b = entity_matrix(world, manifold.entity_b);
            match (transform_a, transform_b) {
                (Some(a), Some(b)) => manifold.refresh(&a, &b),
                _ => manifold.points.clear(),
            }
        }
    }

    /// Record a contact for `a`/`b`. The normal must point from `a` to `b`.
    pub fn add_contact(&mut self, a: Entity, b: Entity, contact: Contact, trigger: bool) {
        let key = pair_key(a, b);
        match self.index.get(&key) {
            Some(&i) => {
                let manifold = &mut self.manifolds[i];
                let contact = if manifold.entity_a == a {
                    contact
                } else {
                    contact.flipped()
                };
                manifold.add_contact(contact);
                // A pair first seen this step still reports Begin
                if manifold.state == ManifoldState::Stale {
                    manifold.state = ManifoldState::Persisting;
                }
                manifold.trigger = trigger;
            }
            None => {
                let mut manifold = Manifold::new(a, b, trigger);
                manifold.add_contact(contact);
                self.index.insert(key, self.manifolds.len());
                self.manifolds.push(manifold);
            }
        }
    }

    /// Keep stale manifolds that still hold points and satisfy `keep`.
    ///
    /// Pairs skipped by the broad phase, such as two sleeping bodies resting
    /// on each other, stay tracked this way instead of ending.
    pub fn keep_alive(&mut self, mut keep: impl FnMut(&Manifold) -> bool) {
        for manifold in &mut self.manifolds {
            if manifold.state == ManifoldState::Stale && !manifold.is_empty() && keep(manifold) {
                manifold.state = ManifoldState::Persisting;
            }
        }
    }

    /// Drop stale manifolds and report every pair's transition.
    pub fn end_step(&mut self, events: &mut Vec<CollisionEvent>) {
        for manifold in &mut self.manifolds {
            let kind = match manifold.state {
                ManifoldState::New => CollisionEventKind::Begin,
                ManifoldState::Persisting => CollisionEventKind::Stay,
                ManifoldState::Stale => CollisionEventKind::End,
            };
            events.push(CollisionEvent {
                kind,
                entity_a: manifold.entity_a,
                entity_b: manifold.entity_b,
                trigger: manifold.trigger,
            });
            manifold.age = manifold.age.saturating_add(1);
        }
        self.manifolds
            .retain(|m| m.state != ManifoldState::Stale);
        self.reindex();
    }

    /// Forget every manifold involving `entity`. Returns how many were removed.
    pub fn remove_entity(&mut self, entity: Entity) -> usize {
        let before = self.manifolds.len();
        self.manifolds
            .retain(|m| m.entity_a != entity && m.entity_b != entity);
        let removed = before - self.manifolds.len();
        if removed > 0 {
            self.reindex();
        }
        removed
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (i, m) in self.manifolds.iter().enumerate() {
            self.index.insert(pair_key(m.entity_a, m.entity_b), i);
        }
    }

    /// Manifold for a pair, in either order.
    pub fn get(&self, a: Entity, b: Entity) -> Option<&Manifold> {
        self.index.get(&pair_key(a, b)).map(|&i| &self.manifolds[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Manifold> {
        self.manifolds.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Manifold> {
        self.manifolds.iter_mut()
    }

    pub(crate) fn as_slice(&self) -> &[Manifold] {
        &self.manifolds
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Manifold] {
        &mut self.manifolds
    }

    pub fn len(&self) -> usize {
        self.manifolds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.manifolds.is_empty()
    }

    pub fn clear(&mut self) {
        self.manifolds.clear();
        self.index.clear();
    }
}
