//! Ray picking against bounding spheres.

use glam::Vec3;
use hecs::Entity;

use crate::ecs::components::transform::GlobalTransform;

use super::collider::BoundingSphere;

/// Something that can be selected with a ray.
pub trait Clickable {
    fn entity(&self) -> Entity;

    /// Radius of the pick sphere around the entity's origin.
    fn bounding_radius(&self) -> f32;

    /// Layers this object belongs to.
    fn layer_mask(&self) -> u32;

    /// Called when this object is the nearest hit.
    fn on_click(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    /// The direction is normalized.
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn point_at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }

    /// Distance along the ray to the first point on `sphere`, or zero if the
    /// origin is inside it.
    pub fn intersect_sphere(&self, sphere: &BoundingSphere) -> Option<f32> {
        let oc = self.origin - sphere.center;
        let b = oc.dot(self.direction);
        let c = oc.length_squared() - sphere.radius * sphere.radius;
        if c <= 0.0 {
            return Some(0.0);
        }
        // Origin outside and pointing away
        if b > 0.0 {
            return None;
        }
        let discriminant = b * b - c;
        if discriminant < 0.0 {
            return None;
        }
        Some(-b - discriminant.sqrt())
    }
}

/// Find the nearest clickable hit by `ray` whose layers intersect `mask`,
/// and notify it.
///
/// Clickables whose entity has no [`GlobalTransform`] are skipped.
pub fn pick(
    world: &hecs::World,
    ray: &Ray,
    mask: u32,
    clickables: &mut [&mut dyn Clickable],
) -> Option<Entity> {
    let mut nearest: Option<(usize, f32)> = None;
    for (index, clickable) in clickables.iter().enumerate() {
        if clickable.layer_mask() & mask == 0 {
            continue;
        }
        let Ok(transform) = world.get::<&GlobalTransform>(clickable.entity()) else {
            continue;
        };
        let sphere = BoundingSphere::new(transform.translation(), clickable.bounding_radius());
        if let Some(t) = ray.intersect_sphere(&sphere) {
            if nearest.map_or(true, |(_, best)| t < best) {
                nearest = Some((index, t));
            }
        }
    }

    let (index, _) = nearest?;
    let clickable = &mut clickables[index];
    clickable.on_click();
    Some(clickable.entity())
}
