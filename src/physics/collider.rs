//! Collider shape support functions and bounding estimates.

use glam::{Mat3, Mat4, Vec3};

use crate::ecs::components::physics::ColliderVolume;

/// Bounding sphere used for broad-phase rejection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingSphere {
    pub center: Vec3,
    pub radius: f32,
}

impl BoundingSphere {
    pub fn new(center: Vec3, radius: f32) -> Self {
        Self { center, radius }
    }

    /// Sphere around the centroid of `points`. Empty input gives a point at the origin.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let points: Vec<Vec3> = points.into_iter().collect();
        if points.is_empty() {
            return Self::new(Vec3::ZERO, 0.0);
        }
        let center = points.iter().copied().sum::<Vec3>() / points.len() as f32;
        let radius = points
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0, f32::max);
        Self::new(center, radius)
    }

    /// Test whether two spheres overlap. Touching spheres count as overlapping.
    #[inline]
    pub fn intersects(&self, other: &BoundingSphere) -> bool {
        let r = self.radius + other.radius;
        self.center.distance_squared(other.center) <= r * r
    }

    /// Test whether `other` lies entirely inside this sphere.
    #[inline]
    pub fn contains(&self, other: &BoundingSphere) -> bool {
        self.center.distance(other.center) + other.radius <= self.radius
    }

    /// Smallest sphere enclosing both.
    pub fn merged(&self, other: &BoundingSphere) -> Self {
        let offset = other.center - self.center;
        let dist = offset.length();
        if dist + other.radius <= self.radius {
            return *self;
        }
        if dist + self.radius <= other.radius {
            return *other;
        }
        let radius = (dist + self.radius + other.radius) * 0.5;
        let center = self.center + offset * ((radius - self.radius) / dist);
        Self::new(center, radius)
    }

    /// Apply an affine transform; the radius grows with the largest axis scale.
    pub fn transformed(&self, mat: &Mat4) -> Self {
        Self::new(
            mat.transform_point3(self.center),
            self.radius * max_axis_scale(mat),
        )
    }
}

/// Triangle with vertices in whatever space its owner uses.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Triangle {
    pub a: Vec3,
    pub b: Vec3,
    pub c: Vec3,
}

impl Triangle {
    pub fn new(a: Vec3, b: Vec3, c: Vec3) -> Self {
        Self { a, b, c }
    }

    #[inline]
    pub fn vertices(&self) -> [Vec3; 3] {
        [self.a, self.b, self.c]
    }

    /// Unit normal following counter-clockwise winding; zero when degenerate.
    pub fn normal(&self) -> Vec3 {
        (self.b - self.a).cross(self.c - self.a).normalize_or_zero()
    }

    pub fn centroid(&self) -> Vec3 {
        (self.a + self.b + self.c) / 3.0
    }

    pub fn transformed(&self, mat: &Mat4) -> Self {
        Self::new(
            mat.transform_point3(self.a),
            mat.transform_point3(self.b),
            mat.transform_point3(self.c),
        )
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        BoundingSphere::from_points(self.vertices())
    }
}

/// Support-function interface consumed by GJK and EPA.
///
/// A shape is a *core* swept by a sphere of radius [`margin`](Self::margin):
/// a sphere is a point core, a capsule a segment core, and polyhedra are
/// their own core with zero margin.
pub trait SupportMap {
    /// Farthest core point along `direction`, in world space.
    fn core_support(&self, direction: Vec3) -> Vec3;

    /// Radius swept around the core.
    fn margin(&self) -> f32;

    /// A point inside the shape.
    fn center(&self) -> Vec3;

    /// Farthest point of the full shape along `direction`.
    #[inline]
    fn support(&self, direction: Vec3) -> Vec3 {
        let core = self.core_support(direction);
        let margin = self.margin();
        if margin > 0.0 {
            core + direction.normalize_or_zero() * margin
        } else {
            core
        }
    }
}

/// A collider volume placed in the world by a transform matrix.
#[derive(Debug, Clone, Copy)]
pub struct TransformedVolume<'a> {
    pub volume: &'a ColliderVolume,
    pub transform: Mat4,
    /// Transposed linear part, maps world directions into local space.
    direction_to_local: Mat3,
    scale: f32,
}

impl<'a> TransformedVolume<'a> {
    pub fn new(volume: &'a ColliderVolume, transform: Mat4) -> Self {
        Self {
            volume,
            transform,
            direction_to_local: Mat3::from_mat4(transform).transpose(),
            scale: max_axis_scale(&transform),
        }
    }

    pub fn bounding_sphere(&self) -> BoundingSphere {
        self.volume.bounding_sphere(&self.transform)
    }
}

impl SupportMap for TransformedVolume<'_> {
    #[inline]
    fn core_support(&self, direction: Vec3) -> Vec3 {
        let local_dir = self.direction_to_local * direction;
        let local_point = self.volume.local_core_support(local_dir);
        self.transform.transform_point3(local_point)
    }

    #[inline]
    fn margin(&self) -> f32 {
        match self.volume {
            ColliderVolume::Sphere { radius, .. } | ColliderVolume::Capsule { radius, .. } => {
                *radius * self.scale
            }
            _ => 0.0,
        }
    }

    #[inline]
    fn center(&self) -> Vec3 {
        self.transform.transform_point3(self.volume.local_center())
    }
}

impl SupportMap for Triangle {
    #[inline]
    fn core_support(&self, direction: Vec3) -> Vec3 {
        let mut best = self.a;
        let mut best_dot = self.a.dot(direction);
        for p in [self.b, self.c] {
            let d = p.dot(direction);
            if d > best_dot {
                best_dot = d;
                best = p;
            }
        }
        best
    }

    #[inline]
    fn margin(&self) -> f32 {
        0.0
    }

    #[inline]
    fn center(&self) -> Vec3 {
        self.centroid()
    }
}

impl ColliderVolume {
    /// Core support point in local space. `local_dir` need not be normalized.
    pub fn local_core_support(&self, local_dir: Vec3) -> Vec3 {
        match self {
            ColliderVolume::Sphere { center, .. } => *center,
            ColliderVolume::Box {
                center,
                half_extents,
                ..
            } => {
                *center
                    + Vec3::new(
                        if local_dir.x >= 0.0 {
                            half_extents.x
                        } else {
                            -half_extents.x
                        },
                        if local_dir.y >= 0.0 {
                            half_extents.y
                        } else {
                            -half_extents.y
                        },
                        if local_dir.z >= 0.0 {
                            half_extents.z
                        } else {
                            -half_extents.z
                        },
                    )
            }
            ColliderVolume::Capsule { a, b, .. } => {
                if a.dot(local_dir) > b.dot(local_dir) {
                    *a
                } else {
                    *b
                }
            }
            ColliderVolume::Hull { vertices, .. } => {
                let Some((first, rest)) = vertices.split_first() else {
                    return Vec3::ZERO;
                };
                let mut best = *first;
                let mut best_dot = best.dot(local_dir);
                for p in rest {
                    let d = p.dot(local_dir);
                    if d > best_dot {
                        best_dot = d;
                        best = *p;
                    }
                }
                best
            }
        }
    }

    /// World-space bounding sphere for the broad phase.
    #[inline]
    pub fn bounding_sphere(&self, transform: &Mat4) -> BoundingSphere {
        BoundingSphere::new(
            transform.transform_point3(self.local_center()),
            self.max_extent() * max_axis_scale(transform),
        )
    }
}

/// Largest scale factor among the matrix's basis vectors.
#[inline]
pub fn max_axis_scale(mat: &Mat4) -> f32 {
    let sx = mat.x_axis.truncate().length();
    let sy = mat.y_axis.truncate().length();
    let sz = mat.z_axis.truncate().length();
    sx.max(sy).max(sz)
}
