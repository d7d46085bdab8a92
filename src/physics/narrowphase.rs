//! Narrowphase collision detection: GJK distance and EPA penetration depth.
//!
//! Shapes are queried only through [`SupportMap`]. Each shape is a core swept
//! by a margin, so most resting and grazing contacts are answered exactly by
//! running GJK on the cores and comparing the distance with the summed
//! margins. Only when the cores themselves overlap does the full shape go
//! through GJK and then EPA.

use arrayvec::ArrayVec;
use glam::{Mat4, Quat, Vec3};
use tracing::debug;

use super::collider::{SupportMap, Triangle, TransformedVolume};
use super::config::PhysicsConfig;
use super::contact::Contact;
use super::polytope::{Polytope, SupportPoint};

const GJK_MAX_ITERATIONS: usize = 64;

/// Relative progress below which GJK stops.
const GJK_RELATIVE_EPSILON: f32 = 1e-5;

/// Squared distance at which the origin counts as inside the simplex.
const GJK_OVERLAP_EPSILON: f32 = 1e-10;

/// Minimum offset when growing a degenerate simplex into a tetrahedron.
const BLOW_UP_EPSILON: f32 = 1e-8;

/// Simplex of up to four Minkowski points with the barycentric weights of
/// its closest point to the origin.
#[derive(Debug, Clone, Default)]
pub struct Simplex {
    points: ArrayVec<SupportPoint, 4>,
    weights: [f32; 4],
}

impl Simplex {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[SupportPoint] {
        &self.points
    }

    fn push(&mut self, point: SupportPoint) {
        self.points.push(point);
    }

    fn contains(&self, point: &SupportPoint) -> bool {
        self.points
            .iter()
            .any(|p| p.point.distance_squared(point.point) < 1e-12)
    }

    /// Replace the simplex by the smallest sub-simplex supporting its closest
    /// point to the origin, and return that point.
    fn reduce(&mut self) -> Vec3 {
        let p: ArrayVec<Vec3, 4> = self.points.iter().map(|s| s.point).collect();
        let (closest, weights) = match p.len() {
            1 => (p[0], [1.0, 0.0, 0.0, 0.0]),
            2 => {
                let (q, [u, v]) = closest_on_segment(p[0], p[1]);
                (q, [u, v, 0.0, 0.0])
            }
            3 => {
                let (q, [u, v, w]) = closest_on_triangle(p[0], p[1], p[2]);
                (q, [u, v, w, 0.0])
            }
            4 => {
                let Some(result) = closest_on_tetrahedron([p[0], p[1], p[2], p[3]]) else {
                    // Origin enclosed
                    return Vec3::ZERO;
                };
                result
            }
            _ => return Vec3::ZERO,
        };

        let mut kept = ArrayVec::new();
        let mut kept_weights = [0.0; 4];
        for (point, weight) in self.points.iter().zip(weights) {
            if weight > 0.0 {
                kept_weights[kept.len()] = weight;
                kept.push(*point);
            }
        }
        if kept.is_empty() {
            kept.push(self.points[0]);
            kept_weights[0] = 1.0;
        }
        self.points = kept;
        self.weights = kept_weights;
        closest
    }

    /// Closest points on shape A and shape B.
    fn witnesses(&self) -> (Vec3, Vec3) {
        self.points
            .iter()
            .zip(self.weights)
            .fold((Vec3::ZERO, Vec3::ZERO), |(a, b), (p, w)| {
                (a + p.a * w, b + p.b * w)
            })
    }
}

/// Outcome of a GJK distance query.
#[derive(Debug, Clone)]
pub enum GjkResult {
    /// Closest points between the shapes.
    Separated {
        distance: f32,
        point_a: Vec3,
        point_b: Vec3,
    },
    /// Proven farther apart than the query limit.
    Disjoint,
    /// The Minkowski difference contains the origin.
    Overlap(Simplex),
}

/// GJK distance between two shapes given the support of their Minkowski
/// difference `A - B`.
///
/// `initial` is any vector inside `A - B` (the center offset works). With a
/// `limit`, the query stops early once the distance is proven to exceed it.
pub fn gjk_distance(
    support: impl Fn(Vec3) -> SupportPoint,
    initial: Vec3,
    limit: Option<f32>,
) -> GjkResult {
    let initial = if initial.length_squared() > 1e-12 {
        initial
    } else {
        Vec3::X
    };

    let mut simplex = Simplex::default();
    let first = support(-initial);
    simplex.push(first);
    simplex.weights[0] = 1.0;
    let mut v = first.point;
    let mut previous = f32::MAX;

    for _ in 0..GJK_MAX_ITERATIONS {
        let vv = v.length_squared();
        if vv <= GJK_OVERLAP_EPSILON {
            return GjkResult::Overlap(simplex);
        }

        let w = support(-v);
        let vw = v.dot(w.point);

        if let Some(limit) = limit {
            if vw > 0.0 && vw * vw > limit * limit * vv {
                return GjkResult::Disjoint;
            }
        }

        if vv - vw <= GJK_RELATIVE_EPSILON * vv || simplex.contains(&w) {
            break;
        }

        simplex.push(w);
        v = simplex.reduce();
        if simplex.len() == 4 {
            return GjkResult::Overlap(simplex);
        }

        let vv = v.length_squared();
        if vv >= previous {
            break;
        }
        previous = vv;
    }

    if v.length_squared() <= GJK_OVERLAP_EPSILON {
        return GjkResult::Overlap(simplex);
    }
    let (point_a, point_b) = simplex.witnesses();
    GjkResult::Separated {
        distance: v.length(),
        point_a,
        point_b,
    }
}

/// Contact in world space, before local points are attached.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawContact {
    pub point_a: Vec3,
    pub point_b: Vec3,
    /// From A toward B.
    pub normal: Vec3,
    pub depth: f32,
}

/// GJK/EPA contact generator. Owns the EPA working buffers.
#[derive(Debug, Clone)]
pub struct NarrowPhase {
    polytope: Polytope,
    max_iterations: u32,
    tolerance: f32,
}

impl Default for NarrowPhase {
    fn default() -> Self {
        Self::new(32, 1e-5)
    }
}

impl NarrowPhase {
    pub fn new(max_iterations: u32, tolerance: f32) -> Self {
        Self {
            polytope: Polytope::new(),
            max_iterations: max_iterations.max(1),
            tolerance,
        }
    }

    pub fn from_config(config: &PhysicsConfig) -> Self {
        Self::new(config.epa_max_iterations, config.epa_tolerance)
    }

    /// Contact between two placed collider volumes.
    pub fn contact(&mut self, a: &TransformedVolume, b: &TransformedVolume) -> Option<Contact> {
        let raw = self.collide(a, b)?;
        Some(Contact::from_world(
            raw.point_a,
            raw.point_b,
            raw.normal,
            raw.depth,
            &a.transform,
            &b.transform,
        ))
    }

    /// Contact against the first touching triangle of a static mesh.
    ///
    /// Triangles are in world space; `mesh_transform` only serves to express
    /// the mesh-side point locally.
    pub fn mesh_contact<'t>(
        &mut self,
        a: &TransformedVolume,
        mesh_transform: &Mat4,
        triangles: impl IntoIterator<Item = &'t Triangle>,
    ) -> Option<Contact> {
        triangles.into_iter().find_map(|triangle| {
            let raw = self.collide(a, triangle)?;
            Some(Contact::from_world(
                raw.point_a,
                raw.point_b,
                raw.normal,
                raw.depth,
                &a.transform,
                mesh_transform,
            ))
        })
    }

    /// Exact contact between any two support-mapped shapes.
    pub fn collide<A, B>(&mut self, a: &A, b: &B) -> Option<RawContact>
    where
        A: SupportMap + ?Sized,
        B: SupportMap + ?Sized,
    {
        let margin_a = a.margin();
        let margin_b = b.margin();
        let margin = margin_a + margin_b;
        let initial = a.center() - b.center();

        let core = |d: Vec3| SupportPoint::new(a.core_support(d), b.core_support(-d));
        match gjk_distance(core, initial, Some(margin)) {
            GjkResult::Disjoint => None,
            GjkResult::Separated {
                distance,
                point_a,
                point_b,
            } => {
                if distance > margin {
                    return None;
                }
                let normal = (point_b - point_a).normalize_or_zero();
                if normal == Vec3::ZERO {
                    return self.penetration(a, b, initial);
                }
                Some(RawContact {
                    point_a: point_a + normal * margin_a,
                    point_b: point_b - normal * margin_b,
                    normal,
                    depth: margin - distance,
                })
            }
            GjkResult::Overlap(simplex) if margin == 0.0 => {
                // Cores are the full shapes: reuse the simplex
                let full = |d: Vec3| SupportPoint::new(a.support(d), b.support(-d));
                let tetrahedron = blow_up(&simplex, &full)?;
                self.epa(&tetrahedron, &full)
            }
            GjkResult::Overlap(_) => self.penetration(a, b, initial),
        }
    }

    /// Penetration of overlapping full shapes.
    fn penetration<A, B>(&mut self, a: &A, b: &B, initial: Vec3) -> Option<RawContact>
    where
        A: SupportMap + ?Sized,
        B: SupportMap + ?Sized,
    {
        let full = |d: Vec3| SupportPoint::new(a.support(d), b.support(-d));
        match gjk_distance(&full, initial, None) {
            GjkResult::Overlap(simplex) => {
                let tetrahedron = blow_up(&simplex, &full)?;
                self.epa(&tetrahedron, &full)
            }
            GjkResult::Separated {
                distance,
                point_a,
                point_b,
            } if distance <= self.tolerance => {
                // Touching within tolerance
                let normal = (point_b - point_a).normalize_or_zero();
                let normal = if normal == Vec3::ZERO {
                    (-initial).normalize_or_zero()
                } else {
                    normal
                };
                (normal != Vec3::ZERO).then_some(RawContact {
                    point_a,
                    point_b,
                    normal,
                    depth: 0.0,
                })
            }
            _ => None,
        }
    }

    /// Expanding polytope over a tetrahedron enclosing the origin.
    ///
    /// Stops when a new support point improves the closest face by less than
    /// the tolerance, or after the iteration cap, returning the best face
    /// found either way.
    fn epa(
        &mut self,
        tetrahedron: &[SupportPoint; 4],
        support: impl Fn(Vec3) -> SupportPoint,
    ) -> Option<RawContact> {
        if !self.polytope.init_tetrahedron(tetrahedron) {
            debug!("EPA skipped: degenerate initial tetrahedron");
            return None;
        }

        let mut best = None;
        let mut converged = false;
        for _ in 0..self.max_iterations {
            let Some(face) = self.polytope.closest_face() else {
                break;
            };
            best = Some((face, self.polytope.face_vertices(&face)));

            let w = support(face.normal);
            if w.point.dot(face.normal) - face.distance < self.tolerance {
                converged = true;
                break;
            }
            if !self.polytope.expand(w) {
                converged = true;
                break;
            }
        }

        let (face, [p0, p1, p2]) = best?;
        if !converged {
            debug!(
                "EPA hit {} iterations, using best face (depth {})",
                self.max_iterations, face.distance
            );
        }

        let (_, [u, v, w]) = closest_on_triangle(p0.point, p1.point, p2.point);
        Some(RawContact {
            point_a: p0.a * u + p1.a * v + p2.a * w,
            point_b: p0.b * u + p1.b * v + p2.b * w,
            normal: face.normal,
            depth: face.distance.max(0.0),
        })
    }
}

/// Grow a simplex that touches the origin into a full tetrahedron.
fn blow_up(
    simplex: &Simplex,
    support: impl Fn(Vec3) -> SupportPoint,
) -> Option<[SupportPoint; 4]> {
    let mut points: ArrayVec<SupportPoint, 4> = simplex.points().iter().copied().collect();

    if points.len() == 1 {
        let p0 = points[0].point;
        let axes = [Vec3::X, Vec3::NEG_X, Vec3::Y, Vec3::NEG_Y, Vec3::Z, Vec3::NEG_Z];
        let next = axes
            .into_iter()
            .map(&support)
            .find(|s| s.point.distance_squared(p0) > BLOW_UP_EPSILON)?;
        points.push(next);
    }

    if points.len() == 2 {
        let p0 = points[0].point;
        let line = (points[1].point - p0).normalize_or_zero();
        if line == Vec3::ZERO {
            return None;
        }
        let abs = line.abs();
        let least = if abs.x <= abs.y && abs.x <= abs.z {
            Vec3::X
        } else if abs.y <= abs.z {
            Vec3::Y
        } else {
            Vec3::Z
        };
        let mut direction = line.cross(least).normalize();
        let step = Quat::from_axis_angle(line, std::f32::consts::FRAC_PI_3);
        let mut next = None;
        for _ in 0..6 {
            let s = support(direction);
            if (s.point - p0).cross(line).length_squared() > BLOW_UP_EPSILON {
                next = Some(s);
                break;
            }
            direction = step * direction;
        }
        points.push(next?);
    }

    if points.len() == 3 {
        let p0 = points[0].point;
        let normal = (points[1].point - p0).cross(points[2].point - p0);
        if normal.length_squared() < BLOW_UP_EPSILON {
            return None;
        }
        let offset = |s: &SupportPoint| normal.dot(s.point - p0).abs();
        let up = support(normal);
        let next = if offset(&up) > BLOW_UP_EPSILON {
            up
        } else {
            let down = support(-normal);
            if offset(&down) <= BLOW_UP_EPSILON {
                return None;
            }
            down
        };
        points.push(next);
    }

    points.into_inner().ok()
}

fn closest_on_segment(a: Vec3, b: Vec3) -> (Vec3, [f32; 2]) {
    let ab = b - a;
    let len_sq = ab.length_squared();
    if len_sq < 1e-20 {
        return (a, [1.0, 0.0]);
    }
    let t = -a.dot(ab) / len_sq;
    if t <= 0.0 {
        (a, [1.0, 0.0])
    } else if t >= 1.0 {
        (b, [0.0, 1.0])
    } else {
        (a + ab * t, [1.0 - t, t])
    }
}

/// Closest point of triangle `abc` to the origin, with barycentric weights.
fn closest_on_triangle(a: Vec3, b: Vec3, c: Vec3) -> (Vec3, [f32; 3]) {
    let ab = b - a;
    let ac = c - a;
    let ao = -a;

    let d1 = ab.dot(ao);
    let d2 = ac.dot(ao);
    if d1 <= 0.0 && d2 <= 0.0 {
        return (a, [1.0, 0.0, 0.0]);
    }

    let bo = -b;
    let d3 = ab.dot(bo);
    let d4 = ac.dot(bo);
    if d3 >= 0.0 && d4 <= d3 {
        return (b, [0.0, 1.0, 0.0]);
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 && d1 - d3 > 0.0 {
        let v = d1 / (d1 - d3);
        return (a + ab * v, [1.0 - v, v, 0.0]);
    }

    let co = -c;
    let d5 = ab.dot(co);
    let d6 = ac.dot(co);
    if d6 >= 0.0 && d5 <= d6 {
        return (c, [0.0, 0.0, 1.0]);
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 && d2 - d6 > 0.0 {
        let w = d2 / (d2 - d6);
        return (a + ac * w, [1.0 - w, 0.0, w]);
    }

    let va = d3 * d6 - d5 * d4;
    let e = (d4 - d3) + (d5 - d6);
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 && e > 0.0 {
        let w = (d4 - d3) / e;
        return (b + (c - b) * w, [0.0, 1.0 - w, w]);
    }

    let sum = va + vb + vc;
    if sum.abs() < 1e-20 {
        // Collinear: fall back to the nearest edge
        let edges = [
            (closest_on_segment(a, b), [0, 1]),
            (closest_on_segment(b, c), [1, 2]),
            (closest_on_segment(a, c), [0, 2]),
        ];
        let ((q, [s, t]), [i, j]) = edges
            .into_iter()
            .min_by(|x, y| x.0 .0.length_squared().total_cmp(&y.0 .0.length_squared()))
            .unwrap_or(((a, [1.0, 0.0]), [0, 1]));
        let mut weights = [0.0; 3];
        weights[i] = s;
        weights[j] = t;
        return (q, weights);
    }

    let v = vb / sum;
    let w = vc / sum;
    (a + ab * v + ac * w, [1.0 - v - w, v, w])
}

/// Closest point of a tetrahedron's boundary to the origin, or `None` if
/// the origin lies inside.
fn closest_on_tetrahedron(p: [Vec3; 4]) -> Option<(Vec3, [f32; 4])> {
    const FACES: [[usize; 4]; 4] = [[0, 1, 2, 3], [0, 3, 1, 2], [0, 2, 3, 1], [1, 3, 2, 0]];

    let mut best: Option<(f32, Vec3, [f32; 4])> = None;
    for [i, j, k, opposite] in FACES {
        let normal = (p[j] - p[i]).cross(p[k] - p[i]);
        let origin_side = normal.dot(-p[i]);
        let opposite_side = normal.dot(p[opposite] - p[i]);
        let outside = opposite_side.abs() < 1e-12 || origin_side * opposite_side < 0.0;
        if !outside {
            continue;
        }

        let (q, [u, v, w]) = closest_on_triangle(p[i], p[j], p[k]);
        let dist = q.length_squared();
        if best.map_or(true, |(nearest, _, _)| dist < nearest) {
            let mut weights = [0.0; 4];
            weights[i] = u;
            weights[j] = v;
            weights[k] = w;
            best = Some((dist, q, weights));
        }
    }
    best.map(|(_, q, weights)| (q, weights))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::components::physics::ColliderVolume;

    fn placed(volume: &ColliderVolume, position: Vec3) -> TransformedVolume<'_> {
        TransformedVolume::new(volume, Mat4::from_translation(position))
    }

    #[test]
    fn test_sphere_sphere_intersection() {
        let sphere = ColliderVolume::sphere(1.0);
        let a = placed(&sphere, Vec3::ZERO);
        let b = placed(&sphere, Vec3::new(1.5, 0.0, 0.0));

        let contact = NarrowPhase::default().contact(&a, &b).unwrap();
        let eps = 1e-4;
        assert!((contact.normal - Vec3::X).length() < eps);
        assert!((contact.depth - 0.5).abs() < eps);
        assert!((contact.world_point_a - Vec3::X).length() < eps);
        assert!((contact.world_point_b - Vec3::new(0.5, 0.0, 0.0)).length() < eps);
        assert!((contact.local_point_b - Vec3::new(-1.0, 0.0, 0.0)).length() < eps);
    }

    #[test]
    fn test_sphere_sphere_no_intersection() {
        let sphere = ColliderVolume::sphere(1.0);
        let a = placed(&sphere, Vec3::ZERO);
        let b = placed(&sphere, Vec3::new(3.0, 0.0, 0.0));
        assert!(NarrowPhase::default().contact(&a, &b).is_none());
    }

    #[test]
    fn test_touching_spheres_zero_depth() {
        let sphere = ColliderVolume::sphere(1.0);
        let a = placed(&sphere, Vec3::new(-1.0, 0.0, 0.0));
        let b = placed(&sphere, Vec3::new(1.0, 0.0, 0.0));

        let contact = NarrowPhase::default().contact(&a, &b).unwrap();
        assert!(contact.depth.abs() < 1e-5);
        assert!((contact.normal - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn test_concentric_spheres_use_epa() {
        let sphere = ColliderVolume::sphere(1.0);
        let a = placed(&sphere, Vec3::ZERO);
        let b = placed(&sphere, Vec3::ZERO);

        let contact = NarrowPhase::default().contact(&a, &b).unwrap();
        assert!((contact.normal.length() - 1.0).abs() < 1e-4);
        assert!(contact.depth > 1.5 && contact.depth <= 2.0 + 1e-4);
    }

    #[test]
    fn test_box_box_penetration() {
        let cube = ColliderVolume::cuboid(Vec3::ONE);
        let a = placed(&cube, Vec3::ZERO);
        let b = placed(&cube, Vec3::new(1.5, 0.0, 0.0));

        let contact = NarrowPhase::default().contact(&a, &b).unwrap();
        let eps = 1e-4;
        assert!((contact.normal - Vec3::X).length() < eps);
        assert!((contact.depth - 0.5).abs() < eps);
        assert!((contact.world_point_a.x - 1.0).abs() < eps);
        assert!((contact.world_point_b.x - 0.5).abs() < eps);
    }

    #[test]
    fn test_box_box_no_intersection() {
        let cube = ColliderVolume::cuboid(Vec3::ONE);
        let a = placed(&cube, Vec3::ZERO);
        let b = placed(&cube, Vec3::new(3.0, 0.0, 0.0));
        assert!(NarrowPhase::default().contact(&a, &b).is_none());
    }

    #[test]
    fn test_sphere_resting_on_box() {
        let ground = ColliderVolume::cuboid(Vec3::ONE);
        let ball = ColliderVolume::sphere(1.0);
        let a = placed(&ground, Vec3::ZERO);
        let b = placed(&ball, Vec3::new(0.2, 1.5, -0.3));

        let contact = NarrowPhase::default().contact(&a, &b).unwrap();
        let eps = 1e-4;
        assert!((contact.normal - Vec3::Y).length() < eps);
        assert!((contact.depth - 0.5).abs() < eps);
        assert!((contact.world_point_a - Vec3::new(0.2, 1.0, -0.3)).length() < eps);
    }

    #[test]
    fn test_sphere_sunk_into_box() {
        let ground = ColliderVolume::cuboid(Vec3::ONE);
        let ball = ColliderVolume::sphere(0.5);
        let a = placed(&ground, Vec3::ZERO);
        let b = placed(&ball, Vec3::new(0.0, 0.5, 0.0));

        let contact = NarrowPhase::default().contact(&a, &b).unwrap();
        assert!(contact.normal.dot(Vec3::Y) > 0.99);
        assert!((contact.depth - 1.0).abs() < 1e-2);
    }

    #[test]
    fn test_crossing_capsules() {
        let capsule = ColliderVolume::capsule(Vec3::new(-2.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0), 0.5);
        let a = placed(&capsule, Vec3::ZERO);
        let rotated = TransformedVolume::new(
            &capsule,
            Mat4::from_rotation_translation(
                Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
                Vec3::new(0.0, 0.8, 0.0),
            ),
        );

        let contact = NarrowPhase::default().contact(&a, &rotated).unwrap();
        let eps = 1e-4;
        assert!((contact.normal - Vec3::Y).length() < eps);
        assert!((contact.depth - 0.2).abs() < eps);
    }

    #[test]
    fn test_epa_iteration_cap_returns_best_face() {
        let cube = ColliderVolume::cuboid(Vec3::ONE);
        let a = placed(&cube, Vec3::ZERO);
        let b = TransformedVolume::new(
            &cube,
            Mat4::from_rotation_translation(
                Quat::from_euler(glam::EulerRot::XYZ, 0.3, 0.7, 0.2),
                Vec3::new(0.4, 0.9, 0.1),
            ),
        );

        let full = NarrowPhase::default().contact(&a, &b).unwrap();
        assert!(full.depth > 0.0);
        assert!((full.normal.length() - 1.0).abs() < 1e-4);

        let capped = NarrowPhase::new(1, 1e-5).contact(&a, &b).unwrap();
        assert!(capped.depth >= 0.0);
        assert!(capped.depth.is_finite());
    }

    #[test]
    fn test_mesh_contact_first_hit() {
        let ball = ColliderVolume::sphere(0.5);
        let a = placed(&ball, Vec3::new(-0.25, 0.4, -0.25));
        let triangles = [
            Triangle::new(Vec3::new(5.0, 0.0, 5.0), Vec3::new(6.0, 0.0, 5.0), Vec3::new(5.0, 0.0, 6.0)),
            Triangle::new(Vec3::new(-1.0, 0.0, -1.0), Vec3::new(-1.0, 0.0, 1.0), Vec3::new(1.0, 0.0, -1.0)),
        ];

        let contact = NarrowPhase::default()
            .mesh_contact(&a, &Mat4::IDENTITY, &triangles)
            .unwrap();
        assert!((contact.normal + Vec3::Y).length() < 1e-4);
        assert!((contact.depth - 0.1).abs() < 1e-4);
        assert!((contact.world_point_b - Vec3::new(-0.25, 0.0, -0.25)).length() < 1e-4);
    }

    #[test]
    fn test_gjk_distance_between_points() {
        let support = |_: Vec3| SupportPoint::new(Vec3::ZERO, Vec3::new(0.0, 3.0, 4.0));
        match gjk_distance(support, Vec3::ONE, None) {
            GjkResult::Separated { distance, .. } => assert!((distance - 5.0).abs() < 1e-5),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(
            gjk_distance(support, Vec3::ONE, Some(1.0)),
            GjkResult::Disjoint
        ));
    }

    #[test]
    fn test_closest_on_triangle_interior() {
        let (q, [u, v, w]) = closest_on_triangle(
            Vec3::new(-1.0, -1.0, 2.0),
            Vec3::new(1.0, -1.0, 2.0),
            Vec3::new(0.0, 1.0, 2.0),
        );
        assert!((q - Vec3::new(0.0, 0.0, 2.0)).length() < 1e-5);
        assert!((u + v + w - 1.0).abs() < 1e-5);
    }
}
