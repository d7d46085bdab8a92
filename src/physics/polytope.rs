//! Expanding polytope used by EPA.
//!
//! Vertices, faces and the horizon edge list live in buffers owned by the
//! narrow phase and reused across queries. Faces refer to vertices by `u32`
//! index so growing the vertex buffer never invalidates them.

use glam::Vec3;

/// Faces whose normal is shorter than this are treated as degenerate.
const DEGENERATE_EPSILON: f32 = 1e-12;

/// A face sees a vertex only if the vertex is this far in front of it.
const VISIBILITY_EPSILON: f32 = 1e-6;

/// A point of the Minkowski difference `A - B` together with the shape
/// points that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SupportPoint {
    /// `a - b`.
    pub point: Vec3,
    pub a: Vec3,
    pub b: Vec3,
}

impl SupportPoint {
    pub fn new(a: Vec3, b: Vec3) -> Self {
        Self { point: a - b, a, b }
    }
}

/// Triangle of the polytope with its cached plane.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolytopeFace {
    /// Counter-clockwise seen from outside.
    pub indices: [u32; 3],
    /// Outward unit normal.
    pub normal: Vec3,
    /// Signed distance of the face plane from the origin.
    pub distance: f32,
}

#[derive(Debug, Default, Clone)]
pub struct Polytope {
    vertices: Vec<SupportPoint>,
    faces: Vec<PolytopeFace>,
    horizon: Vec<[u32; 2]>,
}

impl Polytope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty the buffers, keeping their allocations.
    pub fn clear(&mut self) {
        self.vertices.clear();
        self.faces.clear();
        self.horizon.clear();
    }

    /// Reset to the tetrahedron spanned by `points`, faces wound outward.
    ///
    /// Returns `false` if the tetrahedron is flat.
    pub fn init_tetrahedron(&mut self, points: &[SupportPoint; 4]) -> bool {
        self.clear();
        self.vertices.extend_from_slice(points);

        let centroid = points.iter().map(|p| p.point).sum::<Vec3>() * 0.25;
        for [i, j, k] in [[0, 1, 2], [0, 3, 1], [0, 2, 3], [1, 3, 2]] {
            let Some(face) = make_face(&self.vertices, i, j, k) else {
                return false;
            };
            let a = self.vertices[i as usize].point;
            let face = if face.normal.dot(centroid - a) > 0.0 {
                match make_face(&self.vertices, i, k, j) {
                    Some(face) => face,
                    None => return false,
                }
            } else {
                face
            };
            self.faces.push(face);
        }
        true
    }

    /// Face whose plane is nearest the origin.
    pub fn closest_face(&self) -> Option<PolytopeFace> {
        self.faces
            .iter()
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
            .copied()
    }

    /// The three support points of `face`.
    #[inline]
    pub fn face_vertices(&self, face: &PolytopeFace) -> [SupportPoint; 3] {
        face.indices.map(|i| self.vertices[i as usize])
    }

    /// Add `vertex`, removing every face that sees it and stitching the
    /// horizon to the new vertex.
    ///
    /// Returns `false` if nothing could be stitched, leaving the polytope unusable.
    pub fn expand(&mut self, vertex: SupportPoint) -> bool {
        let new_index = self.vertices.len() as u32;
        self.vertices.push(vertex);
        self.horizon.clear();

        let Self {
            vertices,
            faces,
            horizon,
        } = self;

        let mut i = 0;
        while i < faces.len() {
            let face = faces[i];
            let a = vertices[face.indices[0] as usize].point;
            if face.normal.dot(vertex.point - a) > VISIBILITY_EPSILON {
                let [x, y, z] = face.indices;
                add_edge(horizon, x, y);
                add_edge(horizon, y, z);
                add_edge(horizon, z, x);
                faces.swap_remove(i);
            } else {
                i += 1;
            }
        }

        if horizon.is_empty() {
            vertices.pop();
            return false;
        }

        for &[x, y] in horizon.iter() {
            if let Some(face) = make_face(vertices, x, y, new_index) {
                faces.push(face);
            }
        }
        !faces.is_empty()
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn face_count(&self) -> usize {
        self.faces.len()
    }
}

fn make_face(vertices: &[SupportPoint], i: u32, j: u32, k: u32) -> Option<PolytopeFace> {
    let a = vertices[i as usize].point;
    let b = vertices[j as usize].point;
    let c = vertices[k as usize].point;
    let normal = (b - a).cross(c - a);
    let len_sq = normal.length_squared();
    if len_sq < DEGENERATE_EPSILON {
        return None;
    }
    let normal = normal / len_sq.sqrt();
    Some(PolytopeFace {
        indices: [i, j, k],
        normal,
        distance: normal.dot(a),
    })
}

/// Add a horizon edge, cancelling it against its reverse if already present.
fn add_edge(edges: &mut Vec<[u32; 2]>, a: u32, b: u32) {
    if let Some(pos) = edges.iter().position(|e| e[0] == b && e[1] == a) {
        edges.swap_remove(pos);
    } else {
        edges.push([a, b]);
    }
}
