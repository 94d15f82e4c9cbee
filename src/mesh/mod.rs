//! Subdivision mesh for radiosity patches.
//!
//! Faces are append-only: `subdivide4` keeps the parent face in place and
//! appends the four children, so face handles stay valid for the lifetime of
//! the mesh. Midpoint vertices are shared between neighbouring subdivisions
//! through an edge cache, keeping the mesh watertight.

use crate::core::common::*;
use crate::core::geometry::Point3f;
use crate::core::triangle::Triangle;
use ordered_float::OrderedFloat;
use std::collections::HashMap;

/// Handle of a mesh vertex.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct VertexHandle(pub u32);

/// Handle of a mesh face.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct FaceHandle(pub u32);

/// Position key for vertex deduplication.
type PointKey = [OrderedFloat<Float>; 3];

fn point_key(p: &Point3f) -> PointKey {
    [OrderedFloat(p.x), OrderedFloat(p.y), OrderedFloat(p.z)]
}

/// A triangle mesh with shared vertices and 4-way midpoint subdivision.
#[derive(Default)]
pub struct RadiosityMesh {
    /// Vertex positions.
    points: Vec<Point3f>,

    /// Corner vertices per face.
    faces: Vec<[VertexHandle; 3]>,

    /// Deduplicates vertices by position.
    vertex_cache: HashMap<PointKey, VertexHandle>,

    /// Shared midpoint vertex per undirected edge.
    edge_midpoints: HashMap<(u32, u32), VertexHandle>,
}

impl RadiosityMesh {
    /// Returns the number of faces.
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Returns the number of vertices.
    pub fn num_vertices(&self) -> usize {
        self.points.len()
    }

    /// Returns the position of a vertex.
    ///
    /// * `v` - The vertex handle.
    pub fn point(&self, v: VertexHandle) -> Point3f {
        self.points[v.0 as usize]
    }

    /// Returns the corner vertices of a face.
    ///
    /// * `f` - The face handle.
    pub fn corner_vertices(&self, f: FaceHandle) -> [VertexHandle; 3] {
        self.faces[f.0 as usize]
    }

    /// Returns the corner positions of a face.
    ///
    /// * `f` - The face handle.
    pub fn corner_points(&self, f: FaceHandle) -> [Point3f; 3] {
        let [a, b, c] = self.corner_vertices(f);
        [self.point(a), self.point(b), self.point(c)]
    }

    /// Adds a face over three positions, deduplicating shared vertices.
    ///
    /// * `corners` - The corner positions, counter-clockwise.
    pub fn add_face(&mut self, corners: [Point3f; 3]) -> FaceHandle {
        let vs = [
            self.add_vertex(corners[0]),
            self.add_vertex(corners[1]),
            self.add_vertex(corners[2]),
        ];
        let f = FaceHandle(self.faces.len() as u32);
        self.faces.push(vs);
        f
    }

    /// Splits a face into four children by edge midpoints. The children tile
    /// the parent exactly; corner-child `i` keeps corner `i` and the centre
    /// child comes last. The parent face stays in place so its handle remains
    /// valid.
    ///
    /// * `f` - The face to subdivide.
    pub fn subdivide4(&mut self, f: FaceHandle) -> [FaceHandle; 4] {
        let [v0, v1, v2] = self.corner_vertices(f);
        let m01 = self.midpoint(v0, v1);
        let m12 = self.midpoint(v1, v2);
        let m20 = self.midpoint(v2, v0);

        let base = self.faces.len() as u32;
        self.faces.push([v0, m01, m20]);
        self.faces.push([m01, v1, m12]);
        self.faces.push([m20, m12, v2]);
        self.faces.push([m01, m12, m20]);

        [
            FaceHandle(base),
            FaceHandle(base + 1),
            FaceHandle(base + 2),
            FaceHandle(base + 3),
        ]
    }

    /// Returns the vertex at the midpoint of an edge, creating it on first
    /// use and sharing it afterwards.
    ///
    /// * `a` - First edge vertex.
    /// * `b` - Second edge vertex.
    fn midpoint(&mut self, a: VertexHandle, b: VertexHandle) -> VertexHandle {
        let key = if a.0 < b.0 { (a.0, b.0) } else { (b.0, a.0) };
        if let Some(&v) = self.edge_midpoints.get(&key) {
            return v;
        }

        let (pa, pb) = (self.point(a), self.point(b));
        let mid = Point3f::new(
            (pa.x + pb.x) * 0.5,
            (pa.y + pb.y) * 0.5,
            (pa.z + pb.z) * 0.5,
        );
        let v = self.add_vertex(mid);
        self.edge_midpoints.insert(key, v);
        v
    }

    /// Adds a vertex, returning the existing handle when the position is
    /// already present.
    ///
    /// * `p` - The vertex position.
    fn add_vertex(&mut self, p: Point3f) -> VertexHandle {
        debug_assert!(!p.has_nans());
        if let Some(&v) = self.vertex_cache.get(&point_key(&p)) {
            return v;
        }
        let v = VertexHandle(self.points.len() as u32);
        self.points.push(p);
        self.vertex_cache.insert(point_key(&p), v);
        v
    }
}

/// Builds a mesh over the given triangles. Face `i` corresponds to triangle
/// `i`; vertices shared between triangles are deduplicated by position.
///
/// * `triangles` - The scene triangles.
pub fn build_mesh(triangles: &[Triangle]) -> RadiosityMesh {
    let mut mesh = RadiosityMesh::default();
    for tri in triangles {
        mesh.add_face(tri.vertices);
    }
    debug_assert!(mesh.num_faces() == triangles.len());
    mesh
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spectrum::Spectrum;
    use float_cmp::approx_eq;

    fn face_area(mesh: &RadiosityMesh, f: FaceHandle) -> Float {
        let [a, b, c] = mesh.corner_points(f);
        0.5 * (b - a).cross(&(c - a)).length()
    }

    fn square() -> Vec<Triangle> {
        let p = |x, y| Point3f::new(x, y, 0.0);
        vec![
            Triangle::matte(
                [p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0)],
                Spectrum::new(0.5),
                Spectrum::default(),
            ),
            Triangle::matte(
                [p(0.0, 0.0), p(1.0, 1.0), p(0.0, 1.0)],
                Spectrum::new(0.5),
                Spectrum::default(),
            ),
        ]
    }

    #[test]
    fn build_mesh_shares_vertices_between_faces() {
        let mesh = build_mesh(&square());
        assert_eq!(mesh.num_faces(), 2);
        // The two triangles of the square share the diagonal's endpoints.
        assert_eq!(mesh.num_vertices(), 4);
    }

    #[test]
    fn subdivide4_children_tile_the_parent() {
        let mut mesh = build_mesh(&square());
        let parent = FaceHandle(0);
        let parent_area = face_area(&mesh, parent);

        let children = mesh.subdivide4(parent);
        let total: Float = children.iter().map(|f| face_area(&mesh, *f)).sum();
        assert!(approx_eq!(f32, total, parent_area, epsilon = 1e-6));
        for f in children {
            assert!(approx_eq!(
                f32,
                face_area(&mesh, f),
                parent_area / 4.0,
                epsilon = 1e-6
            ));
        }
    }

    #[test]
    fn subdivide4_keeps_parent_corners_on_corner_children() {
        let mut mesh = build_mesh(&square());
        let corners = mesh.corner_vertices(FaceHandle(0));
        let children = mesh.subdivide4(FaceHandle(0));
        for i in 0..3 {
            assert_eq!(mesh.corner_vertices(children[i])[i], corners[i]);
        }
    }

    #[test]
    fn adjacent_subdivisions_share_edge_midpoints() {
        let mut mesh = build_mesh(&square());
        let before = mesh.num_vertices();
        mesh.subdivide4(FaceHandle(0));
        let after_first = mesh.num_vertices();
        mesh.subdivide4(FaceHandle(1));
        let after_second = mesh.num_vertices();

        // First subdivision adds three midpoints; the second shares the one
        // on the diagonal and adds only two.
        assert_eq!(after_first - before, 3);
        assert_eq!(after_second - after_first, 2);
    }

    #[test]
    fn face_handles_stay_valid_across_subdivision() {
        let mut mesh = build_mesh(&square());
        let corners = mesh.corner_vertices(FaceHandle(0));
        mesh.subdivide4(FaceHandle(0));
        assert_eq!(mesh.corner_vertices(FaceHandle(0)), corners);
    }
}
