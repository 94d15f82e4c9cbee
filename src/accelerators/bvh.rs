//! Bounding Volume Hierarchy over scene triangles.

use crate::core::common::*;
use crate::core::geometry::*;
use crate::core::triangle::Triangle;

/// Identifies a triangle. Input triangles keep their position in the original
/// list; the radiosity solver allocates further ids past them for subdivided
/// patches, which never enter the accelerator.
pub type TriangleId = usize;

/// Build-time bookkeeping for one triangle.
struct BVHPrimitiveInfo {
    /// Index of the triangle in the input list.
    index: TriangleId,

    /// World bounds of the triangle.
    bounds: Bounds3f,

    /// Centroid of the bounds, used for partitioning.
    centroid: Point3f,
}

/// Build-tree node; flattened before use.
struct BVHBuildNode {
    /// Bounds of everything below this node.
    bounds: Bounds3f,

    /// The two children of an interior node.
    children: Option<[Box<BVHBuildNode>; 2]>,

    /// Partition axis of an interior node.
    split_axis: Axis,

    /// Offset of the first triangle of a leaf in the ordered list.
    first_prim_offset: usize,

    /// Number of triangles in a leaf; 0 for interior nodes.
    n_primitives: usize,
}

/// A node of the flattened depth-first tree.
#[derive(Copy, Clone, Default)]
pub struct LinearBVHNode {
    /// Bounds of everything below this node.
    pub bounds: Bounds3f,

    /// For a leaf, the offset of its first triangle in the ordered list; for
    /// an interior node, the index of its second child.
    pub offset: u32,

    /// Number of triangles in a leaf; 0 for interior nodes.
    pub n_primitives: u16,

    /// Partition axis of an interior node.
    pub axis: u8,
}

/// Bounding Volume Hierarchy accelerator. Owns the scene's triangles and
/// answers closest-hit and occlusion queries against them.
pub struct BVHAccel {
    /// The triangles, in input order. `TriangleId`s index this list.
    triangles: Vec<Triangle>,

    /// Triangle ids reordered so every leaf covers a contiguous range.
    prim_order: Vec<TriangleId>,

    /// The flattened depth-first tree.
    nodes: Vec<LinearBVHNode>,
}

impl BVHAccel {
    /// Create a new Bounding Volume Hierarchy accelerator.
    ///
    /// * `triangles`        - The scene triangles.
    /// * `max_tris_in_node` - Maximum number of triangles in a leaf.
    pub fn new(triangles: Vec<Triangle>, max_tris_in_node: usize) -> Self {
        let n = triangles.len();
        if n == 0 {
            return Self {
                triangles,
                prim_order: vec![],
                nodes: vec![],
            };
        }

        let mut primitive_info: Vec<BVHPrimitiveInfo> = triangles
            .iter()
            .enumerate()
            .map(|(i, t)| {
                let bounds = t.bounds();
                BVHPrimitiveInfo {
                    index: i,
                    bounds,
                    centroid: bounds.centroid(),
                }
            })
            .collect();

        let mut prim_order = Vec::with_capacity(n);
        let mut total_nodes = 0;
        let root = Self::recursive_build(
            &mut primitive_info,
            0,
            n,
            max_tris_in_node.max(1),
            &mut total_nodes,
            &mut prim_order,
        );

        // Compute representation of depth-first traversal of the tree.
        let mut nodes = vec![LinearBVHNode::default(); total_nodes];
        let mut offset = 0_u32;
        Self::flatten_tree(&root, &mut nodes, &mut offset);
        debug_assert!(total_nodes == offset as usize);

        Self {
            triangles,
            prim_order,
            nodes,
        }
    }

    /// Returns the number of triangles.
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// Returns the triangles in input order.
    pub fn triangles(&self) -> &[Triangle] {
        &self.triangles
    }

    /// Builds a subtree over `primitive_info[start..end]` using equal-counts
    /// median partitioning along the widest centroid axis.
    ///
    /// * `primitive_info`   - Build-time bookkeeping, reordered in place.
    /// * `start`            - Start of the range.
    /// * `end`              - End of the range.
    /// * `max_tris_in_node` - Maximum number of triangles in a leaf.
    /// * `total_nodes`      - Running node count.
    /// * `prim_order`       - Ordered triangle ids, appended per leaf.
    fn recursive_build(
        primitive_info: &mut [BVHPrimitiveInfo],
        start: usize,
        end: usize,
        max_tris_in_node: usize,
        total_nodes: &mut usize,
        prim_order: &mut Vec<TriangleId>,
    ) -> BVHBuildNode {
        *total_nodes += 1;

        let bounds = primitive_info[start..end]
            .iter()
            .fold(Bounds3f::default(), |b, p| b.union(&p.bounds));

        let n_primitives = end - start;
        let centroid_bounds = primitive_info[start..end]
            .iter()
            .fold(Bounds3f::default(), |b, p| b.union_point(&p.centroid));
        let axis = centroid_bounds.max_extent();

        // A degenerate centroid box cannot be partitioned.
        let degenerate = centroid_bounds.p_max[axis] == centroid_bounds.p_min[axis];

        if n_primitives <= max_tris_in_node || degenerate {
            let first_prim_offset = prim_order.len();
            for p in primitive_info[start..end].iter() {
                prim_order.push(p.index);
            }
            return BVHBuildNode {
                bounds,
                children: None,
                split_axis: axis,
                first_prim_offset,
                n_primitives,
            };
        }

        // Partition into equally sized halves around the median centroid.
        let mid = (start + end) / 2;
        primitive_info[start..end].select_nth_unstable_by(mid - start, |a, b| {
            a.centroid[axis]
                .partial_cmp(&b.centroid[axis])
                .expect("NaN triangle centroid")
        });

        let left = Self::recursive_build(
            primitive_info,
            start,
            mid,
            max_tris_in_node,
            total_nodes,
            prim_order,
        );
        let right = Self::recursive_build(
            primitive_info,
            mid,
            end,
            max_tris_in_node,
            total_nodes,
            prim_order,
        );

        BVHBuildNode {
            bounds: left.bounds.union(&right.bounds),
            children: Some([Box::new(left), Box::new(right)]),
            split_axis: axis,
            first_prim_offset: 0,
            n_primitives: 0,
        }
    }

    /// Flattens the build tree to the linear depth-first representation.
    ///
    /// * `node`   - The build node.
    /// * `nodes`  - The flattened output.
    /// * `offset` - Tracks current offset into `nodes`.
    fn flatten_tree(node: &BVHBuildNode, nodes: &mut [LinearBVHNode], offset: &mut u32) -> u32 {
        let my_offset = *offset;
        *offset += 1;

        match &node.children {
            None => {
                nodes[my_offset as usize] = LinearBVHNode {
                    bounds: node.bounds,
                    offset: node.first_prim_offset as u32,
                    n_primitives: node.n_primitives as u16,
                    axis: 0,
                };
            }
            Some([left, right]) => {
                Self::flatten_tree(left, nodes, offset);
                let second_child_offset = Self::flatten_tree(right, nodes, offset);
                nodes[my_offset as usize] = LinearBVHNode {
                    bounds: node.bounds,
                    offset: second_child_offset,
                    n_primitives: 0,
                    axis: node.split_axis as u8,
                };
            }
        }

        my_offset
    }

    /// Returns the id of the closest triangle hit by the ray and the distance
    /// to it, shrinking `ray.t_max` to that distance. `None` if nothing is
    /// hit.
    ///
    /// * `ray` - The ray.
    pub fn intersect(&self, ray: &mut Ray) -> Option<(TriangleId, Float)> {
        if self.nodes.is_empty() {
            return None;
        }

        let inv_dir = Vector3f::new(1.0 / ray.d.x, 1.0 / ray.d.y, 1.0 / ray.d.z);
        let dir_is_neg = [
            u8::from(inv_dir.x < 0.0),
            u8::from(inv_dir.y < 0.0),
            u8::from(inv_dir.z < 0.0),
        ];

        let mut hit: Option<(TriangleId, Float)> = None;

        // Follow ray through BVH nodes to find triangle intersections.
        let (mut to_visit_offset, mut current_node_index) = (0_usize, 0_usize);
        let mut nodes_to_visit = [0_usize; 64];

        loop {
            let node = &self.nodes[current_node_index];
            if node.bounds.intersect_p_inv(ray, &inv_dir, dir_is_neg) {
                if node.n_primitives > 0 {
                    for i in 0..node.n_primitives as usize {
                        let id = self.prim_order[node.offset as usize + i];
                        if let Some(t) = self.triangles[id].intersect(ray) {
                            ray.t_max = t;
                            hit = Some((id, t));
                        }
                    }
                    if to_visit_offset == 0 {
                        break;
                    }
                    to_visit_offset -= 1;
                    current_node_index = nodes_to_visit[to_visit_offset];
                } else {
                    // Put the far child on the stack, advance to the near one.
                    if dir_is_neg[node.axis as usize] == 1 {
                        nodes_to_visit[to_visit_offset] = current_node_index + 1;
                        to_visit_offset += 1;
                        current_node_index = node.offset as usize;
                    } else {
                        nodes_to_visit[to_visit_offset] = node.offset as usize;
                        to_visit_offset += 1;
                        current_node_index += 1;
                    }
                }
            } else {
                if to_visit_offset == 0 {
                    break;
                }
                to_visit_offset -= 1;
                current_node_index = nodes_to_visit[to_visit_offset];
            }
        }

        hit
    }

    /// Returns true if any triangle intersects the ray's `(0, t_max)`
    /// segment. Early-exits on the first hit.
    ///
    /// * `ray` - The ray.
    pub fn intersect_p(&self, ray: &Ray) -> bool {
        if self.nodes.is_empty() {
            return false;
        }

        let inv_dir = Vector3f::new(1.0 / ray.d.x, 1.0 / ray.d.y, 1.0 / ray.d.z);
        let dir_is_neg = [
            u8::from(inv_dir.x < 0.0),
            u8::from(inv_dir.y < 0.0),
            u8::from(inv_dir.z < 0.0),
        ];

        let (mut to_visit_offset, mut current_node_index) = (0_usize, 0_usize);
        let mut nodes_to_visit = [0_usize; 64];

        loop {
            let node = &self.nodes[current_node_index];
            if node.bounds.intersect_p_inv(ray, &inv_dir, dir_is_neg) {
                if node.n_primitives > 0 {
                    for i in 0..node.n_primitives as usize {
                        let id = self.prim_order[node.offset as usize + i];
                        if self.triangles[id].intersect(ray).is_some() {
                            return true;
                        }
                    }
                    if to_visit_offset == 0 {
                        break;
                    }
                    to_visit_offset -= 1;
                    current_node_index = nodes_to_visit[to_visit_offset];
                } else {
                    if dir_is_neg[node.axis as usize] == 1 {
                        nodes_to_visit[to_visit_offset] = current_node_index + 1;
                        to_visit_offset += 1;
                        current_node_index = node.offset as usize;
                    } else {
                        nodes_to_visit[to_visit_offset] = node.offset as usize;
                        to_visit_offset += 1;
                        current_node_index += 1;
                    }
                }
            } else {
                if to_visit_offset == 0 {
                    break;
                }
                to_visit_offset -= 1;
                current_node_index = nodes_to_visit[to_visit_offset];
            }
        }

        false
    }
}

impl std::ops::Index<TriangleId> for BVHAccel {
    type Output = Triangle;

    /// Indexes an input triangle by its id.
    ///
    /// * `id` - The triangle id.
    fn index(&self, id: TriangleId) -> &Self::Output {
        &self.triangles[id]
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spectrum::Spectrum;

    fn quad_xy(z: Float) -> Vec<Triangle> {
        let p = |x, y| Point3f::new(x, y, z);
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
    fn empty_scene_has_no_intersections() {
        let accel = BVHAccel::new(vec![], 4);
        let mut ray = Ray::new(
            Point3f::zero(),
            Vector3f::new(0.0, 0.0, 1.0),
            INFINITY,
        );
        assert!(accel.intersect(&mut ray).is_none());
        assert!(!accel.intersect_p(&ray));
    }

    #[test]
    fn closest_hit_wins_over_farther_one() {
        let mut tris = quad_xy(1.0);
        tris.extend(quad_xy(2.0));
        let accel = BVHAccel::new(tris, 1);

        let mut ray = Ray::new(
            Point3f::new(0.25, 0.25, 0.0),
            Vector3f::new(0.0, 0.0, 1.0),
            INFINITY,
        );
        let (id, t) = accel.intersect(&mut ray).expect("expected a hit");
        assert!(id < 2, "closer quad should shadow the farther one");
        assert!((t - 1.0).abs() < 1e-5);
    }

    #[test]
    fn occlusion_respects_t_max() {
        let accel = BVHAccel::new(quad_xy(1.0), 4);
        let o = Point3f::new(0.25, 0.25, 0.0);
        let d = Vector3f::new(0.0, 0.0, 1.0);
        assert!(accel.intersect_p(&Ray::new(o, d, INFINITY)));
        assert!(!accel.intersect_p(&Ray::new(o, d, 0.5)));
    }

    #[test]
    fn ids_are_input_positions() {
        let mut tris = quad_xy(2.0);
        tris.extend(quad_xy(1.0));
        let accel = BVHAccel::new(tris, 1);

        let mut ray = Ray::new(
            Point3f::new(0.25, 0.25, 0.0),
            Vector3f::new(0.0, 0.0, 1.0),
            INFINITY,
        );
        let (id, _) = accel.intersect(&mut ray).expect("expected a hit");
        // The closer quad was appended second, so its ids are 2 and 3.
        assert!(id >= 2);
    }
}
