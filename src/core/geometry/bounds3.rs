//! 3-D Axis Aligned Bounding Boxes

use super::{Point3f, Ray, Vector3f};
use crate::core::common::*;

/// A 3-D axis aligned bounding box over `Float` coordinates.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Bounds3f {
    /// Minimum corner.
    pub p_min: Point3f,

    /// Maximum corner.
    pub p_max: Point3f,
}

impl Default for Bounds3f {
    /// Returns an empty box where the corners are at infinity so that any
    /// union with a point or box shrinks onto it.
    fn default() -> Self {
        Self {
            p_min: Point3f::new(INFINITY, INFINITY, INFINITY),
            p_max: Point3f::new(-INFINITY, -INFINITY, -INFINITY),
        }
    }
}

impl Bounds3f {
    /// Creates a new bounding box from two corner points.
    ///
    /// * `p1` - First corner.
    /// * `p2` - Second corner.
    pub fn new(p1: Point3f, p2: Point3f) -> Self {
        Self {
            p_min: Point3f::new(min(p1.x, p2.x), min(p1.y, p2.y), min(p1.z, p2.z)),
            p_max: Point3f::new(max(p1.x, p2.x), max(p1.y, p2.y), max(p1.z, p2.z)),
        }
    }

    /// Returns the union with a point.
    ///
    /// * `p` - The point.
    pub fn union_point(&self, p: &Point3f) -> Self {
        Self {
            p_min: Point3f::new(
                min(self.p_min.x, p.x),
                min(self.p_min.y, p.y),
                min(self.p_min.z, p.z),
            ),
            p_max: Point3f::new(
                max(self.p_max.x, p.x),
                max(self.p_max.y, p.y),
                max(self.p_max.z, p.z),
            ),
        }
    }

    /// Returns the union with another bounding box.
    ///
    /// * `other` - The other bounding box.
    pub fn union(&self, other: &Self) -> Self {
        self.union_point(&other.p_min).union_point(&other.p_max)
    }

    /// Returns the vector from the minimum to the maximum corner.
    pub fn diagonal(&self) -> Vector3f {
        self.p_max - self.p_min
    }

    /// Returns the centroid of the box.
    pub fn centroid(&self) -> Point3f {
        self.p_min + self.diagonal() * 0.5
    }

    /// Returns the axis along which the box is widest.
    pub fn max_extent(&self) -> Axis {
        self.diagonal().max_dimension()
    }

    /// Returns true if the ray's segment `[0, t_max]` intersects the box.
    /// Uses the precomputed reciprocal direction to avoid per-node divides.
    ///
    /// * `ray`        - The ray.
    /// * `inv_dir`    - Reciprocal of the ray direction.
    /// * `dir_is_neg` - 1 per axis where the direction is negative.
    pub fn intersect_p_inv(&self, ray: &Ray, inv_dir: &Vector3f, dir_is_neg: [u8; 3]) -> bool {
        let (mut t_min, mut t_max) = (0.0 as Float, ray.t_max);

        for axis in [Axis::X, Axis::Y, Axis::Z] {
            let (near, far) = if dir_is_neg[axis as usize] == 1 {
                (self.p_max[axis], self.p_min[axis])
            } else {
                (self.p_min[axis], self.p_max[axis])
            };
            let t_near = (near - ray.o[axis]) * inv_dir[axis];
            // Pad the far intersection to stay conservative under rounding.
            let t_far = (far - ray.o[axis]) * inv_dir[axis] * (1.0 + 2.0 * gamma(3));

            t_min = max(t_min, t_near);
            t_max = min(t_max, t_far);
            if t_min > t_max {
                return false;
            }
        }

        true
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
