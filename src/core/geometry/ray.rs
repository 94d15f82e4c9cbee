//! Rays

use super::{Point3f, Vector3f};
use crate::core::common::*;

/// A ray with origin, direction and a parametric extent.
#[derive(Copy, Clone, Debug)]
pub struct Ray {
    /// Origin.
    pub o: Point3f,

    /// Direction.
    pub d: Vector3f,

    /// Maximum extent of the ray. Intersection routines shrink this to the
    /// closest hit found so far.
    pub t_max: Float,
}

impl Ray {
    /// Creates a new ray.
    ///
    /// * `o`     - Origin.
    /// * `d`     - Direction.
    /// * `t_max` - Maximum extent of the ray.
    pub fn new(o: Point3f, d: Vector3f, t_max: Float) -> Self {
        Self { o, d, t_max }
    }

    /// Returns the point at the given parameter along the ray.
    ///
    /// * `t` - The parameter.
    pub fn at(&self, t: Float) -> Point3f {
        self.o + self.d * t
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_zero_is_origin() {
        let r = Ray::new(
            Point3f::new(1.0, 2.0, 3.0),
            Vector3f::new(0.0, 1.0, 0.0),
            INFINITY,
        );
        assert_eq!(r.at(0.0), r.o);
        assert_eq!(r.at(2.0), Point3f::new(1.0, 4.0, 3.0));
    }
}
