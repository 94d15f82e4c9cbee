//! Scene triangles.

use crate::core::common::*;
use crate::core::geometry::*;
use crate::core::spectrum::Spectrum;

/// A scene triangle with per-vertex normals and material channels.
///
/// The radiosity transport reads the `diffuse` channel as the reflectance ρ
/// and the `emissive` channel as the emission E. The remaining channels are
/// carried through subdivision for downstream shading.
#[derive(Clone, Debug, PartialEq)]
pub struct Triangle {
    /// The corner vertices.
    pub vertices: [Point3f; 3],

    /// Per-vertex shading normals.
    pub normals: [Normal3f; 3],

    /// Ambient material channel.
    pub ambient: Spectrum,

    /// Diffuse material channel (reflectance ρ).
    pub diffuse: Spectrum,

    /// Emissive material channel (emission E).
    pub emissive: Spectrum,

    /// Reflective material channel.
    pub reflective: Spectrum,

    /// Scalar reflectivity.
    pub reflectivity: Float,
}

impl Triangle {
    /// Creates a new triangle.
    ///
    /// * `vertices`     - The corner vertices.
    /// * `normals`      - Per-vertex shading normals.
    /// * `ambient`      - Ambient material channel.
    /// * `diffuse`      - Diffuse material channel (reflectance ρ).
    /// * `emissive`     - Emissive material channel (emission E).
    /// * `reflective`   - Reflective material channel.
    /// * `reflectivity` - Scalar reflectivity.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        vertices: [Point3f; 3],
        normals: [Normal3f; 3],
        ambient: Spectrum,
        diffuse: Spectrum,
        emissive: Spectrum,
        reflective: Spectrum,
        reflectivity: Float,
    ) -> Self {
        Self {
            vertices,
            normals,
            ambient,
            diffuse,
            emissive,
            reflective,
            reflectivity,
        }
    }

    /// Creates a matte triangle with the geometric normal at every vertex.
    ///
    /// * `vertices` - The corner vertices.
    /// * `diffuse`  - Diffuse material channel (reflectance ρ).
    /// * `emissive` - Emissive material channel (emission E).
    pub fn matte(vertices: [Point3f; 3], diffuse: Spectrum, emissive: Spectrum) -> Self {
        let n = geometric_normal(&vertices);
        Self::new(
            vertices,
            [n; 3],
            Spectrum::default(),
            diffuse,
            emissive,
            Spectrum::default(),
            0.0,
        )
    }

    /// Returns the surface area.
    pub fn area(&self) -> Float {
        let e1 = self.vertices[1] - self.vertices[0];
        let e2 = self.vertices[2] - self.vertices[0];
        0.5 * e1.cross(&e2).length()
    }

    /// Returns the centroid.
    pub fn midpoint(&self) -> Point3f {
        let [a, b, c] = self.vertices;
        Point3f::new(
            (a.x + b.x + c.x) / 3.0,
            (a.y + b.y + c.y) / 3.0,
            (a.z + b.z + c.z) / 3.0,
        )
    }

    /// Returns the unit geometric normal. Winding is counter-clockwise.
    pub fn normal(&self) -> Normal3f {
        geometric_normal(&self.vertices)
    }

    /// Returns the bounding box in world space.
    pub fn bounds(&self) -> Bounds3f {
        Bounds3f::new(self.vertices[0], self.vertices[1]).union_point(&self.vertices[2])
    }

    /// Returns the distance along the ray at which it intersects the triangle,
    /// if the intersection lies in `(0, ray.t_max)`. Möller-Trumbore.
    ///
    /// * `ray` - The ray.
    pub fn intersect(&self, ray: &Ray) -> Option<Float> {
        let [v0, v1, v2] = self.vertices;
        let e1 = v1 - v0;
        let e2 = v2 - v0;

        let p = ray.d.cross(&e2);
        let det = e1.dot(&p);
        if abs(det) < 1e-9 {
            // Ray parallel to the triangle's plane.
            return None;
        }

        let inv_det = 1.0 / det;
        let s = ray.o - v0;
        let u = s.dot(&p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            return None;
        }

        let q = s.cross(&e1);
        let v = ray.d.dot(&q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            return None;
        }

        let t = e2.dot(&q) * inv_det;
        if t <= 1e-6 || t >= ray.t_max {
            return None;
        }

        Some(t)
    }
}

/// Returns the unit geometric normal of a counter-clockwise vertex triple.
///
/// * `vertices` - The corner vertices.
fn geometric_normal(vertices: &[Point3f; 3]) -> Normal3f {
    let e1 = vertices[1] - vertices[0];
    let e2 = vertices[2] - vertices[0];
    Normal3f::from(e1.cross(&e2).normalize())
}

/// Returns the solid angle subtended by a triangle viewed from a point, via
/// the spherical-excess formula of Van Oosterom and Strackee. The result is
/// in `[0, 2π]`; a point in the plane of the triangle yields 0.
///
/// * `x`   - The viewing point.
/// * `tri` - The triangle.
pub fn solid_angle(x: &Point3f, tri: &Triangle) -> Float {
    let a = tri.vertices[0] - *x;
    let b = tri.vertices[1] - *x;
    let c = tri.vertices[2] - *x;

    let la = a.length();
    let lb = b.length();
    let lc = c.length();

    let numerator = a.dot(&b.cross(&c));
    let denominator =
        la * lb * lc + a.dot(&b) * lc + a.dot(&c) * lb + b.dot(&c) * la;

    if numerator == 0.0 {
        // The viewing point lies in the plane of the triangle.
        return 0.0;
    }

    // atan2 of the unsigned excess keeps the result in [0, 2π]; a negative
    // denominator corresponds to an angle past π.
    2.0 * abs(numerator).atan2(denominator)
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::approx_eq;

    fn unit_right_triangle() -> Triangle {
        Triangle::matte(
            [
                Point3f::new(0.0, 0.0, 0.0),
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
            ],
            Spectrum::new(0.5),
            Spectrum::default(),
        )
    }

    #[test]
    fn area_of_unit_right_triangle() {
        assert!(approx_eq!(f32, unit_right_triangle().area(), 0.5, ulps = 2));
    }

    #[test]
    fn normal_of_ccw_triangle_points_up() {
        let n = unit_right_triangle().normal();
        assert!(approx_eq!(f32, n.z, 1.0, epsilon = 1e-6));
    }

    #[test]
    fn midpoint_is_vertex_average() {
        let m = unit_right_triangle().midpoint();
        assert!(approx_eq!(f32, m.x, 1.0 / 3.0, epsilon = 1e-6));
        assert!(approx_eq!(f32, m.y, 1.0 / 3.0, epsilon = 1e-6));
        assert_eq!(m.z, 0.0);
    }

    #[test]
    fn ray_through_interior_intersects() {
        let tri = unit_right_triangle();
        let ray = Ray::new(
            Point3f::new(0.25, 0.25, 1.0),
            Vector3f::new(0.0, 0.0, -1.0),
            INFINITY,
        );
        let t = tri.intersect(&ray).expect("expected a hit");
        assert!(approx_eq!(f32, t, 1.0, epsilon = 1e-5));
    }

    #[test]
    fn ray_past_edge_misses() {
        let tri = unit_right_triangle();
        let ray = Ray::new(
            Point3f::new(0.75, 0.75, 1.0),
            Vector3f::new(0.0, 0.0, -1.0),
            INFINITY,
        );
        assert!(tri.intersect(&ray).is_none());
    }

    #[test]
    fn intersection_beyond_t_max_is_ignored() {
        let tri = unit_right_triangle();
        let ray = Ray::new(
            Point3f::new(0.25, 0.25, 1.0),
            Vector3f::new(0.0, 0.0, -1.0),
            0.5,
        );
        assert!(tri.intersect(&ray).is_none());
    }

    #[test]
    fn solid_angle_of_octant_is_half_pi() {
        // The triangle spanning the positive axes' unit points covers exactly
        // one octant of the sphere around the origin: 4π / 8.
        let tri = Triangle::matte(
            [
                Point3f::new(1.0, 0.0, 0.0),
                Point3f::new(0.0, 1.0, 0.0),
                Point3f::new(0.0, 0.0, 1.0),
            ],
            Spectrum::new(0.5),
            Spectrum::default(),
        );
        let omega = solid_angle(&Point3f::zero(), &tri);
        assert!(approx_eq!(f32, omega, PI / 2.0, epsilon = 1e-5));
    }

    #[test]
    fn solid_angle_from_coplanar_point_is_zero() {
        let tri = unit_right_triangle();
        assert_eq!(solid_angle(&Point3f::new(5.0, 5.0, 0.0), &tri), 0.0);
    }

    #[test]
    fn solid_angle_shrinks_with_distance() {
        let tri = unit_right_triangle();
        let near = solid_angle(&Point3f::new(0.33, 0.33, 1.0), &tri);
        let far = solid_angle(&Point3f::new(0.33, 0.33, 4.0), &tri);
        assert!(near > far);
        assert!(far > 0.0);
    }
}
