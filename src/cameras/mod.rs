//! Cameras

use crate::core::common::*;
use crate::core::geometry::*;

/// A pinhole camera used to project world points onto the raster when
/// overlaying diagnostics such as gather-links.
pub struct Camera {
    /// Camera position in world space.
    position: Point3f,

    /// Unit right axis of the camera frame.
    right: Vector3f,

    /// Unit up axis of the camera frame.
    up: Vector3f,

    /// Unit viewing direction.
    forward: Vector3f,

    /// Tangent of half the vertical field of view.
    tan_half_fov: Float,
}

impl Camera {
    /// Creates a new camera.
    ///
    /// * `position` - Camera position in world space.
    /// * `look_at`  - Point the camera is aimed at.
    /// * `up`       - Approximate up direction; re-orthogonalized.
    /// * `fov_y`    - Vertical field of view in degrees.
    pub fn new(position: Point3f, look_at: Point3f, up: Vector3f, fov_y: Float) -> Self {
        // Camera space is left-handed: x right, y up, z forward.
        let forward = (look_at - position).normalize();
        let right = up.cross(&forward).normalize();
        let up = forward.cross(&right);
        Self {
            position,
            right,
            up,
            forward,
            tan_half_fov: (fov_y.to_radians() * 0.5).tan(),
        }
    }

    /// Projects a world point onto the raster. Points behind the camera are
    /// pushed onto the near plane, which keeps the projection defined; the
    /// caller clips against the raster bounds.
    ///
    /// * `p`      - The world point.
    /// * `width`  - Raster width in pixels.
    /// * `height` - Raster height in pixels.
    pub fn cam2raster(&self, p: &Point3f, width: usize, height: usize) -> Point2i {
        let v = *p - self.position;
        let z = max(v.dot(&self.forward), 1e-6);
        let aspect = width as Float / height as Float;

        let sx = v.dot(&self.right) / (z * self.tan_half_fov * aspect);
        let sy = v.dot(&self.up) / (z * self.tan_half_fov);

        Point2i::new(
            ((sx + 1.0) * 0.5 * width as Float) as Int,
            ((1.0 - sy) * 0.5 * height as Float) as Int,
        )
    }

    /// Generates the viewing ray through the centre of a raster pixel; the
    /// inverse of `cam2raster`.
    ///
    /// * `x`      - Raster column.
    /// * `y`      - Raster row.
    /// * `width`  - Raster width in pixels.
    /// * `height` - Raster height in pixels.
    pub fn generate_ray(&self, x: usize, y: usize, width: usize, height: usize) -> Ray {
        let aspect = width as Float / height as Float;
        let sx = (x as Float + 0.5) / width as Float * 2.0 - 1.0;
        let sy = 1.0 - (y as Float + 0.5) / height as Float * 2.0;

        let d = self.right * (sx * self.tan_half_fov * aspect)
            + self.up * (sy * self.tan_half_fov)
            + self.forward;
        Ray::new(self.position, d.normalize(), INFINITY)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn test_camera() -> Camera {
        Camera::new(
            Point3f::new(0.0, 0.0, -5.0),
            Point3f::zero(),
            Vector3f::new(0.0, 1.0, 0.0),
            60.0,
        )
    }

    #[test]
    fn point_on_view_axis_projects_to_raster_centre() {
        let cam = test_camera();
        let p = cam.cam2raster(&Point3f::zero(), 200, 100);
        assert_eq!(p, Point2i::new(100, 50));
    }

    #[test]
    fn point_above_axis_projects_to_upper_half() {
        let cam = test_camera();
        let p = cam.cam2raster(&Point3f::new(0.0, 1.0, 0.0), 200, 100);
        assert_eq!(p.x, 100);
        assert!(p.y < 50);
    }

    #[test]
    fn point_right_of_axis_projects_to_right_half() {
        let cam = test_camera();
        let p = cam.cam2raster(&Point3f::new(1.0, 0.0, 0.0), 200, 100);
        assert!(p.x > 100);
        assert_eq!(p.y, 50);
    }

    #[test]
    fn generate_ray_inverts_cam2raster() {
        let cam = test_camera();
        let (w, h) = (200, 100);
        for (x, y) in [(10, 20), (100, 50), (180, 90)] {
            let ray = cam.generate_ray(x, y, w, h);
            let p = cam.cam2raster(&ray.at(3.0), w, h);
            assert!((p.x - x as Int).abs() <= 1);
            assert!((p.y - y as Int).abs() <= 1);
        }
    }
}
