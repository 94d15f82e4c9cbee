//! Form factors between scene triangles.

use crate::accelerators::{BVHAccel, TriangleId};
use crate::core::common::*;
use crate::core::geometry::*;
use crate::core::rng::RNG;
use crate::core::triangle::{solid_angle, Triangle};

/// The form factor integrator draws `STRATA × STRATA` sample pairs, jittered
/// within a grid over the first barycentric dimension of either triangle.
const STRATA: usize = 16;

/// Number of sample pairs for the Monte-Carlo form factor integrator.
const FORM_FACTOR_SAMPLES: usize = STRATA * STRATA;

/// Shadow rays stop short of the receiving sample point by this fraction of
/// the distance so the target surface does not occlude itself.
const SHADOW_EPSILON: Float = 1e-3;

/// Returns a cheap upper-bound estimate of the form factor from `p` to `q`,
/// used only to decide subdivision: the cosine at `p`'s midpoint times the
/// solid angle `q` subtends there, over π. No visibility is considered.
///
/// * `p` - The gathering triangle.
/// * `q` - The shooting triangle.
pub fn estimate_form_factor(p: &Triangle, q: &Triangle) -> Float {
    let p_midpoint = p.midpoint();
    let q_midpoint = q.midpoint();

    let to_q = q_midpoint - p_midpoint;
    if to_q.length_squared() == 0.0 {
        // Coincident midpoints subtend no resolvable direction.
        return 0.0;
    }

    let cos_theta = p.normal().dot(&to_q.normalize());
    debug_assert!(!cos_theta.is_nan());
    if cos_theta <= 0.0 {
        return 0.0;
    }

    let omega_q = solid_angle(&p_midpoint, q);
    cos_theta * omega_q * INV_PI
}

/// Returns the form factor from `p` to `q`, averaged over sample point pairs
/// with occlusion checked against the scene. A sample pair contributes only
/// when the segment between the points is unobstructed; surfaces belonging to
/// `q_root_id` do not count as obstructions, since subdivided patches of the
/// shooter are coplanar with it.
///
/// Sampling is seeded per call so repeated runs produce identical links.
///
/// * `p`         - The gathering triangle.
/// * `q`         - The shooting triangle.
/// * `accel`     - The scene accelerator answering visibility queries.
/// * `q_root_id` - Id of the scene triangle `q` descends from.
/// * `seed`      - RNG sequence seed.
pub fn form_factor(
    accel: &BVHAccel,
    p: &Triangle,
    q: &Triangle,
    q_root_id: TriangleId,
    seed: u64,
) -> Float {
    let mut rng = RNG::new(seed);
    let n_p = p.normal();
    let n_q = q.normal();

    let mut sum = 0.0;
    for stratum in 0..FORM_FACTOR_SAMPLES {
        let u1p = ((stratum / STRATA) as Float + rng.uniform_float()) / STRATA as Float;
        let u1q = ((stratum % STRATA) as Float + rng.uniform_float()) / STRATA as Float;
        let xp = sample_triangle(p, u1p, rng.uniform_float());
        let xq = sample_triangle(q, u1q, rng.uniform_float());

        let w = xq - xp;
        let r2 = w.length_squared();
        if r2 < 1e-12 {
            continue;
        }
        let dist = r2.sqrt();
        let dir = w / dist;

        let cos_p = n_p.dot(&dir);
        let cos_q = -n_q.dot(&dir);
        if cos_p <= 0.0 || cos_q <= 0.0 {
            continue;
        }

        let shadow_ray = Ray::new(xp, dir, dist * (1.0 - SHADOW_EPSILON));
        if occluded(accel, shadow_ray, q_root_id) {
            continue;
        }

        sum += cos_p * cos_q / (PI * r2);
    }

    let factor = sum / FORM_FACTOR_SAMPLES as Float * q.area();
    debug_assert!(factor >= 0.0 && !factor.is_nan());
    factor
}

/// Returns true if any surface other than the target's root triangle blocks
/// the shadow ray.
///
/// * `ray`       - The shadow ray, with `t_max` just short of the target.
/// * `q_root_id` - Id of the target's root triangle.
fn occluded(accel: &BVHAccel, mut ray: Ray, q_root_id: TriangleId) -> bool {
    loop {
        // `intersect` shrinks `t_max` onto the hit, so keep the extent.
        let remaining = ray.t_max;
        match accel.intersect(&mut ray) {
            None => return false,
            Some((id, t)) => {
                if id != q_root_id {
                    return true;
                }
                // Grazing hit on the target's own root; look past it.
                if remaining - t <= 1e-6 {
                    return false;
                }
                ray = Ray::new(ray.at(t), ray.d, remaining - t);
            }
        }
    }
}

/// Returns a uniformly distributed point on a triangle.
///
/// * `tri` - The triangle.
/// * `u1`  - First uniform sample in [0, 1).
/// * `u2`  - Second uniform sample in [0, 1).
fn sample_triangle(tri: &Triangle, u1: Float, u2: Float) -> Point3f {
    let su = u1.sqrt();
    let b0 = 1.0 - su;
    let b1 = u2 * su;
    let b2 = 1.0 - b0 - b1;

    let [v0, v1, v2] = tri.vertices;
    Point3f::new(
        v0.x * b0 + v1.x * b1 + v2.x * b2,
        v0.y * b0 + v1.y * b1 + v2.y * b2,
        v0.z * b0 + v1.z * b1 + v2.z * b2,
    )
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::spectrum::Spectrum;

    /// Two triangles tiling the unit square at the given height, wound so the
    /// normal points along `flip * z`.
    fn square(z: Float, flip: Float) -> Vec<Triangle> {
        let p = |x, y| Point3f::new(x, y, z);
        let (a, b, c, d) = (p(0.0, 0.0), p(1.0, 0.0), p(1.0, 1.0), p(0.0, 1.0));
        let mk = |v| Triangle::matte(v, Spectrum::new(0.5), Spectrum::default());
        if flip > 0.0 {
            vec![mk([a, b, c]), mk([a, c, d])]
        } else {
            vec![mk([a, c, b]), mk([a, d, c])]
        }
    }

    fn square_to_square_form_factor(accel: &BVHAccel) -> Float {
        // Patch-to-patch factors area-averaged up to the full squares.
        let mut total = 0.0;
        let mut area = 0.0;
        for i in 0..2 {
            let mut to_other = 0.0;
            for j in 2..4 {
                to_other += form_factor(accel, &accel[i], &accel[j], j, (i * 4 + j) as u64);
            }
            total += accel[i].area() * to_other;
            area += accel[i].area();
        }
        total / area
    }

    #[test]
    fn estimate_is_zero_behind_the_patch() {
        let below = square(-1.0, 1.0);
        let facing_up = square(0.0, 1.0);
        assert_eq!(estimate_form_factor(&facing_up[0], &below[0]), 0.0);
    }

    #[test]
    fn estimate_is_positive_for_facing_patches() {
        let lower = square(0.0, 1.0);
        let upper = square(1.0, -1.0);
        let f = estimate_form_factor(&lower[0], &upper[0]);
        assert!(f > 0.0);
        assert!(!f.is_nan());
    }

    #[test]
    fn parallel_unit_squares_match_analytic_value() {
        // Closed form for coaxial parallel unit squares at unit distance.
        const ANALYTIC: Float = 0.199825;

        let mut tris = square(0.0, 1.0);
        tris.extend(square(1.0, -1.0));
        let accel = BVHAccel::new(tris, 4);

        let f = square_to_square_form_factor(&accel);
        assert!(
            (f - ANALYTIC).abs() < 0.05 * ANALYTIC,
            "estimated {} vs analytic {}",
            f,
            ANALYTIC
        );
    }

    #[test]
    fn reciprocity_holds_within_sampling_tolerance() {
        let mut tris = square(0.0, 1.0);
        tris.extend(square(1.0, -1.0));
        let accel = BVHAccel::new(tris, 4);

        let f_pq = form_factor(&accel, &accel[0], &accel[2], 2, 7);
        let f_qp = form_factor(&accel, &accel[2], &accel[0], 0, 11);
        let lhs = f_pq * accel[0].area();
        let rhs = f_qp * accel[2].area();
        assert!((lhs - rhs).abs() < 0.1 * lhs.max(rhs));
    }

    #[test]
    fn fully_occluded_shooter_has_zero_form_factor() {
        let mut tris = square(0.0, 1.0);
        tris.extend(square(1.0, -1.0));
        // A blocker spanning well past the squares, halfway between them.
        let p = |x: Float, y: Float| Point3f::new(x, y, 0.5);
        let (a, b, c, d) = (p(-2.0, -2.0), p(3.0, -2.0), p(3.0, 3.0), p(-2.0, 3.0));
        tris.push(Triangle::matte(
            [a, b, c],
            Spectrum::new(0.5),
            Spectrum::default(),
        ));
        tris.push(Triangle::matte(
            [a, c, d],
            Spectrum::new(0.5),
            Spectrum::default(),
        ));
        let accel = BVHAccel::new(tris, 4);

        assert_eq!(form_factor(&accel, &accel[0], &accel[2], 2, 3), 0.0);
    }

    #[test]
    fn form_factor_is_deterministic_per_seed() {
        let mut tris = square(0.0, 1.0);
        tris.extend(square(1.0, -1.0));
        let accel = BVHAccel::new(tris, 4);

        let a = form_factor(&accel, &accel[0], &accel[2], 2, 42);
        let b = form_factor(&accel, &accel[0], &accel[2], 2, 42);
        assert_eq!(a, b);
    }
}
