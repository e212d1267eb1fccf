//! # sail-types
//!
//! Shared geometry value types for the sailboat racing simulation.
//!
//! These types are used by:
//! - `sail-simulator`: vehicle dynamics, course layout, planning, steering
//! - any external driver that wants to inspect positions and plans
//!
//! ## Coordinate Conventions
//!
//! - **Course frame**: polar `(radius, angle)` about the course center;
//!   angles in radians, normalized to `(-pi, pi]`, zero pointing east,
//!   positive counter-clockwise
//! - **Cartesian frame**: the same plane as `(x, y)`; used for anything
//!   linear (Kalman state, tack-vector decomposition, projections)
//!
//! A polar vector with radius exactly `0.0` has no meaningful direction;
//! its angle is `0.0` by convention (`atan2(0, 0)`), never NaN. Crossing
//! gates reuse that convention: a segment of length `0.0` is an unbounded
//! ray.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use thiserror::Error;

/// Determinant threshold below which a 2x2 system is treated as singular.
pub const DEGENERATE_EPS: f64 = 1e-9;

// ── Errors ────────────────────────────────────────────────────────────────────

/// Geometry precondition violations. These indicate a malformed course or
/// plan (zero-length legs, parallel decomposition vectors) and are surfaced
/// loudly rather than returning a silently wrong answer.
#[derive(Debug, Error, PartialEq)]
pub enum GeometryError {
    #[error("2x2 system is singular (|det| = {det:.3e})")]
    SingularSystem { det: f64 },
    #[error("segment has zero length")]
    ZeroLengthSegment,
}

// ── Angles ────────────────────────────────────────────────────────────────────

/// Normalize an angle into `(-pi, pi]`.
pub fn normalize_angle(angle: f64) -> f64 {
    let mut a = angle;
    while a <= -PI {
        a += 2.0 * PI;
    }
    while a > PI {
        a -= 2.0 * PI;
    }
    a
}

// ── Vectors ───────────────────────────────────────────────────────────────────

/// 2D vector in polar form. Radius is non-negative; the angle of a
/// zero-radius vector is `0.0` by convention.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Polar {
    pub radius: f64,
    pub angle: f64,
}

/// 2D vector in Cartesian form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Cartesian {
    pub x: f64,
    pub y: f64,
}

impl Polar {
    pub fn new(radius: f64, angle: f64) -> Self {
        Self { radius, angle: normalize_angle(angle) }
    }

    pub fn to_cartesian(self) -> Cartesian {
        Cartesian {
            x: self.radius * self.angle.cos(),
            y: self.radius * self.angle.sin(),
        }
    }

    /// Polar vector addition, via the Cartesian plane.
    pub fn add(self, other: Polar) -> Polar {
        self.to_cartesian().add(other.to_cartesian()).to_polar()
    }

    /// Polar vector subtraction: `self - other`.
    pub fn sub(self, other: Polar) -> Polar {
        self.to_cartesian().sub(other.to_cartesian()).to_polar()
    }
}

impl Cartesian {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn to_polar(self) -> Polar {
        Polar {
            radius: (self.x * self.x + self.y * self.y).sqrt(),
            // atan2(0, 0) == 0 — the zero vector's conventional angle
            angle: self.y.atan2(self.x),
        }
    }

    pub fn add(self, other: Cartesian) -> Cartesian {
        Cartesian::new(self.x + other.x, self.y + other.y)
    }

    pub fn sub(self, other: Cartesian) -> Cartesian {
        Cartesian::new(self.x - other.x, self.y - other.y)
    }

    pub fn scale(self, s: f64) -> Cartesian {
        Cartesian::new(self.x * s, self.y * s)
    }

    pub fn dot(self, other: Cartesian) -> f64 {
        self.x * other.x + self.y * other.y
    }

    /// 2D cross product (z component of the 3D cross).
    pub fn cross(self, other: Cartesian) -> f64 {
        self.x * other.y - self.y * other.x
    }

    pub fn norm(self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }
}

/// Unit vector for a bearing.
pub fn unit(bearing: f64) -> Cartesian {
    Cartesian::new(bearing.cos(), bearing.sin())
}

// ── Segments and intersection ─────────────────────────────────────────────────

/// A directed segment (or unbounded ray) in the course frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Start point, in course-frame polar coordinates.
    pub origin: Polar,
    /// Direction of travel.
    pub bearing: f64,
    /// Length along the bearing. `0.0` means unbounded ("any distance").
    pub length: f64,
}

impl Segment {
    pub fn new(origin: Polar, bearing: f64, length: f64) -> Self {
        Self { origin, bearing: normalize_angle(bearing), length }
    }

    /// Segment between two course-frame points.
    pub fn between(from: Polar, to: Polar) -> Self {
        let diff = to.sub(from);
        Self { origin: from, bearing: diff.angle, length: diff.radius }
    }
}

/// Test whether two segments/rays intersect.
///
/// Solves `o_a + t*d_a == o_b + u*d_b` for `(t, u)` and checks both
/// parameters against their segment bounds. Parallel segments never
/// intersect here; a course that depends on a collinear graze is malformed
/// and callers guard against it upstream.
pub fn intersect(a: &Segment, b: &Segment) -> bool {
    let oa = a.origin.to_cartesian();
    let ob = b.origin.to_cartesian();
    let da = unit(a.bearing);
    let db = unit(b.bearing);

    // t*da - u*db = ob - oa
    let rhs = ob.sub(oa);
    let det = db.x * da.y - da.x * db.y;
    if det.abs() < DEGENERATE_EPS {
        return false;
    }
    let t = (rhs.y * db.x - rhs.x * db.y) / det;
    let u = (da.x * rhs.y - da.y * rhs.x) / det;

    let within = |param: f64, length: f64| -> bool {
        param >= -DEGENERATE_EPS && (length == 0.0 || param <= length + DEGENERATE_EPS)
    };
    within(t, a.length) && within(u, b.length)
}

// ── 2x2 linear solve ──────────────────────────────────────────────────────────

/// Solve `m * x = rhs` by Cramer's rule.
///
/// Errors on a near-singular matrix instead of producing a wildly scaled
/// answer; in tack decomposition that means the two tack vectors are
/// (anti)parallel, which a well-formed plan never produces.
pub fn solve_2x2(m: [[f64; 2]; 2], rhs: [f64; 2]) -> Result<[f64; 2], GeometryError> {
    let det = m[0][0] * m[1][1] - m[0][1] * m[1][0];
    if det.abs() < DEGENERATE_EPS {
        return Err(GeometryError::SingularSystem { det });
    }
    Ok([
        (rhs[0] * m[1][1] - m[0][1] * rhs[1]) / det,
        (m[0][0] * rhs[1] - rhs[0] * m[1][0]) / det,
    ])
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn normalize_is_idempotent_and_in_range() {
        for i in -20..=20 {
            let a = i as f64 * 0.7;
            let n = normalize_angle(a);
            assert!(n > -PI && n <= PI, "out of range: {n}");
            assert_relative_eq!(normalize_angle(n), n);
        }
    }

    #[test]
    fn normalize_mod_two_pi() {
        for k in -3i32..=3 {
            let a = 1.234 + k as f64 * 2.0 * PI;
            assert_relative_eq!(normalize_angle(a), normalize_angle(1.234), epsilon = 1e-9);
        }
        // boundary: pi maps to pi, -pi maps to pi
        assert_relative_eq!(normalize_angle(PI), PI);
        assert_relative_eq!(normalize_angle(-PI), PI);
    }

    #[test]
    fn polar_add_sub_round_trip() {
        let cases = [
            (Polar::new(3.0, 0.4), Polar::new(1.5, -2.0)),
            (Polar::new(10.0, 3.0), Polar::new(10.0, -3.0)),
            (Polar::new(0.2, 1.0), Polar::new(5.0, 2.9)),
        ];
        for (v1, v2) in cases {
            let back = v1.add(v2).sub(v2);
            assert_relative_eq!(back.radius, v1.radius, epsilon = 1e-9);
            assert_relative_eq!(
                normalize_angle(back.angle - v1.angle),
                0.0,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn zero_vector_angle_is_zero() {
        let z = Cartesian::new(0.0, 0.0).to_polar();
        assert_eq!(z.radius, 0.0);
        assert_eq!(z.angle, 0.0);
    }

    #[test]
    fn crossing_segments_intersect() {
        let a = Segment::new(Polar::new(0.0, 0.0), 0.0, 1.0);
        let b = Segment::new(Polar::new(1.0, -PI / 4.0), PI / 2.0, 1.0);
        assert!(intersect(&a, &b));
    }

    #[test]
    fn parallel_segments_do_not_intersect() {
        let a = Segment::new(Polar::new(0.0, 0.0), 0.0, 1.0);
        let b = Segment::new(Polar::new(1.0, -PI / 4.0), 0.0, 1.0);
        assert!(!intersect(&a, &b));
    }

    #[test]
    fn unbounded_ray_intersects_far_segment() {
        // ray east from origin, segment crossing it at x = 50
        let ray = Segment::new(Polar::new(0.0, 0.0), 0.0, 0.0);
        let far = Segment::between(
            Cartesian::new(50.0, -1.0).to_polar(),
            Cartesian::new(50.0, 1.0).to_polar(),
        );
        assert!(intersect(&ray, &far));
    }

    #[test]
    fn short_segment_misses_far_crossing() {
        let short = Segment::new(Polar::new(0.0, 0.0), 0.0, 10.0);
        let far = Segment::between(
            Cartesian::new(50.0, -1.0).to_polar(),
            Cartesian::new(50.0, 1.0).to_polar(),
        );
        assert!(!intersect(&short, &far));
    }

    #[test]
    fn solve_2x2_recovers_known_solution() {
        let m = [[2.0, 1.0], [1.0, 3.0]];
        // x = [1, 2]
        let rhs = [4.0, 7.0];
        let x = solve_2x2(m, rhs).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(x[1], 2.0, epsilon = 1e-12);
    }

    #[test]
    fn solve_2x2_rejects_singular() {
        let m = [[1.0, 2.0], [2.0, 4.0]];
        assert!(matches!(
            solve_2x2(m, [1.0, 2.0]),
            Err(GeometryError::SingularSystem { .. })
        ));
    }
}
