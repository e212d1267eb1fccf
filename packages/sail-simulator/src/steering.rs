//! steering.rs — Cross-track-error rudder law
//!
//! Tracks the current tacking leg by projecting the believed position onto
//! the leg line. A projection ratio past 1 completes the leg and advances
//! to the next one; a negative ratio means the boat is behind the leg
//! start, in which case it steers straight at the start instead of chasing
//! a cross-track offset that points the wrong way.
//!
//! The output is a rudder *delta*: the actuator interface takes relative
//! adjustments, so the desired rudder has the measured rudder subtracted.

use sail_types::{normalize_angle, GeometryError, Polar, DEGENERATE_EPS};

#[derive(Debug)]
pub struct CrossTrackPid {
    kp: f64,
    kd: f64,
    ki: f64,
    integral: f64,
    previous_offset: Option<f64>,
}

impl CrossTrackPid {
    pub fn new(kp: f64, kd: f64, ki: f64) -> Self {
        Self { kp, kd, ki, integral: 0.0, previous_offset: None }
    }

    /// Clear accumulated PID state; call when the leg changes.
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.previous_offset = None;
    }

    /// Compute the rudder delta for this tick, advancing `leg_index` past
    /// any legs the boat has already completed.
    pub fn steer(
        &mut self,
        location: Polar,
        heading: f64,
        route: &[Polar],
        leg_index: &mut usize,
        measured_rudder: f64,
    ) -> Result<f64, GeometryError> {
        loop {
            if *leg_index + 1 >= route.len() {
                // past the final leg: head straight for the route's end
                let target = match route.last() {
                    Some(p) => *p,
                    None => return Ok(0.0),
                };
                let desired = normalize_angle(target.sub(location).angle - heading);
                return Ok(normalize_angle(desired - measured_rudder));
            }

            let start = route[*leg_index].to_cartesian();
            let end = route[*leg_index + 1].to_cartesian();
            let leg = end.sub(start);
            let len_sq = leg.dot(leg);
            if len_sq < DEGENERATE_EPS {
                return Err(GeometryError::ZeroLengthSegment);
            }

            let offset_vec = location.to_cartesian().sub(start);
            let ratio = offset_vec.dot(leg) / len_sq;
            if ratio > 1.0 {
                *leg_index += 1;
                self.reset();
                continue;
            }
            if ratio < 0.0 {
                let desired =
                    normalize_angle(route[*leg_index].sub(location).angle - heading);
                return Ok(normalize_angle(desired - measured_rudder));
            }

            // signed perpendicular offset, positive left of the leg
            let offset = leg.cross(offset_vec) / len_sq.sqrt();
            let rate = offset - self.previous_offset.unwrap_or(offset);
            self.integral += offset;
            self.previous_offset = Some(offset);

            let desired = -offset * self.kp - rate * self.kd - self.integral * self.ki;
            return Ok(normalize_angle(desired - measured_rudder));
        }
    }
}
