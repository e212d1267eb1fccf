//! boat.rs — True vehicle state and dynamics
//!
//! `TrueSailboat` is the ground-truth boat the environment owns. Agents
//! never see its fields directly; they get independently-noised copies via
//! `provide_measurements` / `measure_rudder`, and influence it only through
//! `update_controls` deltas.
//!
//! The speed model is a stalling cosine-Gaussian polar diagram: maximum
//! speed on a dead run, near-zero (negative = stalled) close to
//! head-to-wind. A negative model speed is a stall signal, not reverse
//! motion; the stalled boat rotates in place instead of translating.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use sail_types::{normalize_angle, Polar};

use crate::config::{BoatConfig, ErrorConfig};
use crate::wind::Wind;

/// Control deltas requested by an agent for one tick. A zero delta means
/// "no actuation request", not "request angle zero".
#[derive(Debug, Clone, Copy, Default)]
pub struct BoatAction {
    pub boom_delta: f64,
    pub rudder_delta: f64,
}

/// Boat speed through water from the polar-diagram model.
///
/// `relative_wind_angle` is heading minus wind direction, normalized; zero
/// is a dead run. The `stall_range` offset drives the result negative in
/// the no-go zone. Shared with the planner's velocity-made-good objective.
pub fn calculate_speed(relative_wind_angle: f64, wind_speed: f64, max_speed_ratio: f64) -> f64 {
    let max_speed = max_speed_ratio * wind_speed;
    let stall_range = 0.05 * max_speed;
    (max_speed + stall_range) * (-relative_wind_angle.powi(2) / 2.0).exp() - stall_range
}

#[derive(Debug, Clone, Copy)]
pub struct BoatParams {
    pub max_rudder: f64,
    pub max_speed_ratio: f64,
    pub momentum_limit: f64,
    pub momentum_threshold: f64,
    pub rudder_authority: f64,
    pub stall_rotation_rate: f64,
    pub boom_control_error: f64,
    pub rudder_control_error: f64,
    pub rudder_measure_error: f64,
    pub location_radius_error: f64,
    pub location_bearing_error: f64,
    pub heading_error: f64,
    pub speed_error: f64,
}

impl BoatParams {
    pub fn from_config(boat: &BoatConfig, errors: &ErrorConfig) -> Self {
        Self {
            max_rudder: boat.max_rudder(),
            max_speed_ratio: boat.max_speed_ratio,
            momentum_limit: boat.momentum_limit,
            momentum_threshold: boat.momentum_threshold,
            rudder_authority: boat.rudder_authority,
            stall_rotation_rate: boat.stall_rotation_rate,
            boom_control_error: errors.boom_control_error(),
            rudder_control_error: errors.rudder_control_error(),
            rudder_measure_error: errors.rudder_measure_error(),
            location_radius_error: errors.location_radius_error,
            location_bearing_error: errors.location_bearing_error(),
            heading_error: errors.heading_error(),
            speed_error: errors.speed_error,
        }
    }
}

#[derive(Debug)]
pub struct TrueSailboat {
    pub location: Polar,
    pub heading: f64,
    pub rudder: f64,
    pub boom: f64,
    pub speed: f64,
    pub relative_wind_angle: f64,
    previous_speed: f64,
    params: BoatParams,
}

impl TrueSailboat {
    pub fn new(location: Polar, heading: f64, params: BoatParams) -> Self {
        Self {
            location,
            heading: normalize_angle(heading),
            rudder: 0.0,
            boom: 0.0,
            speed: 0.0,
            relative_wind_angle: 0.0,
            previous_speed: 0.0,
            params,
        }
    }

    /// Apply requested control deltas plus Gaussian actuation noise.
    pub fn update_controls(&mut self, action: BoatAction, rng: &mut impl Rng) {
        if action.boom_delta != 0.0 {
            let noise = Normal::new(0.0, self.params.boom_control_error).unwrap();
            self.boom = normalize_angle(self.boom + action.boom_delta + noise.sample(rng));
        }
        if action.rudder_delta != 0.0 {
            let noise = Normal::new(0.0, self.params.rudder_control_error).unwrap();
            let rudder = normalize_angle(self.rudder + action.rudder_delta + noise.sample(rng));
            self.rudder = rudder.clamp(-self.params.max_rudder, self.params.max_rudder);
        }
    }

    /// Advance physics one tick under the current wind.
    pub fn update(&mut self, wind: Wind) {
        self.relative_wind_angle = normalize_angle(self.heading - wind.direction);

        let mut speed =
            calculate_speed(self.relative_wind_angle, wind.speed, self.params.max_speed_ratio);

        // Momentum clamp: the cosine model is discontinuous across tacks;
        // bound the per-tick speed change once the boat is moving.
        if self.previous_speed > self.params.momentum_threshold {
            let max_delta = self.params.momentum_limit * self.previous_speed;
            speed = speed.clamp(self.previous_speed - max_delta, self.previous_speed + max_delta);
        }

        if speed <= 0.0 {
            // Stalled in irons: the bow gets blown off toward downwind
            // instead of the boat translating.
            let turn = self.params.stall_rotation_rate * wind.speed;
            self.heading =
                normalize_angle(self.heading - self.relative_wind_angle.signum() * turn);
            self.speed = 0.0;
            self.previous_speed = 0.0;
            return;
        }

        self.heading =
            normalize_angle(self.heading + self.rudder * self.params.rudder_authority);
        self.speed = speed;
        // speed > 0 here; a negative radius must never reach polar addition
        self.location = self.location.add(Polar::new(speed.max(0.0), self.heading));
        self.previous_speed = speed;
    }

    /// Noisy sensor snapshot: (location, heading, speed). Each channel is
    /// perturbed independently; true state is untouched.
    pub fn provide_measurements(&self, rng: &mut impl Rng) -> (Polar, f64, f64) {
        let p = &self.params;
        let radius_scale = Normal::new(1.0, p.location_radius_error).unwrap();
        let bearing_offset = Normal::new(0.0, p.location_bearing_error).unwrap();
        let heading_offset = Normal::new(0.0, p.heading_error).unwrap();
        let speed_scale = Normal::new(1.0, p.speed_error).unwrap();

        let location = Polar::new(
            (self.location.radius * radius_scale.sample(rng)).max(0.0),
            self.location.angle + bearing_offset.sample(rng),
        );
        let heading = normalize_angle(self.heading + heading_offset.sample(rng));
        let speed = (self.speed * speed_scale.sample(rng)).max(0.0);
        (location, heading, speed)
    }

    pub fn measure_rudder(&self, rng: &mut impl Rng) -> f64 {
        let noise = Normal::new(0.0, self.params.rudder_measure_error).unwrap();
        normalize_angle(self.rudder + noise.sample(rng))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};
    use std::f64::consts::PI;

    fn params() -> BoatParams {
        BoatParams {
            max_rudder: 85f64.to_radians(),
            max_speed_ratio: 0.5,
            momentum_limit: 0.2,
            momentum_threshold: 0.1,
            rudder_authority: 1.0,
            stall_rotation_rate: 0.01,
            boom_control_error: 0.0,
            rudder_control_error: 0.0,
            rudder_measure_error: 0.0,
            location_radius_error: 0.0,
            location_bearing_error: 0.0,
            heading_error: 0.0,
            speed_error: 0.0,
        }
    }

    #[test]
    fn speed_model_peaks_downwind_and_stalls_upwind() {
        let downwind = calculate_speed(0.0, 15.0, 0.5);
        assert_relative_eq!(downwind, 0.5 * 15.0, epsilon = 1e-9);
        let upwind = calculate_speed(PI, 15.0, 0.5);
        assert!(upwind < 0.0, "head-to-wind must stall, got {upwind}");
        // reaching is between the two
        let reach = calculate_speed(PI / 2.0, 15.0, 0.5);
        assert!(reach > 0.0 && reach < downwind);
    }

    #[test]
    fn stalled_boat_rotates_instead_of_translating() {
        let mut boat = TrueSailboat::new(Polar::new(50.0, 0.0), 0.0, params());
        // wind dead against the bow
        let wind = Wind { speed: 15.0, direction: normalize_angle(PI) };
        let start = boat.location;
        boat.update(wind);
        assert_eq!(boat.speed, 0.0);
        assert_eq!(boat.location, start);
        assert!(boat.heading != 0.0, "bow should be blown off the wind");
    }

    #[test]
    fn momentum_clamp_bounds_speed_change() {
        let mut boat = TrueSailboat::new(Polar::new(50.0, 0.0), 0.0, params());
        let run = Wind { speed: 15.0, direction: 0.0 };
        boat.update(run); // reaches full downwind speed immediately from rest
        let fast = boat.speed;
        assert!(fast > 1.0);
        // turn hard toward the wind; the raw model speed collapses but the
        // clamp only lets it fall 20% per tick
        boat.rudder = 2.0;
        boat.update(run); // heading swings after this tick's speed is computed
        boat.update(run);
        let raw = calculate_speed(boat.relative_wind_angle, run.speed, 0.5);
        assert!(raw < fast * 0.5, "test setup: raw speed should have collapsed");
        assert_relative_eq!(boat.speed, fast * 0.8, epsilon = 1e-9);
    }

    #[test]
    fn rudder_clamps_and_zero_delta_leaves_controls() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut boat = TrueSailboat::new(Polar::new(0.0, 0.0), 0.0, params());
        boat.update_controls(BoatAction { boom_delta: 0.0, rudder_delta: 3.0 }, &mut rng);
        assert_relative_eq!(boat.rudder, 85f64.to_radians());
        let before = boat.rudder;
        boat.update_controls(BoatAction::default(), &mut rng);
        assert_eq!(boat.rudder, before);
        assert_eq!(boat.boom, 0.0);
    }

    #[test]
    fn zero_noise_measurements_match_truth() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut boat = TrueSailboat::new(Polar::new(40.0, 1.0), 0.3, params());
        boat.update(Wind { speed: 10.0, direction: 0.3 });
        let (loc, heading, speed) = boat.provide_measurements(&mut rng);
        assert_relative_eq!(loc.radius, boat.location.radius, epsilon = 1e-9);
        assert_relative_eq!(loc.angle, boat.location.angle, epsilon = 1e-9);
        assert_relative_eq!(heading, boat.heading, epsilon = 1e-9);
        assert_relative_eq!(speed, boat.speed, epsilon = 1e-9);
    }
}
