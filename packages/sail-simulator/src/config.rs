//! config.rs — Simulation parameters, loaded once from config.toml
//!
//! The whole parameter bag is immutable after load; the environment, the
//! vehicles and the agents each take the sections they need by reference at
//! construction time. Angles in the TOML file are degrees for readability
//! and converted to radians through the accessor methods here.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    pub simulation: SimulationConfig,
    pub wind: WindConfig,
    pub course: CourseConfig,
    pub errors: ErrorConfig,
    pub boat: BoatConfig,
    pub control: ControlConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimulationConfig {
    /// Step-count bound; the run terminates after this many ticks.
    pub max_steps: u64,
    pub nr_of_boats: usize,
    /// Console report every N ticks.
    pub report_interval: u64,
    pub print_boat_data: bool,
    pub print_boat_belief: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WindConfig {
    /// Pick a random prevailing wind instead of the configured one.
    pub random_prevailing: bool,
    pub prevailing_speed: f64,
    pub prevailing_direction_deg: f64,
    /// Speed bounds for a randomly chosen prevailing wind.
    pub speed_min: f64,
    pub speed_max: f64,
    pub speed_sigma: f64,
    pub direction_sigma_deg: f64,
    /// A wind change is spread across this many ticks. Integer, >= 1.
    pub change_rate_steps: u64,
}

impl WindConfig {
    pub fn prevailing_direction(&self) -> f64 {
        self.prevailing_direction_deg.to_radians()
    }
    pub fn direction_sigma(&self) -> f64 {
        self.direction_sigma_deg.to_radians()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CourseConfig {
    /// Radius extent of the course.
    pub course_range: f64,
    /// Intermediate marks, excluding the start and finish gates.
    pub num_course_marks: usize,
    /// Width of the start/finish gates, in distance units.
    pub gate_width: f64,
    /// Waypoint offset from a mark along its bisector crossing.
    pub mark_buffer_distance: f64,
    /// Corner smoothing offset; keep below mark_buffer_distance.
    pub smooth_distance: f64,
    pub smooth_corners: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorConfig {
    /// Location radius is scaled by Gaussian(1, this).
    pub location_radius_error: f64,
    pub location_bearing_error_deg: f64,
    /// Speed is scaled by Gaussian(1, this).
    pub speed_error: f64,
    pub heading_error_deg: f64,
    pub boom_control_error_deg: f64,
    pub rudder_control_error_deg: f64,
    pub rudder_measure_error_deg: f64,
}

impl ErrorConfig {
    pub fn location_bearing_error(&self) -> f64 {
        self.location_bearing_error_deg.to_radians()
    }
    pub fn heading_error(&self) -> f64 {
        self.heading_error_deg.to_radians()
    }
    pub fn boom_control_error(&self) -> f64 {
        self.boom_control_error_deg.to_radians()
    }
    pub fn rudder_control_error(&self) -> f64 {
        self.rudder_control_error_deg.to_radians()
    }
    pub fn rudder_measure_error(&self) -> f64 {
        self.rudder_measure_error_deg.to_radians()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct BoatConfig {
    /// Hull speed as a fraction of wind speed in the polar-diagram model.
    pub max_speed_ratio: f64,
    /// Per-tick speed change bound, as a fraction of the previous speed.
    pub momentum_limit: f64,
    /// Momentum clamping engages above this previous speed.
    pub momentum_threshold: f64,
    /// How strongly the rudder angle turns the heading per tick.
    pub rudder_authority: f64,
    /// Stalled-boat rotation, radians per tick per unit wind speed.
    pub stall_rotation_rate: f64,
    pub max_rudder_deg: f64,
}

impl BoatConfig {
    pub fn max_rudder(&self) -> f64 {
        self.max_rudder_deg.to_radians()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    /// Cross-track PID gains, radians of rudder per unit of offset.
    pub xte_kp_deg: f64,
    pub xte_kd_deg: f64,
    pub xte_ki_deg: f64,
    /// A leg is sailed direct when an optimal tack angle is within this of
    /// the direct bearing.
    pub direct_sail_tolerance_deg: f64,
    /// Waypoints bending the route less than this are elided.
    pub waypoint_skip_tolerance_deg: f64,
    /// Kalman measurement noise variance (x and y, Cartesian units^2).
    pub position_measurement_variance: f64,
    /// Initial velocity variance in the filter (position starts at zero).
    pub initial_velocity_variance: f64,
}

impl ControlConfig {
    pub fn xte_gains(&self) -> (f64, f64, f64) {
        (
            self.xte_kp_deg.to_radians(),
            self.xte_kd_deg.to_radians(),
            self.xte_ki_deg.to_radians(),
        )
    }
    pub fn direct_sail_tolerance(&self) -> f64 {
        self.direct_sail_tolerance_deg.to_radians()
    }
    pub fn waypoint_skip_tolerance(&self) -> f64 {
        self.waypoint_skip_tolerance_deg.to_radians()
    }
}

impl SimConfig {
    pub fn from_toml(raw: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bundled_config_parses() {
        let cfg = SimConfig::from_toml(include_str!("../config.toml")).unwrap();
        assert!(cfg.simulation.max_steps > 0);
        assert!(cfg.wind.change_rate_steps >= 1);
        assert!(cfg.course.smooth_distance < cfg.course.mark_buffer_distance);
        assert!(cfg.boat.max_rudder() > 0.0);
    }
}
