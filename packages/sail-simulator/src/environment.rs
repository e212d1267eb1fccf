//! environment.rs — The world the boats sail in
//!
//! Owns the course, the wind model, every `TrueSailboat`, and the single
//! seedable RNG all noise is drawn from. One simulation tick is atomic:
//! the driver collects every agent's action first, then applies the whole
//! batch here, so physics order never leaks into per-tick decisions.
//!
//! Agents see the environment only through the three capability traits
//! below; true boat state stays private to the driver/reporting side.

use rand::{rngs::StdRng, SeedableRng};
use sail_types::{normalize_angle, Polar};
use std::f64::consts::PI;

use crate::boat::{BoatAction, BoatParams, TrueSailboat};
use crate::config::SimConfig;
use crate::course::Course;
use crate::wind::{Wind, WindModel};

/// Read-only course access for planners.
pub trait CourseView {
    fn course(&self) -> &Course;
}

/// Read-only wind access.
pub trait WindView {
    fn current_wind(&self) -> Wind;
}

/// Per-vehicle noisy sensor reads. `&mut self` because every read draws
/// fresh measurement noise.
pub trait MeasurementSource {
    fn provide_measurements(&mut self, boat_id: usize) -> (Polar, f64, f64);
    fn measure_rudder(&mut self, boat_id: usize) -> f64;
}

pub struct Environment {
    course: Course,
    wind: WindModel,
    boats: Vec<TrueSailboat>,
    rng: StdRng,
    boat_params: BoatParams,
    max_steps: u64,
}

impl Environment {
    pub fn new(cfg: &SimConfig, seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(seed);
        let course = Course::generate(&cfg.course, &mut rng);
        let wind = WindModel::new(&cfg.wind, &mut rng);
        Self {
            course,
            wind,
            boats: Vec::new(),
            rng,
            boat_params: BoatParams::from_config(&cfg.boat, &cfg.errors),
            max_steps: cfg.simulation.max_steps,
        }
    }

    /// Register a new boat at the start-gate midpoint, pointed into the
    /// course (opposite the gate's bearing from the course center).
    pub fn create_vehicle(&mut self) -> usize {
        let start = self.course.start_gate_midpoint();
        let heading = normalize_angle(start.angle + PI);
        self.boats.push(TrueSailboat::new(start, heading, self.boat_params));
        self.boats.len() - 1
    }

    /// Apply the batched control deltas, then advance physics for every
    /// boat under the current wind.
    pub fn step(&mut self, actions: &[BoatAction]) {
        let wind = self.wind.current();
        for (boat, action) in self.boats.iter_mut().zip(actions) {
            boat.update_controls(*action, &mut self.rng);
        }
        for boat in &mut self.boats {
            boat.update(wind);
        }
    }

    /// Recompute/interpolate the wind for this tick.
    pub fn advance_wind(&mut self, step: u64) {
        self.wind.advance(step, &mut self.rng);
    }

    pub fn is_finished(&self, step: u64) -> bool {
        step >= self.max_steps
    }

    /// Ground-truth access for the reporting layer only.
    pub fn boats(&self) -> &[TrueSailboat] {
        &self.boats
    }
}

impl CourseView for Environment {
    fn course(&self) -> &Course {
        &self.course
    }
}

impl WindView for Environment {
    fn current_wind(&self) -> Wind {
        self.wind.current()
    }
}

impl MeasurementSource for Environment {
    fn provide_measurements(&mut self, boat_id: usize) -> (Polar, f64, f64) {
        self.boats[boat_id].provide_measurements(&mut self.rng)
    }
    fn measure_rudder(&mut self, boat_id: usize) -> f64 {
        self.boats[boat_id].measure_rudder(&mut self.rng)
    }
}
