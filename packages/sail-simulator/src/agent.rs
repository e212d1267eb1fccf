//! agent.rs — The autonomous sailing agent
//!
//! One agent per boat. Per tick it reads noisy sensors, fuses position
//! through the Kalman filter, advances its mark-crossing state using the
//! segment between the previous and new believed positions, regenerates
//! waypoints and tacking legs when a gate was crossed, and converts the
//! current leg into a rudder delta.
//!
//! The agent never touches the environment type directly — it sees only
//! the `CourseView` / `WindView` / `MeasurementSource` capability traits,
//! so it can be driven by the real environment or a test double alike.

use sail_types::{Cartesian, GeometryError, Polar};

use crate::boat::BoatAction;
use crate::config::SimConfig;
use crate::course::MarkState;
use crate::environment::{CourseView, MeasurementSource, WindView};
use crate::estimator::PositionFilter;
use crate::planner::{tacking_route, waypoints, PlannerParams};
use crate::steering::CrossTrackPid;

pub struct SailboatAgent {
    pub boat_id: usize,

    // belief (estimator output) and raw sensor state
    pub believed_location: Polar,
    pub believed_heading: f64,
    pub believed_speed: f64,
    pub measured_location: Polar,

    // plan state, regenerated on replan
    pub way_points: Vec<Polar>,
    pub tacking: Vec<Polar>,
    tacking_index: usize,

    filter: PositionFilter,
    steering: CrossTrackPid,
    mark_state: MarkState,
    replan: bool,
    seeded: bool,
    planner_params: PlannerParams,
}

impl SailboatAgent {
    pub fn new(boat_id: usize, initial_mark_state: MarkState, cfg: &SimConfig) -> Self {
        let (kp, kd, ki) = cfg.control.xte_gains();
        Self {
            boat_id,
            believed_location: Polar::default(),
            believed_heading: 0.0,
            believed_speed: 0.0,
            measured_location: Polar::default(),
            way_points: Vec::new(),
            tacking: Vec::new(),
            tacking_index: 0,
            filter: PositionFilter::new(
                cfg.control.position_measurement_variance,
                cfg.control.initial_velocity_variance,
            ),
            steering: CrossTrackPid::new(kp, kd, ki),
            mark_state: initial_mark_state,
            replan: true,
            seeded: false,
            planner_params: PlannerParams {
                max_speed_ratio: cfg.boat.max_speed_ratio,
                direct_sail_tolerance: cfg.control.direct_sail_tolerance(),
                waypoint_skip_tolerance: cfg.control.waypoint_skip_tolerance(),
                mark_buffer_distance: cfg.course.mark_buffer_distance,
                smooth_corners: cfg.course.smooth_corners,
                smooth_distance: cfg.course.smooth_distance,
            },
        }
    }

    pub fn mark_state(&self) -> MarkState {
        self.mark_state
    }

    /// Estimated velocity, for the reporting layer.
    pub fn believed_velocity(&self) -> Cartesian {
        self.filter.velocity()
    }

    /// Position-block covariance trace, for the reporting layer.
    pub fn position_variance(&self) -> f64 {
        self.filter.position_variance()
    }

    /// Per-tick decision entry point: localize, track gates, (re)plan,
    /// steer. Returns the control deltas for the environment to apply.
    pub fn boat_action<E>(&mut self, env: &mut E) -> Result<BoatAction, GeometryError>
    where
        E: CourseView + WindView + MeasurementSource,
    {
        let (location, heading, speed) = env.provide_measurements(self.boat_id);
        let measured_rudder = env.measure_rudder(self.boat_id);
        let wind = env.current_wind();

        self.measured_location = location;
        let previous_believed = self.believed_location;
        self.believed_location = self.filter.observe(location.to_cartesian()).to_polar();
        self.believed_heading = heading;
        self.believed_speed = speed;

        let course = env.course();
        if self.seeded {
            let next = course.update_mark_state(
                previous_believed,
                self.believed_location,
                self.mark_state,
            );
            if next != self.mark_state {
                self.mark_state = next;
                self.replan = true;
            }
        } else {
            // first tick: belief was just seeded, there is no motion
            // segment to test against a gate yet
            self.seeded = true;
        }

        if course.is_complete(self.mark_state) {
            return Ok(BoatAction::default());
        }

        if self.replan {
            self.way_points = waypoints(
                course,
                self.mark_state,
                self.planner_params.mark_buffer_distance,
            );
            self.tacking = tacking_route(
                self.believed_location,
                self.believed_heading,
                &self.way_points,
                wind,
                &self.planner_params,
            )?;
            self.tacking_index = 0;
            self.steering.reset();
            self.replan = false;
        }

        let rudder_delta = self.steering.steer(
            self.believed_location,
            self.believed_heading,
            &self.tacking,
            &mut self.tacking_index,
            measured_rudder,
        )?;

        // boom is carried in the dynamics but the current controller
        // never trims it, matching the rudder-only control law
        Ok(BoatAction { boom_delta: 0.0, rudder_delta })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimConfig;
    use crate::course::{Course, CourseMark, Crossing};
    use crate::environment::{CourseView, MeasurementSource, WindView};
    use crate::wind::Wind;
    use sail_types::Cartesian;
    use std::f64::consts::PI;

    /// Deterministic, noise-free stand-in for the environment.
    struct FixedWorld {
        course: Course,
        wind: Wind,
        location: Polar,
        heading: f64,
        speed: f64,
    }

    impl CourseView for FixedWorld {
        fn course(&self) -> &Course {
            &self.course
        }
    }
    impl WindView for FixedWorld {
        fn current_wind(&self) -> Wind {
            self.wind
        }
    }
    impl MeasurementSource for FixedWorld {
        fn provide_measurements(&mut self, _boat_id: usize) -> (Polar, f64, f64) {
            (self.location, self.heading, self.speed)
        }
        fn measure_rudder(&mut self, _boat_id: usize) -> f64 {
            0.0
        }
    }

    /// Straight start->finish corridor along the x axis with one rounding
    /// mark halfway, start gate near x = -100 and finish near x = +100.
    fn corridor_course() -> Course {
        let mark = |x: f64, y: f64| Cartesian::new(x, y).to_polar();
        Course {
            marks: vec![
                CourseMark { position: mark(-100.0, -5.0), to_port: true, crossings: vec![] },
                CourseMark { position: mark(-100.0, 5.0), to_port: false, crossings: vec![] },
                CourseMark {
                    position: mark(0.0, 0.0),
                    to_port: true,
                    crossings: vec![
                        Crossing { distance: 0.0, angle: PI / 2.0 },
                        Crossing { distance: 100.0, angle: 0.0 },
                    ],
                },
                CourseMark { position: mark(100.0, -5.0), to_port: false, crossings: vec![] },
                CourseMark { position: mark(100.0, 5.0), to_port: true, crossings: vec![] },
            ],
        }
    }

    fn world(wind_direction: f64) -> FixedWorld {
        FixedWorld {
            course: corridor_course(),
            wind: Wind { speed: 15.0, direction: wind_direction },
            location: Cartesian::new(-100.0, 0.0).to_polar(),
            heading: 0.0,
            speed: 0.0,
        }
    }

    fn agent() -> SailboatAgent {
        let cfg = SimConfig::from_toml(include_str!("../config.toml")).unwrap();
        SailboatAgent::new(0, MarkState { mark_index: 2, crossing_index: 0 }, &cfg)
    }

    #[test]
    fn dead_upwind_course_plans_tacks() {
        // wind blows toward -x: sailing to +x is dead upwind
        let mut env = world(PI);
        let mut agent = agent();
        agent.boat_action(&mut env).unwrap();
        assert!(!agent.tacking.is_empty());
        // more points than route endpoints means intermediate tack marks
        assert!(
            agent.tacking.len() > agent.way_points.len() + 1,
            "upwind plan must insert tack points: tacking={:?} way_points={:?}",
            agent.tacking,
            agent.way_points
        );
    }

    #[test]
    fn dead_downwind_course_plans_direct() {
        // wind blows toward +x: the whole corridor is a run
        let mut env = world(0.0);
        let mut agent = agent();
        agent.boat_action(&mut env).unwrap();
        // direct route: start plus at most one point per surviving waypoint
        assert!(
            agent.tacking.len() <= agent.way_points.len() + 1,
            "downwind plan must not tack: {:?}",
            agent.tacking
        );
    }

    #[test]
    fn belief_tracks_truth_without_noise() {
        let mut env = world(0.0);
        let mut agent = agent();
        // constant-velocity motion with exact measurements: after the
        // filter locks onto the velocity the residual shrinks toward zero
        for step in 0..20 {
            env.location = Cartesian::new(-100.0 + step as f64, 0.0).to_polar();
            agent.boat_action(&mut env).unwrap();
            let err = agent.believed_location.sub(env.location).radius;
            if step >= 3 {
                assert!(err < 0.05, "belief diverged at step {step}: {err}");
            }
        }
        // the filter locked onto the +1 x-per-tick motion and tightened up
        let vel = agent.believed_velocity();
        assert!((vel.x - 1.0).abs() < 0.1, "vx estimate off: {}", vel.x);
        assert!(vel.y.abs() < 0.1, "vy estimate off: {}", vel.y);
        assert!(agent.position_variance() < 1.0);
    }

    #[test]
    fn crossing_a_gate_triggers_replan() {
        let mut env = world(0.0);
        let mut agent = agent();
        agent.boat_action(&mut env).unwrap();
        assert_eq!(agent.mark_state(), MarkState { mark_index: 2, crossing_index: 0 });
        // march the boat across the mark's bisector ray (north ray at x=0)
        for step in 0..30 {
            env.location = Cartesian::new(-100.0 + step as f64 * 4.0, 2.0).to_polar();
            agent.boat_action(&mut env).unwrap();
        }
        assert!(
            agent.mark_state().crossing_index > 0 || agent.mark_state().mark_index > 2,
            "mark state never advanced: {:?}",
            agent.mark_state()
        );
    }
}
