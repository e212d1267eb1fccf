//! course.rs — Race course layout and mark-crossing state machine
//!
//! A course is a start gate (two marks), `num_course_marks` intermediate
//! marks, and a finish gate (two marks). Intermediate marks zig-zag between
//! the gates with alternating rounding sides, which forces tacking on at
//! least some legs regardless of wind direction.
//!
//! Each intermediate mark carries two precomputed crossings the boat must
//! satisfy in order:
//!   1. an unbounded bisector ray pointing to the side the boat leaves the
//!      mark on ("cross at any distance"),
//!   2. a bounded gate along the segment toward the next mark.
//! Gate marks carry no crossings; a gate is crossed as the line between its
//! two marks and the planner treats its midpoint as a waypoint instead.

use rand::Rng;
use sail_types::{intersect, normalize_angle, Polar, Segment};
use serde::Serialize;
use std::f64::consts::{FRAC_PI_4, PI};

use crate::config::CourseConfig;

/// One gate a boat must cross at a mark. `distance == 0.0` means the
/// crossing ray is unbounded.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Crossing {
    pub distance: f64,
    pub angle: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CourseMark {
    pub position: Polar,
    /// Leave this mark on the boat's port side (red/square) rather than
    /// starboard (green/triangle).
    pub to_port: bool,
    /// Derived at generation time; empty for start/finish gate marks.
    pub crossings: Vec<Crossing>,
}

/// Which mark / which of its crossings the boat must satisfy next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MarkState {
    pub mark_index: usize,
    pub crossing_index: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct Course {
    pub marks: Vec<CourseMark>,
}

impl Course {
    /// Generate a random course: start gate at a random bearing, finish
    /// gate mirrored opposite, intermediates zig-zagging between them.
    pub fn generate(cfg: &CourseConfig, rng: &mut impl Rng) -> Self {
        let radius = 0.98 * cfg.course_range;
        let gate_span = (cfg.gate_width).atan2(cfg.course_range);

        let start_angle = rng.gen_range(-PI..PI);
        let start2_angle = normalize_angle(start_angle + gate_span);
        let finish_angle = normalize_angle(start_angle + PI);
        let finish2_angle = normalize_angle(finish_angle + gate_span);

        let mut marks = vec![
            CourseMark {
                position: Polar::new(radius, start_angle),
                to_port: true,
                crossings: vec![],
            },
            CourseMark {
                position: Polar::new(radius, start2_angle),
                to_port: false,
                crossings: vec![],
            },
        ];

        let midpoint = |a: Polar, b: Polar| -> Polar {
            a.to_cartesian().add(b.to_cartesian()).scale(0.5).to_polar()
        };
        let finish_mid = midpoint(
            Polar::new(radius, finish_angle),
            Polar::new(radius, finish2_angle),
        );

        let mut current = midpoint(marks[0].position, marks[1].position);
        let mut sign = 1.0f64;
        let n = cfg.num_course_marks;
        for i in 0..n {
            let remaining = finish_mid.sub(current);
            // divide by one more than the marks left to place: the extra
            // share reserves the final leg from the last mark to the
            // finish gate, so no mark lands on (or past) the finish line
            let step =
                remaining.radius / (n - i + 1) as f64 * rng.gen_range(0.8..1.5);
            let bearing = normalize_angle(remaining.angle + sign * rng.gen_range(0.0..FRAC_PI_4));
            let position = current.add(Polar::new(step, bearing));
            marks.push(CourseMark {
                position,
                // a mark offset counter-clockwise of the direct line gets
                // left to port by a boat tracking that line
                to_port: sign > 0.0,
                crossings: vec![],
            });
            current = position;
            sign = -sign;
        }

        // keep the port/starboard alternation running through the finish gate
        let last_to_port = marks.last().map(|m| m.to_port).unwrap_or(false);
        marks.push(CourseMark {
            position: Polar::new(radius, finish_angle),
            to_port: !last_to_port,
            crossings: vec![],
        });
        marks.push(CourseMark {
            position: Polar::new(radius, finish2_angle),
            to_port: last_to_port,
            crossings: vec![],
        });

        let mut course = Self { marks };
        course.compute_crossings();
        course
    }

    /// Precompute the two crossings per intermediate mark. Runs once; the
    /// course is immutable afterwards.
    fn compute_crossings(&mut self) {
        let n = self.marks.len();
        for i in 2..n.saturating_sub(2) {
            let position = self.marks[i].position;
            let from_prev = self.marks[i - 1].position.sub(position);
            let to_next = self.marks[i + 1].position.sub(position);

            // Bisect the wedge between the neighbor directions, sweeping
            // counter-clockwise from previous to next for a port mark and
            // clockwise for a starboard mark, so the ray points to the side
            // the boat leaves the mark on.
            let mut sweep = normalize_angle(to_next.angle - from_prev.angle);
            if self.marks[i].to_port {
                if sweep < 0.0 {
                    sweep += 2.0 * PI;
                }
            } else if sweep > 0.0 {
                sweep -= 2.0 * PI;
            }
            let bisector = normalize_angle(from_prev.angle + sweep / 2.0);

            self.marks[i].crossings = vec![
                Crossing { distance: 0.0, angle: bisector },
                Crossing { distance: to_next.radius, angle: to_next.angle },
            ];
        }
    }

    pub fn start_gate_midpoint(&self) -> Polar {
        self.marks[0]
            .position
            .to_cartesian()
            .add(self.marks[1].position.to_cartesian())
            .scale(0.5)
            .to_polar()
    }

    pub fn finish_gate_midpoint(&self) -> Polar {
        let n = self.marks.len();
        self.marks[n - 2]
            .position
            .to_cartesian()
            .add(self.marks[n - 1].position.to_cartesian())
            .scale(0.5)
            .to_polar()
    }

    /// First mark the boat actually has to round.
    pub fn initial_mark_state(&self) -> MarkState {
        self.skip_gate_marks(MarkState { mark_index: 0, crossing_index: 0 })
    }

    pub fn is_complete(&self, state: MarkState) -> bool {
        state.mark_index >= self.marks.len()
    }

    /// Advance the mark state given the boat's motion segment this tick.
    /// Crossing the active gate bumps the crossing index; finishing a
    /// mark's crossings moves on to the next mark that has any.
    pub fn update_mark_state(&self, prev: Polar, new: Polar, state: MarkState) -> MarkState {
        let mut state = self.skip_gate_marks(state);
        if self.is_complete(state) {
            return state;
        }
        let motion = Segment::between(prev, new);
        if motion.length == 0.0 {
            // a zero-length motion segment would read as an unbounded ray
            return state;
        }
        let mark = &self.marks[state.mark_index];
        let crossing = mark.crossings[state.crossing_index];
        let gate = Segment::new(mark.position, crossing.angle, crossing.distance);
        if intersect(&motion, &gate) {
            state.crossing_index += 1;
            if state.crossing_index >= mark.crossings.len() {
                state.mark_index += 1;
                state.crossing_index = 0;
                state = self.skip_gate_marks(state);
            }
        }
        state
    }

    fn skip_gate_marks(&self, mut state: MarkState) -> MarkState {
        while state.mark_index < self.marks.len()
            && self.marks[state.mark_index].crossings.is_empty()
        {
            state.mark_index += 1;
            state.crossing_index = 0;
        }
        state
    }
}
