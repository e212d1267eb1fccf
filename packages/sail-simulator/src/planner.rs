//! planner.rs — Waypoint generation and tacking-route construction
//!
//! Converts the remaining mark crossings into an ordered list of waypoints,
//! then turns each leg into something the boat can actually sail. Direct
//! legs (reaches and runs) pass through untouched; legs into the no-go
//! zone are decomposed into a pair of close-hauled tack vectors by solving
//! the 2x2 system `a1*v1 + a2*v2 = to_waypoint`.
//!
//! Planning is a pure function of (believed location, mark state, course,
//! wind); the agent regenerates the whole route whenever the mark state
//! advances rather than patching it incrementally.

use sail_types::{normalize_angle, solve_2x2, unit, GeometryError, Polar};

use crate::boat::calculate_speed;
use crate::course::{Course, MarkState};
use crate::wind::Wind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TackSide {
    Port,
    Starboard,
}

#[derive(Debug, Clone, Copy)]
pub struct PlannerParams {
    pub max_speed_ratio: f64,
    /// Sail direct when an optimal tack angle is this close to the bearing.
    pub direct_sail_tolerance: f64,
    /// Elide a waypoint that bends the route less than this.
    pub waypoint_skip_tolerance: f64,
    pub mark_buffer_distance: f64,
    pub smooth_corners: bool,
    pub smooth_distance: f64,
}

// ── Waypoints ─────────────────────────────────────────────────────────────────

/// Walk the remaining crossings and emit one waypoint per gate: the buffer
/// point along a bisector ray, or the midpoint of a bounded gate. Gate
/// marks contribute nothing; the finish gate midpoint closes the list.
pub fn waypoints(course: &Course, state: MarkState, buffer_distance: f64) -> Vec<Polar> {
    let mut points = Vec::new();
    let mut mark_index = state.mark_index;
    let mut crossing_index = state.crossing_index;
    while mark_index < course.marks.len() {
        let mark = &course.marks[mark_index];
        for crossing in &mark.crossings[crossing_index.min(mark.crossings.len())..] {
            let offset = if crossing.distance == 0.0 {
                Polar::new(buffer_distance, crossing.angle)
            } else {
                Polar::new(crossing.distance / 2.0, crossing.angle)
            };
            points.push(mark.position.add(offset));
        }
        mark_index += 1;
        crossing_index = 0;
    }
    points.push(course.finish_gate_midpoint());
    points
}

// ── Optimal tack angle ────────────────────────────────────────────────────────

/// Best-speed heading toward `desired_bearing` on the given side, by
/// maximizing velocity made good: `cos(offset) * polar_speed(heading)`.
/// Close to the wind the optimum diverges sharply from the direct bearing
/// (the no-go zone); downwind it converges to it.
pub fn optimal_tack_angle(
    desired_bearing: f64,
    wind: Wind,
    side: TackSide,
    max_speed_ratio: f64,
) -> f64 {
    let (lo, hi) = match side {
        TackSide::Port => (0.0, std::f64::consts::FRAC_PI_2),
        TackSide::Starboard => (-std::f64::consts::FRAC_PI_2, 0.0),
    };
    let negated_vmg = |offset: f64| {
        let heading = normalize_angle(desired_bearing + offset);
        let relative = normalize_angle(heading - wind.direction);
        -(offset.cos() * calculate_speed(relative, wind.speed, max_speed_ratio))
    };
    let best_offset = golden_section_min(negated_vmg, lo, hi, 1e-5);
    normalize_angle(desired_bearing + best_offset)
}

/// 1-D bounded scalar minimization by golden-section search.
fn golden_section_min(f: impl Fn(f64) -> f64, mut a: f64, mut b: f64, tol: f64) -> f64 {
    const INV_PHI: f64 = 0.618_033_988_749_894_8;
    let mut c = b - (b - a) * INV_PHI;
    let mut d = a + (b - a) * INV_PHI;
    let mut fc = f(c);
    let mut fd = f(d);
    while (b - a).abs() > tol {
        if fc < fd {
            b = d;
            d = c;
            fd = fc;
            c = b - (b - a) * INV_PHI;
            fc = f(c);
        } else {
            a = c;
            c = d;
            fc = fd;
            d = a + (b - a) * INV_PHI;
            fd = f(d);
        }
    }
    (a + b) / 2.0
}

// ── Tacking route ─────────────────────────────────────────────────────────────

/// Build the sailable route from `from` through `way_points`.
///
/// The returned route starts at `from`. Per leg: sail direct when viable,
/// otherwise insert tack points. The entry tack is chosen by proximity to
/// the previous leg's exit heading (avoids a gratuitous tack right at the
/// corner) and the exit tack by proximity to the next leg's bearing; when
/// those land on the same tack the entry leg is split in two so the boat
/// doesn't finish the leg on the wrong tack.
pub fn tacking_route(
    from: Polar,
    initial_heading: f64,
    way_points: &[Polar],
    wind: Wind,
    params: &PlannerParams,
) -> Result<Vec<Polar>, GeometryError> {
    let mut route = vec![from];
    let mut current = from;
    let mut exit_heading = initial_heading;

    let mut i = 0;
    while i < way_points.len() {
        let wp = way_points[i];
        let to_wp = wp.sub(current);
        if to_wp.radius < 1e-9 {
            i += 1;
            continue;
        }
        // elide a waypoint the following leg already nearly passes through
        if i + 1 < way_points.len() {
            let next_bearing = way_points[i + 1].sub(wp).angle;
            if normalize_angle(next_bearing - to_wp.angle).abs()
                < params.waypoint_skip_tolerance
            {
                i += 1;
                continue;
            }
        }

        let direct = to_wp.angle;
        let port = optimal_tack_angle(direct, wind, TackSide::Port, params.max_speed_ratio);
        let starboard =
            optimal_tack_angle(direct, wind, TackSide::Starboard, params.max_speed_ratio);

        let port_off = normalize_angle(port - direct).abs();
        let starboard_off = normalize_angle(starboard - direct).abs();
        if port_off < params.direct_sail_tolerance || starboard_off < params.direct_sail_tolerance
        {
            // reach or run: no intermediate tack point needed
            route.push(wp);
            exit_heading = direct;
            current = wp;
            i += 1;
            continue;
        }

        // decompose the displacement onto the two tack unit vectors
        let v_port = unit(port);
        let v_starboard = unit(starboard);
        let rhs = to_wp.to_cartesian();
        let [a_port, a_starboard] = solve_2x2(
            [[v_port.x, v_starboard.x], [v_port.y, v_starboard.y]],
            [rhs.x, rhs.y],
        )?;

        let enter_port = normalize_angle(port - exit_heading).abs()
            <= normalize_angle(starboard - exit_heading).abs();
        let next_desired = if i + 1 < way_points.len() {
            way_points[i + 1].sub(wp).angle
        } else {
            direct
        };
        let leave_port = normalize_angle(port - next_desired).abs()
            <= normalize_angle(starboard - next_desired).abs();

        let (first_len, first_dir, second_len, second_dir) = if enter_port {
            (a_port, v_port, a_starboard, v_starboard)
        } else {
            (a_starboard, v_starboard, a_port, v_port)
        };

        let cur_c = current.to_cartesian();
        if enter_port == leave_port {
            // same tack in and out: half the entry tack, the full other
            // tack, then the remaining half
            let p1 = cur_c.add(first_dir.scale(first_len / 2.0)).to_polar();
            let p2 = p1.to_cartesian().add(second_dir.scale(second_len)).to_polar();
            route.push(p1);
            route.push(p2);
        } else {
            route.push(cur_c.add(first_dir.scale(first_len)).to_polar());
        }
        route.push(wp);
        exit_heading = if leave_port { port } else { starboard };
        current = wp;
        i += 1;
    }

    Ok(if params.smooth_corners {
        smooth_corners(&route, params.smooth_distance)
    } else {
        route
    })
}

/// Optional cosmetic post-process: replace each sharp tack vertex with
/// three points (offset back along the incoming leg, an averaged corner
/// point, offset forward along the outgoing leg).
pub fn smooth_corners(route: &[Polar], smooth_distance: f64) -> Vec<Polar> {
    if route.len() < 3 {
        return route.to_vec();
    }
    let mut out = vec![route[0]];
    for i in 1..route.len() - 1 {
        let vertex = route[i];
        let incoming = route[i - 1].sub(vertex);
        let outgoing = route[i + 1].sub(vertex);
        // never offset past a leg midpoint
        let back_dist = smooth_distance.min(incoming.radius / 2.0);
        let fwd_dist = smooth_distance.min(outgoing.radius / 2.0);
        let back = vertex.add(Polar::new(back_dist, incoming.angle));
        let forward = vertex.add(Polar::new(fwd_dist, outgoing.angle));
        let corner = back.to_cartesian().add(forward.to_cartesian()).scale(0.5).to_polar();
        out.push(back);
        out.push(corner);
        out.push(forward);
    }
    out.push(route[route.len() - 1]);
    out
}
