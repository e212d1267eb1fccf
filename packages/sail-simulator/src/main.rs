//! main.rs — Sailboat simulation entry point
//!
//! Turn-based driver around the core library modules:
//!   1. each agent is asked for its control deltas (localize, plan, steer)
//!   2. the per-tick report is printed
//!   3. the environment applies the batched actions and advances physics
//!   4. the wind interpolates toward its current goal
//!
//! Everything stochastic flows from one seedable RNG, so a fixed `--seed`
//! reproduces a run exactly.

mod agent;
mod boat;
mod config;
mod course;
mod environment;
mod estimator;
mod planner;
mod steering;
mod wind;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use agent::SailboatAgent;
use config::SimConfig;
use environment::{CourseView, Environment, WindView};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "sail-sim", about = "Sailboat racing simulator")]
struct Args {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,
    /// RNG seed (random when omitted)
    #[arg(long)]
    seed: Option<u64>,
    /// Override the number of boats
    #[arg(long)]
    boats: Option<usize>,
    /// Override the step-count bound
    #[arg(long)]
    steps: Option<u64>,
}

// ── Main ──────────────────────────────────────────────────────────────────────

/// Events in this file carry the binary crate's target (`sail_sim`, from
/// the `sail-sim` bin name), not the package name.
const DEFAULT_LOG_FILTER: &str = "sail_sim=info";

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .init();

    let args = Args::parse();

    let config_str = std::fs::read_to_string(&args.config)
        .unwrap_or_else(|_| include_str!("../config.toml").to_string());
    let mut cfg = SimConfig::from_toml(&config_str).context("invalid config.toml")?;
    if let Some(boats) = args.boats {
        cfg.simulation.nr_of_boats = boats;
    }
    if let Some(steps) = args.steps {
        cfg.simulation.max_steps = steps;
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    info!(
        "⛵ sail-sim starting — {} boat(s), {} marks, seed {}",
        cfg.simulation.nr_of_boats, cfg.course.num_course_marks, seed
    );

    let mut env = Environment::new(&cfg, seed);
    let mut agents: Vec<SailboatAgent> = (0..cfg.simulation.nr_of_boats)
        .map(|_| {
            let id = env.create_vehicle();
            SailboatAgent::new(id, env.course().initial_mark_state(), &cfg)
        })
        .collect();

    let mut step = 0u64;
    while !env.is_finished(step) {
        let mut actions = Vec::with_capacity(agents.len());
        for agent in &mut agents {
            let action = agent
                .boat_action(&mut env)
                .with_context(|| format!("planning failed for boat {}", agent.boat_id))?;
            actions.push(action);
        }

        if should_report(step, cfg.simulation.report_interval) {
            report(&env, &agents, step, &cfg);
        }

        env.step(&actions);
        env.advance_wind(step);
        step += 1;
    }

    let finished = agents
        .iter()
        .filter(|a| env.course().is_complete(a.mark_state()))
        .count();
    if finished < agents.len() {
        warn!(
            "🏁 run ended at step bound {}: {}/{} boats completed the course",
            step,
            finished,
            agents.len()
        );
    } else {
        info!("🏁 all {} boat(s) completed the course within {} steps", finished, step);
    }
    Ok(())
}

// ── Console report ────────────────────────────────────────────────────────────

/// `interval = 0` reports every tick instead of dividing by zero.
fn should_report(step: u64, interval: u64) -> bool {
    step % interval.max(1) == 0
}

fn report(env: &Environment, agents: &[SailboatAgent], step: u64, cfg: &SimConfig) {
    let wind = env.current_wind();
    info!(
        "⏱ step {:>4} | wind {:>5.1} @ {:>6.1}°",
        step,
        wind.speed,
        wind.direction.to_degrees()
    );
    for agent in agents {
        let boat = &env.boats()[agent.boat_id];
        if cfg.simulation.print_boat_data {
            info!(
                "  boat {} | true ({:>6.1}, {:>6.1}°) hdg {:>6.1}° spd {:>4.1} rudder {:>5.1}°",
                agent.boat_id,
                boat.location.radius,
                boat.location.angle.to_degrees(),
                boat.heading.to_degrees(),
                boat.speed,
                boat.rudder.to_degrees()
            );
        }
        if cfg.simulation.print_boat_belief {
            let error = agent.believed_location.sub(boat.location).radius;
            info!(
                "  boat {} | belief ({:>6.1}, {:>6.1}°) err {:>5.2} vel {:>4.1} var {:>6.2} | mark {}/{} gate {} | {} leg pts",
                agent.boat_id,
                agent.believed_location.radius,
                agent.believed_location.angle.to_degrees(),
                error,
                agent.believed_velocity().norm(),
                agent.position_variance(),
                agent.mark_state().mark_index,
                env.course().marks.len(),
                agent.mark_state().crossing_index,
                agent.tacking.len()
            );
        }
    }
}
