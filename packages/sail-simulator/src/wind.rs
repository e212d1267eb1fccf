//! wind.rs — Smoothed stochastic wind model
//!
//! The wind the boats feel is never stepped discontinuously: a goal wind is
//! re-sampled every `change_rate_steps` ticks as a Gaussian perturbation of
//! the prevailing wind, and the current wind interpolates toward that goal
//! a little each tick. Direction interpolation takes the shortest angular
//! path so a goal across the -pi/pi seam doesn't spin the wind the long way
//! around.

use rand::Rng;
use rand_distr::{Distribution, Normal};
use sail_types::normalize_angle;
use serde::Serialize;

use crate::config::WindConfig;

/// Wind felt across the whole course this tick. `direction` is the bearing
/// the air mass moves toward, so `heading == direction` is a dead run.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct Wind {
    pub speed: f64,
    pub direction: f64,
}

#[derive(Debug)]
pub struct WindModel {
    prevailing: Wind,
    goal: Wind,
    current: Wind,
    speed_sigma: f64,
    direction_sigma: f64,
    change_rate: u64,
}

impl WindModel {
    pub fn new(cfg: &WindConfig, rng: &mut impl Rng) -> Self {
        let prevailing = if cfg.random_prevailing {
            Wind {
                speed: rng.gen_range(cfg.speed_min..cfg.speed_max),
                direction: rng.gen_range(-std::f64::consts::PI..std::f64::consts::PI),
            }
        } else {
            Wind {
                speed: cfg.prevailing_speed,
                direction: normalize_angle(cfg.prevailing_direction()),
            }
        };
        Self {
            prevailing,
            goal: prevailing,
            current: prevailing,
            speed_sigma: cfg.speed_sigma,
            direction_sigma: cfg.direction_sigma(),
            change_rate: cfg.change_rate_steps.max(1),
        }
    }

    pub fn current(&self) -> Wind {
        self.current
    }

    /// Advance one tick: maybe re-sample the goal, then interpolate toward it.
    pub fn advance(&mut self, step: u64, rng: &mut impl Rng) {
        if step % self.change_rate == 0 {
            let speed_noise = Normal::new(0.0, self.speed_sigma).unwrap();
            let dir_noise = Normal::new(0.0, self.direction_sigma).unwrap();
            self.goal = Wind {
                speed: (self.prevailing.speed + speed_noise.sample(rng)).max(0.0),
                direction: normalize_angle(self.prevailing.direction + dir_noise.sample(rng)),
            };
        }
        let alpha = 1.0 / self.change_rate as f64;
        self.current.speed += (self.goal.speed - self.current.speed) * alpha;
        self.current.direction = normalize_angle(
            self.current.direction
                + normalize_angle(self.goal.direction - self.current.direction) * alpha,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WindConfig;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};

    fn cfg(sigma_speed: f64, sigma_dir_deg: f64) -> WindConfig {
        WindConfig {
            random_prevailing: false,
            prevailing_speed: 15.0,
            prevailing_direction_deg: 90.0,
            speed_min: 5.0,
            speed_max: 20.0,
            speed_sigma: sigma_speed,
            direction_sigma_deg: sigma_dir_deg,
            change_rate_steps: 10,
        }
    }

    #[test]
    fn zero_sigma_wind_is_constant() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut model = WindModel::new(&cfg(0.0, 0.0), &mut rng);
        for step in 0..100 {
            model.advance(step, &mut rng);
        }
        let w = model.current();
        assert_relative_eq!(w.speed, 15.0, epsilon = 1e-9);
        assert_relative_eq!(w.direction, std::f64::consts::FRAC_PI_2, epsilon = 1e-9);
    }

    #[test]
    fn wind_moves_toward_goal_without_jumps() {
        let mut rng = StdRng::seed_from_u64(42);
        let mut model = WindModel::new(&cfg(2.0, 30.0), &mut rng);
        let mut last = model.current();
        for step in 0..200 {
            model.advance(step, &mut rng);
            let w = model.current();
            assert!(w.speed >= 0.0);
            // one tick moves at most 1/change_rate of the way; nothing jumps
            assert!((w.speed - last.speed).abs() < 2.0);
            assert!(normalize_angle(w.direction - last.direction).abs() < 0.5);
            last = w;
        }
    }

    #[test]
    fn identical_seeds_give_identical_wind() {
        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut model = WindModel::new(&cfg(1.0, 20.0), &mut rng);
            (0..50).map(|s| {
                model.advance(s, &mut rng);
                model.current().speed
            }).collect::<Vec<_>>()
        };
        assert_eq!(run(3), run(3));
    }
}
