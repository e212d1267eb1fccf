//! estimator.rs — Constant-velocity Kalman filter over Cartesian position
//!
//! State vector `[x, y, vx, vy]`. The filter runs in Cartesian space
//! because velocity addition and directional noise are not linear in the
//! polar frame the rest of the simulation uses; the agent converts on the
//! way in and out.
//!
//! Only position is observed. Heading and speed sensors are low-noise in
//! this model and feed the belief unfiltered; position noise is the large
//! one, so position/velocity is the only estimated pair. That asymmetry is
//! intentional and mirrored by the agent.

use nalgebra::{Matrix2, Matrix2x4, Matrix4, Vector2, Vector4};
use sail_types::Cartesian;

#[derive(Debug)]
pub struct PositionFilter {
    x: Vector4<f64>,
    p: Matrix4<f64>,
    f: Matrix4<f64>,
    h: Matrix2x4<f64>,
    r: Matrix2<f64>,
    initialized: bool,
}

impl PositionFilter {
    /// `measurement_variance`: diagonal of R (independent x/y noise).
    /// `initial_velocity_variance`: the filter starts certain about
    /// position (seeded from the first fix) and uncertain about velocity.
    pub fn new(measurement_variance: f64, initial_velocity_variance: f64) -> Self {
        #[rustfmt::skip]
        let f = Matrix4::new(
            1.0, 0.0, 1.0, 0.0,
            0.0, 1.0, 0.0, 1.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        );
        #[rustfmt::skip]
        let h = Matrix2x4::new(
            1.0, 0.0, 0.0, 0.0,
            0.0, 1.0, 0.0, 0.0,
        );
        let mut p = Matrix4::zeros();
        p[(2, 2)] = initial_velocity_variance;
        p[(3, 3)] = initial_velocity_variance;
        Self {
            x: Vector4::zeros(),
            p,
            f,
            h,
            r: Matrix2::identity() * measurement_variance,
            initialized: false,
        }
    }

    /// Fuse one position measurement; returns the filtered position.
    ///
    /// The very first measurement seeds the state directly — there is no
    /// prior to correct against and the covariance is not yet meaningful.
    pub fn observe(&mut self, measured: Cartesian) -> Cartesian {
        let z = Vector2::new(measured.x, measured.y);
        if !self.initialized {
            self.x = Vector4::new(z.x, z.y, 0.0, 0.0);
            self.initialized = true;
            return measured;
        }

        // predict
        self.x = self.f * self.x;
        self.p = self.f * self.p * self.f.transpose();

        // update
        let innovation = z - self.h * self.x;
        let s = self.h * self.p * self.h.transpose() + self.r;
        let k = self.p
            * self.h.transpose()
            * s.try_inverse().expect("innovation covariance is invertible");
        self.x += k * innovation;
        self.p = (Matrix4::identity() - k * self.h) * self.p;

        Cartesian::new(self.x[0], self.x[1])
    }

    pub fn velocity(&self) -> Cartesian {
        Cartesian::new(self.x[2], self.x[3])
    }

    /// Trace of the position block of P.
    pub fn position_variance(&self) -> f64 {
        self.p[(0, 0)] + self.p[(1, 1)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};
    use rand_distr::{Distribution, Normal};

    #[test]
    fn zero_noise_tracks_identically() {
        let mut filter = PositionFilter::new(1e-12, 1000.0);
        // straight-line truth; measurements are exact
        for step in 0..50 {
            let truth = Cartesian::new(step as f64 * 2.0, step as f64 * -1.0);
            let believed = filter.observe(truth);
            assert_relative_eq!(believed.x, truth.x, epsilon = 1e-5);
            assert_relative_eq!(believed.y, truth.y, epsilon = 1e-5);
        }
    }

    #[test]
    fn stationary_noisy_stream_converges() {
        let mut filter = PositionFilter::new(1.0, 1000.0);
        let mut rng = StdRng::seed_from_u64(99);
        let noise = Normal::new(0.0, 1.0).unwrap();
        let truth = Cartesian::new(30.0, -20.0);

        filter.observe(truth); // seed
        let mut last_var = f64::INFINITY;
        let mut believed = truth;
        for _ in 0..200 {
            let z = Cartesian::new(
                truth.x + noise.sample(&mut rng),
                truth.y + noise.sample(&mut rng),
            );
            believed = filter.observe(z);
            let var = filter.position_variance();
            assert!(var <= last_var + 1e-9, "variance must shrink tick over tick");
            last_var = var;
        }
        assert!(last_var < 0.2, "variance did not converge: {last_var}");
        assert!((believed.x - truth.x).abs() < 0.5, "x estimate off: {}", believed.x);
        assert!((believed.y - truth.y).abs() < 0.5, "y estimate off: {}", believed.y);
        // a stationary target settles to near-zero velocity
        assert!(filter.velocity().norm() < 0.1);
    }

    #[test]
    fn first_measurement_passes_through() {
        let mut filter = PositionFilter::new(1.0, 1000.0);
        let z = Cartesian::new(5.0, 7.0);
        let believed = filter.observe(z);
        assert_eq!(believed, z);
    }
}
