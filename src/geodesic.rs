//! Geodesic integration over a proper-time grid.
//!
//! The state is `y = [x^0..x^3, u^0..u^3]` and the equations of motion are
//!
//! ```text
//! dx^μ/dτ = u^μ
//! du^ρ/dτ = −Γ^ρ_{μν} u^μ u^ν
//! ```
//!
//! with Γ evaluated in geometrized units at every stage.
//!
//! # Integrator
//! Classical RK4. In adaptive mode each step is taken once with `h` and twice
//! with `h/2`; the difference gives a Richardson error estimate and a
//! fifth-order extrapolated state. Steps are clipped so every grid point is
//! landed on exactly. Fixed mode takes constant steps of `initial_step`,
//! clipped the same way.
//!
//! Approaching a coordinate singularity is not an error: once the state goes
//! non-finite, the remaining samples are NaN. A step that is still over
//! tolerance at the smallest step the grid can resolve is taken anyway and
//! counted in [`Trajectory::forced_steps`].

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::coordinates::Coordinate;
use crate::error::{RelativityError, Result};
use crate::metrics::{FourState, Metric};

// ── Configuration ──

/// Step control for [`GeodesicIntegrator`]. Steps are in proper time
/// (geometrized metres).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IntegratorConfig {
    /// First trial step, and the constant step in fixed mode.
    pub initial_step: f64,
    /// Smallest adaptive step. A step this small is accepted whatever its error.
    pub min_step: f64,
    /// Largest adaptive step.
    pub max_step: f64,
    /// Absolute tolerance.
    pub atol: f64,
    /// Relative tolerance.
    pub rtol: f64,
    /// Error-controlled steps when true, constant steps otherwise.
    pub adaptive: bool,
}

impl Default for IntegratorConfig {
    fn default() -> Self {
        IntegratorConfig {
            initial_step: 1e-2,
            min_step: 1e-10,
            max_step: 1e6,
            atol: 1e-10,
            rtol: 1e-10,
            adaptive: true,
        }
    }
}

impl IntegratorConfig {
    /// Constant steps of `step`.
    pub fn fixed(step: f64) -> Self {
        IntegratorConfig {
            initial_step: step,
            adaptive: false,
            ..Self::default()
        }
    }

    /// Adaptive with both tolerances set to `tol`.
    pub fn with_tolerance(tol: f64) -> Self {
        IntegratorConfig {
            atol: tol,
            rtol: tol,
            ..Self::default()
        }
    }

    /// Tight tolerances for conservation checks.
    pub fn precise() -> Self {
        Self::with_tolerance(1e-12)
    }

    fn validate(&self) -> Result<()> {
        let positive = |name: &str, v: f64| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(RelativityError::invalid_argument(format!(
                    "{name} must be positive and finite, got {v}"
                )))
            }
        };
        positive("initial_step", self.initial_step)?;
        if self.adaptive {
            positive("min_step", self.min_step)?;
            positive("max_step", self.max_step)?;
            positive("atol", self.atol)?;
            if !(self.rtol >= 0.0 && self.rtol.is_finite()) {
                return Err(RelativityError::invalid_argument(format!(
                    "rtol must be non-negative and finite, got {}",
                    self.rtol
                )));
            }
            if self.min_step > self.max_step {
                return Err(RelativityError::invalid_argument(format!(
                    "min_step {} exceeds max_step {}",
                    self.min_step, self.max_step
                )));
            }
        }
        Ok(())
    }
}

// ── Trajectory ──

/// States sampled on a proper-time grid.
///
/// Sample `k` is `states()[k]` at `taus()[k]`; row `i` of [`Trajectory::rows`]
/// is component `i` of every sample (0..4 position, 4..8 four-velocity).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    taus: Vec<f64>,
    states: Vec<FourState>,
    #[serde(default)]
    forced_steps: usize,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn taus(&self) -> &[f64] {
        &self.taus
    }

    pub fn states(&self) -> &[FourState] {
        &self.states
    }

    pub fn last(&self) -> Option<&FourState> {
        self.states.last()
    }

    /// Steps accepted above tolerance because the step could not shrink
    /// further. Non-zero means the samples after the first such step are
    /// not trustworthy.
    pub fn forced_steps(&self) -> usize {
        self.forced_steps
    }

    /// Component `index` (0..8) of every sample.
    pub fn component(&self, index: usize) -> Result<Vec<f64>> {
        if index >= 8 {
            return Err(RelativityError::invalid_argument(format!(
                "trajectory component {index} out of range, must be in [0, 7]"
            )));
        }
        Ok(self.states.iter().map(|s| s[index]).collect())
    }

    /// The 8×T layout.
    pub fn rows(&self) -> [Vec<f64>; 8] {
        std::array::from_fn(|i| self.states.iter().map(|s| s[i]).collect())
    }

    /// `(τ, state)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (f64, &FourState)> + '_ {
        self.taus.iter().copied().zip(self.states.iter())
    }
}

// ── Integrator ──

/// Integrates geodesics of one spacetime.
#[derive(Debug, Clone, Copy)]
pub struct GeodesicIntegrator<'a, M: Metric + ?Sized> {
    metric: &'a M,
    config: IntegratorConfig,
}

enum StepResult {
    Accept {
        y_new: FourState,
        h_new: f64,
        forced: bool,
    },
    Reject {
        h_new: f64,
    },
}

impl<'a, M: Metric + ?Sized> GeodesicIntegrator<'a, M> {
    pub fn new(metric: &'a M) -> Self {
        GeodesicIntegrator {
            metric,
            config: IntegratorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: IntegratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &IntegratorConfig {
        &self.config
    }

    /// Integrate from `initial` at `taus[0]` and sample at every grid point.
    ///
    /// `taus` must be non-empty, finite and strictly increasing.
    pub fn path(&self, initial: &FourState, taus: &[f64]) -> Result<Trajectory> {
        validate_grid(taus)?;
        self.config.validate()?;
        debug!(
            metric = self.metric.name(),
            samples = taus.len(),
            adaptive = self.config.adaptive,
            "integrating geodesic"
        );
        Ok(self.integrate(initial, taus))
    }

    /// [`GeodesicIntegrator::path`] starting from a coordinate's four-state.
    pub fn path_from(&self, coordinate: &Coordinate, taus: &[f64]) -> Result<Trajectory> {
        let initial = self.metric.four_state_vector(coordinate)?;
        self.path(&initial, taus)
    }

    fn integrate(&self, initial: &FourState, taus: &[f64]) -> Trajectory {
        let mut states = Vec::with_capacity(taus.len());
        let mut y = *initial;
        let mut tau = taus[0];
        let mut h = self.config.initial_step;
        let (mut accepted, mut rejected, mut forced) = (0usize, 0usize, 0usize);

        states.push(y);
        for &target in &taus[1..] {
            if !is_finite(&y) {
                warn!(tau, "state became non-finite, remaining samples are NaN");
                states.resize(taus.len(), [f64::NAN; 8]);
                break;
            }

            while tau < target {
                let remaining = target - tau;
                // Below this the step no longer advances τ
                let floor = tau.abs() * 4.0 * f64::EPSILON;
                let step = h.min(remaining).max(floor);
                let clipped = step >= remaining;

                let result = if self.config.adaptive {
                    self.adaptive_step(&y, step, self.config.min_step.max(floor))
                } else {
                    StepResult::Accept {
                        y_new: self.rk4_step(&y, step),
                        h_new: self.config.initial_step,
                        forced: false,
                    }
                };

                match result {
                    StepResult::Accept {
                        y_new,
                        h_new,
                        forced: was_forced,
                    } => {
                        accepted += 1;
                        forced += usize::from(was_forced);
                        y = y_new;
                        tau = if clipped { target } else { tau + step };
                        // A clipped step says nothing about the step that would have fit
                        h = if clipped { h.max(h_new) } else { h_new };
                        if !is_finite(&y) {
                            break;
                        }
                    }
                    StepResult::Reject { h_new } => {
                        rejected += 1;
                        h = h_new;
                    }
                }
            }

            states.push(y);
        }

        if forced > 0 {
            warn!(forced, "steps accepted above tolerance at the minimum step");
        }
        debug!(accepted, rejected, forced, "geodesic integration finished");
        Trajectory {
            taus: taus.to_vec(),
            states,
            forced_steps: forced,
        }
    }

    /// One RK4 step with error control by step doubling.
    ///
    /// `min_step` is the smallest step that still advances τ; at or below it
    /// the step is accepted whatever the error.
    fn adaptive_step(&self, y: &FourState, h: f64, min_step: f64) -> StepResult {
        let cfg = &self.config;

        let y_full = self.rk4_step(y, h);
        let y_half1 = self.rk4_step(y, h / 2.0);
        let y_half2 = self.rk4_step(&y_half1, h / 2.0);

        let mut err_max: f64 = 0.0;
        let mut y_better = [0.0; 8];
        for i in 0..8 {
            let diff = (y_half2[i] - y_full[i]) / 15.0;
            y_better[i] = y_half2[i] + diff;

            let scale = cfg.atol + cfg.rtol * y[i].abs().max(y_better[i].abs());
            err_max = err_max.max(diff.abs() / scale);
        }

        // NaN compares false everywhere; accept and let it propagate
        if !err_max.is_finite() || !is_finite(&y_better) {
            return StepResult::Accept {
                y_new: y_better,
                h_new: h,
                forced: false,
            };
        }

        if err_max <= 1.0 || h <= min_step {
            let forced = err_max > 1.0;
            if forced {
                debug!(h, err = err_max, "accepting step at min_step above tolerance");
            }
            let h_new = if err_max < 1e-10 {
                h * 2.0
            } else {
                h * 0.9 * err_max.powf(-0.2)
            };
            StepResult::Accept {
                y_new: y_better,
                h_new: h_new.clamp(cfg.min_step, cfg.max_step),
                forced,
            }
        } else {
            let h_new = h * 0.9 * err_max.powf(-0.25);
            StepResult::Reject {
                h_new: h_new.max(min_step),
            }
        }
    }

    /// Classical RK4 step.
    fn rk4_step(&self, y: &FourState, h: f64) -> FourState {
        let k1 = self.derivatives(y);
        let k2 = self.derivatives(&offset(y, 0.5 * h, &k1));
        let k3 = self.derivatives(&offset(y, 0.5 * h, &k2));
        let k4 = self.derivatives(&offset(y, h, &k3));

        let mut slope = [0.0; 8];
        for (weight, k) in [(1.0, &k1), (2.0, &k2), (2.0, &k3), (1.0, &k4)] {
            for (acc, dk) in slope.iter_mut().zip(k) {
                *acc += weight * dk;
            }
        }
        offset(y, h / 6.0, &slope)
    }

    /// Geodesic equation: `dy/dτ = f(y)`.
    fn derivatives(&self, y: &FourState) -> FourState {
        let gamma = self.metric.christoffel_dimensionless(&[y[0], y[1], y[2], y[3]]);
        let u = [y[4], y[5], y[6], y[7]];

        let mut dy = [u[0], u[1], u[2], u[3], 0.0, 0.0, 0.0, 0.0];
        for rho in 0..4 {
            let mut acc = 0.0;
            for mu in 0..4 {
                for nu in 0..4 {
                    acc += gamma[rho][mu][nu] * u[mu] * u[nu];
                }
            }
            dy[4 + rho] = -acc;
        }
        dy
    }
}

/// Integrate independent initial states on one grid in parallel.
///
/// Identical to calling [`GeodesicIntegrator::path`] on each state in order.
pub fn integrate_batch<M: Metric + Sync + ?Sized>(
    metric: &M,
    config: IntegratorConfig,
    initial: &[FourState],
    taus: &[f64],
) -> Result<Vec<Trajectory>> {
    validate_grid(taus)?;
    config.validate()?;
    let integrator = GeodesicIntegrator::new(metric).with_config(config);

    initial
        .par_iter()
        .map(|y0| integrator.path(y0, taus))
        .collect()
}

/// Non-empty, finite, strictly increasing.
fn validate_grid(taus: &[f64]) -> Result<()> {
    if taus.is_empty() {
        return Err(RelativityError::invalid_argument("proper-time grid is empty"));
    }
    if let Some(bad) = taus.iter().find(|t| !t.is_finite()) {
        return Err(RelativityError::invalid_argument(format!(
            "proper-time grid contains non-finite value {bad}"
        )));
    }
    if let Some(i) = taus.windows(2).position(|w| w[1] <= w[0]) {
        return Err(RelativityError::invalid_argument(format!(
            "proper-time grid must be strictly increasing, taus[{}] = {} follows {}",
            i + 1,
            taus[i + 1],
            taus[i]
        )));
    }
    Ok(())
}

/// `y + h·k`.
fn offset(y: &FourState, h: f64, k: &FourState) -> FourState {
    std::array::from_fn(|i| y[i] + h * k[i])
}

fn is_finite(y: &FourState) -> bool {
    y.iter().all(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::Chart;
    use crate::metrics::{Kerr, Minkowski, Schwarzschild};
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    fn grid(start: f64, end: f64, n: usize) -> Vec<f64> {
        (0..n)
            .map(|i| start + (end - start) * i as f64 / (n - 1) as f64)
            .collect()
    }

    /// Circular equatorial orbit at `r` around a unit-mass black hole.
    fn circular_orbit(r: f64) -> Coordinate {
        let omega = (1.0 / (r * r * r)).sqrt();
        Coordinate::from_rates(
            Chart::Spherical,
            [0.0, r, FRAC_PI_2, 0.0],
            [0.0, 0.0, omega],
        )
        .unwrap()
    }

    #[test]
    fn test_minkowski_at_rest_stays_put() {
        let taus = grid(0.0, 10.0, 11);
        let traj = GeodesicIntegrator::new(&Minkowski)
            .path(&[0.0, 1.0, 2.0, 3.0, 1.0, 0.0, 0.0, 0.0], &taus)
            .unwrap();

        assert_eq!(traj.len(), 11);
        for (tau, s) in traj.iter() {
            assert_relative_eq!(s[0], tau, epsilon = 1e-12);
            assert_eq!(&s[1..4], &[1.0, 2.0, 3.0]);
            assert_eq!(&s[4..8], &[1.0, 0.0, 0.0, 0.0]);
        }
    }

    #[test]
    fn test_minkowski_straight_line() {
        let gamma = 1.0 / (1.0 - 0.36_f64).sqrt();
        let y0 = [0.0, 0.0, 0.0, 0.0, gamma, 0.6 * gamma, 0.0, 0.0];
        let taus = grid(0.0, 5.0, 6);
        for config in [IntegratorConfig::default(), IntegratorConfig::fixed(0.3)] {
            let traj = GeodesicIntegrator::new(&Minkowski)
                .with_config(config)
                .path(&y0, &taus)
                .unwrap();
            for (tau, s) in traj.iter() {
                assert_relative_eq!(s[0], gamma * tau, epsilon = 1e-10);
                assert_relative_eq!(s[1], 0.6 * gamma * tau, epsilon = 1e-10);
            }
        }
    }

    #[test]
    fn test_grid_points_hit_exactly() {
        let taus = vec![0.0, 0.013, 0.5, 0.51, 3.0, 7.77];
        let sch = Schwarzschild::new(1.0).unwrap();
        let traj = GeodesicIntegrator::new(&sch)
            .path_from(&circular_orbit(10.0), &taus)
            .unwrap();
        assert_eq!(traj.taus(), taus.as_slice());
        assert_eq!(traj.len(), taus.len());
    }

    #[test]
    fn test_single_point_grid() {
        let y0 = [0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let traj = GeodesicIntegrator::new(&Minkowski).path(&y0, &[2.5]).unwrap();
        assert_eq!(traj.states(), &[y0]);
    }

    #[test]
    fn test_invalid_grids() {
        let integrator = GeodesicIntegrator::new(&Minkowski);
        let y0 = [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        for taus in [vec![], vec![0.0, 1.0, 1.0], vec![1.0, 0.5], vec![0.0, f64::NAN]] {
            assert!(matches!(
                integrator.path(&y0, &taus),
                Err(RelativityError::InvalidArgument(_))
            ));
        }
    }

    #[test]
    fn test_invalid_config() {
        let y0 = [0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0];
        let bad = IntegratorConfig {
            initial_step: 0.0,
            ..IntegratorConfig::default()
        };
        let result = GeodesicIntegrator::new(&Minkowski)
            .with_config(bad)
            .path(&y0, &[0.0, 1.0]);
        assert!(result.is_err());
    }

    #[test]
    fn test_circular_orbit_keeps_radius() {
        let sch = Schwarzschild::new(1.0).unwrap();
        let taus = grid(0.0, 200.0, 41);
        let traj = GeodesicIntegrator::new(&sch)
            .path_from(&circular_orbit(10.0), &taus)
            .unwrap();

        for r in traj.component(1).unwrap() {
            assert_relative_eq!(r, 10.0, epsilon = 1e-6);
        }
        for theta in traj.component(2).unwrap() {
            assert_relative_eq!(theta, FRAC_PI_2, epsilon = 1e-12);
        }
        // u^t = 1/√(1 − 3M/r)
        let ut = traj.component(4).unwrap();
        assert_relative_eq!(ut[0], 1.0 / 0.7_f64.sqrt(), epsilon = 1e-12);
        // dφ/dτ = u^t Ω
        let phi = traj.last().unwrap()[3];
        assert_relative_eq!(phi, 200.0 * ut[0] * 1e-3_f64.sqrt(), max_relative = 1e-6);
    }

    #[test]
    fn test_fixed_and_adaptive_agree() {
        let kerr = Kerr::new(1.0, 0.6).unwrap();
        let start = Coordinate::new(
            kerr.chart(),
            [0.0, 12.0, 1.2, 0.0],
            [0.05, 0.1, 0.25],
        )
        .unwrap();
        let taus = grid(0.0, 50.0, 11);

        let adaptive = GeodesicIntegrator::new(&kerr).path_from(&start, &taus).unwrap();
        let fixed = GeodesicIntegrator::new(&kerr)
            .with_config(IntegratorConfig::fixed(0.05))
            .path_from(&start, &taus)
            .unwrap();

        let (a, f) = (adaptive.last().unwrap(), fixed.last().unwrap());
        for i in 0..8 {
            assert_relative_eq!(a[i], f[i], epsilon = 1e-6, max_relative = 1e-6);
        }
    }

    #[test]
    fn test_singularity_propagates_nan() {
        // Radial motion starting on the horizon: Γ^t_tr is infinite
        let sch = Schwarzschild::new(1.0).unwrap();
        let y0 = [0.0, 2.0, FRAC_PI_2, 0.0, 1.0, -0.5, 0.0, 0.0];
        let traj = GeodesicIntegrator::new(&sch).path(&y0, &grid(0.0, 1.0, 5)).unwrap();

        assert_eq!(traj.len(), 5);
        assert_eq!(traj.states()[0], y0);
        assert!(traj.states()[1..]
            .iter()
            .all(|s| s.iter().any(|v| !v.is_finite())));
    }

    /// Radial fall from rest at r = 10 reaches r = 0 after τ ≈ 35.
    fn plunge(sch: &Schwarzschild, taus: &[f64]) -> Trajectory {
        let start = Coordinate::at_rest(Chart::Spherical, [0.0, 10.0, FRAC_PI_2, 0.0]);
        GeodesicIntegrator::new(sch).path_from(&start, taus).unwrap()
    }

    fn is_flagged(traj: &Trajectory) -> bool {
        traj.forced_steps() > 0 || traj.states().iter().any(|s| !is_finite(s))
    }

    #[test]
    fn test_plunge_through_centre_is_flagged() {
        let sch = Schwarzschild::new(1.0).unwrap();
        let traj = plunge(&sch, &grid(0.0, 200.0, 21));

        assert_eq!(traj.len(), 21);
        assert!(is_flagged(&traj));
    }

    #[test]
    fn test_large_tau_offset_does_not_stall() {
        // At τ ~ 1e9 the smallest step that advances τ is far above min_step
        let sch = Schwarzschild::new(1.0).unwrap();
        let taus = grid(1e9, 1e9 + 200.0, 21);
        let traj = plunge(&sch, &taus);

        assert_eq!(traj.len(), 21);
        assert_eq!(traj.taus(), &taus[..]);
        assert!(is_flagged(&traj));
    }

    #[test]
    fn test_smooth_orbit_has_no_forced_steps() {
        let sch = Schwarzschild::new(1.0).unwrap();
        let traj = GeodesicIntegrator::new(&sch)
            .path_from(&circular_orbit(10.0), &grid(0.0, 100.0, 11))
            .unwrap();
        assert_eq!(traj.forced_steps(), 0);
    }

    #[test]
    fn test_batch_matches_serial() {
        let sch = Schwarzschild::new(1.0).unwrap();
        let starts: Vec<FourState> = [8.0, 10.0, 15.0, 30.0]
            .iter()
            .map(|&r| sch.four_state_vector(&circular_orbit(r)).unwrap())
            .collect();
        let taus = grid(0.0, 20.0, 5);
        let config = IntegratorConfig::default();

        let batch = integrate_batch(&sch, config, &starts, &taus).unwrap();
        assert_eq!(batch.len(), starts.len());
        for (y0, traj) in starts.iter().zip(&batch) {
            let serial = GeodesicIntegrator::new(&sch)
                .with_config(config)
                .path(y0, &taus)
                .unwrap();
            assert_eq!(&serial, traj);
        }

        assert!(integrate_batch(&sch, config, &starts, &[]).is_err());
    }

    #[test]
    fn test_trajectory_layout() {
        let y0 = [0.0, 1.0, 2.0, 3.0, 1.0, 0.0, 0.0, 0.0];
        let traj = GeodesicIntegrator::new(&Minkowski).path(&y0, &[0.0, 1.0, 2.0]).unwrap();
        let rows = traj.rows();
        assert_eq!(rows.len(), 8);
        assert!(rows.iter().all(|row| row.len() == 3));
        assert_eq!(rows[2], vec![2.0; 3]);
        assert!(traj.component(8).is_err());

        let json = serde_json::to_string(&traj).unwrap();
        let back: Trajectory = serde_json::from_str(&json).unwrap();
        assert_eq!(back, traj);
    }
}
