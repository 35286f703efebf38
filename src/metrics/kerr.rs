//! Kerr spacetime in Boyer-Lindquist coordinates `(t, r, θ, φ)`.

use tracing::debug;

use crate::coordinates::{Chart, Position};
use crate::error::{RelativityError, Result};
use crate::metrics::{
    christoffel_from_derivatives, split_state, ChristoffelSymbols, FourState, Metric, MetricTensor,
};
use crate::units::{self, Value};

/// Rotating black hole of mass `M` and dimensionless spin `a* = J/M²`.
///
/// With `α = a* M`, `Σ = r² + α² cos²θ` and `Δ = r² − R_s r + α²`:
///
/// ```text
/// g_tt = 1 − R_s r / Σ
/// g_tφ = R_s r α sin²θ / Σ
/// g_rr = −Σ / Δ
/// g_θθ = −Σ
/// g_φφ = −(r² + α² + R_s r α² sin²θ / Σ) sin²θ
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Kerr {
    mass: f64,
    spin: f64,
}

impl Kerr {
    /// `spin` is the dimensionless `a*`, limited to `|a*| ≤ 1`.
    pub fn new(mass: impl Into<Value>, spin: f64) -> Result<Self> {
        let mass = units::validate_mass(mass)?;
        if !spin.is_finite() || spin.abs() > 1.0 {
            return Err(RelativityError::invalid_argument(format!(
                "spin parameter must lie in [-1, 1], got {spin}"
            )));
        }
        debug!(mass, spin, "building Kerr spacetime");
        Ok(Kerr { mass, spin })
    }

    pub fn spin(&self) -> f64 {
        self.spin
    }

    /// `α = a* M`, in metres.
    pub fn spin_length(&self) -> f64 {
        self.spin * self.mass
    }

    /// `r₊ = M + √(M² − α²)`
    pub fn outer_horizon(&self) -> f64 {
        let a = self.spin_length();
        self.mass + (self.mass * self.mass - a * a).sqrt()
    }

    /// `r₋ = M − √(M² − α²)`
    pub fn inner_horizon(&self) -> f64 {
        let a = self.spin_length();
        self.mass - (self.mass * self.mass - a * a).sqrt()
    }

    /// Metric and its `r`, `θ` partial derivatives.
    fn metric_with_derivatives(&self, xs: &Position) -> (MetricTensor, MetricTensor, MetricTensor) {
        let rs = self.schwarzschild_radius();
        let a = self.spin_length();
        let a2 = a * a;
        let (r, theta) = (xs[1], xs[2]);
        let (s, c) = theta.sin_cos();
        let (s2, sc) = (s * s, s * c);

        let sigma = r * r + a2 * c * c;
        let delta = r * r - rs * r + a2;
        let sigma2 = sigma * sigma;
        let dsigma_dth = -2.0 * a2 * sc;
        // ∂_r (r/Σ) = (Σ − 2r²)/Σ²
        let dq_dr = (sigma - 2.0 * r * r) / sigma2;
        // ∂_θ (sin²θ/Σ) = (2 sinθ cosθ Σ − sin²θ ∂_θΣ)/Σ²
        let dp_dth = (2.0 * sc * sigma - s2 * dsigma_dth) / sigma2;

        let g_tt = 1.0 - rs * r / sigma;
        let g_tp = rs * r * a * s2 / sigma;
        let g_rr = -sigma / delta;
        let g_thth = -sigma;
        let b = r * r + a2 + rs * r * a2 * s2 / sigma;
        let g_pp = -b * s2;

        let mut g = [[0.0; 4]; 4];
        g[0][0] = g_tt;
        g[0][3] = g_tp;
        g[3][0] = g_tp;
        g[1][1] = g_rr;
        g[2][2] = g_thth;
        g[3][3] = g_pp;

        let mut dr = [[0.0; 4]; 4];
        dr[0][0] = -rs * dq_dr;
        dr[0][3] = rs * a * s2 * dq_dr;
        dr[3][0] = dr[0][3];
        dr[1][1] = -(2.0 * r * delta - sigma * (2.0 * r - rs)) / (delta * delta);
        dr[2][2] = -2.0 * r;
        dr[3][3] = -(2.0 * r + rs * a2 * s2 * dq_dr) * s2;

        let mut dth = [[0.0; 4]; 4];
        dth[0][0] = rs * r * dsigma_dth / sigma2;
        dth[0][3] = rs * r * a * dp_dth;
        dth[3][0] = dth[0][3];
        dth[1][1] = -dsigma_dth / delta;
        dth[2][2] = -dsigma_dth;
        dth[3][3] = -(rs * r * a2 * dp_dth * s2 + b * 2.0 * sc);

        (g, dr, dth)
    }
}

impl Metric for Kerr {
    fn name(&self) -> &'static str {
        "Kerr"
    }

    fn mass(&self) -> f64 {
        self.mass
    }

    fn chart(&self) -> Chart {
        Chart::BoyerLindquist {
            a: self.spin_length(),
        }
    }

    fn metric_dimensionless(&self, xs: &Position) -> MetricTensor {
        self.metric_with_derivatives(xs).0
    }

    fn christoffel_dimensionless(&self, xs: &Position) -> ChristoffelSymbols {
        let (g, dr, dth) = self.metric_with_derivatives(xs);

        // t–φ block inverts as a 2×2, r and θ are diagonal
        let det = g[0][0] * g[3][3] - g[0][3] * g[0][3];
        let mut g_inv = [[0.0; 4]; 4];
        g_inv[0][0] = g[3][3] / det;
        g_inv[0][3] = -g[0][3] / det;
        g_inv[3][0] = g_inv[0][3];
        g_inv[3][3] = g[0][0] / det;
        g_inv[1][1] = 1.0 / g[1][1];
        g_inv[2][2] = 1.0 / g[2][2];

        let zero = [[0.0; 4]; 4];
        christoffel_from_derivatives(&g_inv, &[zero, dr, dth, zero])
    }

    fn carter_constant(&self, state: &FourState) -> Option<f64> {
        Some(carter_constant(self, self.spin_length(), state))
    }
}

/// `Q = u_θ² + cos²θ (α² (1 − E²) + L² / sin²θ)`
///
/// Shared by every Boyer-Lindquist spacetime; `alpha` is the spin length.
pub(crate) fn carter_constant<M: Metric + ?Sized>(
    metric: &M,
    alpha: f64,
    state: &FourState,
) -> f64 {
    let (x, u) = split_state(state);
    let g = metric.metric_dimensionless(&x);
    let u_theta = g[2][2] * u[2];
    let energy = metric.energy(state);
    let l = metric.angular_momentum(state);
    let (s, c) = x[2].sin_cos();

    u_theta * u_theta + c * c * (alpha * alpha * (1.0 - energy * energy) + l * l / (s * s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::Coordinate;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_spin_bounds() {
        assert!(Kerr::new(1.0, 1.0).is_ok());
        assert!(Kerr::new(1.0, -1.0).is_ok());
        assert!(matches!(
            Kerr::new(1.0, 1.01),
            Err(RelativityError::InvalidArgument(_))
        ));
        assert!(Kerr::new(1.0, f64::NAN).is_err());
        assert!(Kerr::new(-1.0, 0.5).is_err());
    }

    #[test]
    fn test_horizons() {
        let kerr = Kerr::new(2.0, 0.6).unwrap();
        assert_relative_eq!(kerr.spin_length(), 1.2, epsilon = 1e-15);
        assert_relative_eq!(kerr.outer_horizon(), 3.6, epsilon = 1e-12);
        assert_relative_eq!(kerr.inner_horizon(), 0.4, epsilon = 1e-12);

        // Δ vanishes at both horizons, so g_rr diverges
        let g = kerr.metric_dimensionless(&[0.0, kerr.outer_horizon(), 1.0, 0.0]);
        assert!(g[1][1].abs() > 1e12 || !g[1][1].is_finite());

        let extremal = Kerr::new(1.0, 1.0).unwrap();
        assert_relative_eq!(extremal.outer_horizon(), 1.0, epsilon = 1e-15);

        let schwarzschild_like = Kerr::new(1.0, 0.0).unwrap();
        assert_relative_eq!(schwarzschild_like.outer_horizon(), 2.0, epsilon = 1e-15);
    }

    #[test]
    fn test_metric_components() {
        let kerr = Kerr::new(1.0, 0.5).unwrap();
        let (r, theta) = (4.0_f64, 1.0_f64);
        let g = kerr.metric_dimensionless(&[0.0, r, theta, 0.0]);

        let a = 0.5;
        let sigma = r * r + a * a * theta.cos().powi(2);
        let delta = r * r - 2.0 * r + a * a;
        let s2 = theta.sin().powi(2);
        assert_relative_eq!(g[0][0], 1.0 - 2.0 * r / sigma, max_relative = 1e-14);
        assert_relative_eq!(g[0][3], 2.0 * r * a * s2 / sigma, max_relative = 1e-14);
        assert_relative_eq!(g[1][1], -sigma / delta, max_relative = 1e-14);
        assert_relative_eq!(g[2][2], -sigma, max_relative = 1e-14);
        assert_relative_eq!(
            g[3][3],
            -(r * r + a * a + 2.0 * r * a * a * s2 / sigma) * s2,
            max_relative = 1e-14
        );
        // Frame dragging follows the sign of the spin
        assert!(g[0][3] > 0.0);
        let counter = Kerr::new(1.0, -0.5).unwrap().metric_dimensionless(&[0.0, r, theta, 0.0]);
        assert_relative_eq!(counter[0][3], -g[0][3], max_relative = 1e-14);
    }

    #[test]
    fn test_christoffel_matches_finite_differences() {
        let kerr = Kerr::new(1.0, 0.8).unwrap();
        let xs = [0.0, 5.0, 0.9, 0.3];
        let h = 1e-5;

        let partial = |axis: usize| {
            let (mut hi, mut lo) = (xs, xs);
            hi[axis] += h;
            lo[axis] -= h;
            let (gh, gl) = (kerr.metric_dimensionless(&hi), kerr.metric_dimensionless(&lo));
            let mut d = [[0.0; 4]; 4];
            for mu in 0..4 {
                for nu in 0..4 {
                    d[mu][nu] = (gh[mu][nu] - gl[mu][nu]) / (2.0 * h);
                }
            }
            d
        };
        let zero = [[0.0; 4]; 4];
        let dg = [zero, partial(1), partial(2), zero];

        let (g, _, _) = kerr.metric_with_derivatives(&xs);
        let det = g[0][0] * g[3][3] - g[0][3] * g[0][3];
        let mut g_inv = [[0.0; 4]; 4];
        g_inv[0][0] = g[3][3] / det;
        g_inv[0][3] = -g[0][3] / det;
        g_inv[3][0] = g_inv[0][3];
        g_inv[3][3] = g[0][0] / det;
        g_inv[1][1] = 1.0 / g[1][1];
        g_inv[2][2] = 1.0 / g[2][2];

        // g · g⁻¹ = 1
        for mu in 0..4 {
            for nu in 0..4 {
                let prod: f64 = (0..4).map(|k| g[mu][k] * g_inv[k][nu]).sum();
                assert_relative_eq!(prod, if mu == nu { 1.0 } else { 0.0 }, epsilon = 1e-12);
            }
        }

        let expected = christoffel_from_derivatives(&g_inv, &dg);
        let gamma = kerr.christoffel_dimensionless(&xs);
        for rho in 0..4 {
            for mu in 0..4 {
                for nu in 0..4 {
                    assert_relative_eq!(gamma[rho][mu][nu], expected[rho][mu][nu], epsilon = 1e-7);
                }
            }
        }
    }

    #[test]
    fn test_equatorial_orbit_has_zero_carter_constant() {
        let kerr = Kerr::new(1.0, 0.9).unwrap();
        let coord = Coordinate::new(
            kerr.chart(),
            [0.0, 10.0, FRAC_PI_2, 0.0],
            [0.0, 0.0, 0.3],
        )
        .unwrap();
        let state = kerr.four_state_vector(&coord).unwrap();
        assert!(kerr.carter_constant(&state).unwrap().abs() < 1e-12);

        let inclined = Coordinate::new(
            kerr.chart(),
            [0.0, 10.0, 1.0, 0.0],
            [0.0, 0.2, 0.2],
        )
        .unwrap();
        let state = kerr.four_state_vector(&inclined).unwrap();
        assert!(kerr.carter_constant(&state).unwrap() > 0.0);
    }
}
