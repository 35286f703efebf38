//! Conserved quantities along a computed trajectory.
//!
//! Along an exact geodesic `g_{μν} u^μ u^ν`, `E` and, for axisymmetric
//! spacetimes, `L` and the Carter constant `Q` are constant. Their drift
//! measures integration error.

use crate::geodesic::Trajectory;
use crate::metrics::Metric;

/// `g_{μν} u^μ u^ν` at every sample, `1` for a timelike geodesic.
pub fn ds_dtau<M: Metric + ?Sized>(metric: &M, trajectory: &Trajectory) -> Vec<f64> {
    trajectory.states().iter().map(|s| metric.norm_squared(s)).collect()
}

/// `E = g_{0ν} u^ν` at every sample.
pub fn specific_energy<M: Metric + ?Sized>(metric: &M, trajectory: &Trajectory) -> Vec<f64> {
    trajectory.states().iter().map(|s| metric.energy(s)).collect()
}

/// Axial angular momentum at every sample.
pub fn angular_momentum<M: Metric + ?Sized>(metric: &M, trajectory: &Trajectory) -> Vec<f64> {
    trajectory
        .states()
        .iter()
        .map(|s| metric.angular_momentum(s))
        .collect()
}

/// Carter constant at every sample, `None` where the spacetime has none.
pub fn carter_constant<M: Metric + ?Sized>(
    metric: &M,
    trajectory: &Trajectory,
) -> Option<Vec<f64>> {
    trajectory
        .states()
        .iter()
        .map(|s| metric.carter_constant(s))
        .collect()
}

/// `max |q_i − q_0| / max(|q_0|, 1e-300)`; zero for an empty series.
pub fn relative_drift(series: &[f64]) -> f64 {
    let Some(&q0) = series.first() else {
        return 0.0;
    };
    let scale = q0.abs().max(1e-300);
    series
        .iter()
        .map(|q| (q - q0).abs() / scale)
        .fold(0.0, f64::max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinates::{Chart, Coordinate};
    use crate::geodesic::{GeodesicIntegrator, IntegratorConfig};
    use crate::metrics::{Kerr, Minkowski, Schwarzschild};
    use approx::assert_relative_eq;

    fn grid(end: f64, n: usize) -> Vec<f64> {
        (0..n).map(|i| end * i as f64 / (n - 1) as f64).collect()
    }

    #[test]
    fn test_relative_drift() {
        assert_eq!(relative_drift(&[]), 0.0);
        assert_eq!(relative_drift(&[2.0, 2.0]), 0.0);
        assert_relative_eq!(relative_drift(&[2.0, 2.1, 1.7]), 0.15, epsilon = 1e-12);
        assert!(relative_drift(&[0.0, 1e-310]) > 0.0);
    }

    #[test]
    fn test_minkowski_has_no_carter_constant() {
        let traj = GeodesicIntegrator::new(&Minkowski)
            .path(&[0.0, 1.0, 0.0, 0.0, 1.25, 0.0, 0.75, 0.0], &grid(4.0, 5))
            .unwrap();
        assert!(carter_constant(&Minkowski, &traj).is_none());

        // L = x u^y − y u^x
        for l in angular_momentum(&Minkowski, &traj) {
            assert_relative_eq!(l, 0.75, epsilon = 1e-12);
        }
        for n in ds_dtau(&Minkowski, &traj) {
            assert_relative_eq!(n, 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_schwarzschild_invariants_conserved() {
        let sch = Schwarzschild::new(1.0).unwrap();
        let start = Coordinate::new(
            Chart::Spherical,
            [0.0, 12.0, 1.0, 0.0],
            [0.1, 0.15, 0.2],
        )
        .unwrap();
        let traj = GeodesicIntegrator::new(&sch)
            .with_config(IntegratorConfig::precise())
            .path_from(&start, &grid(100.0, 21))
            .unwrap();

        assert!(relative_drift(&ds_dtau(&sch, &traj)) < 1e-8);
        assert!(relative_drift(&specific_energy(&sch, &traj)) < 1e-8);
        assert!(relative_drift(&angular_momentum(&sch, &traj)) < 1e-8);
        let q = carter_constant(&sch, &traj).unwrap();
        assert!(q[0] > 0.0);
        assert!(relative_drift(&q) < 1e-7);
    }

    #[test]
    fn test_kerr_invariants_conserved() {
        let kerr = Kerr::new(1.0, 0.9).unwrap();
        let start = Coordinate::new(
            kerr.chart(),
            [0.0, 10.0, 1.1, 0.0],
            [0.05, 0.2, 0.25],
        )
        .unwrap();
        let traj = GeodesicIntegrator::new(&kerr)
            .with_config(IntegratorConfig::precise())
            .path_from(&start, &grid(100.0, 21))
            .unwrap();

        let norms = ds_dtau(&kerr, &traj);
        assert_relative_eq!(norms[0], 1.0, epsilon = 1e-12);
        assert!(relative_drift(&norms) < 1e-8);
        assert!(relative_drift(&specific_energy(&kerr, &traj)) < 1e-8);
        assert!(relative_drift(&angular_momentum(&kerr, &traj)) < 1e-8);
        assert!(relative_drift(&carter_constant(&kerr, &traj).unwrap()) < 1e-7);
    }
}
