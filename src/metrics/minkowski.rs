//! Flat spacetime in Cartesian coordinates.

use crate::coordinates::{Chart, Position};
use crate::metrics::{ChristoffelSymbols, FourState, Metric, MetricTensor};

/// `η = diag(1, −1, −1, −1)` in `(t, x, y, z)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Minkowski;

impl Metric for Minkowski {
    fn name(&self) -> &'static str {
        "Minkowski"
    }

    fn mass(&self) -> f64 {
        0.0
    }

    fn chart(&self) -> Chart {
        Chart::Cartesian
    }

    fn metric_dimensionless(&self, _xs: &Position) -> MetricTensor {
        [
            [1.0, 0.0, 0.0, 0.0],
            [0.0, -1.0, 0.0, 0.0],
            [0.0, 0.0, -1.0, 0.0],
            [0.0, 0.0, 0.0, -1.0],
        ]
    }

    fn christoffel_dimensionless(&self, _xs: &Position) -> ChristoffelSymbols {
        [[[0.0; 4]; 4]; 4]
    }

    /// `L_z = x u^y − y u^x`
    fn angular_momentum(&self, state: &FourState) -> f64 {
        state[1] * state[6] - state[2] * state[5]
    }
}
