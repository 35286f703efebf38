//! Schwarzschild spacetime in spherical coordinates `(t, r, θ, φ)`.

use tracing::debug;

use crate::coordinates::{Chart, Position};
use crate::error::Result;
use crate::metrics::{kerr, ChristoffelSymbols, FourState, Metric, MetricTensor};
use crate::units::{self, Value};

/// Non-rotating black hole of mass `M`.
///
/// `ds² = (1 − R_s/r) dt² − dr²/(1 − R_s/r) − r² dθ² − r² sin²θ dφ²`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Schwarzschild {
    mass: f64,
}

impl Schwarzschild {
    /// `mass` is a bare geometrized length or a tagged mass.
    pub fn new(mass: impl Into<Value>) -> Result<Self> {
        let mass = units::validate_mass(mass)?;
        debug!(mass, r_s = 2.0 * mass, "building Schwarzschild spacetime");
        Ok(Schwarzschild { mass })
    }
}

impl Metric for Schwarzschild {
    fn name(&self) -> &'static str {
        "Schwarzschild"
    }

    fn mass(&self) -> f64 {
        self.mass
    }

    fn chart(&self) -> Chart {
        Chart::Spherical
    }

    fn metric_dimensionless(&self, xs: &Position) -> MetricTensor {
        let (r, theta) = (xs[1], xs[2]);
        let a = 1.0 - self.schwarzschild_radius() / r;
        let sin_t = theta.sin();

        [
            [a, 0.0, 0.0, 0.0],
            [0.0, -1.0 / a, 0.0, 0.0],
            [0.0, 0.0, -r * r, 0.0],
            [0.0, 0.0, 0.0, -r * r * sin_t * sin_t],
        ]
    }

    fn christoffel_dimensionless(&self, xs: &Position) -> ChristoffelSymbols {
        let rs = self.schwarzschild_radius();
        let (r, theta) = (xs[1], xs[2]);
        let (sin_t, cos_t) = theta.sin_cos();

        let t_tr = rs / (2.0 * r * (r - rs));
        let cot = cos_t / sin_t;

        let mut gamma = [[[0.0; 4]; 4]; 4];

        gamma[0][0][1] = t_tr;
        gamma[0][1][0] = t_tr;

        gamma[1][0][0] = rs * (r - rs) / (2.0 * r * r * r);
        gamma[1][1][1] = -t_tr;
        gamma[1][2][2] = -(r - rs);
        gamma[1][3][3] = -(r - rs) * sin_t * sin_t;

        gamma[2][1][2] = 1.0 / r;
        gamma[2][2][1] = 1.0 / r;
        gamma[2][3][3] = -sin_t * cos_t;

        gamma[3][1][3] = 1.0 / r;
        gamma[3][3][1] = 1.0 / r;
        gamma[3][2][3] = cot;
        gamma[3][3][2] = cot;

        gamma
    }

    /// Total angular momentum squared minus `L_z²`; the `a = 0` limit of
    /// the Kerr Carter constant.
    fn carter_constant(&self, state: &FourState) -> Option<f64> {
        Some(kerr::carter_constant(self, 0.0, state))
    }
}
