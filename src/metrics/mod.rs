//! Metric tensors and Christoffel symbols.
//!
//! Each spacetime implements [`Metric`] by supplying its geometrized
//! (`G = c = 1`) metric and connection at a single point. Everything else,
//! batching, SI conversion and the four-velocity normalization, is provided
//! on top of those two functions.
//!
//! Conventions:
//! - signature `(+, −, −, −)`;
//! - `Γ[ρ][μ][ν] = Γ^ρ_{μν}`, symmetric in `μ, ν`;
//! - SI output scales `g_{μν}` by `c^([μ=0] + [ν=0])` and `Γ^ρ_{μν}` by
//!   `c^([μ=0] + [ν=0] − [ρ=0])`.

mod kerr;
mod minkowski;
mod schwarzschild;

pub use kerr::Kerr;
pub use minkowski::Minkowski;
pub use schwarzschild::Schwarzschild;

use serde::{Deserialize, Serialize};

use crate::constants::C_SI;
use crate::coordinates::{Chart, Coordinate, Position, Velocity};
use crate::error::{RelativityError, Result};

/// `g[μ][ν] = g_{μν}`
pub type MetricTensor = [[f64; 4]; 4];

/// `Γ[ρ][μ][ν] = Γ^ρ_{μν}`
pub type ChristoffelSymbols = [[[f64; 4]; 4]; 4];

/// `u^μ = dx^μ/dτ`
pub type FourVelocity = [f64; 4];

/// `[x^0..x^3, u^0..u^3]`, the integrator state.
pub type FourState = [f64; 8];

/// Output unit convention for tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UnitSystem {
    /// Geometrized, `G = c = 1`.
    #[default]
    Dimensionless,
    /// Time index rescaled by powers of `c`.
    Si,
}

/// Where to evaluate: one point or a batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Points {
    Single(Position),
    Batch(Vec<Position>),
}

impl Points {
    /// Interpret a flat row-major buffer with an ndarray-style `shape`.
    ///
    /// Accepts `[4]` (one point) and `[n, 4]` (n points).
    pub fn from_shape(data: &[f64], shape: &[usize]) -> Result<Self> {
        let expected = "(4,) or (N, 4)";
        let numel: usize = shape.iter().product();
        if numel != data.len() {
            return Err(RelativityError::shape(expected, shape));
        }
        match *shape {
            [4] => Ok(Points::Single([data[0], data[1], data[2], data[3]])),
            [_, 4] => Ok(Points::Batch(
                data.chunks_exact(4)
                    .map(|c| [c[0], c[1], c[2], c[3]])
                    .collect(),
            )),
            _ => Err(RelativityError::shape(expected, shape)),
        }
    }
}

impl From<Position> for Points {
    fn from(xs: Position) -> Self {
        Points::Single(xs)
    }
}

impl From<Vec<Position>> for Points {
    fn from(xs: Vec<Position>) -> Self {
        Points::Batch(xs)
    }
}

impl From<&[Position]> for Points {
    fn from(xs: &[Position]) -> Self {
        Points::Batch(xs.to_vec())
    }
}

/// Result shaped like the [`Points`] it was evaluated on.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluated<T> {
    Single(T),
    Batch(Vec<T>),
}

impl<T> Evaluated<T> {
    pub fn single(self) -> Option<T> {
        match self {
            Evaluated::Single(t) => Some(t),
            Evaluated::Batch(_) => None,
        }
    }

    pub fn batch(self) -> Option<Vec<T>> {
        match self {
            Evaluated::Single(_) => None,
            Evaluated::Batch(v) => Some(v),
        }
    }
}

/// A spacetime with closed-form metric and connection.
pub trait Metric {
    fn name(&self) -> &'static str;

    /// Mass in geometrized units (metres).
    fn mass(&self) -> f64;

    /// Chart the closed forms are written in.
    fn chart(&self) -> Chart;

    /// `g_{μν}` at `xs`, geometrized.
    fn metric_dimensionless(&self, xs: &Position) -> MetricTensor;

    /// `Γ^ρ_{μν}` at `xs`, geometrized.
    fn christoffel_dimensionless(&self, xs: &Position) -> ChristoffelSymbols;

    /// `R_s = 2GM/c²`
    fn schwarzschild_radius(&self) -> f64 {
        2.0 * self.mass()
    }

    fn metric_at(&self, xs: &Position, units: UnitSystem) -> MetricTensor {
        let g = self.metric_dimensionless(xs);
        match units {
            UnitSystem::Dimensionless => g,
            UnitSystem::Si => metric_geom_to_si(&g),
        }
    }

    fn metric_batch(&self, xs: &[Position], units: UnitSystem) -> Vec<MetricTensor> {
        xs.iter().map(|x| self.metric_at(x, units)).collect()
    }

    /// Metric at one point or a batch.
    fn metric(&self, points: &Points, units: UnitSystem) -> Evaluated<MetricTensor> {
        match points {
            Points::Single(xs) => Evaluated::Single(self.metric_at(xs, units)),
            Points::Batch(xs) => Evaluated::Batch(self.metric_batch(xs, units)),
        }
    }

    fn christoffel_at(&self, xs: &Position, units: UnitSystem) -> ChristoffelSymbols {
        let gamma = self.christoffel_dimensionless(xs);
        match units {
            UnitSystem::Dimensionless => gamma,
            UnitSystem::Si => christoffel_geom_to_si(&gamma),
        }
    }

    fn christoffel_batch(&self, xs: &[Position], units: UnitSystem) -> Vec<ChristoffelSymbols> {
        xs.iter().map(|x| self.christoffel_at(x, units)).collect()
    }

    /// Christoffel symbols at one point or a batch.
    fn christoffel_symbols(
        &self,
        points: &Points,
        units: UnitSystem,
    ) -> Evaluated<ChristoffelSymbols> {
        match points {
            Points::Single(xs) => Evaluated::Single(self.christoffel_at(xs, units)),
            Points::Batch(xs) => Evaluated::Batch(self.christoffel_batch(xs, units)),
        }
    }

    /// Four-velocity of a massive particle moving with the coordinate's
    /// three-velocity.
    ///
    /// The coordinate is first expressed in [`Metric::chart`]. With rates
    /// `v^i = dx^i/dt`:
    ///
    /// `u_t² = g_00 + 2 g_0i v^i + g_ij v^i v^j`, `u^0 = 1/√u_t²`, `u^i = v^i u^0`
    ///
    /// so that `g_{μν} u^μ u^ν = 1`. Fails when `u_t²` is not positive.
    fn four_velocity(&self, coordinate: &Coordinate) -> Result<FourVelocity> {
        let coordinate = coordinate.convert_to(self.chart());
        let g = self.metric_dimensionless(coordinate.xs());
        let v = coordinate.dxs_dt();

        let mut u_t2 = g[0][0];
        for i in 1..4 {
            u_t2 += 2.0 * g[0][i] * v[i - 1];
            for j in 1..4 {
                u_t2 += g[i][j] * v[i - 1] * v[j - 1];
            }
        }

        if !(u_t2 > 0.0 && u_t2.is_finite()) {
            return Err(RelativityError::InvalidState { normalization: u_t2 });
        }

        let u0 = 1.0 / u_t2.sqrt();
        Ok([u0, v[0] * u0, v[1] * u0, v[2] * u0])
    }

    /// `[xs, u]`, the integrator's initial condition.
    fn four_state_vector(&self, coordinate: &Coordinate) -> Result<FourState> {
        let u = self.four_velocity(coordinate)?;
        let xs = coordinate.convert_to(self.chart());
        let x = xs.xs();
        Ok([x[0], x[1], x[2], x[3], u[0], u[1], u[2], u[3]])
    }

    /// Chart rates `dx^i/dt = u^i / u^0`.
    fn rate_from_four_velocity(&self, us: &FourVelocity) -> Velocity {
        [us[1] / us[0], us[2] / us[0], us[3] / us[0]]
    }

    /// `g_{μν} u^μ u^ν`.
    fn norm_squared(&self, state: &FourState) -> f64 {
        let (x, u) = split_state(state);
        contract(&self.metric_dimensionless(&x), &u, &u)
    }

    /// Specific energy `E = u_t = g_{0ν} u^ν`.
    fn energy(&self, state: &FourState) -> f64 {
        let (x, u) = split_state(state);
        let g = self.metric_dimensionless(&x);
        (0..4).map(|nu| g[0][nu] * u[nu]).sum()
    }

    /// Axial angular momentum `L = −u_φ = −g_{3ν} u^ν`.
    fn angular_momentum(&self, state: &FourState) -> f64 {
        let (x, u) = split_state(state);
        let g = self.metric_dimensionless(&x);
        -(0..4).map(|nu| g[3][nu] * u[nu]).sum::<f64>()
    }

    /// Carter constant, where the spacetime has one.
    fn carter_constant(&self, _state: &FourState) -> Option<f64> {
        None
    }
}

/// Split an 8-state into position and four-velocity.
pub fn split_state(state: &FourState) -> (Position, FourVelocity) {
    (
        [state[0], state[1], state[2], state[3]],
        [state[4], state[5], state[6], state[7]],
    )
}

/// `g_{μν} a^μ b^ν`
pub fn contract(g: &MetricTensor, a: &FourVelocity, b: &FourVelocity) -> f64 {
    let mut sum = 0.0;
    for mu in 0..4 {
        for nu in 0..4 {
            sum += g[mu][nu] * a[mu] * b[nu];
        }
    }
    sum
}

/// Geometrized (`x^0 = ct`) metric to SI (`x^0 = t`).
pub fn metric_geom_to_si(g: &MetricTensor) -> MetricTensor {
    let mut out = [[0.0; 4]; 4];
    for mu in 0..4 {
        for nu in 0..4 {
            let n_zero = (mu == 0) as i32 + (nu == 0) as i32;
            out[mu][nu] = C_SI.powi(n_zero) * g[mu][nu];
        }
    }
    out
}

/// Geometrized Christoffel symbols to SI.
pub fn christoffel_geom_to_si(gamma: &ChristoffelSymbols) -> ChristoffelSymbols {
    let mut out = [[[0.0; 4]; 4]; 4];
    for rho in 0..4 {
        for mu in 0..4 {
            for nu in 0..4 {
                let exponent = (mu == 0) as i32 + (nu == 0) as i32 - (rho == 0) as i32;
                out[rho][mu][nu] = C_SI.powi(exponent) * gamma[rho][mu][nu];
            }
        }
    }
    out
}

/// `Γ^ρ_{μν} = ½ g^{ρσ} (∂_μ g_{σν} + ∂_ν g_{σμ} − ∂_σ g_{μν})`
///
/// `dg[σ]` holds `∂_σ g_{μν}`.
pub(crate) fn christoffel_from_derivatives(
    g_inv: &MetricTensor,
    dg: &[MetricTensor; 4],
) -> ChristoffelSymbols {
    let mut gamma = [[[0.0; 4]; 4]; 4];
    for rho in 0..4 {
        for mu in 0..4 {
            for nu in mu..4 {
                let mut sum = 0.0;
                for sigma in 0..4 {
                    if g_inv[rho][sigma] == 0.0 {
                        continue;
                    }
                    sum += g_inv[rho][sigma]
                        * (dg[mu][sigma][nu] + dg[nu][sigma][mu] - dg[sigma][mu][nu]);
                }
                gamma[rho][mu][nu] = 0.5 * sum;
                gamma[rho][nu][mu] = 0.5 * sum;
            }
        }
    }
    gamma
}

// ── Closed set of spacetimes ──

/// Any of the supported spacetimes.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Spacetime {
    Minkowski(Minkowski),
    Schwarzschild(Schwarzschild),
    Kerr(Kerr),
}

impl Spacetime {
    fn inner(&self) -> &dyn Metric {
        match self {
            Spacetime::Minkowski(m) => m,
            Spacetime::Schwarzschild(s) => s,
            Spacetime::Kerr(k) => k,
        }
    }
}

impl From<Minkowski> for Spacetime {
    fn from(m: Minkowski) -> Self {
        Spacetime::Minkowski(m)
    }
}

impl From<Schwarzschild> for Spacetime {
    fn from(s: Schwarzschild) -> Self {
        Spacetime::Schwarzschild(s)
    }
}

impl From<Kerr> for Spacetime {
    fn from(k: Kerr) -> Self {
        Spacetime::Kerr(k)
    }
}

impl Metric for Spacetime {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn mass(&self) -> f64 {
        self.inner().mass()
    }

    fn chart(&self) -> Chart {
        self.inner().chart()
    }

    fn metric_dimensionless(&self, xs: &Position) -> MetricTensor {
        self.inner().metric_dimensionless(xs)
    }

    fn christoffel_dimensionless(&self, xs: &Position) -> ChristoffelSymbols {
        self.inner().christoffel_dimensionless(xs)
    }

    fn angular_momentum(&self, state: &FourState) -> f64 {
        self.inner().angular_momentum(state)
    }

    fn carter_constant(&self, state: &FourState) -> Option<f64> {
        self.inner().carter_constant(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn spacetimes() -> Vec<(Spacetime, Position)> {
        vec![
            (Minkowski.into(), [0.0, 1.0, -2.0, 3.0]),
            (Schwarzschild::new(1.0).unwrap().into(), [0.0, 8.0, 1.1, 0.4]),
            (Kerr::new(1.0, 0.7).unwrap().into(), [0.0, 6.0, 0.8, 2.0]),
        ]
    }

    #[test]
    fn test_metric_is_symmetric() {
        for (st, xs) in spacetimes() {
            for units in [UnitSystem::Dimensionless, UnitSystem::Si] {
                let g = st.metric_at(&xs, units);
                for mu in 0..4 {
                    for nu in 0..4 {
                        assert_eq!(g[mu][nu], g[nu][mu], "{} g[{mu}][{nu}]", st.name());
                    }
                }
            }
        }
    }

    #[test]
    fn test_christoffel_lower_symmetric() {
        for (st, xs) in spacetimes() {
            let gamma = st.christoffel_at(&xs, UnitSystem::Dimensionless);
            for rho in 0..4 {
                for mu in 0..4 {
                    for nu in 0..4 {
                        assert_eq!(gamma[rho][mu][nu], gamma[rho][nu][mu]);
                    }
                }
            }
        }
    }

    #[test]
    fn test_si_round_trip() {
        for (st, xs) in spacetimes() {
            let g = st.metric_at(&xs, UnitSystem::Dimensionless);
            let g_si = st.metric_at(&xs, UnitSystem::Si);
            for mu in 0..4 {
                for nu in 0..4 {
                    let n0 = (mu == 0) as i32 + (nu == 0) as i32;
                    assert_relative_eq!(
                        g_si[mu][nu] / C_SI.powi(n0),
                        g[mu][nu],
                        max_relative = 1e-14,
                    );
                }
            }

            let gamma = st.christoffel_at(&xs, UnitSystem::Dimensionless);
            let gamma_si = st.christoffel_at(&xs, UnitSystem::Si);
            for rho in 0..4 {
                for mu in 0..4 {
                    for nu in 0..4 {
                        let e = (mu == 0) as i32 + (nu == 0) as i32 - (rho == 0) as i32;
                        assert_relative_eq!(
                            gamma_si[rho][mu][nu] / C_SI.powi(e),
                            gamma[rho][mu][nu],
                            max_relative = 1e-14
                        );
                    }
                }
            }
        }
    }

    #[test]
    fn test_points_from_shape() {
        let one = Points::from_shape(&[0.0, 1.0, 2.0, 3.0], &[4]).unwrap();
        assert_eq!(one, Points::Single([0.0, 1.0, 2.0, 3.0]));

        let data: Vec<f64> = (0..8).map(f64::from).collect();
        let two = Points::from_shape(&data, &[2, 4]).unwrap();
        assert_eq!(two, Points::Batch(vec![[0.0, 1.0, 2.0, 3.0], [4.0, 5.0, 6.0, 7.0]]));

        assert!(matches!(
            Points::from_shape(&data, &[2, 2, 2]),
            Err(RelativityError::Shape { .. })
        ));
        assert!(Points::from_shape(&data[..3], &[3]).is_err());
        assert!(Points::from_shape(&data, &[4]).is_err());
    }

    #[test]
    fn test_batch_matches_single() {
        let st: Spacetime = Kerr::new(2.0, 0.3).unwrap().into();
        let xs = vec![[0.0, 10.0, 1.0, 0.0], [0.0, 20.0, 0.5, 1.0], [1.0, 7.0, 2.0, 3.0]];
        let batch = st
            .christoffel_symbols(&Points::from(xs.clone()), UnitSystem::Si)
            .batch()
            .unwrap();
        assert_eq!(batch.len(), 3);
        for (x, gamma) in xs.iter().zip(&batch) {
            assert_eq!(*gamma, st.christoffel_at(x, UnitSystem::Si));
        }

        let single = st.metric(&Points::Single(xs[0]), UnitSystem::Dimensionless);
        assert_eq!(single.single().unwrap(), st.metric_dimensionless(&xs[0]));
    }

    #[test]
    fn test_four_velocity_normalized() {
        use crate::coordinates::Coordinate;

        let cases = [
            (
                Spacetime::from(Minkowski),
                Coordinate::new(Chart::Cartesian, [0.0, 1.0, 2.0, 3.0], [0.3, -0.2, 0.5]).unwrap(),
            ),
            (
                Schwarzschild::new(1.0).unwrap().into(),
                Coordinate::new(Chart::Spherical, [0.0, 10.0, 1.2, 0.0], [0.1, 0.05, 0.3]).unwrap(),
            ),
            (
                Kerr::new(1.0, 0.9).unwrap().into(),
                Coordinate::new(
                    Chart::BoyerLindquist { a: 0.9 },
                    [0.0, 8.0, 1.0, 0.5],
                    [-0.1, 0.1, 0.25],
                )
                .unwrap(),
            ),
        ];
        for (st, coord) in cases {
            let state = st.four_state_vector(&coord).unwrap();
            assert_relative_eq!(st.norm_squared(&state), 1.0, epsilon = 1e-12);

            let u = [state[4], state[5], state[6], state[7]];
            let rates = st.rate_from_four_velocity(&u);
            for i in 0..3 {
                assert_relative_eq!(rates[i], coord.dxs_dt()[i], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_four_velocity_converts_chart() {
        use crate::coordinates::Coordinate;

        let sch = Schwarzschild::new(1.0).unwrap();
        let sph = Coordinate::new(
            Chart::Spherical,
            [0.0, 10.0, 1.2, 0.3],
            [0.1, 0.05, 0.3],
        )
        .unwrap();
        let cart = sph.to_cartesian();
        let u_sph = sch.four_velocity(&sph).unwrap();
        let u_cart = sch.four_velocity(&cart).unwrap();
        for mu in 0..4 {
            assert_relative_eq!(u_sph[mu], u_cart[mu], epsilon = 1e-10);
        }
    }

    #[test]
    fn test_four_velocity_inside_horizon_is_invalid() {
        use crate::coordinates::Coordinate;

        // Static observer inside r = R_s cannot exist
        let sch = Schwarzschild::new(1.0).unwrap();
        let inside = Coordinate::at_rest(Chart::Spherical, [0.0, 1.5, 1.0, 0.0]);
        assert!(matches!(
            sch.four_velocity(&inside),
            Err(RelativityError::InvalidState { .. })
        ));
    }
}
