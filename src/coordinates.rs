//! Coordinate charts and chart-tagged spacetime points.
//!
//! A [`Coordinate`] is a position `(x0, x1, x2, x3)` plus a three-velocity in
//! one chart. The velocity is held twice:
//!
//! - `vs`: physical components with the angular directions scaled by their
//!   radius, so magnitudes are comparable across charts;
//! - `dxs_dt`: chart-native rates `dx^i/dt`, which is what the metric needs.
//!
//! Exactly one of them is supplied by the caller; the chart derives the other.
//!
//! Chart changes always go through the canonical Cartesian representation
//! (`self → Cartesian → target`), so each chart only knows two transforms.
//!
//! # Singular loci
//! The inverse maps and the rate scalings are undefined on the axis
//! (`ρ = 0` cylindrical, `r = 0` or `sin θ = 0` spherical/Boyer-Lindquist, and
//! the ring `r = 0, θ = π/2` for Boyer-Lindquist with `a ≠ 0`). Nothing is
//! clamped there: the results are non-finite. Do not seed trajectories on
//! these sets.

use std::collections::BTreeMap;
use std::ops::Range;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{RelativityError, Result};
use crate::units::{self, Dimension, UnitError, Value};

/// Four-position `(x0, x1, x2, x3)`.
pub type Position = [f64; 4];

/// Three-velocity, either physical `vs` or rates `dxs_dt`.
pub type Velocity = [f64; 3];

/// Capabilities every chart provides.
pub trait CoordinateChart {
    /// Registry name.
    fn name(&self) -> &'static str;

    /// Dimension of each position slot, for tagged input.
    fn position_dimensions(&self) -> [Dimension; 4];

    /// Dimension of each rate slot `dx^i/dt`, for tagged input.
    fn rate_dimensions(&self) -> [Dimension; 3];

    /// Map `(xs, vs)` in this chart to Cartesian `(t, x, y, z)` and `(vx, vy, vz)`.
    fn to_cartesian(&self, xs: &Position, vs: &Velocity) -> (Position, Velocity);

    /// Inverse of [`CoordinateChart::to_cartesian`].
    fn from_cartesian(&self, xs: &Position, vs: &Velocity) -> (Position, Velocity);

    /// Physical velocity from chart rates at `xs`.
    fn velocity_from_rate(&self, xs: &Position, dxs_dt: &Velocity) -> Velocity;

    /// Chart rates from physical velocity at `xs`.
    fn rate_from_velocity(&self, xs: &Position, vs: &Velocity) -> Velocity;
}

// ── Charts ──

/// `(t, x, y, z)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cartesian;

/// `(t, ρ, φ, z)`; `vs = (ρ̇, ρ φ̇, ż)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Cylindrical;

/// `(t, r, θ, φ)`; `vs = (ṙ, r θ̇, r sin θ φ̇)`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Spherical;

/// Boyer-Lindquist `(t, r, θ, φ)` with spin length `a` (geometrized metres).
///
/// `x = √(r²+a²) sin θ cos φ`, `y = √(r²+a²) sin θ sin φ`, `z = r cos θ`.
/// Velocities are scaled like [`Spherical`]; with `a = 0` the two coincide.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoyerLindquist {
    pub a: f64,
}

impl CoordinateChart for Cartesian {
    fn name(&self) -> &'static str {
        "Cartesian"
    }

    fn position_dimensions(&self) -> [Dimension; 4] {
        [Dimension::Time, Dimension::Length, Dimension::Length, Dimension::Length]
    }

    fn rate_dimensions(&self) -> [Dimension; 3] {
        [Dimension::Velocity; 3]
    }

    fn to_cartesian(&self, xs: &Position, vs: &Velocity) -> (Position, Velocity) {
        (*xs, *vs)
    }

    fn from_cartesian(&self, xs: &Position, vs: &Velocity) -> (Position, Velocity) {
        (*xs, *vs)
    }

    fn velocity_from_rate(&self, _xs: &Position, dxs_dt: &Velocity) -> Velocity {
        *dxs_dt
    }

    fn rate_from_velocity(&self, _xs: &Position, vs: &Velocity) -> Velocity {
        *vs
    }
}

impl CoordinateChart for Cylindrical {
    fn name(&self) -> &'static str {
        "Cylindrical"
    }

    fn position_dimensions(&self) -> [Dimension; 4] {
        [Dimension::Time, Dimension::Length, Dimension::Angle, Dimension::Length]
    }

    fn rate_dimensions(&self) -> [Dimension; 3] {
        [Dimension::Velocity, Dimension::AngularVelocity, Dimension::Velocity]
    }

    fn to_cartesian(&self, xs: &Position, vs: &Velocity) -> (Position, Velocity) {
        let (rho, phi, z) = (xs[1], xs[2], xs[3]);
        let (sin_phi, cos_phi) = phi.sin_cos();

        let xs_cart = [xs[0], rho * cos_phi, rho * sin_phi, z];
        let vs_cart = [
            cos_phi * vs[0] - sin_phi * vs[1],
            sin_phi * vs[0] + cos_phi * vs[1],
            vs[2],
        ];
        (xs_cart, vs_cart)
    }

    fn from_cartesian(&self, xs: &Position, vs: &Velocity) -> (Position, Velocity) {
        let rho = xs[1].hypot(xs[2]);
        let phi = xs[2].atan2(xs[1]);
        let (sin_phi, cos_phi) = phi.sin_cos();

        let xs_cyl = [xs[0], rho, phi, xs[3]];
        let vs_cyl = [
            cos_phi * vs[0] + sin_phi * vs[1],
            -sin_phi * vs[0] + cos_phi * vs[1],
            vs[2],
        ];
        (xs_cyl, vs_cyl)
    }

    fn velocity_from_rate(&self, xs: &Position, dxs_dt: &Velocity) -> Velocity {
        [dxs_dt[0], xs[1] * dxs_dt[1], dxs_dt[2]]
    }

    fn rate_from_velocity(&self, xs: &Position, vs: &Velocity) -> Velocity {
        [vs[0], vs[1] / xs[1], vs[2]]
    }
}

impl CoordinateChart for Spherical {
    fn name(&self) -> &'static str {
        "Spherical"
    }

    fn position_dimensions(&self) -> [Dimension; 4] {
        [Dimension::Time, Dimension::Length, Dimension::Angle, Dimension::Angle]
    }

    fn rate_dimensions(&self) -> [Dimension; 3] {
        [Dimension::Velocity, Dimension::AngularVelocity, Dimension::AngularVelocity]
    }

    fn to_cartesian(&self, xs: &Position, vs: &Velocity) -> (Position, Velocity) {
        let rates = self.rate_from_velocity(xs, vs);
        oblate_to_cartesian(0.0, xs, &rates)
    }

    fn from_cartesian(&self, xs: &Position, vs: &Velocity) -> (Position, Velocity) {
        let (xs_sph, rates) = oblate_from_cartesian(0.0, xs, vs);
        (xs_sph, self.velocity_from_rate(&xs_sph, &rates))
    }

    fn velocity_from_rate(&self, xs: &Position, dxs_dt: &Velocity) -> Velocity {
        angular_velocity_from_rate(xs, dxs_dt)
    }

    fn rate_from_velocity(&self, xs: &Position, vs: &Velocity) -> Velocity {
        angular_rate_from_velocity(xs, vs)
    }
}

impl CoordinateChart for BoyerLindquist {
    fn name(&self) -> &'static str {
        "BoyerLindquist"
    }

    fn position_dimensions(&self) -> [Dimension; 4] {
        Spherical.position_dimensions()
    }

    fn rate_dimensions(&self) -> [Dimension; 3] {
        Spherical.rate_dimensions()
    }

    fn to_cartesian(&self, xs: &Position, vs: &Velocity) -> (Position, Velocity) {
        let rates = self.rate_from_velocity(xs, vs);
        oblate_to_cartesian(self.a, xs, &rates)
    }

    fn from_cartesian(&self, xs: &Position, vs: &Velocity) -> (Position, Velocity) {
        let (xs_bl, rates) = oblate_from_cartesian(self.a, xs, vs);
        (xs_bl, self.velocity_from_rate(&xs_bl, &rates))
    }

    fn velocity_from_rate(&self, xs: &Position, dxs_dt: &Velocity) -> Velocity {
        angular_velocity_from_rate(xs, dxs_dt)
    }

    fn rate_from_velocity(&self, xs: &Position, vs: &Velocity) -> Velocity {
        angular_rate_from_velocity(xs, vs)
    }
}

/// `(ṙ, θ̇, φ̇) → (ṙ, r θ̇, r sin θ φ̇)`
fn angular_velocity_from_rate(xs: &Position, dxs_dt: &Velocity) -> Velocity {
    let (r, theta) = (xs[1], xs[2]);
    [dxs_dt[0], r * dxs_dt[1], r * theta.sin() * dxs_dt[2]]
}

fn angular_rate_from_velocity(xs: &Position, vs: &Velocity) -> Velocity {
    let (r, theta) = (xs[1], xs[2]);
    [vs[0], vs[1] / r, vs[2] / (r * theta.sin())]
}

/// Oblate spheroidal `(r, θ, φ)` with rates → Cartesian position and velocity.
/// `a = 0` is ordinary spherical.
fn oblate_to_cartesian(a: f64, xs: &Position, rates: &Velocity) -> (Position, Velocity) {
    let (r, theta, phi) = (xs[1], xs[2], xs[3]);
    let (r_dot, theta_dot, phi_dot) = (rates[0], rates[1], rates[2]);
    let (sin_t, cos_t) = theta.sin_cos();
    let (sin_p, cos_p) = phi.sin_cos();

    let big_r = (r * r + a * a).sqrt();
    let big_r_dot = if big_r > 0.0 { r * r_dot / big_r } else { r_dot };

    let xs_cart = [
        xs[0],
        big_r * sin_t * cos_p,
        big_r * sin_t * sin_p,
        r * cos_t,
    ];
    let vs_cart = [
        big_r_dot * sin_t * cos_p + big_r * cos_t * cos_p * theta_dot
            - big_r * sin_t * sin_p * phi_dot,
        big_r_dot * sin_t * sin_p
            + big_r * cos_t * sin_p * theta_dot
            + big_r * sin_t * cos_p * phi_dot,
        r_dot * cos_t - r * sin_t * theta_dot,
    ];
    (xs_cart, vs_cart)
}

/// Cartesian → oblate spheroidal position and rates.
///
/// r² is the positive root of `r⁴ − (x²+y²+z²−a²) r² − a² z² = 0`.
fn oblate_from_cartesian(a: f64, xs: &Position, vs: &Velocity) -> (Position, Velocity) {
    let (x, y, z) = (xs[1], xs[2], xs[3]);
    let (vx, vy, vz) = (vs[0], vs[1], vs[2]);
    let a2 = a * a;

    let w = x * x + y * y + z * z - a2;
    let s = (w * w + 4.0 * a2 * z * z).sqrt();
    let r = (0.5 * (w + s)).sqrt();
    let cos_t = (z / r).clamp(-1.0, 1.0);
    let theta = cos_t.acos();
    let phi = y.atan2(x);

    let w_dot = 2.0 * (x * vx + y * vy + z * vz);
    let r_dot = (w_dot + (w * w_dot + 4.0 * a2 * z * vz) / s) / (4.0 * r);
    let theta_dot = (r_dot * cos_t - vz) / (r * theta.sin());
    let phi_dot = (x * vy - y * vx) / (x * x + y * y);

    ([xs[0], r, theta, phi], [r_dot, theta_dot, phi_dot])
}

/// The closed set of supported charts.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Chart {
    Cartesian,
    Cylindrical,
    Spherical,
    BoyerLindquist { a: f64 },
}

impl Chart {
    fn dispatch<R>(&self, f: impl FnOnce(&dyn CoordinateChart) -> R) -> R {
        match *self {
            Chart::Cartesian => f(&Cartesian),
            Chart::Cylindrical => f(&Cylindrical),
            Chart::Spherical => f(&Spherical),
            Chart::BoyerLindquist { a } => f(&BoyerLindquist { a }),
        }
    }

    /// Dimension of each physical velocity slot. Always velocities.
    pub fn velocity_dimensions(&self) -> [Dimension; 3] {
        [Dimension::Velocity; 3]
    }
}

impl CoordinateChart for Chart {
    fn name(&self) -> &'static str {
        self.dispatch(|c| c.name())
    }

    fn position_dimensions(&self) -> [Dimension; 4] {
        self.dispatch(|c| c.position_dimensions())
    }

    fn rate_dimensions(&self) -> [Dimension; 3] {
        self.dispatch(|c| c.rate_dimensions())
    }

    fn to_cartesian(&self, xs: &Position, vs: &Velocity) -> (Position, Velocity) {
        self.dispatch(|c| c.to_cartesian(xs, vs))
    }

    fn from_cartesian(&self, xs: &Position, vs: &Velocity) -> (Position, Velocity) {
        self.dispatch(|c| c.from_cartesian(xs, vs))
    }

    fn velocity_from_rate(&self, xs: &Position, dxs_dt: &Velocity) -> Velocity {
        self.dispatch(|c| c.velocity_from_rate(xs, dxs_dt))
    }

    fn rate_from_velocity(&self, xs: &Position, vs: &Velocity) -> Velocity {
        self.dispatch(|c| c.rate_from_velocity(xs, vs))
    }
}

// ── Coordinate ──

/// A point and three-velocity in one chart, in geometrized units.
///
/// Immutable: conversions return a new value. Deserialized values go
/// through the same checks as [`Coordinate::new`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    chart: Chart,
    xs: Position,
    vs: Velocity,
    dxs_dt: Velocity,
}

impl Coordinate {
    /// Build from physical velocity `vs`. Rejects `|vs| ≥ c`.
    pub fn new(chart: Chart, xs: Position, vs: Velocity) -> Result<Self> {
        check_subluminal(&vs)?;
        let dxs_dt = chart.rate_from_velocity(&xs, &vs);
        Ok(Self::from_parts(chart, xs, vs, dxs_dt))
    }

    /// Build from chart-native rates `dx^i/dt`. Rejects `|vs| ≥ c`.
    pub fn from_rates(chart: Chart, xs: Position, dxs_dt: Velocity) -> Result<Self> {
        let vs = chart.velocity_from_rate(&xs, &dxs_dt);
        check_subluminal(&vs)?;
        Ok(Self::from_parts(chart, xs, vs, dxs_dt))
    }

    /// A particle momentarily at rest in `chart`.
    pub fn at_rest(chart: Chart, xs: Position) -> Self {
        Self::from_parts(chart, xs, [0.0; 3], [0.0; 3])
    }

    /// Build from bare or tagged values, validated slot by slot.
    ///
    /// `xs` must have 4 entries and `vs` 3 (physical velocities).
    pub fn from_quantities(chart: Chart, xs: &[Value], vs: &[Value]) -> Result<Self> {
        let xs = validate_slots(xs, &chart.position_dimensions())?;
        let vs = validate_slots(vs, &chart.velocity_dimensions())?;
        Self::new(chart, xs, vs)
    }

    /// Like [`Coordinate::from_quantities`] but `dxs_dt` holds chart rates
    /// (angular slots take angular velocities).
    pub fn from_rate_quantities(chart: Chart, xs: &[Value], dxs_dt: &[Value]) -> Result<Self> {
        let xs = validate_slots(xs, &chart.position_dimensions())?;
        let dxs_dt = validate_slots(dxs_dt, &chart.rate_dimensions())?;
        Self::from_rates(chart, xs, dxs_dt)
    }

    fn from_parts(chart: Chart, xs: Position, vs: Velocity, dxs_dt: Velocity) -> Self {
        Coordinate {
            chart,
            xs,
            vs,
            dxs_dt,
        }
    }

    pub fn chart(&self) -> Chart {
        self.chart
    }

    pub fn xs(&self) -> &Position {
        &self.xs
    }

    pub fn vs(&self) -> &Velocity {
        &self.vs
    }

    pub fn dxs_dt(&self) -> &Velocity {
        &self.dxs_dt
    }

    /// `[x0, x1, x2, x3, v1, v2, v3]`
    pub fn state_vector(&self) -> [f64; 7] {
        [
            self.xs[0], self.xs[1], self.xs[2], self.xs[3],
            self.vs[0], self.vs[1], self.vs[2],
        ]
    }

    /// Component `index` of the state vector.
    pub fn get(&self, index: usize) -> Result<f64> {
        self.state_vector()
            .get(index)
            .copied()
            .ok_or(RelativityError::IndexOutOfRange {
                index: index as i64,
            })
    }

    /// Components `range` of the state vector.
    pub fn slice(&self, range: Range<usize>) -> Result<Vec<f64>> {
        let state = self.state_vector();
        if range.start > range.end {
            return Err(RelativityError::IndexOutOfRange {
                index: range.start as i64,
            });
        }
        if range.end > state.len() {
            return Err(RelativityError::IndexOutOfRange {
                index: range.end as i64 - 1,
            });
        }
        Ok(state[range].to_vec())
    }

    /// The same event and velocity in the Cartesian chart.
    pub fn to_cartesian(&self) -> Coordinate {
        let (xs, vs) = self.chart.to_cartesian(&self.xs, &self.vs);
        Self::from_parts(Chart::Cartesian, xs, vs, vs)
    }

    /// The same event and velocity in `target`, via Cartesian.
    pub fn convert_to(&self, target: Chart) -> Coordinate {
        if target == self.chart {
            return *self;
        }
        debug!(from = self.chart.name(), to = target.name(), "converting coordinate");

        let cartesian = self.to_cartesian();
        let (xs, vs) = target.from_cartesian(&cartesian.xs, &cartesian.vs);
        let dxs_dt = target.rate_from_velocity(&xs, &vs);
        Self::from_parts(target, xs, vs, dxs_dt)
    }
}

/// Serialized form of [`Coordinate`], before validation.
#[derive(Deserialize)]
struct RawCoordinate {
    chart: Chart,
    xs: Position,
    vs: Velocity,
    dxs_dt: Velocity,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = RelativityError;

    fn try_from(raw: RawCoordinate) -> Result<Self> {
        check_subluminal(&raw.vs)?;
        let expected = raw.chart.rate_from_velocity(&raw.xs, &raw.vs);
        let agrees = expected
            .iter()
            .zip(&raw.dxs_dt)
            .all(|(a, b)| (a - b).abs() <= 1e-9 * (1.0 + a.abs().max(b.abs())));
        if !agrees {
            return Err(RelativityError::invalid_argument(format!(
                "dxs_dt {:?} does not match vs {:?} in {:?}",
                raw.dxs_dt, raw.vs, raw.chart
            )));
        }
        Ok(Self::from_parts(raw.chart, raw.xs, raw.vs, raw.dxs_dt))
    }
}

fn check_subluminal(vs: &Velocity) -> Result<()> {
    let speed = (vs[0] * vs[0] + vs[1] * vs[1] + vs[2] * vs[2]).sqrt();
    if speed.is_nan() {
        return Err(UnitError::NonFinite(Dimension::Velocity).into());
    }
    if speed >= 1.0 {
        return Err(UnitError::Superluminal(speed).into());
    }
    Ok(())
}

fn validate_slots<const N: usize>(
    values: &[Value],
    dimensions: &[Dimension; N],
) -> Result<[f64; N]> {
    let validated = units::validate_vector(values, dimensions)?;
    validated
        .try_into()
        .map_err(|v: Vec<f64>| RelativityError::shape("one value per slot", &[v.len()]))
}

// ── Registry ──

/// Charts available for name-based conversion.
///
/// Built once, then only read. A conversion to a name that was never
/// registered fails with [`RelativityError::UnsupportedCoordinateSystem`].
#[derive(Debug, Clone, Default)]
pub struct ChartRegistry {
    charts: BTreeMap<String, Chart>,
}

impl ChartRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cartesian, Cylindrical and Spherical.
    pub fn standard() -> Self {
        Self::new()
            .with(Chart::Cartesian)
            .with(Chart::Cylindrical)
            .with(Chart::Spherical)
    }

    /// Add `chart` under its name, replacing any previous entry.
    pub fn with(mut self, chart: Chart) -> Self {
        self.charts.insert(chart.name().to_string(), chart);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.charts.contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.charts.keys().cloned().collect()
    }

    /// Look up a chart by name.
    pub fn get(&self, name: &str) -> Result<Chart> {
        self.charts
            .get(name)
            .copied()
            .ok_or_else(|| RelativityError::UnsupportedCoordinateSystem {
                requested: name.to_string(),
                registered: self.names(),
            })
    }

    /// Convert `coordinate` to the chart registered as `target`.
    pub fn convert(&self, coordinate: &Coordinate, target: &str) -> Result<Coordinate> {
        let chart = self.get(target)?;
        Ok(coordinate.convert_to(chart))
    }
}
