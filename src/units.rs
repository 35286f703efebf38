//! Unit validation at the input boundary.
//!
//! Callers may hand the crate either bare numbers, which are taken to be
//! geometrized already, or values tagged with a physical [`Unit`]. Tagged
//! values are converted here and nowhere else:
//!
//! | quantity          | conversion          |
//! |-------------------|---------------------|
//! | mass              | `m · G / c²` (m)    |
//! | length            | metres              |
//! | time              | `t / c`             |
//! | angle             | radians             |
//! | velocity          | `v / c`             |
//! | angular velocity  | `ω / c`             |
//!
//! # Example
//! ```
//! use relativistic::units::{self, Unit};
//!
//! let m = units::validate_mass(1.988_47e30 * Unit::Kilogram).unwrap();
//! assert!((m - 1476.6).abs() < 1.0); // half the solar Schwarzschild radius
//! ```

use std::fmt;
use std::str::FromStr;
use std::ops::Mul;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::*;
use crate::error::{RelativityError, Result};

/// Physical dimension expected in a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dimension {
    Mass,
    Length,
    Time,
    Angle,
    Velocity,
    AngularVelocity,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Mass => "mass",
            Dimension::Length => "length",
            Dimension::Time => "time",
            Dimension::Angle => "angle",
            Dimension::Velocity => "velocity",
            Dimension::AngularVelocity => "angular velocity",
        };
        f.write_str(name)
    }
}

/// Physical units accepted at the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    Kilogram,
    SolarMass,
    Metre,
    Kilometre,
    Second,
    Radian,
    Degree,
    MetrePerSecond,
    KilometrePerSecond,
    RadianPerSecond,
}

impl Unit {
    /// Dimension this unit measures.
    pub fn dimension(self) -> Dimension {
        match self {
            Unit::Kilogram | Unit::SolarMass => Dimension::Mass,
            Unit::Metre | Unit::Kilometre => Dimension::Length,
            Unit::Second => Dimension::Time,
            Unit::Radian | Unit::Degree => Dimension::Angle,
            Unit::MetrePerSecond | Unit::KilometrePerSecond => Dimension::Velocity,
            Unit::RadianPerSecond => Dimension::AngularVelocity,
        }
    }

    /// Factor taking a value in this unit to the SI base unit of its dimension.
    pub fn si_factor(self) -> f64 {
        match self {
            Unit::Kilogram => 1.0,
            Unit::SolarMass => SOLAR_MASS,
            Unit::Metre => 1.0,
            Unit::Kilometre => 1e3,
            Unit::Second => 1.0,
            Unit::Radian => 1.0,
            Unit::Degree => DEG2RAD,
            Unit::MetrePerSecond => 1.0,
            Unit::KilometrePerSecond => 1e3,
            Unit::RadianPerSecond => 1.0,
        }
    }

    /// Short symbol, e.g. `m/s`.
    pub fn symbol(self) -> &'static str {
        match self {
            Unit::Kilogram => "kg",
            Unit::SolarMass => "M_sun",
            Unit::Metre => "m",
            Unit::Kilometre => "km",
            Unit::Second => "s",
            Unit::Radian => "rad",
            Unit::Degree => "deg",
            Unit::MetrePerSecond => "m/s",
            Unit::KilometrePerSecond => "km/s",
            Unit::RadianPerSecond => "rad/s",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    /// Parse a [`Unit::symbol`].
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        const ALL: [Unit; 10] = [
            Unit::Kilogram,
            Unit::SolarMass,
            Unit::Metre,
            Unit::Kilometre,
            Unit::Second,
            Unit::Radian,
            Unit::Degree,
            Unit::MetrePerSecond,
            Unit::KilometrePerSecond,
            Unit::RadianPerSecond,
        ];
        ALL.into_iter()
            .find(|u| u.symbol() == s)
            .ok_or_else(|| UnitError::UnknownUnit(s.to_string()))
    }
}

/// A number tagged with a physical unit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quantity {
    pub value: f64,
    pub unit: Unit,
}

impl Quantity {
    pub fn new(value: f64, unit: Unit) -> Self {
        Quantity { value, unit }
    }

    /// Value in the SI base unit of its dimension.
    pub fn si(&self) -> f64 {
        self.value * self.unit.si_factor()
    }
}

impl Mul<Unit> for f64 {
    type Output = Quantity;

    fn mul(self, unit: Unit) -> Quantity {
        Quantity::new(self, unit)
    }
}

/// Boundary input: either already geometrized, or tagged.
///
/// Deserializes from a bare number or from `{ "value": .., "unit": .. }`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bare(f64),
    Tagged(Quantity),
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Bare(v)
    }
}

impl From<Quantity> for Value {
    fn from(q: Quantity) -> Self {
        Value::Tagged(q)
    }
}

/// Unit validation failures.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum UnitError {
    #[error("expected a {expected} quantity, got {found} ({unit})")]
    IncompatibleDimension {
        expected: Dimension,
        found: Dimension,
        unit: Unit,
    },

    #[error("mass must be non-negative, got {0}")]
    NegativeMass(f64),

    #[error("velocity must be below the speed of light, got {0} c")]
    Superluminal(f64),

    #[error("{0} must be finite")]
    NonFinite(Dimension),

    #[error("unknown unit symbol '{0}'")]
    UnknownUnit(String),
}

// ── Per-quantity rules ──

/// Strip the tag after checking it measures `expected`; returns the SI value.
fn tagged_si(q: &Quantity, expected: Dimension) -> Result<f64> {
    let found = q.unit.dimension();
    if found != expected {
        return Err(UnitError::IncompatibleDimension {
            expected,
            found,
            unit: q.unit,
        }
        .into());
    }
    Ok(q.si())
}

fn finite(v: f64, dimension: Dimension) -> Result<f64> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(UnitError::NonFinite(dimension).into())
    }
}

/// Mass → geometrized length `G·m/c²`. Negative mass is rejected.
pub fn validate_mass(mass: impl Into<Value>) -> Result<f64> {
    let m = match mass.into() {
        Value::Tagged(q) => tagged_si(&q, Dimension::Mass)? * KG_TO_METRES,
        Value::Bare(m) => m,
    };
    let m = finite(m, Dimension::Mass)?;
    if m < 0.0 {
        return Err(UnitError::NegativeMass(m).into());
    }
    Ok(m)
}

/// Length → metres.
pub fn validate_length(length: impl Into<Value>) -> Result<f64> {
    let l = match length.into() {
        Value::Tagged(q) => tagged_si(&q, Dimension::Length)?,
        Value::Bare(l) => l,
    };
    finite(l, Dimension::Length)
}

/// Time → `t / c`.
pub fn validate_time(time: impl Into<Value>) -> Result<f64> {
    let t = match time.into() {
        Value::Tagged(q) => tagged_si(&q, Dimension::Time)? / C_SI,
        Value::Bare(t) => t,
    };
    finite(t, Dimension::Time)
}

/// Angle → radians.
pub fn validate_angle(angle: impl Into<Value>) -> Result<f64> {
    let a = match angle.into() {
        Value::Tagged(q) => tagged_si(&q, Dimension::Angle)?,
        Value::Bare(a) => a,
    };
    finite(a, Dimension::Angle)
}

/// Velocity → fraction of c. `|v| ≥ c` is rejected.
pub fn validate_velocity(velocity: impl Into<Value>) -> Result<f64> {
    let v = match velocity.into() {
        Value::Tagged(q) => tagged_si(&q, Dimension::Velocity)? / C_SI,
        Value::Bare(v) => v,
    };
    let v = finite(v, Dimension::Velocity)?;
    if v.abs() >= C {
        return Err(UnitError::Superluminal(v).into());
    }
    Ok(v)
}

/// Angular velocity → `ω / c`.
pub fn validate_angular_velocity(angular_velocity: impl Into<Value>) -> Result<f64> {
    let w = match angular_velocity.into() {
        Value::Tagged(q) => tagged_si(&q, Dimension::AngularVelocity)? / C_SI,
        Value::Bare(w) => w,
    };
    finite(w, Dimension::AngularVelocity)
}

/// Validate `value` against the rule for `dimension`.
pub fn validate(value: impl Into<Value>, dimension: Dimension) -> Result<f64> {
    let value = value.into();
    match dimension {
        Dimension::Mass => validate_mass(value),
        Dimension::Length => validate_length(value),
        Dimension::Time => validate_time(value),
        Dimension::Angle => validate_angle(value),
        Dimension::Velocity => validate_velocity(value),
        Dimension::AngularVelocity => validate_angular_velocity(value),
    }
}

/// Validate by the tag's own dimension. Bare numbers pass through.
pub fn validate_scalar(value: impl Into<Value>) -> Result<f64> {
    match value.into() {
        Value::Tagged(q) => validate(q, q.unit.dimension()),
        Value::Bare(v) => Ok(v),
    }
}

/// Validate each slot of `values` against the matching entry of `dimensions`.
///
/// Order is preserved. A length mismatch is a shape error.
pub fn validate_vector(values: &[Value], dimensions: &[Dimension]) -> Result<Vec<f64>> {
    if values.len() != dimensions.len() {
        return Err(RelativityError::Shape {
            expected: "one value per slot",
            found: vec![values.len()],
        });
    }
    values
        .iter()
        .zip(dimensions)
        .map(|(v, d)| validate(*v, *d))
        .collect()
}
