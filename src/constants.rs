//! Physical and mathematical constants.
//!
//! SI values are only used at the unit boundary. Everything past the
//! validator works in geometrized units (G = c = 1, lengths in metres).

/// Speed of light in vacuum (m/s), exact.
pub const C_SI: f64 = 299_792_458.0;

/// Newtonian gravitational constant (m³ kg⁻¹ s⁻²), CODATA 2018
pub const G_SI: f64 = 6.674_30e-11;

/// Nominal solar mass (kg)
pub const SOLAR_MASS: f64 = 1.988_47e30;

/// Kilograms to geometrized length (m/kg): G / c²
pub const KG_TO_METRES: f64 = G_SI / (C_SI * C_SI);

/// Speed of light in geometrized units
pub const C: f64 = 1.0;

/// Degrees to radians
pub const DEG2RAD: f64 = std::f64::consts::PI / 180.0;
