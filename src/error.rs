//! Crate-wide error type.

use thiserror::Error;

use crate::units::UnitError;

/// Errors raised by coordinate construction, metric evaluation and
/// geodesic integration.
///
/// Every failure is reported at the call that detects it. Numerical
/// blow-up near a coordinate singularity is *not* an error: it shows up
/// as non-finite values in the returned tensors or trajectory.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RelativityError {
    /// A tagged quantity had the wrong dimension or violated a physical bound.
    #[error("invalid unit: {0}")]
    InvalidUnit(#[from] UnitError),

    /// Coordinate data did not have the single-point `(4,)` or batch `(N, 4)` form.
    #[error("expected {expected}, got shape {found:?}")]
    Shape {
        expected: &'static str,
        found: Vec<usize>,
    },

    /// A chart name was looked up that the registry does not hold.
    #[error("unsupported coordinate system '{requested}', registered: {registered:?}")]
    UnsupportedCoordinateSystem {
        requested: String,
        registered: Vec<String>,
    },

    /// The four-velocity normalization has no real solution.
    #[error("four-velocity normalization is not positive (u_t² = {normalization})")]
    InvalidState { normalization: f64 },

    /// Component access outside the 7-element state vector.
    #[error("index {index} out of range, must be in [0, 6] for [x0, x1, x2, x3, v1, v2, v3]")]
    IndexOutOfRange { index: i64 },

    /// An argument outside its valid domain (proper-time grid, spin, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl RelativityError {
    /// Create a shape error.
    pub fn shape(expected: &'static str, found: &[usize]) -> Self {
        Self::Shape {
            expected,
            found: found.to_vec(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RelativityError>;
