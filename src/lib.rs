//! # relativistic
//!
//! Metric tensors, Christoffel symbols and geodesics for the Minkowski,
//! Schwarzschild and Kerr spacetimes.
//!
//! Provides unit validation at the input boundary, coordinate charts
//! (Cartesian, cylindrical, spherical, Boyer-Lindquist) with
//! velocity-consistent conversions, closed-form metric and connection
//! evaluation in geometrized or SI units, an adaptive RK4 geodesic
//! integrator, and conserved-quantity diagnostics.
//!
//! ```
//! use relativistic::coordinates::{Chart, Coordinate};
//! use relativistic::geodesic::GeodesicIntegrator;
//! use relativistic::metrics::{Metric, Schwarzschild};
//! use relativistic::diagnostics;
//!
//! let bh = Schwarzschild::new(1.0).unwrap();
//! let start = Coordinate::new(Chart::Spherical, [0.0, 20.0, 1.2, 0.0], [0.0, 0.05, 0.2]).unwrap();
//! let traj = GeodesicIntegrator::new(&bh).path_from(&start, &[0.0, 5.0, 10.0]).unwrap();
//!
//! let energy = diagnostics::specific_energy(&bh, &traj);
//! assert!(diagnostics::relative_drift(&energy) < 1e-8);
//! ```

pub mod config;
pub mod constants;
pub mod coordinates;
pub mod diagnostics;
pub mod error;
pub mod geodesic;
pub mod metrics;
pub mod units;

pub use error::{RelativityError, Result};

#[cfg(feature = "python")]
mod pybridge;

#[cfg(feature = "python")]
use pyo3::prelude::*;

#[cfg(feature = "python")]
#[pymodule]
fn relativistic(m: &Bound<'_, PyModule>) -> PyResult<()> {
    pybridge::register(m)?;
    Ok(())
}
