//! Serializable descriptions of spacetimes and charts.
//!
//! These are the enumerated counterparts of the constructor arguments, so a
//! setup can be read from JSON (or any serde format) and built in one call.
//!
//! ```
//! use relativistic::config::SpacetimeConfig;
//! use relativistic::metrics::Metric;
//!
//! let json = r#"{ "kind": "kerr", "mass": { "value": 1.0, "unit": "SolarMass" }, "spin": 0.5 }"#;
//! let spacetime = serde_json::from_str::<SpacetimeConfig>(json).unwrap().build().unwrap();
//! assert_eq!(spacetime.name(), "Kerr");
//! ```

use serde::{Deserialize, Serialize};

use crate::coordinates::Chart;
use crate::error::Result;
use crate::metrics::{Kerr, Minkowski, Schwarzschild, Spacetime};
use crate::units::{self, Value};

/// Which spacetime to build, with its parameters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SpacetimeConfig {
    #[default]
    Minkowski,
    Schwarzschild { mass: Value },
    /// `spin` is the dimensionless `a*`.
    Kerr { mass: Value, spin: f64 },
}

impl SpacetimeConfig {
    /// Validate the parameters and construct the spacetime.
    pub fn build(&self) -> Result<Spacetime> {
        Ok(match *self {
            SpacetimeConfig::Minkowski => Minkowski.into(),
            SpacetimeConfig::Schwarzschild { mass } => Schwarzschild::new(mass)?.into(),
            SpacetimeConfig::Kerr { mass, spin } => Kerr::new(mass, spin)?.into(),
        })
    }
}

/// Which chart to use. The Boyer-Lindquist spin length may be tagged.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChartConfig {
    #[default]
    Cartesian,
    Cylindrical,
    Spherical,
    BoyerLindquist { a: Value },
}

impl ChartConfig {
    pub fn build(&self) -> Result<Chart> {
        Ok(match *self {
            ChartConfig::Cartesian => Chart::Cartesian,
            ChartConfig::Cylindrical => Chart::Cylindrical,
            ChartConfig::Spherical => Chart::Spherical,
            ChartConfig::BoyerLindquist { a } => Chart::BoyerLindquist {
                a: units::validate_length(a)?,
            },
        })
    }
}
