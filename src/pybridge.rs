//! Python bindings via PyO3.
use pyo3::exceptions::{PyIndexError, PyKeyError, PyValueError};
use pyo3::prelude::*;

use crate::coordinates::{Chart, ChartRegistry, Coordinate, CoordinateChart};
use crate::diagnostics;
use crate::error::RelativityError;
use crate::geodesic::{self, GeodesicIntegrator, IntegratorConfig, Trajectory};
use crate::metrics::{
    ChristoffelSymbols, FourState, Kerr, Metric, MetricTensor, Minkowski, Schwarzschild, Spacetime,
    UnitSystem,
};
use crate::units::{Quantity, Unit, Value};

impl From<RelativityError> for PyErr {
    fn from(e: RelativityError) -> PyErr {
        match e {
            RelativityError::IndexOutOfRange { .. } => PyIndexError::new_err(e.to_string()),
            RelativityError::UnsupportedCoordinateSystem { .. } => {
                PyKeyError::new_err(e.to_string())
            }
            _ => PyValueError::new_err(e.to_string()),
        }
    }
}

/// Python indices may be negative; the state vector takes none.
fn state_index(index: isize) -> Result<usize, RelativityError> {
    usize::try_from(index).map_err(|_| RelativityError::IndexOutOfRange {
        index: index as i64,
    })
}

/// A bare number, or a number tagged with a unit symbol such as `"kg"`.
fn value(v: f64, unit: Option<&str>) -> PyResult<Value> {
    match unit {
        None => Ok(Value::Bare(v)),
        Some(symbol) => {
            let unit: Unit = symbol.parse().map_err(RelativityError::from)?;
            Ok(Quantity::new(v, unit).into())
        }
    }
}

fn chart(name: &str, a: f64) -> PyResult<Chart> {
    let registry = ChartRegistry::standard().with(Chart::BoyerLindquist { a });
    Ok(registry.get(name)?)
}

fn units(si: bool) -> UnitSystem {
    if si {
        UnitSystem::Si
    } else {
        UnitSystem::Dimensionless
    }
}

// Coordinate
#[pyclass(name = "Coordinate", frozen)]
#[derive(Clone)]
pub struct PyCoordinate {
    inner: Coordinate,
}

#[pymethods]
impl PyCoordinate {
    /// Build from physical velocity `vs`. `a` is the Boyer-Lindquist spin length.
    #[new]
    #[pyo3(signature = (chart_name, xs, vs=[0.0; 3], a=0.0))]
    fn new(chart_name: &str, xs: [f64; 4], vs: [f64; 3], a: f64) -> PyResult<Self> {
        let inner = Coordinate::new(chart(chart_name, a)?, xs, vs)?;
        Ok(PyCoordinate { inner })
    }

    /// Build from chart rates `dx^i/dt`.
    #[staticmethod]
    #[pyo3(signature = (chart_name, xs, dxs_dt, a=0.0))]
    fn from_rates(chart_name: &str, xs: [f64; 4], dxs_dt: [f64; 3], a: f64) -> PyResult<Self> {
        let inner = Coordinate::from_rates(chart(chart_name, a)?, xs, dxs_dt)?;
        Ok(PyCoordinate { inner })
    }

    #[pyo3(signature = (chart_name, a=0.0))]
    fn convert_to(&self, chart_name: &str, a: f64) -> PyResult<PyCoordinate> {
        Ok(PyCoordinate {
            inner: self.inner.convert_to(chart(chart_name, a)?),
        })
    }

    fn to_cartesian(&self) -> PyCoordinate {
        PyCoordinate {
            inner: self.inner.to_cartesian(),
        }
    }

    fn state_vector(&self) -> [f64; 7] {
        self.inner.state_vector()
    }

    fn __getitem__(&self, index: isize) -> PyResult<f64> {
        Ok(self.inner.get(state_index(index)?)?)
    }

    fn __len__(&self) -> usize {
        7
    }

    #[getter] fn chart(&self) -> &'static str { self.inner.chart().name() }
    #[getter] fn xs(&self) -> [f64; 4] { *self.inner.xs() }
    #[getter] fn vs(&self) -> [f64; 3] { *self.inner.vs() }
    #[getter] fn dxs_dt(&self) -> [f64; 3] { *self.inner.dxs_dt() }

    fn __repr__(&self) -> String {
        format!(
            "Coordinate({}, xs={:?}, vs={:?})",
            self.inner.chart().name(),
            self.inner.xs(),
            self.inner.vs()
        )
    }
}

// Trajectory
#[pyclass(name = "Trajectory", frozen)]
pub struct PyTrajectory {
    inner: Trajectory,
}

#[pymethods]
impl PyTrajectory {
    /// The 8×T array: rows 0..4 position, 4..8 four-velocity.
    fn rows(&self) -> Vec<Vec<f64>> {
        self.inner.rows().into_iter().collect()
    }

    fn component(&self, index: usize) -> PyResult<Vec<f64>> {
        Ok(self.inner.component(index)?)
    }

    fn __len__(&self) -> usize {
        self.inner.len()
    }

    #[getter] fn taus(&self) -> Vec<f64> { self.inner.taus().to_vec() }
    #[getter] fn forced_steps(&self) -> usize { self.inner.forced_steps() }
    #[getter] fn states(&self) -> Vec<FourState> { self.inner.states().to_vec() }
}

// Spacetime
#[pyclass(name = "Spacetime", frozen)]
pub struct PySpacetime {
    inner: Spacetime,
}

#[pymethods]
impl PySpacetime {
    #[staticmethod]
    fn minkowski() -> Self {
        PySpacetime {
            inner: Minkowski.into(),
        }
    }

    /// `unit` is a symbol such as `"kg"` or `"M_sun"`; bare masses are geometrized.
    #[staticmethod]
    #[pyo3(signature = (mass, unit=None))]
    fn schwarzschild(mass: f64, unit: Option<&str>) -> PyResult<Self> {
        Ok(PySpacetime {
            inner: Schwarzschild::new(value(mass, unit)?)?.into(),
        })
    }

    #[staticmethod]
    #[pyo3(signature = (mass, spin, unit=None))]
    fn kerr(mass: f64, spin: f64, unit: Option<&str>) -> PyResult<Self> {
        Ok(PySpacetime {
            inner: Kerr::new(value(mass, unit)?, spin)?.into(),
        })
    }

    #[pyo3(signature = (xs, si=false))]
    fn metric(&self, xs: [f64; 4], si: bool) -> MetricTensor {
        self.inner.metric_at(&xs, units(si))
    }

    #[pyo3(signature = (xs, si=false))]
    fn metric_batch(&self, xs: Vec<[f64; 4]>, si: bool) -> Vec<MetricTensor> {
        self.inner.metric_batch(&xs, units(si))
    }

    #[pyo3(signature = (xs, si=false))]
    fn christoffel_symbols(&self, xs: [f64; 4], si: bool) -> ChristoffelSymbols {
        self.inner.christoffel_at(&xs, units(si))
    }

    #[pyo3(signature = (xs, si=false))]
    fn christoffel_batch(&self, xs: Vec<[f64; 4]>, si: bool) -> Vec<ChristoffelSymbols> {
        self.inner.christoffel_batch(&xs, units(si))
    }

    fn four_velocity(&self, coordinate: &PyCoordinate) -> PyResult<[f64; 4]> {
        Ok(self.inner.four_velocity(&coordinate.inner)?)
    }

    fn four_state_vector(&self, coordinate: &PyCoordinate) -> PyResult<FourState> {
        Ok(self.inner.four_state_vector(&coordinate.inner)?)
    }

    /// Integrate from an 8-state over `taus`.
    #[allow(clippy::too_many_arguments)]
    #[pyo3(signature = (state, taus, adaptive=true, step=1e-2, atol=1e-10, rtol=1e-10))]
    fn geodesic(
        &self,
        py: Python<'_>,
        state: FourState,
        taus: Vec<f64>,
        adaptive: bool,
        step: f64,
        atol: f64,
        rtol: f64,
    ) -> PyResult<PyTrajectory> {
        let config = integrator_config(adaptive, step, atol, rtol);
        let spacetime = self.inner;
        let inner = py.allow_threads(|| {
            GeodesicIntegrator::new(&spacetime)
                .with_config(config)
                .path(&state, &taus)
        })?;
        Ok(PyTrajectory { inner })
    }

    /// Integrate many 8-states in parallel on one grid.
    #[allow(clippy::too_many_arguments)]
    #[pyo3(signature = (states, taus, adaptive=true, step=1e-2, atol=1e-10, rtol=1e-10))]
    fn geodesic_batch(
        &self,
        py: Python<'_>,
        states: Vec<FourState>,
        taus: Vec<f64>,
        adaptive: bool,
        step: f64,
        atol: f64,
        rtol: f64,
    ) -> PyResult<Vec<PyTrajectory>> {
        let config = integrator_config(adaptive, step, atol, rtol);
        let spacetime = self.inner;
        let trajectories =
            py.allow_threads(|| geodesic::integrate_batch(&spacetime, config, &states, &taus))?;
        Ok(trajectories
            .into_iter()
            .map(|inner| PyTrajectory { inner })
            .collect())
    }

    fn ds_dtau(&self, trajectory: &PyTrajectory) -> Vec<f64> {
        diagnostics::ds_dtau(&self.inner, &trajectory.inner)
    }

    fn specific_energy(&self, trajectory: &PyTrajectory) -> Vec<f64> {
        diagnostics::specific_energy(&self.inner, &trajectory.inner)
    }

    fn angular_momentum(&self, trajectory: &PyTrajectory) -> Vec<f64> {
        diagnostics::angular_momentum(&self.inner, &trajectory.inner)
    }

    fn carter_constant(&self, trajectory: &PyTrajectory) -> Option<Vec<f64>> {
        diagnostics::carter_constant(&self.inner, &trajectory.inner)
    }

    fn schwarzschild_radius(&self) -> f64 {
        self.inner.schwarzschild_radius()
    }

    #[getter] fn name(&self) -> &'static str { self.inner.name() }
    #[getter] fn mass(&self) -> f64 { self.inner.mass() }
    #[getter] fn chart(&self) -> &'static str { self.inner.chart().name() }

    fn __repr__(&self) -> String {
        format!("Spacetime({}, M={} m)", self.inner.name(), self.inner.mass())
    }
}

fn integrator_config(adaptive: bool, step: f64, atol: f64, rtol: f64) -> IntegratorConfig {
    IntegratorConfig {
        initial_step: step,
        atol,
        rtol,
        adaptive,
        ..IntegratorConfig::default()
    }
}

// Free functions
#[pyfunction]
fn relative_drift(series: Vec<f64>) -> f64 {
    diagnostics::relative_drift(&series)
}

// Module registration
pub fn register(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyCoordinate>()?;
    m.add_class::<PyTrajectory>()?;
    m.add_class::<PySpacetime>()?;
    m.add_function(wrap_pyfunction!(relative_drift, m)?)?;
    m.add("SPEED_OF_LIGHT", crate::constants::C_SI)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negative_index_is_out_of_range() {
        assert_eq!(state_index(3), Ok(3));
        assert_eq!(
            state_index(-1),
            Err(RelativityError::IndexOutOfRange { index: -1 })
        );
    }
}
