use crate::catalogue;
use crate::config::ScenarioConfig;
use crate::display::trace;
use crate::periods::Period;
use crate::scenario::{SurveyScenario, SurveyTable};
use pyo3::exceptions::{PyRuntimeError, PyValueError};
use pyo3::prelude::*;
use std::collections::HashMap;

fn runtime_error(e: impl std::fmt::Display) -> PyErr { PyRuntimeError::new_err(e.to_string()) }
fn value_error(e: impl std::fmt::Display) -> PyErr { PyValueError::new_err(e.to_string()) }

/// A survey bound to the catalogue legislation, reformed by `reforms`.
/// Simulations hold per-thread state, hence `unsendable`.
#[pyclass(name = "_SurveyScenario", unsendable)]
pub struct PySurveyScenario {
    inner: SurveyScenario,
    config: ScenarioConfig,
}

impl PySurveyScenario {
    fn period(&self, period: Option<&str>) -> PyResult<Period> {
        match period {
            Some(p) => Period::parse(p).map_err(value_error),
            None => Ok(self.inner.period()),
        }
    }
}

#[pymethods]
impl PySurveyScenario {
    #[new]
    #[pyo3(signature = (ids, columns, year, reforms=None, weight_column=None, data_year=None, inflators=None))]
    pub fn new(
        ids: Vec<i64>,
        columns: HashMap<String, Vec<f64>>,
        year: i32,
        reforms: Option<Vec<String>>,
        weight_column: Option<String>,
        data_year: Option<i32>,
        inflators: Option<HashMap<String, f64>>,
    ) -> PyResult<Self> {
        let mut config = ScenarioConfig::new(year);
        config.reforms = reforms.unwrap_or_default();
        config.data_year = data_year;
        if let Some(w) = weight_column { config.weight_column = w; }
        config.inflators = inflators.unwrap_or_default().into_iter().collect();
        config.validate().map_err(value_error)?;

        let mut table = SurveyTable::new(ids).map_err(value_error)?;
        for (name, values) in columns {
            table.insert_column(name, values).map_err(value_error)?;
        }
        let inner = config.build_scenario(table).map_err(runtime_error)?;
        Ok(Self { inner, config })
    }

    #[pyo3(signature = (variable, period=None, use_baseline=false))]
    pub fn calculate(&mut self, variable: &str, period: Option<&str>, use_baseline: bool) -> PyResult<Vec<f64>> {
        let period = self.period(period)?;
        let value = self.inner.calculate(variable, period, use_baseline).map_err(runtime_error)?;
        Ok(value.to_f64().to_vec())
    }

    #[pyo3(signature = (variable, period=None, difference=false, use_baseline=false))]
    pub fn compute_aggregate(&mut self, variable: &str, period: Option<&str>, difference: bool, use_baseline: bool) -> PyResult<f64> {
        let period = self.period(period)?;
        self.inner.compute_aggregate(variable, period, difference, use_baseline).map_err(runtime_error)
    }

    #[pyo3(signature = (variable, period=None, use_baseline=false))]
    pub fn count_where(&mut self, variable: &str, period: Option<&str>, use_baseline: bool) -> PyResult<f64> {
        let period = self.period(period)?;
        self.inner.count_where(variable, period, use_baseline).map_err(runtime_error)
    }

    #[pyo3(signature = (variable, group, period=None, use_baseline=false))]
    pub fn aggregate_by_group(&mut self, variable: &str, group: &str, period: Option<&str>, use_baseline: bool) -> PyResult<Vec<(i64, f64)>> {
        let period = self.period(period)?;
        let totals = self.inner.aggregate_by_group(variable, group, period, use_baseline).map_err(runtime_error)?;
        Ok(totals.into_iter().collect())
    }

    /// The data frame serialized as JSON.
    #[pyo3(signature = (variables, period=None, use_baseline=false))]
    pub fn data_frame_json(&mut self, variables: Vec<String>, period: Option<&str>, use_baseline: bool) -> PyResult<String> {
        let period = self.period(period)?;
        let names: Vec<&str> = variables.iter().map(String::as_str).collect();
        let frame = self.inner.create_data_frame_by_entity(&names, period, use_baseline).map_err(runtime_error)?;
        frame.to_json().map_err(runtime_error)
    }

    #[pyo3(signature = (variable, period=None, use_baseline=false))]
    pub fn trace(&mut self, variable: &str, period: Option<&str>, use_baseline: bool) -> PyResult<String> {
        let period = self.period(period)?;
        let simulation = self.inner.simulation_mut(use_baseline).map_err(value_error)?;
        trace::format_trace(simulation, variable, period).map_err(runtime_error)
    }

    pub fn has_baseline(&self) -> bool { self.inner.has_baseline() }

    pub fn reforms(&self) -> Vec<String> { self.config.reforms.clone() }
}

#[pyfunction]
fn reform_keys() -> Vec<&'static str> { catalogue::reform_keys().to_vec() }

#[pyfunction]
fn rust_core_version() -> &'static str { env!("CARGO_PKG_VERSION") }

/// This function defines the `_core` Python module.
#[pymodule]
pub fn _core(m: &Bound<'_, PyModule>) -> PyResult<()> {
    // 1. Classes
    m.add_class::<PySurveyScenario>()?;
    // 2. Functions
    m.add_function(wrap_pyfunction!(reform_keys, m)?)?;
    m.add_function(wrap_pyfunction!(rust_core_version, m)?)?;
    Ok(())
}
