//! survey_scenario.rs
//! A survey bound to a legislative system, and to its baseline when the
//! system is a reform, with the weighted aggregates computed over it.

use super::data_frame::DataFrame;
use super::survey::{SurveyError, SurveyTable};
use crate::compute::{kernel, ComputationError, Simulation, Value};
use crate::periods::Period;
use crate::reform::{LegislativeSystem, SystemError};
use crate::store::EntityKind;
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScenarioError {
    #[error(transparent)]
    Computation(#[from] ComputationError),

    #[error(transparent)]
    Survey(#[from] SurveyError),

    #[error(transparent)]
    System(#[from] SystemError),

    #[error("No baseline simulation: the scenario runs an unreformed system")]
    NoBaseline,

    #[error("Variable '{variable}' cannot define groups: expected an int, bool or enum column, got {actual}")]
    InvalidGroup { variable: String, actual: String },
}

/// Hook run once the survey is bound: (reformed simulation, baseline simulation, period).
pub type Initializer = dyn Fn(&mut Simulation, Option<&mut Simulation>, Period) -> Result<(), ComputationError> + Send + Sync;

pub struct SurveyScenario {
    table: Arc<SurveyTable>,
    period: Period,
    simulation: Simulation,
    baseline_simulation: Option<Simulation>,
}

impl SurveyScenario {
    /// Binds every survey column naming a registered variable as its input for
    /// `period`. Columns unknown to the legislation are skipped.
    pub fn new(system: Arc<LegislativeSystem>, table: Arc<SurveyTable>, period: Period) -> Result<Self, ScenarioError> {
        let mut simulation = Simulation::new(Arc::clone(&system), table.len());
        let bound = bind_inputs(&mut simulation, &table, period)?;

        let baseline_simulation = if system.is_reform() {
            let mut baseline = Simulation::new(system.root_baseline(), table.len());
            bind_inputs(&mut baseline, &table, period)?;
            Some(baseline)
        } else {
            None
        };

        info!(system = %system.key(), households = table.len(), %period, bound, "survey scenario ready");
        Ok(Self { table, period, simulation, baseline_simulation })
    }

    /// Runs a hook after the survey has been bound, typically to derive inputs
    /// of the reformed simulation from baseline results.
    pub fn with_initializer<F>(mut self, initializer: F) -> Result<Self, ScenarioError>
    where
        F: FnOnce(&mut Simulation, Option<&mut Simulation>, Period) -> Result<(), ComputationError>,
    {
        initializer(&mut self.simulation, self.baseline_simulation.as_mut(), self.period)?;
        Ok(self)
    }

    pub fn period(&self) -> Period { self.period }
    pub fn table(&self) -> &Arc<SurveyTable> { &self.table }
    pub fn has_baseline(&self) -> bool { self.baseline_simulation.is_some() }

    pub fn simulation(&self) -> &Simulation { &self.simulation }
    pub fn baseline_simulation(&self) -> Option<&Simulation> { self.baseline_simulation.as_ref() }

    /// The baseline simulation with `use_baseline`, the main one otherwise.
    /// Asking for the baseline of an unreformed scenario is an error.
    pub fn simulation_mut(&mut self, use_baseline: bool) -> Result<&mut Simulation, ScenarioError> {
        if !use_baseline {
            return Ok(&mut self.simulation);
        }
        self.baseline_simulation.as_mut().ok_or(ScenarioError::NoBaseline)
    }

    pub fn calculate(&mut self, variable: &str, period: Period, use_baseline: bool) -> Result<Value, ScenarioError> {
        Ok(self.simulation_mut(use_baseline)?.calculate(variable, period)?)
    }

    fn weights(&mut self, use_baseline: bool) -> Result<Arc<Vec<f64>>, ScenarioError> {
        let period = self.period;
        let weight_column = self.table.weight_column().to_string();
        let simulation = self.simulation_mut(use_baseline)?;
        if simulation.registry().contains(&weight_column) {
            return Ok(simulation.calculate_float(&weight_column, period)?);
        }
        Ok(self.table.weights()?)
    }

    fn weighted_total(&mut self, variable: &str, period: Period, use_baseline: bool) -> Result<f64, ScenarioError> {
        let weights = self.weights(use_baseline)?;
        let values = self.simulation_mut(use_baseline)?.calculate_float(variable, period)?;
        Ok(kernel::weighted_sum(&values, &weights))
    }

    /// Weighted sum over households. With `difference`, reform minus baseline.
    pub fn compute_aggregate(&mut self, variable: &str, period: Period, difference: bool, use_baseline: bool) -> Result<f64, ScenarioError> {
        if !difference {
            return self.weighted_total(variable, period, use_baseline);
        }
        if !self.has_baseline() {
            return Err(ScenarioError::NoBaseline);
        }
        let reformed = self.weighted_total(variable, period, false)?;
        let baseline = self.weighted_total(variable, period, true)?;
        debug!(variable, reformed, baseline, "aggregate difference");
        Ok(reformed - baseline)
    }

    pub fn create_data_frame_by_entity(&mut self, variables: &[&str], period: Period, use_baseline: bool) -> Result<DataFrame, ScenarioError> {
        let simulation = self.simulation_mut(use_baseline)?;
        let mut columns = BTreeMap::new();
        for &variable in variables {
            columns.insert(variable.to_string(), simulation.calculate(variable, period)?);
        }
        Ok(DataFrame { entity: EntityKind::Menage, period, index: self.table.ids().to_vec(), columns })
    }

    /// Per group code: (weighted sum of `variable`, sum of weights).
    fn group_totals(&mut self, variable: &str, group: &str, period: Period, use_baseline: bool) -> Result<BTreeMap<i64, (f64, f64)>, ScenarioError> {
        let weights = self.weights(use_baseline)?;
        let simulation = self.simulation_mut(use_baseline)?;
        let values = simulation.calculate_float(variable, period)?;
        let codes: Vec<i64> = match simulation.calculate(group, period)? {
            Value::Int(v) => v.to_vec(),
            Value::Enum(v) => v.iter().map(|&c| c as i64).collect(),
            Value::Bool(v) => v.iter().map(|&b| b as i64).collect(),
            other => return Err(ScenarioError::InvalidGroup { variable: group.to_string(), actual: other.type_name().to_string() }),
        };

        let mut totals: BTreeMap<i64, (f64, f64)> = BTreeMap::new();
        for ((code, value), weight) in codes.iter().zip(values.iter()).zip(weights.iter()) {
            let entry = totals.entry(*code).or_insert((0.0, 0.0));
            entry.0 += value * weight;
            entry.1 += weight;
        }
        Ok(totals)
    }

    pub fn aggregate_by_group(&mut self, variable: &str, group: &str, period: Period, use_baseline: bool) -> Result<BTreeMap<i64, f64>, ScenarioError> {
        let totals = self.group_totals(variable, group, period, use_baseline)?;
        Ok(totals.into_iter().map(|(code, (sum, _))| (code, sum)).collect())
    }

    /// Groups without weight map to zero.
    pub fn weighted_mean_by_group(&mut self, variable: &str, group: &str, period: Period, use_baseline: bool) -> Result<BTreeMap<i64, f64>, ScenarioError> {
        let totals = self.group_totals(variable, group, period, use_baseline)?;
        Ok(totals.into_iter().map(|(code, (sum, weight))| (code, if weight > 0.0 { sum / weight } else { 0.0 })).collect())
    }

    /// Weighted number of households for which `variable` is true (or non-zero).
    pub fn count_where(&mut self, variable: &str, period: Period, use_baseline: bool) -> Result<f64, ScenarioError> {
        let weights = self.weights(use_baseline)?;
        let flags = self.simulation_mut(use_baseline)?.calculate_float(variable, period)?;
        let selected: Vec<f64> = flags.iter().map(|&f| if f != 0.0 { 1.0 } else { 0.0 }).collect();
        Ok(kernel::weighted_sum(&selected, &weights))
    }
}

/// Sets every table column that names a variable of the simulation. A numeric
/// column is read as the variable's type when they differ (enum codes, flags).
fn bind_inputs(simulation: &mut Simulation, table: &SurveyTable, period: Period) -> Result<usize, ComputationError> {
    let mut bound = 0;
    for (name, column) in table.columns() {
        let value_type = match simulation.registry().get(name) {
            Ok(definition) => definition.value_type,
            Err(_) => {
                warn!(column = name, "survey column is not a variable, ignored");
                continue;
            }
        };
        let value = if column.matches(value_type) {
            column.clone()
        } else {
            Value::from_f64s(value_type, column.to_f64().to_vec()).map_err(|_| ComputationError::TypeMismatch {
                variable: name.to_string(),
                period,
                expected: value_type.to_string(),
                actual: column.type_name().to_string(),
            })?
        };
        simulation.set_input(name, period, value)?;
        bound += 1;
    }
    Ok(bound)
}
