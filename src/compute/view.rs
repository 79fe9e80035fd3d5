//! view.rs
//! What a formula sees of the simulation: other variables of the same households.

use crate::compute::engine::Simulation;
use crate::compute::ledger::ComputationError;
use crate::compute::value::Value;
use crate::periods::Period;
use crate::store::Category;
use std::sync::Arc;

pub struct EntityView<'s> {
    simulation: &'s mut Simulation,
    period: Period,
    variable: &'s str,
}

impl<'s> EntityView<'s> {
    pub(crate) fn new(simulation: &'s mut Simulation, variable: &'s str, period: Period) -> Self {
        Self { simulation, period, variable }
    }

    /// The period the calling formula was invoked for.
    pub fn period(&self) -> Period { self.period }

    pub fn count(&self) -> usize { self.simulation.household_count() }

    /// Any variable, at any period. Reads go through the simulation cache.
    pub fn calculate(&mut self, name: &str, period: Period) -> Result<Value, ComputationError> {
        self.simulation.calculate(name, period)
    }

    /// A numeric column; booleans read as 0/1 and integers are widened.
    pub fn float(&mut self, name: &str, period: Period) -> Result<Arc<Vec<f64>>, ComputationError> {
        Ok(self.calculate(name, period)?.to_f64())
    }

    pub fn bools(&mut self, name: &str, period: Period) -> Result<Arc<Vec<bool>>, ComputationError> {
        let value = self.calculate(name, period)?;
        value.as_bool().cloned().ok_or_else(|| ComputationError::TypeMismatch {
            variable: name.to_string(),
            period,
            expected: "bool".to_string(),
            actual: value.type_name().to_string(),
        })
    }

    pub fn categories<C: Category>(&mut self, name: &str, period: Period) -> Result<Vec<C>, ComputationError> {
        let value = self.calculate(name, period)?;
        value.categories::<C>().ok_or_else(|| ComputationError::TypeMismatch {
            variable: name.to_string(),
            period,
            expected: "enum".to_string(),
            actual: value.type_name().to_string(),
        })
    }

    /// Sum of a flow over the sub-periods of `period` in units of its definition period.
    pub fn float_sum(&mut self, name: &str, period: Period) -> Result<Vec<f64>, ComputationError> {
        self.simulation.calculate_add(name, period)
    }

    pub fn zeros(&self) -> Vec<f64> { vec![0.0; self.count()] }

    pub fn filled(&self, value: f64) -> Vec<f64> { vec![value; self.count()] }

    /// A formula-level arithmetic failure attributed to the calling variable.
    pub fn arithmetic_error(&self, reason: impl std::fmt::Display) -> ComputationError {
        ComputationError::Arithmetic(format!("{} for {}: {}", self.variable, self.period, reason))
    }
}
