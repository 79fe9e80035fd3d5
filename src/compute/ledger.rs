use crate::compute::value::Value;
use crate::parameters::ParameterError;
use crate::periods::{Period, PeriodError, PeriodUnit};
use crate::store::{RegistryError, VariableId};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ComputationError {
    #[error("Circular dependency: {}", format_chain(.chain))]
    CircularDependency { chain: Vec<(String, Period)> },

    #[error("Variable '{name}' not found")]
    VariableNotFound { name: String },

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Period(#[from] PeriodError),

    #[error("Variable '{variable}' is defined per {definition}, not for {period}")]
    PeriodMismatch { variable: String, period: Period, definition: PeriodUnit },

    #[error("Variable '{variable}' for {period}: expected {expected} values, got {actual}")]
    LengthMismatch { variable: String, period: Period, expected: usize, actual: usize },

    #[error("Variable '{variable}' for {period}: expected a {expected} column, got {actual}")]
    TypeMismatch { variable: String, period: Period, expected: String, actual: String },

    #[error("Math error: {0}")]
    Arithmetic(String),

    #[error(transparent)]
    Registry(RegistryError),

    #[error("Evaluating '{variable}' for {period} failed: {source}")]
    FormulaFailed { variable: String, period: Period, source: Box<ComputationError> },
}

fn format_chain(chain: &[(String, Period)]) -> String {
    chain.iter().map(|(name, period)| format!("{}<{}>", name, period)).collect::<Vec<_>>().join(" -> ")
}

impl ComputationError {
    /// The innermost error, past every `FormulaFailed` wrapper.
    pub fn root_cause(&self) -> &ComputationError {
        match self {
            ComputationError::FormulaFailed { source, .. } => source.root_cause(),
            other => other,
        }
    }

    pub fn is_cycle(&self) -> bool {
        matches!(self.root_cause(), ComputationError::CircularDependency { .. })
    }
}

impl From<RegistryError> for ComputationError {
    fn from(e: RegistryError) -> Self {
        match e {
            RegistryError::VariableNotFound { name } => ComputationError::VariableNotFound { name },
            other => ComputationError::Registry(other),
        }
    }
}

pub type CacheKey = (VariableId, Period);

/// The memo of a simulation. A key absent from the ledger has never been requested
/// (or was invalidated); `InProgress` marks an evaluation on the current stack.
#[derive(Debug, Clone)]
pub enum Slot {
    InProgress,
    Computed(Value),
    Failed(ComputationError),
}

#[derive(Debug, Clone, Default)]
pub struct Ledger {
    slots: HashMap<CacheKey, Slot>,
}

impl Ledger {
    pub fn new() -> Self { Self::default() }

    pub fn get(&self, key: &CacheKey) -> Option<&Slot> { self.slots.get(key) }

    pub fn computed(&self, key: &CacheKey) -> Option<&Value> {
        match self.slots.get(key)? {
            Slot::Computed(v) => Some(v),
            _ => None,
        }
    }

    pub fn insert(&mut self, key: CacheKey, slot: Slot) { self.slots.insert(key, slot); }

    pub fn invalidate(&mut self, keys: impl IntoIterator<Item = CacheKey>) {
        for key in keys {
            self.slots.remove(&key);
        }
    }

    pub fn clear(&mut self) { self.slots.clear(); }

    pub fn len(&self) -> usize { self.slots.len() }
    pub fn is_empty(&self) -> bool { self.slots.is_empty() }

    pub fn in_progress(&self) -> usize {
        self.slots.values().filter(|s| matches!(s, Slot::InProgress)).count()
    }
}
