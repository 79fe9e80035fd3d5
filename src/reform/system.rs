use crate::parameters::{ParameterError, ParameterTree};
use crate::store::{RegistryError, VariableRegistry};
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SystemError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error("Reform '{reform}': variable '{variable}' has no formula to build on")]
    NothingToWrap { reform: String, variable: String },
}

/// A complete legislation: its variables and its parameters.
///
/// A reformed system keeps a handle on the system it was derived from; the
/// base is shared, never copied, and never modified by the derivation.
#[derive(Debug, Clone)]
pub struct LegislativeSystem {
    key: String,
    registry: Arc<VariableRegistry>,
    parameters: Arc<ParameterTree>,
    baseline: Option<Arc<LegislativeSystem>>,
}

impl LegislativeSystem {
    pub fn new(key: impl Into<String>, registry: VariableRegistry, parameters: ParameterTree) -> Self {
        Self { key: key.into(), registry: Arc::new(registry), parameters: Arc::new(parameters), baseline: None }
    }

    pub(crate) fn derived(key: String, registry: VariableRegistry, parameters: ParameterTree, base: &Arc<LegislativeSystem>) -> Self {
        Self { key, registry: Arc::new(registry), parameters: Arc::new(parameters), baseline: Some(Arc::clone(base)) }
    }

    /// `baseline_key.reform_key` for reformed systems.
    pub fn key(&self) -> &str { &self.key }
    pub fn registry(&self) -> &VariableRegistry { &self.registry }
    pub fn parameters(&self) -> &ParameterTree { &self.parameters }

    /// The system this one was derived from, if any.
    pub fn baseline(&self) -> Option<&Arc<LegislativeSystem>> { self.baseline.as_ref() }

    pub fn is_reform(&self) -> bool { self.baseline.is_some() }

    /// The unreformed legislation at the bottom of the derivation chain.
    pub fn root_baseline(self: &Arc<Self>) -> Arc<LegislativeSystem> {
        let mut current = Arc::clone(self);
        while let Some(base) = current.baseline.clone() {
            current = base;
        }
        current
    }
}
