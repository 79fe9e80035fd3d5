//! builder.rs
//! Declarative reforms: a list of variable and parameter edits applied to a
//! base legislative system to produce a new one.

use super::system::{LegislativeSystem, SystemError};
use crate::compute::{ComputationError, EntityView, Value};
use crate::parameters::{ParameterError, ParameterNode, ParameterTree, ParameterValue, ParametersAt};
use crate::periods::Period;
use crate::store::{Formula, VariableDefinition, WrapperFn};
use chrono::NaiveDate;
use std::fmt;
use std::sync::Arc;
use tracing::info;

pub type ParameterTransform = dyn Fn(&ParameterTree) -> Result<ParameterTree, ParameterError> + Send + Sync;

#[derive(Clone)]
pub enum VariableChange {
    /// Substitutes the definition of the same name, or adds it when new.
    Update(VariableDefinition),
    /// Adds a variable; an existing name is an error.
    Add(VariableDefinition),
    Neutralize(String),
    /// Rebuilds every formula of a variable around the formula it replaces.
    Wrap { variable: String, wrapper: Arc<WrapperFn> },
}

#[derive(Clone)]
pub enum ParameterPatch {
    Update { path: String, start: NaiveDate, value: ParameterValue },
    UpdateBetween { path: String, start: NaiveDate, stop: NaiveDate, value: ParameterValue },
    AddChild { path: String, node: ParameterNode },
    Transform(Arc<ParameterTransform>),
}

#[derive(Clone)]
pub struct Reform {
    key: String,
    name: String,
    variable_changes: Vec<VariableChange>,
    parameter_patches: Vec<ParameterPatch>,
}

impl fmt::Debug for Reform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reform")
            .field("key", &self.key)
            .field("variable_changes", &self.variable_changes.len())
            .field("parameter_patches", &self.parameter_patches.len())
            .finish()
    }
}

impl Reform {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self { key: key.into(), name: name.into(), variable_changes: Vec::new(), parameter_patches: Vec::new() }
    }

    pub fn key(&self) -> &str { &self.key }
    pub fn name(&self) -> &str { &self.name }

    pub fn update_variable(mut self, definition: VariableDefinition) -> Self {
        self.variable_changes.push(VariableChange::Update(definition));
        self
    }

    pub fn add_variable(mut self, definition: VariableDefinition) -> Self {
        self.variable_changes.push(VariableChange::Add(definition));
        self
    }

    pub fn neutralize_variable(mut self, name: impl Into<String>) -> Self {
        self.variable_changes.push(VariableChange::Neutralize(name.into()));
        self
    }

    /// The new formula receives the formula in force under the base system
    /// for the same window, and may call it.
    pub fn based_on_baseline<F>(mut self, variable: impl Into<String>, wrapper: F) -> Self
    where
        F: Fn(&Formula, &mut EntityView<'_>, Period, &ParametersAt<'_>) -> Result<Value, ComputationError> + Send + Sync + 'static,
    {
        self.variable_changes.push(VariableChange::Wrap { variable: variable.into(), wrapper: Arc::new(wrapper) });
        self
    }

    pub fn update_parameter(mut self, path: impl Into<String>, start: NaiveDate, value: impl Into<ParameterValue>) -> Self {
        self.parameter_patches.push(ParameterPatch::Update { path: path.into(), start, value: value.into() });
        self
    }

    pub fn update_parameter_between(mut self, path: impl Into<String>, start: NaiveDate, stop: NaiveDate, value: impl Into<ParameterValue>) -> Self {
        self.parameter_patches.push(ParameterPatch::UpdateBetween { path: path.into(), start, stop, value: value.into() });
        self
    }

    pub fn add_parameter(mut self, path: impl Into<String>, node: ParameterNode) -> Self {
        self.parameter_patches.push(ParameterPatch::AddChild { path: path.into(), node });
        self
    }

    /// An arbitrary tree-to-tree edit, run in declaration order with the other patches.
    pub fn modify_parameters<F>(mut self, transform: F) -> Self
    where
        F: Fn(&ParameterTree) -> Result<ParameterTree, ParameterError> + Send + Sync + 'static,
    {
        self.parameter_patches.push(ParameterPatch::Transform(Arc::new(transform)));
        self
    }

    /// Derives a new system from `base`. The base is left untouched; when a
    /// variable is edited twice, the later edit wins.
    pub fn apply(&self, base: &Arc<LegislativeSystem>) -> Result<Arc<LegislativeSystem>, SystemError> {
        // 1. Variables: the cloned registry shares every untouched definition
        let mut registry = base.registry().clone();
        for change in &self.variable_changes {
            match change {
                VariableChange::Update(definition) => { registry.replace(definition.clone())?; }
                VariableChange::Add(definition) => { registry.register(definition.clone())?; }
                VariableChange::Neutralize(name) => { registry.neutralize(name)?; }
                VariableChange::Wrap { variable, wrapper } => {
                    let current = registry.get(variable)?;
                    if !current.has_formula() {
                        return Err(SystemError::NothingToWrap { reform: self.key.clone(), variable: variable.clone() });
                    }
                    let wrapped = current.with_wrapped_formulas(wrapper);
                    registry.replace(wrapped)?;
                }
            }
        }

        // 2. Parameters
        let mut parameters = base.parameters().clone();
        for patch in &self.parameter_patches {
            parameters = match patch {
                ParameterPatch::Update { path, start, value } => parameters.with_value_update(path, *start, value.clone())?,
                ParameterPatch::UpdateBetween { path, start, stop, value } => {
                    parameters.with_value_update_between(path, *start, *stop, value.clone())?
                }
                ParameterPatch::AddChild { path, node } => parameters.with_child(path, node.clone())?,
                ParameterPatch::Transform(transform) => transform(&parameters)?,
            };
        }

        let key = format!("{}.{}", base.key(), self.key);
        info!(reform = %self.key, base = %base.key(), changes = self.variable_changes.len(), patches = self.parameter_patches.len(), "reform applied");
        Ok(Arc::new(LegislativeSystem::derived(key, registry, parameters, base)))
    }
}

/// Applies `reforms` left to right; each one sees the system produced by the previous.
pub fn compose(base: &Arc<LegislativeSystem>, reforms: &[Reform]) -> Result<Arc<LegislativeSystem>, SystemError> {
    reforms.iter().try_fold(Arc::clone(base), |system, reform| reform.apply(&system))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{kernel, Simulation};
    use crate::parameters::{Parameter, ParameterEntry};
    use crate::periods::PeriodUnit;
    use crate::store::VariableRegistry;

    fn jan1(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
    }

    fn year(y: i32) -> Period {
        Period::year(y).unwrap()
    }

    fn base_system() -> Arc<LegislativeSystem> {
        let mut registry = VariableRegistry::new();
        registry.register(VariableDefinition::float("poste", PeriodUnit::Year)).unwrap();
        registry.register(VariableDefinition::float("taxe", PeriodUnit::Year).formula(Formula::new(|view, period, parameters| {
            Ok(Value::from(kernel::scale(&view.float("poste", period)?, parameters.number("taux")?)))
        }))).unwrap();
        registry.register(VariableDefinition::float("aide", PeriodUnit::Year).formula(Formula::new(|view, _, _| Ok(Value::from(view.filled(10.0)))))).unwrap();

        let taux = Parameter::new(vec![ParameterEntry::new(jan1(2000), 0.1)]).unwrap();
        let parameters = ParameterTree::new().with_child("taux", ParameterNode::leaf(taux)).unwrap();
        Arc::new(LegislativeSystem::new("base", registry, parameters))
    }

    fn run(system: &Arc<LegislativeSystem>, variable: &str) -> Value {
        let mut sim = Simulation::new(Arc::clone(system), 2);
        sim.set_input("poste", year(2017), Value::from(vec![100.0, 200.0])).unwrap();
        sim.calculate(variable, year(2017)).unwrap()
    }

    #[test]
    fn test_parameter_reform_leaves_base_untouched() {
        let base = base_system();
        let reform = Reform::new("hausse", "Hausse du taux").update_parameter("taux", jan1(2017), 0.2);
        let reformed = reform.apply(&base).unwrap();

        assert_eq!(reformed.key(), "base.hausse");
        assert!(Arc::ptr_eq(reformed.baseline().unwrap(), &base));
        assert_eq!(run(&reformed, "taxe"), Value::from(vec![20.0, 40.0]));
        assert_eq!(run(&base, "taxe"), Value::from(vec![10.0, 20.0]));
    }

    #[test]
    fn test_neutralize_and_add_variable() {
        let base = base_system();
        let reform = Reform::new("r", "r")
            .neutralize_variable("aide")
            .add_variable(VariableDefinition::float("nouvelle", PeriodUnit::Year).formula(Formula::new(|view, _, _| Ok(Value::from(view.filled(1.0))))));
        let reformed = reform.apply(&base).unwrap();

        assert_eq!(run(&reformed, "aide"), Value::from(vec![0.0, 0.0]));
        assert_eq!(run(&reformed, "nouvelle"), Value::from(vec![1.0, 1.0]));
        assert!(!base.registry().contains("nouvelle"));
        assert!(!base.registry().get("aide").unwrap().is_neutralized);

        let duplicate = Reform::new("d", "d").add_variable(VariableDefinition::float("aide", PeriodUnit::Year));
        assert!(matches!(duplicate.apply(&base), Err(SystemError::Registry(_))));
    }

    #[test]
    fn test_based_on_baseline_wraps_base_formula() {
        let base = base_system();
        let reform = Reform::new("double", "double").based_on_baseline("taxe", |base, view, period, parameters| {
            let before = base.call(view, period, parameters)?.to_f64();
            Ok(Value::from(kernel::scale(&before, 2.0)))
        });
        let reformed = reform.apply(&base).unwrap();
        assert_eq!(run(&reformed, "taxe"), Value::from(vec![20.0, 40.0]));

        let nothing = Reform::new("n", "n").based_on_baseline("poste", |base, view, period, parameters| base.call(view, period, parameters));
        assert!(matches!(nothing.apply(&base), Err(SystemError::NothingToWrap { .. })));
    }

    #[test]
    fn test_later_edit_wins_and_composition() {
        let base = base_system();
        let first = Reform::new("a", "a").update_parameter("taux", jan1(2017), 0.3).update_parameter("taux", jan1(2017), 0.5);
        let second = Reform::new("b", "b").modify_parameters(|tree| {
            let reference = tree.node("taux")?.clone();
            tree.with_child("taux_reference", reference)
        });

        let composed = compose(&base, &[first, second]).unwrap();
        assert_eq!(composed.key(), "base.a.b");
        assert_eq!(composed.parameters().number("taux", jan1(2017)).unwrap(), 0.5);
        assert_eq!(composed.parameters().number("taux_reference", jan1(2017)).unwrap(), 0.5);
        assert!(Arc::ptr_eq(&composed.root_baseline(), &base));
        assert!(base.parameters().node("taux_reference").is_err());
    }

    #[test]
    fn test_failed_patch_is_an_error() {
        let base = base_system();
        let reform = Reform::new("x", "x").update_parameter("absent", jan1(2017), 1.0);
        assert!(matches!(reform.apply(&base), Err(SystemError::Parameter(e)) if e.is_not_found()));
    }
}
