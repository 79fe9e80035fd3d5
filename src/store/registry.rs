use super::error::RegistryError;
use super::types::VariableId;
use super::variable::{Formula, VariableDefinition};
use crate::periods::Period;
use std::collections::HashMap;
use std::sync::Arc;

/// What a simulation runs for one (variable, period): a formula, or the default constant.
#[derive(Debug, Clone, Copy)]
pub enum SelectedFormula<'a> {
    Formula(&'a Formula),
    Default,
}

/// The variables of a legislative system, addressed by name or by id.
///
/// Definitions are stored behind `Arc`, so cloning a registry to derive a reform
/// only copies pointers; replaced definitions never affect the original.
#[derive(Debug, Clone, Default)]
pub struct VariableRegistry {
    definitions: Vec<Arc<VariableDefinition>>,
    ids: HashMap<String, VariableId>,
}

impl VariableRegistry {
    pub fn new() -> Self { Self::default() }
    pub fn len(&self) -> usize { self.definitions.len() }
    pub fn is_empty(&self) -> bool { self.definitions.is_empty() }

    pub fn register(&mut self, definition: VariableDefinition) -> Result<VariableId, RegistryError> {
        if self.ids.contains_key(&definition.name) {
            return Err(RegistryError::DuplicateVariable { name: definition.name });
        }
        validate(&definition)?;

        let id = VariableId::new(self.definitions.len());
        self.ids.insert(definition.name.clone(), id);
        self.definitions.push(Arc::new(definition));
        Ok(id)
    }

    /// Substitutes the definition of the same name, or registers it when absent.
    /// A replaced variable keeps its id.
    pub fn replace(&mut self, definition: VariableDefinition) -> Result<VariableId, RegistryError> {
        match self.ids.get(&definition.name) {
            Some(&id) => {
                validate(&definition)?;
                self.definitions[id.index()] = Arc::new(definition);
                Ok(id)
            }
            None => self.register(definition),
        }
    }

    /// Drops every formula of `name`: it yields its default value for any period
    /// and ignores inputs.
    pub fn neutralize(&mut self, name: &str) -> Result<VariableId, RegistryError> {
        let id = self.id(name)?;
        let neutral = self.definitions[id.index()].neutralized();
        self.definitions[id.index()] = Arc::new(neutral);
        Ok(id)
    }

    pub fn id(&self, name: &str) -> Result<VariableId, RegistryError> {
        self.ids.get(name).copied().ok_or_else(|| RegistryError::VariableNotFound { name: name.to_string() })
    }

    pub fn get(&self, name: &str) -> Result<&Arc<VariableDefinition>, RegistryError> {
        self.id(name).map(|id| &self.definitions[id.index()])
    }

    pub fn get_by_id(&self, id: VariableId) -> Option<&Arc<VariableDefinition>> {
        self.definitions.get(id.index())
    }

    pub fn contains(&self, name: &str) -> bool { self.ids.contains_key(name) }

    /// Names in registration order.
    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.definitions.iter().map(|d| d.name.as_str())
    }

    pub fn select_formula(definition: &VariableDefinition, period: Period) -> SelectedFormula<'_> {
        match definition.formula_at(period) {
            Some(formula) => SelectedFormula::Formula(formula),
            None => SelectedFormula::Default,
        }
    }
}

fn validate(definition: &VariableDefinition) -> Result<(), RegistryError> {
    let name = &definition.name;
    if !definition.default_value.matches(definition.value_type) {
        return Err(RegistryError::InvalidDefault { name: name.clone(), expected: definition.value_type.to_string() });
    }

    let formulas = definition.formulas();
    if let Some(empty) = formulas.iter().find(|f| f.is_empty_window()) {
        return Err(RegistryError::EmptyFormulaWindow { name: name.clone(), window: empty.window() });
    }
    for (i, first) in formulas.iter().enumerate() {
        if let Some(second) = formulas[i + 1..].iter().find(|other| first.overlaps(other)) {
            return Err(RegistryError::OverlappingFormulaValidity {
                name: name.clone(),
                first: first.window(),
                second: second.window(),
            });
        }
    }
    Ok(())
}
