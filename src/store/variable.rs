//! variable.rs
//! Variable definitions and their dated formulas.

use super::types::{EntityKind, PeriodPolicy, Scalar, ValueType};
use crate::compute::{ComputationError, EntityView, Value};
use crate::parameters::ParametersAt;
use crate::periods::{Period, PeriodUnit};
use chrono::NaiveDate;
use smallvec::SmallVec;
use std::fmt;
use std::sync::Arc;

pub type FormulaFn = dyn Fn(&mut EntityView<'_>, Period, &ParametersAt<'_>) -> Result<Value, ComputationError> + Send + Sync;

/// A formula reusing the formula it replaces: `(base, view, period, parameters)`.
pub type WrapperFn = dyn Fn(&Formula, &mut EntityView<'_>, Period, &ParametersAt<'_>) -> Result<Value, ComputationError> + Send + Sync;

/// A formula body together with its validity window `[valid_from, valid_until)`.
/// An open bound extends to the beginning or the end of time.
#[derive(Clone)]
pub struct Formula {
    valid_from: Option<NaiveDate>,
    valid_until: Option<NaiveDate>,
    compute: Arc<FormulaFn>,
}

impl Formula {
    pub fn new<F>(compute: F) -> Self
    where
        F: Fn(&mut EntityView<'_>, Period, &ParametersAt<'_>) -> Result<Value, ComputationError> + Send + Sync + 'static,
    {
        Self { valid_from: None, valid_until: None, compute: Arc::new(compute) }
    }

    pub fn starting(mut self, valid_from: NaiveDate) -> Self {
        self.valid_from = Some(valid_from);
        self
    }

    pub fn until(mut self, valid_until: NaiveDate) -> Self {
        self.valid_until = Some(valid_until);
        self
    }

    pub fn valid_from(&self) -> Option<NaiveDate> { self.valid_from }
    pub fn valid_until(&self) -> Option<NaiveDate> { self.valid_until }

    pub fn applies_at(&self, instant: NaiveDate) -> bool {
        self.valid_from.map_or(true, |from| from <= instant) && self.valid_until.map_or(true, |until| instant < until)
    }

    pub(crate) fn is_empty_window(&self) -> bool {
        matches!((self.valid_from, self.valid_until), (Some(from), Some(until)) if from >= until)
    }

    pub(crate) fn overlaps(&self, other: &Formula) -> bool {
        let starts_before_other_ends = match (self.valid_from, other.valid_until) {
            (Some(from), Some(until)) => from < until,
            _ => true,
        };
        let other_starts_before_end = match (other.valid_from, self.valid_until) {
            (Some(from), Some(until)) => from < until,
            _ => true,
        };
        starts_before_other_ends && other_starts_before_end
    }

    /// Same window, new body built around this formula.
    pub fn wrapped(&self, wrapper: Arc<WrapperFn>) -> Formula {
        let base = self.clone();
        Formula {
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            compute: Arc::new(move |view: &mut EntityView<'_>, period: Period, parameters: &ParametersAt<'_>| {
                wrapper(&base, view, period, parameters)
            }),
        }
    }

    pub fn call(&self, view: &mut EntityView<'_>, period: Period, parameters: &ParametersAt<'_>) -> Result<Value, ComputationError> {
        (self.compute)(view, period, parameters)
    }

    pub fn window(&self) -> String {
        let from = self.valid_from.map_or_else(|| "-inf".to_string(), |d| d.to_string());
        let until = self.valid_until.map_or_else(|| "+inf".to_string(), |d| d.to_string());
        format!("[{}, {})", from, until)
    }
}

impl fmt::Debug for Formula {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Formula").field("window", &self.window()).finish()
    }
}

/// A named quantity computed for every household.
#[derive(Debug, Clone)]
pub struct VariableDefinition {
    pub name: String,
    pub label: String,
    pub entity: EntityKind,
    pub value_type: ValueType,
    pub default_value: Scalar,
    pub definition_period: PeriodUnit,
    pub period_policy: PeriodPolicy,
    pub is_neutralized: bool,
    formulas: SmallVec<[Formula; 2]>,
}

impl VariableDefinition {
    pub fn new(name: impl Into<String>, value_type: ValueType, definition_period: PeriodUnit) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            entity: EntityKind::Menage,
            value_type,
            default_value: Scalar::zero_of(value_type),
            definition_period,
            period_policy: PeriodPolicy::Strict,
            is_neutralized: false,
            formulas: SmallVec::new(),
        }
    }

    pub fn float(name: impl Into<String>, definition_period: PeriodUnit) -> Self {
        Self::new(name, ValueType::Float, definition_period)
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    pub fn default_value(mut self, value: Scalar) -> Self {
        self.default_value = value;
        self
    }

    pub fn policy(mut self, policy: PeriodPolicy) -> Self {
        self.period_policy = policy;
        self
    }

    pub fn formula(mut self, formula: Formula) -> Self {
        self.formulas.push(formula);
        self
    }

    pub fn formulas(&self) -> &[Formula] { &self.formulas }

    /// Input-only variables carry no formula.
    pub fn has_formula(&self) -> bool { !self.formulas.is_empty() }

    /// The formula whose window contains the first day of `period`.
    pub fn formula_at(&self, period: Period) -> Option<&Formula> {
        let instant = period.start_instant();
        self.formulas.iter().find(|f| f.applies_at(instant))
    }

    pub fn neutralized(&self) -> VariableDefinition {
        VariableDefinition { is_neutralized: true, formulas: SmallVec::new(), ..self.clone() }
    }

    pub fn with_wrapped_formulas(&self, wrapper: &Arc<WrapperFn>) -> VariableDefinition {
        let formulas = self.formulas.iter().map(|f| f.wrapped(Arc::clone(wrapper))).collect();
        VariableDefinition { formulas, ..self.clone() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jan1(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
    }

    fn constant(v: f64) -> Formula {
        Formula::new(move |view, _, _| Ok(Value::from(view.filled(v))))
    }

    #[test]
    fn test_window_bounds() {
        let f = constant(1.0).starting(jan1(2007)).until(jan1(2009));
        assert!(!f.applies_at(NaiveDate::from_ymd_opt(2006, 12, 31).unwrap()));
        assert!(f.applies_at(jan1(2007)));
        assert!(f.applies_at(NaiveDate::from_ymd_opt(2008, 12, 31).unwrap()));
        assert!(!f.applies_at(jan1(2009)));
        assert_eq!(f.window(), "[2007-01-01, 2009-01-01)");
    }

    #[test]
    fn test_overlap_detection() {
        let early = constant(1.0).until(jan1(2007));
        let middle = constant(2.0).starting(jan1(2007)).until(jan1(2009));
        let late = constant(3.0).starting(jan1(2008));

        assert!(!early.overlaps(&middle));
        assert!(!middle.overlaps(&early));
        assert!(middle.overlaps(&late));
        assert!(constant(0.0).overlaps(&early));
    }

    #[test]
    fn test_formula_selection_by_period_start() {
        let def = VariableDefinition::float("essence_ticpe", PeriodUnit::Year)
            .formula(constant(1.0).starting(jan1(1990)).until(jan1(2007)))
            .formula(constant(2.0).starting(jan1(2007)).until(jan1(2009)))
            .formula(constant(3.0).starting(jan1(2009)));

        assert!(def.formula_at(Period::year(1985).unwrap()).is_none());
        assert_eq!(def.formula_at(Period::year(2006).unwrap()).unwrap().valid_from(), Some(jan1(1990)));
        assert_eq!(def.formula_at(Period::year(2008).unwrap()).unwrap().valid_from(), Some(jan1(2007)));
        assert_eq!(def.formula_at(Period::year(2015).unwrap()).unwrap().valid_from(), Some(jan1(2009)));
    }

    #[test]
    fn test_neutralized_drops_formulas() {
        let def = VariableDefinition::float("tarifs_sociaux_gaz", PeriodUnit::Year).formula(constant(5.0));
        let neutral = def.neutralized();
        assert!(neutral.is_neutralized);
        assert!(!neutral.has_formula());
        assert!(def.has_formula());
    }
}
