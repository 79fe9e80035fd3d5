//! engine.rs
//! Lazy, memoized evaluation of variables for a population of households.
//!
//! A request for (variable, period) is answered, in order, from the ledger, from a
//! bound input column, from the formula in force at the start of the period, or
//! with the variable's default value. Every formula run goes through `calculate`,
//! which keeps the stack of evaluations in progress: meeting a key already on the
//! stack is a circular dependency, reported with the whole chain.

use crate::analysis::telemetry::EvaluationStats;
use crate::analysis::topology::DependencyGraph;
use crate::compute::kernel;
use crate::compute::ledger::{CacheKey, ComputationError, Ledger, Slot};
use crate::compute::value::Value;
use crate::compute::view::EntityView;
use crate::periods::{Period, PeriodUnit};
use crate::reform::LegislativeSystem;
use crate::store::{Formula, PeriodPolicy, SelectedFormula, ValueType, VariableDefinition, VariableId, VariableRegistry};
use smallvec::SmallVec;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, warn};

pub struct Simulation {
    system: Arc<LegislativeSystem>,
    count: usize,
    inputs: HashMap<VariableId, BTreeMap<Period, Value>>,
    ledger: Ledger,
    stack: SmallVec<[CacheKey; 16]>,
    dependencies: DependencyGraph,
    stats: EvaluationStats,
}

impl Simulation {
    pub fn new(system: Arc<LegislativeSystem>, household_count: usize) -> Self {
        Self {
            system,
            count: household_count,
            inputs: HashMap::new(),
            ledger: Ledger::new(),
            stack: SmallVec::new(),
            dependencies: DependencyGraph::new(),
            stats: EvaluationStats::default(),
        }
    }

    pub fn system(&self) -> &Arc<LegislativeSystem> { &self.system }
    pub fn registry(&self) -> &VariableRegistry { self.system.registry() }
    pub fn household_count(&self) -> usize { self.count }
    pub fn ledger(&self) -> &Ledger { &self.ledger }
    pub fn dependency_graph(&self) -> &DependencyGraph { &self.dependencies }
    pub fn stats(&self) -> &EvaluationStats { &self.stats }

    /// No evaluation is in progress and no slot is left marked as such.
    pub fn is_idle(&self) -> bool { self.stack.is_empty() && self.ledger.in_progress() == 0 }

    pub fn variable_name(&self, id: VariableId) -> Option<&str> {
        self.registry().get_by_id(id).map(|d| d.name.as_str())
    }

    fn lookup(&self, name: &str) -> Result<(VariableId, Arc<VariableDefinition>), ComputationError> {
        let registry = self.system.registry();
        let id = registry.id(name)?;
        let definition = Arc::clone(registry.get(name)?);
        Ok((id, definition))
    }

    /// The ledger key of a request, with the period of eternal variables collapsed.
    pub fn key_of(&self, name: &str, period: Period) -> Result<CacheKey, ComputationError> {
        let (id, definition) = self.lookup(name)?;
        Ok((id, normalize(&definition, period)))
    }

    pub fn cached(&self, name: &str, period: Period) -> Option<&Value> {
        let key = self.key_of(name, period).ok()?;
        self.ledger.computed(&key)
    }

    pub fn input(&self, name: &str, period: Period) -> Option<&Value> {
        let (id, period) = self.key_of(name, period).ok()?;
        self.inputs.get(&id)?.get(&period)
    }

    pub fn has_input(&self, name: &str) -> bool {
        self.registry().id(name).map_or(false, |id| self.inputs.get(&id).map_or(false, |m| !m.is_empty()))
    }

    // --- Inputs ---

    /// Binds `value` as the ground truth of `name` over `period`.
    ///
    /// A period coarser than the definition period is split according to the
    /// variable's policy; a finer one is rejected. Every cached value that read
    /// the replaced keys, directly or not, is invalidated.
    pub fn set_input(&mut self, name: &str, period: Period, value: Value) -> Result<(), ComputationError> {
        let (id, definition) = self.lookup(name)?;
        if value.len() != self.count {
            return Err(ComputationError::LengthMismatch { variable: name.to_string(), period, expected: self.count, actual: value.len() });
        }
        if !value.matches(definition.value_type) {
            return Err(type_mismatch(&definition, period, &value));
        }
        if definition.is_neutralized {
            warn!(variable = name, %period, "ignoring input for a neutralized variable");
            return Ok(());
        }

        let value = value.sanitized();
        let native = definition.definition_period;
        let assignments: Vec<(Period, Value)> = if native == PeriodUnit::Eternity {
            vec![(Period::eternity(), value)]
        } else if is_native(&definition, period) {
            vec![(period, value)]
        } else if period.is_eternal() || period.unit() < native {
            return Err(period_mismatch(&definition, period));
        } else {
            let parts = period.subperiods(native)?;
            match definition.period_policy {
                PeriodPolicy::Strict => return Err(period_mismatch(&definition, period)),
                PeriodPolicy::Divide => {
                    require_float(&definition, period)?;
                    let share = Value::from(kernel::scale(&value.to_f64(), 1.0 / parts.len() as f64));
                    parts.into_iter().map(|p| (p, share.clone())).collect()
                }
                PeriodPolicy::Dispatch => parts.into_iter().map(|p| (p, value.clone())).collect(),
            }
        };

        let keys: Vec<CacheKey> = assignments.iter().map(|(p, _)| (id, *p)).collect();
        let by_period = self.inputs.entry(id).or_default();
        for (p, v) in assignments {
            by_period.insert(p, v);
        }
        debug!(variable = name, %period, keys = keys.len(), "input bound");
        self.invalidate_keys(&keys);
        Ok(())
    }

    /// Drops the cached value of (name, period) and everything computed from it.
    /// Inputs are kept.
    pub fn invalidate(&mut self, name: &str, period: Period) -> Result<(), ComputationError> {
        let key = self.key_of(name, period)?;
        self.invalidate_keys(&[key]);
        Ok(())
    }

    fn invalidate_keys(&mut self, keys: &[CacheKey]) {
        let stale = self.dependencies.downstream_from(keys);
        let before = self.ledger.len();
        self.ledger.invalidate(stale);
        self.stats.invalidations += before - self.ledger.len();
    }

    /// Forgets every computed value and recorded dependency. Inputs are kept.
    pub fn reset(&mut self) {
        self.ledger.clear();
        self.dependencies.clear();
        self.stack.clear();
    }

    // --- Evaluation ---

    pub fn calculate(&mut self, name: &str, period: Period) -> Result<Value, ComputationError> {
        let (id, definition) = self.lookup(name)?;
        let period = normalize(&definition, period);
        let key = (id, period);

        if let Some(&consumer) = self.stack.last() {
            self.dependencies.record(key, consumer);
        }

        match self.ledger.get(&key) {
            Some(Slot::Computed(value)) => {
                self.stats.cache_hits += 1;
                return Ok(value.clone());
            }
            Some(Slot::Failed(error)) => return Err(error.clone()),
            Some(Slot::InProgress) => return Err(self.cycle_through(key)),
            None => {}
        }

        // 1. Mark, so that a request for the same key from below is seen as a cycle
        self.ledger.insert(key, Slot::InProgress);
        self.stack.push(key);

        // 2. Evaluate
        let outcome = self.evaluate(&definition, id, period);

        // 3. Unmark, on every path
        self.stack.pop();
        match &outcome {
            Ok(value) => self.ledger.insert(key, Slot::Computed(value.clone())),
            Err(error) => self.ledger.insert(key, Slot::Failed(error.clone())),
        }
        outcome
    }

    pub fn calculate_float(&mut self, name: &str, period: Period) -> Result<Arc<Vec<f64>>, ComputationError> {
        Ok(self.calculate(name, period)?.to_f64())
    }

    /// Sum over the definition-period sub-periods of `period`, whatever the variable's policy.
    pub fn calculate_add(&mut self, name: &str, period: Period) -> Result<Vec<f64>, ComputationError> {
        let (_, definition) = self.lookup(name)?;
        let native = definition.definition_period;
        if native == PeriodUnit::Eternity || is_native(&definition, period) {
            return Ok(self.calculate(name, period)?.to_f64().to_vec());
        }
        if period.is_eternal() || period.unit() < native {
            return Err(period_mismatch(&definition, period));
        }
        self.sum_over(&definition, period)
    }

    /// Pro-rata share of the enclosing definition period, whatever the variable's policy.
    pub fn calculate_divide(&mut self, name: &str, period: Period) -> Result<Vec<f64>, ComputationError> {
        let (_, definition) = self.lookup(name)?;
        if definition.definition_period == PeriodUnit::Eternity || is_native(&definition, period) {
            return Ok(self.calculate(name, period)?.to_f64().to_vec());
        }
        if period.is_eternal() || period.unit() > definition.definition_period {
            return Err(period_mismatch(&definition, period));
        }
        let (containing, share) = containing_share(&definition, period)?;
        let whole = self.calculate(name, containing)?.to_f64();
        Ok(kernel::scale(&whole, share))
    }

    fn evaluate(&mut self, definition: &VariableDefinition, id: VariableId, period: Period) -> Result<Value, ComputationError> {
        if definition.is_neutralized {
            self.stats.default_fills += 1;
            return Ok(Value::filled(definition.default_value, self.count));
        }
        if !is_native(definition, period) {
            return self.evaluate_across_periods(definition, period);
        }
        if let Some(value) = self.inputs.get(&id).and_then(|by_period| by_period.get(&period)) {
            self.stats.input_reads += 1;
            return Ok(value.clone());
        }
        match VariableRegistry::select_formula(definition, period) {
            SelectedFormula::Formula(formula) => self.run_formula(definition, formula, period),
            SelectedFormula::Default => {
                self.stats.default_fills += 1;
                Ok(Value::filled(definition.default_value, self.count))
            }
        }
    }

    fn evaluate_across_periods(&mut self, definition: &VariableDefinition, period: Period) -> Result<Value, ComputationError> {
        if period.is_eternal() {
            return Err(period_mismatch(definition, period));
        }
        let coarser = period.unit() >= definition.definition_period;
        match (definition.period_policy, coarser) {
            (PeriodPolicy::Strict, _) | (PeriodPolicy::Dispatch, true) => Err(period_mismatch(definition, period)),
            (PeriodPolicy::Divide, true) => {
                require_float(definition, period)?;
                self.sum_over(definition, period).map(Value::from)
            }
            (PeriodPolicy::Divide, false) => {
                require_float(definition, period)?;
                let (containing, share) = containing_share(definition, period)?;
                let whole = self.calculate(&definition.name, containing)?.to_f64();
                Ok(Value::from(kernel::scale(&whole, share)))
            }
            (PeriodPolicy::Dispatch, false) => {
                let (containing, _) = containing_share(definition, period)?;
                self.calculate(&definition.name, containing)
            }
        }
    }

    fn sum_over(&mut self, definition: &VariableDefinition, period: Period) -> Result<Vec<f64>, ComputationError> {
        let mut total = vec![0.0; self.count];
        for part in period.subperiods(definition.definition_period)? {
            let value = self.calculate(&definition.name, part)?.to_f64();
            total = kernel::add(&total, &value);
        }
        Ok(total)
    }

    fn run_formula(&mut self, definition: &VariableDefinition, formula: &Formula, period: Period) -> Result<Value, ComputationError> {
        self.stats.record_formula_call(&definition.name);
        debug!(variable = %definition.name, %period, window = %formula.window(), "running formula");

        let system = Arc::clone(&self.system);
        let parameters = system.parameters().at_instant(period.start_instant());
        let result = {
            let mut view = EntityView::new(self, &definition.name, period);
            formula.call(&mut view, period, &parameters)
        };
        let value = result.map_err(|error| attribute(error, &definition.name, period))?;

        if value.len() != self.count {
            return Err(ComputationError::LengthMismatch {
                variable: definition.name.clone(),
                period,
                expected: self.count,
                actual: value.len(),
            });
        }
        if !value.matches(definition.value_type) {
            return Err(type_mismatch(definition, period, &value));
        }
        Ok(value.sanitized())
    }

    fn cycle_through(&self, key: CacheKey) -> ComputationError {
        let chain = self.stack.iter()
            .chain(std::iter::once(&key))
            .map(|&(id, period)| (self.variable_name(id).unwrap_or("?").to_string(), period))
            .collect();
        ComputationError::CircularDependency { chain }
    }
}

fn normalize(definition: &VariableDefinition, period: Period) -> Period {
    if definition.definition_period == PeriodUnit::Eternity { Period::eternity() } else { period }
}

fn is_native(definition: &VariableDefinition, period: Period) -> bool {
    period.unit() == definition.definition_period && period.size() == 1
}

/// The calendar definition period containing `period`, and the share of it `period` covers.
fn containing_share(definition: &VariableDefinition, period: Period) -> Result<(Period, f64), ComputationError> {
    let containing = period.enclosing(definition.definition_period);
    if !containing.contains(&period) {
        return Err(period_mismatch(definition, period));
    }
    let units = containing.subperiods(period.unit())?.len();
    Ok((containing, period.size() as f64 / units as f64))
}

/// Formula errors name the variable whose formula failed. An error already
/// attributed deeper in the graph keeps its original attribution.
fn attribute(error: ComputationError, variable: &str, period: Period) -> ComputationError {
    match error {
        ComputationError::CircularDependency { .. } | ComputationError::FormulaFailed { .. } => error,
        other => ComputationError::FormulaFailed { variable: variable.to_string(), period, source: Box::new(other) },
    }
}

fn period_mismatch(definition: &VariableDefinition, period: Period) -> ComputationError {
    ComputationError::PeriodMismatch { variable: definition.name.clone(), period, definition: definition.definition_period }
}

fn type_mismatch(definition: &VariableDefinition, period: Period, value: &Value) -> ComputationError {
    ComputationError::TypeMismatch {
        variable: definition.name.clone(),
        period,
        expected: definition.value_type.to_string(),
        actual: value.type_name().to_string(),
    }
}

fn require_float(definition: &VariableDefinition, period: Period) -> Result<(), ComputationError> {
    if definition.value_type == ValueType::Float {
        Ok(())
    } else {
        Err(ComputationError::TypeMismatch {
            variable: definition.name.clone(),
            period,
            expected: ValueType::Float.to_string(),
            actual: definition.value_type.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parameters::{Parameter, ParameterEntry, ParameterNode, ParameterTree};
    use crate::store::{Category, Scalar};
    use chrono::NaiveDate;
    use rstest::rstest;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn year(y: i32) -> Period {
        Period::year(y).unwrap()
    }

    fn jan1(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
    }

    fn system(definitions: Vec<VariableDefinition>) -> Arc<LegislativeSystem> {
        let mut registry = VariableRegistry::new();
        for d in definitions {
            registry.register(d).unwrap();
        }
        let rate = Parameter::new(vec![ParameterEntry::new(jan1(2000), 0.5), ParameterEntry::new(jan1(2015), 0.25)]).unwrap();
        let parameters = ParameterTree::new().with_child("taux", ParameterNode::leaf(rate)).unwrap();
        Arc::new(LegislativeSystem::new("test", registry, parameters))
    }

    fn yearly(name: &str) -> VariableDefinition {
        VariableDefinition::float(name, PeriodUnit::Year)
    }

    fn times(source: &'static str, factor: f64) -> Formula {
        Formula::new(move |view, period, _| Ok(Value::from(kernel::scale(&view.float(source, period)?, factor))))
    }

    #[test]
    fn test_input_then_formula() {
        let sys = system(vec![yearly("poste"), yearly("depense").formula(times("poste", 2.0))]);
        let mut sim = Simulation::new(sys, 3);
        sim.set_input("poste", year(2015), Value::from(vec![1.0, 2.0, 3.0])).unwrap();

        assert_eq!(sim.calculate("depense", year(2015)).unwrap(), Value::from(vec![2.0, 4.0, 6.0]));
        // No input for 2016: the raw variable falls back to its default.
        assert_eq!(sim.calculate("depense", year(2016)).unwrap(), Value::from(vec![0.0; 3]));
        assert!(sim.is_idle());
    }

    #[test]
    fn test_memoized_formula_runs_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sys = system(vec![
            yearly("a").formula(Formula::new(move |view, _, _| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(Value::from(view.filled(1.0)))
            })),
            yearly("b").formula(times("a", 1.0)),
        ]);
        let mut sim = Simulation::new(sys, 2);

        let first = sim.calculate("b", year(2015)).unwrap();
        let again = sim.calculate("a", year(2015)).unwrap();
        assert_eq!(first, again);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(sim.stats().formula_calls_for("a"), 1);
        assert_eq!(sim.stats().cache_hits, 1);
    }

    #[test]
    fn test_parameters_read_at_period_start() {
        let sys = system(vec![yearly("taux_applique").formula(Formula::new(|view, _, parameters| {
            Ok(Value::from(view.filled(parameters.number("taux")?)))
        }))]);
        let mut sim = Simulation::new(sys, 1);
        assert_eq!(sim.calculate("taux_applique", year(2014)).unwrap(), Value::from(vec![0.5]));
        assert_eq!(sim.calculate("taux_applique", year(2015)).unwrap(), Value::from(vec![0.25]));
    }

    #[test]
    fn test_cycle_reported_with_chain_and_no_marks_left() {
        let sys = system(vec![yearly("a").formula(times("b", 1.0)), yearly("b").formula(times("a", 1.0))]);
        let mut sim = Simulation::new(sys, 1);

        let err = sim.calculate("a", year(2015)).unwrap_err();
        match &err {
            ComputationError::CircularDependency { chain } => {
                let names: Vec<&str> = chain.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["a", "b", "a"]);
            }
            other => panic!("Wrong error type: {:?}", other),
        }
        assert!(sim.is_idle());
        // The failure is memoized for both participants.
        assert!(sim.calculate("b", year(2015)).unwrap_err().is_cycle());
    }

    #[test]
    fn test_cycle_chain_includes_callers_above_the_loop() {
        let sys = system(vec![
            yearly("x").formula(times("a", 1.0)),
            yearly("a").formula(times("b", 1.0)),
            yearly("b").formula(times("a", 1.0)),
        ]);
        let mut sim = Simulation::new(sys, 1);

        match sim.calculate("x", year(2015)).unwrap_err() {
            ComputationError::CircularDependency { chain } => {
                let names: Vec<&str> = chain.iter().map(|(n, _)| n.as_str()).collect();
                assert_eq!(names, vec!["x", "a", "b", "a"]);
                assert!(chain.iter().all(|(_, p)| *p == year(2015)));
            }
            other => panic!("Wrong error type: {:?}", other),
        }
        assert!(sim.is_idle());
    }

    #[test]
    fn test_failure_is_attributed_once() {
        let sys = system(vec![
            yearly("inner").formula(Formula::new(|_, _, parameters| Ok(Value::from(vec![parameters.number("absent")?])))),
            yearly("outer").formula(times("inner", 1.0)),
        ]);
        let mut sim = Simulation::new(sys, 1);

        let err = sim.calculate("outer", year(2015)).unwrap_err();
        match &err {
            ComputationError::FormulaFailed { variable, .. } => assert_eq!(variable, "inner"),
            other => panic!("Wrong error type: {:?}", other),
        }
        assert!(matches!(err.root_cause(), ComputationError::Parameter(e) if e.is_not_found()));
        assert!(sim.is_idle());
    }

    #[test]
    fn test_unknown_variable() {
        let mut sim = Simulation::new(system(vec![yearly("a").formula(times("missing", 1.0))]), 1);
        assert!(matches!(sim.calculate("nope", year(2015)), Err(ComputationError::VariableNotFound { .. })));
        let err = sim.calculate("a", year(2015)).unwrap_err();
        assert!(matches!(err.root_cause(), ComputationError::VariableNotFound { name } if name == "missing"));
    }

    #[test]
    fn test_formula_output_checked_and_sanitized() {
        let sys = system(vec![
            yearly("short").formula(Formula::new(|_, _, _| Ok(Value::from(vec![1.0])))),
            yearly("flag").formula(Formula::new(|view, _, _| Ok(Value::from(vec![true; view.count()])))),
            yearly("ratio").formula(Formula::new(|_, _, _| Ok(Value::from(vec![1.0 / 0.0, f64::NAN])))),
        ]);
        let mut sim = Simulation::new(sys, 2);

        assert!(matches!(sim.calculate("short", year(2015)), Err(ComputationError::LengthMismatch { expected: 2, actual: 1, .. })));
        assert!(matches!(sim.calculate("flag", year(2015)), Err(ComputationError::TypeMismatch { .. })));
        assert_eq!(sim.calculate("ratio", year(2015)).unwrap(), Value::from(vec![0.0, 0.0]));
    }

    #[test]
    fn test_set_input_invalidates_dependents() {
        let sys = system(vec![
            yearly("poste"),
            yearly("depense").formula(times("poste", 2.0)),
            yearly("total").formula(times("depense", 1.0)),
            yearly("autre").formula(Formula::new(|view, _, _| Ok(Value::from(view.filled(7.0))))),
        ]);
        let mut sim = Simulation::new(sys, 1);
        sim.set_input("poste", year(2015), Value::from(vec![1.0])).unwrap();
        assert_eq!(sim.calculate("total", year(2015)).unwrap(), Value::from(vec![2.0]));
        sim.calculate("autre", year(2015)).unwrap();

        sim.set_input("poste", year(2015), Value::from(vec![5.0])).unwrap();
        assert!(sim.cached("total", year(2015)).is_none());
        assert!(sim.cached("autre", year(2015)).is_some());
        assert_eq!(sim.calculate("total", year(2015)).unwrap(), Value::from(vec![10.0]));
        assert_eq!(sim.stats().formula_calls_for("depense"), 2);
    }

    #[test]
    fn test_input_shape_checked() {
        let mut sim = Simulation::new(system(vec![yearly("poste")]), 2);
        assert!(matches!(sim.set_input("poste", year(2015), Value::from(vec![1.0])), Err(ComputationError::LengthMismatch { .. })));
        assert!(matches!(sim.set_input("poste", year(2015), Value::from(vec![true, false])), Err(ComputationError::TypeMismatch { .. })));
        assert!(matches!(sim.set_input("poste", Period::month(2015, 1).unwrap(), Value::from(vec![1.0, 1.0])), Err(ComputationError::PeriodMismatch { .. })));
    }

    #[rstest]
    #[case(PeriodPolicy::Divide, 10.0, 120.0)]
    #[case(PeriodPolicy::Dispatch, 120.0, 120.0)]
    fn test_monthly_variable_given_yearly(#[case] policy: PeriodPolicy, #[case] expected_month: f64, #[case] expected_year: f64) {
        let monthly = VariableDefinition::float("loyer", PeriodUnit::Month).policy(policy);
        let mut sim = Simulation::new(system(vec![monthly]), 1);
        sim.set_input("loyer", year(2015), Value::from(vec![120.0])).unwrap();

        assert_eq!(sim.calculate("loyer", Period::month(2015, 6).unwrap()).unwrap(), Value::from(vec![expected_month]));
        match policy {
            PeriodPolicy::Divide => assert_eq!(sim.calculate("loyer", year(2015)).unwrap(), Value::from(vec![expected_year])),
            _ => assert!(matches!(sim.calculate("loyer", year(2015)), Err(ComputationError::PeriodMismatch { .. }))),
        }
    }

    #[test]
    fn test_yearly_flow_read_monthly() {
        let sys = system(vec![yearly("revenu").policy(PeriodPolicy::Divide), yearly("strict")]);
        let mut sim = Simulation::new(sys, 1);
        sim.set_input("revenu", year(2015), Value::from(vec![1200.0])).unwrap();

        assert_eq!(sim.calculate("revenu", Period::month(2015, 3).unwrap()).unwrap(), Value::from(vec![100.0]));
        assert!(matches!(sim.calculate("strict", Period::month(2015, 3).unwrap()), Err(ComputationError::PeriodMismatch { .. })));
        assert_eq!(sim.calculate_divide("strict", Period::month(2015, 3).unwrap()).unwrap(), vec![0.0]);
        assert_eq!(sim.calculate_add("revenu", Period::parse("year:2015:2").unwrap()).unwrap(), vec![1200.0]);
    }

    #[test]
    fn test_neutralized_ignores_input_and_formula() {
        let mut registry = VariableRegistry::new();
        registry.register(yearly("tarif").formula(Formula::new(|view, _, _| Ok(Value::from(view.filled(3.0)))))).unwrap();
        registry.neutralize("tarif").unwrap();
        let sys = Arc::new(LegislativeSystem::new("neutral", registry, ParameterTree::new()));

        let mut sim = Simulation::new(sys, 2);
        sim.set_input("tarif", year(2015), Value::from(vec![9.0, 9.0])).unwrap();
        assert_eq!(sim.calculate("tarif", year(2015)).unwrap(), Value::from(vec![0.0, 0.0]));
    }

    #[derive(Debug, Clone, Copy, PartialEq)]
    enum Contrat { Aucun, Base }

    impl Category for Contrat {
        const VARIANTS: &'static [&'static str] = &["aucun", "base"];
        fn code(self) -> u16 { self as u16 }
        fn from_code(code: u16) -> Option<Self> {
            match code { 0 => Some(Contrat::Aucun), 1 => Some(Contrat::Base), _ => None }
        }
    }

    #[test]
    fn test_enum_and_eternal_variables() {
        let contrat = VariableDefinition::new("contrat", Contrat::value_type(), PeriodUnit::Eternity);
        let abonnement = yearly("abonnement").formula(Formula::new(|view, period, _| {
            let contrats = view.categories::<Contrat>("contrat", period)?;
            Ok(Value::from(contrats.iter().map(|c| if *c == Contrat::Base { 100.0 } else { 0.0 }).collect::<Vec<_>>()))
        }));
        let default_base = VariableDefinition::new("defaut", Contrat::value_type(), PeriodUnit::Year).default_value(Scalar::Enum(1));
        let mut sim = Simulation::new(system(vec![contrat, abonnement, default_base]), 2);
        sim.set_input("contrat", year(2010), Value::from_categories(&[Contrat::Base, Contrat::Aucun])).unwrap();

        assert_eq!(sim.calculate("abonnement", year(2015)).unwrap(), Value::from(vec![100.0, 0.0]));
        assert_eq!(sim.calculate("defaut", year(2015)).unwrap().categories::<Contrat>().unwrap(), vec![Contrat::Base; 2]);
    }
}
