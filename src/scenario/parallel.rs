use super::data_frame::DataFrame;
use super::survey::SurveyTable;
use super::survey_scenario::{Initializer, ScenarioError, SurveyScenario};
use crate::periods::Period;
use crate::reform::{LegislativeSystem, Reform};
use rayon::prelude::*;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Results of one reform evaluated on the survey.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReformOutcome {
    pub key: String,
    pub data_frame: DataFrame,
    /// Weighted aggregate of each variable, reform minus baseline.
    pub differences: BTreeMap<String, f64>,
}

/// Evaluates every reform against `base` on the same table. Each worker owns
/// its scenario; only the systems and the table are shared.
pub fn run_reforms_parallel(
    base: &Arc<LegislativeSystem>,
    reforms: &[Reform],
    table: &Arc<SurveyTable>,
    period: Period,
    variables: &[&str],
    initializer: Option<&Initializer>,
) -> Vec<Result<ReformOutcome, ScenarioError>> {
    info!(reforms = reforms.len(), households = table.len(), %period, "evaluating reforms in parallel");
    reforms
        .par_iter()
        .map(|reform| evaluate_reform(base, reform, table, period, variables, initializer))
        .collect()
}

fn evaluate_reform(
    base: &Arc<LegislativeSystem>,
    reform: &Reform,
    table: &Arc<SurveyTable>,
    period: Period,
    variables: &[&str],
    initializer: Option<&Initializer>,
) -> Result<ReformOutcome, ScenarioError> {
    let system = reform.apply(base)?;
    let key = system.key().to_string();
    let mut scenario = SurveyScenario::new(system, Arc::clone(table), period)?;
    if let Some(initializer) = initializer {
        scenario = scenario.with_initializer(initializer)?;
    }

    let data_frame = scenario.create_data_frame_by_entity(variables, period, false)?;
    let mut differences = BTreeMap::new();
    for &variable in variables {
        differences.insert(variable.to_string(), scenario.compute_aggregate(variable, period, true, false)?);
    }
    Ok(ReformOutcome { key, data_frame, differences })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{kernel, Value};
    use crate::parameters::{Parameter, ParameterEntry, ParameterNode, ParameterTree};
    use crate::periods::PeriodUnit;
    use crate::store::{Formula, VariableDefinition, VariableRegistry};
    use chrono::NaiveDate;

    fn jan1(y: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, 1, 1).unwrap()
    }

    fn system() -> Arc<LegislativeSystem> {
        let mut registry = VariableRegistry::new();
        registry.register(VariableDefinition::float("pondmen", PeriodUnit::Year)).unwrap();
        registry.register(VariableDefinition::float("assiette", PeriodUnit::Year)).unwrap();
        registry.register(VariableDefinition::float("accise", PeriodUnit::Year).formula(Formula::new(|view, period, parameters| {
            Ok(Value::from(kernel::scale(&view.float("assiette", period)?, parameters.number("taux")?)))
        }))).unwrap();
        let taux = Parameter::new(vec![ParameterEntry::new(jan1(2000), 1.0)]).unwrap();
        let parameters = ParameterTree::new().with_child("taux", ParameterNode::leaf(taux)).unwrap();
        Arc::new(LegislativeSystem::new("base", registry, parameters))
    }

    #[test]
    fn test_reforms_run_independently() {
        let table = Arc::new(
            SurveyTable::new(vec![1, 2]).unwrap()
                .with_column("pondmen", vec![1.0, 3.0]).unwrap()
                .with_column("assiette", vec![10.0, 20.0]).unwrap(),
        );
        let reforms: Vec<Reform> = (2..6)
            .map(|t| Reform::new(format!("taux_{}", t), "hausse").update_parameter("taux", jan1(2010), t as f64))
            .collect();
        let period = Period::year(2015).unwrap();

        let outcomes = run_reforms_parallel(&system(), &reforms, &table, period, &["accise"], None);
        assert_eq!(outcomes.len(), 4);
        for (t, outcome) in (2..6).zip(outcomes) {
            let outcome = outcome.unwrap();
            assert_eq!(outcome.key, format!("base.taux_{}", t));
            // Baseline aggregate is 1*10 + 3*20 = 70.
            assert!((outcome.differences["accise"] - 70.0 * (t as f64 - 1.0)).abs() < 1e-9);
            assert_eq!(outcome.data_frame.column("accise").unwrap(), &Value::from(vec![10.0 * t as f64, 20.0 * t as f64]));
        }
    }

    #[test]
    fn test_failure_stays_with_its_reform() {
        let table = Arc::new(SurveyTable::new(vec![1]).unwrap().with_column("pondmen", vec![1.0]).unwrap());
        let reforms = vec![
            Reform::new("ok", "ok").update_parameter("taux", jan1(2010), 2.0),
            Reform::new("ko", "ko").update_parameter("absent.taux", jan1(2010), 2.0),
        ];
        let outcomes = run_reforms_parallel(&system(), &reforms, &table, Period::year(2015).unwrap(), &["accise"], None);
        assert!(outcomes[0].is_ok());
        assert!(matches!(outcomes[1], Err(ScenarioError::System(_))));
    }
}
