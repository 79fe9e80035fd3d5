//! config.rs
//! Scenario settings read from JSON: which year to simulate, which reforms to
//! apply, and how the survey columns map onto the catalogue.

use crate::catalogue::{self, reforms};
use crate::periods::{Period, PeriodError};
use crate::reform::{compose, LegislativeSystem, Reform, SystemError};
use crate::scenario::{ScenarioError, SurveyError, SurveyScenario, SurveyTable, DEFAULT_UC_COLUMN, DEFAULT_WEIGHT_COLUMN};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Cannot read '{path}': {reason}")]
    Io { path: String, reason: String },

    #[error("Invalid scenario configuration: {0}")]
    Parse(String),

    #[error("Unknown reform '{key}'")]
    UnknownReform { key: String },

    #[error("Year {year} is outside the legislation (1990 onward)")]
    InvalidYear { year: i32 },

    #[error("Inflator for '{column}' must be finite and positive, got {factor}")]
    InvalidInflator { column: String, factor: f64 },

    #[error(transparent)]
    Period(#[from] PeriodError),

    #[error(transparent)]
    System(#[from] SystemError),

    #[error(transparent)]
    Survey(#[from] SurveyError),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

const FIRST_LEGISLATIVE_YEAR: i32 = 1990;

fn default_weight_column() -> String { DEFAULT_WEIGHT_COLUMN.to_string() }
fn default_uc_column() -> String { DEFAULT_UC_COLUMN.to_string() }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScenarioConfig {
    /// Year whose legislation is simulated.
    pub year: i32,
    /// Year the survey was collected; defaults to `year`.
    #[serde(default)]
    pub data_year: Option<i32>,
    /// Reform keys, applied left to right.
    #[serde(default)]
    pub reforms: Vec<String>,
    #[serde(default = "default_weight_column")]
    pub weight_column: String,
    #[serde(default = "default_uc_column")]
    pub uc_column: String,
    /// Factors ageing survey columns from `data_year` to `year`.
    #[serde(default)]
    pub inflators: BTreeMap<String, f64>,
    /// Variables reported by the scenario.
    #[serde(default)]
    pub variables: Vec<String>,
}

impl ScenarioConfig {
    pub fn new(year: i32) -> Self {
        Self {
            year,
            data_year: None,
            reforms: Vec::new(),
            weight_column: default_weight_column(),
            uc_column: default_uc_column(),
            inflators: BTreeMap::new(),
            variables: Vec::new(),
        }
    }

    pub fn from_json_str(document: &str) -> Result<Self, ConfigError> {
        let config: ScenarioConfig = serde_json::from_str(document).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let document = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io { path: path.display().to_string(), reason: e.to_string() })?;
        Self::from_json_str(&document)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for year in std::iter::once(self.year).chain(self.data_year) {
            if year < FIRST_LEGISLATIVE_YEAR {
                return Err(ConfigError::InvalidYear { year });
            }
        }
        if let Some(key) = self.reforms.iter().find(|key| reforms::by_key(key).is_none()) {
            return Err(ConfigError::UnknownReform { key: key.clone() });
        }
        if let Some((column, &factor)) = self.inflators.iter().find(|(_, f)| !f.is_finite() || **f <= 0.0) {
            return Err(ConfigError::InvalidInflator { column: column.clone(), factor });
        }
        Ok(())
    }

    pub fn period(&self) -> Result<Period, ConfigError> {
        Ok(Period::year(self.year)?)
    }

    pub fn data_year(&self) -> i32 { self.data_year.unwrap_or(self.year) }

    fn reform_list(&self) -> Result<Vec<Reform>, ConfigError> {
        self.reforms.iter()
            .map(|key| reforms::by_key(key).ok_or_else(|| ConfigError::UnknownReform { key: key.clone() }))
            .collect()
    }

    /// The catalogue legislation with the configured reforms applied.
    pub fn build_system(&self) -> Result<Arc<LegislativeSystem>, ConfigError> {
        let base = catalogue::tax_benefit_system()?;
        Ok(compose(&base, &self.reform_list()?)?)
    }

    /// Maps the configured columns onto the catalogue names and ages the data.
    pub fn prepare_table(&self, table: SurveyTable) -> Result<SurveyTable, ConfigError> {
        let mut table = table.with_weight_column(self.weight_column.clone());
        if self.uc_column != DEFAULT_UC_COLUMN {
            let units = table.column(&self.uc_column)?.clone();
            table.insert_column(DEFAULT_UC_COLUMN, units)?;
        }
        if self.data_year() != self.year {
            table.inflate(&self.inflators)?;
        }
        Ok(table)
    }

    /// A scenario over `table`, with the initializers of the configured reforms run.
    pub fn build_scenario(&self, table: SurveyTable) -> Result<SurveyScenario, ConfigError> {
        let system = self.build_system()?;
        let table = Arc::new(self.prepare_table(table)?);
        let mut scenario = SurveyScenario::new(system, table, self.period()?)?;
        for key in &self.reforms {
            if let Some(initializer) = reforms::initializer_for(key) {
                scenario = scenario.with_initializer(initializer)?;
            }
        }
        info!(year = self.year, data_year = self.data_year(), reforms = ?self.reforms, "scenario built from configuration");
        Ok(scenario)
    }
}
