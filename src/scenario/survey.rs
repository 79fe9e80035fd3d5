//! survey.rs
//! Household survey data: one row per household, one column per raw variable.

use crate::compute::Value;
use crate::store::ValueType;
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

pub const DEFAULT_WEIGHT_COLUMN: &str = "pondmen";
pub const DEFAULT_UC_COLUMN: &str = "ocde10";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SurveyError {
    #[error("Column '{column}' has {actual} rows, expected {expected}")]
    LengthMismatch { column: String, expected: usize, actual: usize },

    #[error("Household id {id} appears more than once")]
    DuplicateHousehold { id: i64 },

    #[error("Column '{name}' not found")]
    MissingColumn { name: String },

    #[error("Column '{column}' is not numeric")]
    NotNumeric { column: String },

    #[error("Inflator for '{column}' must be finite and positive, got {factor}")]
    InvalidInflator { column: String, factor: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct SurveyTable {
    ids: Vec<i64>,
    columns: BTreeMap<String, Value>,
    weight_column: String,
}

impl SurveyTable {
    pub fn new(ids: Vec<i64>) -> Result<Self, SurveyError> {
        let mut seen = HashSet::with_capacity(ids.len());
        if let Some(&id) = ids.iter().find(|id| !seen.insert(**id)) {
            return Err(SurveyError::DuplicateHousehold { id });
        }
        Ok(Self { ids, columns: BTreeMap::new(), weight_column: DEFAULT_WEIGHT_COLUMN.to_string() })
    }

    pub fn with_column(mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<Self, SurveyError> {
        self.insert_column(name, value)?;
        Ok(self)
    }

    pub fn with_weight_column(mut self, name: impl Into<String>) -> Self {
        self.weight_column = name.into();
        self
    }

    pub fn insert_column(&mut self, name: impl Into<String>, value: impl Into<Value>) -> Result<(), SurveyError> {
        let (name, value) = (name.into(), value.into());
        if value.len() != self.ids.len() {
            return Err(SurveyError::LengthMismatch { column: name, expected: self.ids.len(), actual: value.len() });
        }
        self.columns.insert(name, value);
        Ok(())
    }

    /// Reads a numeric column as `value_type`, e.g. contract codes of an enum column.
    pub fn insert_typed_column(&mut self, name: impl Into<String>, value_type: ValueType, values: Vec<f64>) -> Result<(), SurveyError> {
        let name = name.into();
        let value = Value::from_f64s(value_type, values).map_err(|_| SurveyError::NotNumeric { column: name.clone() })?;
        self.insert_column(name, value)
    }

    pub fn len(&self) -> usize { self.ids.len() }
    pub fn is_empty(&self) -> bool { self.ids.is_empty() }
    pub fn ids(&self) -> &[i64] { &self.ids }
    pub fn weight_column(&self) -> &str { &self.weight_column }

    pub fn column_names(&self) -> impl Iterator<Item = &str> + '_ { self.columns.keys().map(String::as_str) }

    pub fn columns(&self) -> impl Iterator<Item = (&str, &Value)> + '_ {
        self.columns.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn column(&self, name: &str) -> Result<&Value, SurveyError> {
        self.columns.get(name).ok_or_else(|| SurveyError::MissingColumn { name: name.to_string() })
    }

    pub fn weights(&self) -> Result<Arc<Vec<f64>>, SurveyError> {
        Ok(self.column(&self.weight_column)?.to_f64())
    }

    /// Multiplies each named float column by its factor, e.g. to age
    /// expenditures from the survey year to the simulated year.
    pub fn inflate(&mut self, inflators: &BTreeMap<String, f64>) -> Result<(), SurveyError> {
        for (column, &factor) in inflators {
            if !factor.is_finite() || factor <= 0.0 {
                return Err(SurveyError::InvalidInflator { column: column.clone(), factor });
            }
            let current = self.columns.get(column).ok_or_else(|| SurveyError::MissingColumn { name: column.clone() })?;
            let values = current.as_float().ok_or_else(|| SurveyError::NotNumeric { column: column.clone() })?;
            let inflated: Vec<f64> = values.iter().map(|v| v * factor).collect();
            debug!(column = %column, factor, "inflating column");
            self.columns.insert(column.clone(), Value::from(inflated));
        }
        Ok(())
    }
}
