//! Defines the error types for the parameters module.
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParameterError {
    /// No value in force at the instant, or no node at the path.
    /// Formula authors catch this one to detect parameters that only exist under some legislation.
    #[error("Parameter '{path}' not found{}", .instant.map(|i| format!(" at {}", i)).unwrap_or_default())]
    ParameterNotFound { path: String, instant: Option<NaiveDate> },
    #[error("Parameter '{path}' is not a leaf")]
    NotALeaf { path: String },
    #[error("Parameter '{path}' is not a branch")]
    NotABranch { path: String },
    #[error("Parameter '{path}' is not a scale")]
    NotAScale { path: String },
    #[error("Parameter '{path}' has no numeric value at {instant}")]
    NotANumber { path: String, instant: NaiveDate },
    #[error("Invalid entries for parameter '{path}': {reason}")]
    InvalidEntries { path: String, reason: String },
    #[error("Failed to load parameters at '{path}': {reason}")]
    Load { path: String, reason: String },
}

impl ParameterError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ParameterError::ParameterNotFound { .. })
    }

    pub(crate) fn not_found(path: &str, instant: Option<NaiveDate>) -> Self {
        ParameterError::ParameterNotFound { path: path.to_string(), instant }
    }
}
