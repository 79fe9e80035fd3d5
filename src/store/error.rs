use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Variable '{name}' not found")]
    VariableNotFound { name: String },

    #[error("Variable '{name}' is already registered")]
    DuplicateVariable { name: String },

    #[error("Variable '{name}': formula windows {first} and {second} overlap")]
    OverlappingFormulaValidity { name: String, first: String, second: String },

    #[error("Variable '{name}': formula window {window} is empty")]
    EmptyFormulaWindow { name: String, window: String },

    #[error("Variable '{name}': default value does not match type {expected}")]
    InvalidDefault { name: String, expected: String },
}
