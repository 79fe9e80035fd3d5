pub mod error;
pub mod registry;
pub mod types;
pub mod variable;

pub use error::RegistryError;
pub use registry::{SelectedFormula, VariableRegistry};
pub use types::{Category, EntityKind, PeriodPolicy, Scalar, ValueType, VariableId};
pub use variable::{Formula, FormulaFn, VariableDefinition, WrapperFn};
