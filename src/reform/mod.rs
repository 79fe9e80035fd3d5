pub mod builder;
pub mod system;

pub use builder::{compose, ParameterPatch, ParameterTransform, Reform, VariableChange};
pub use system::{LegislativeSystem, SystemError};
