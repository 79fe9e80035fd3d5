//! The versioned legislative parameter tree.
pub mod error;
pub mod loader;
pub mod node;
pub mod tree;

pub use error::ParameterError;
pub use node::{Bracket, Parameter, ParameterEntry, ParameterNode, ParameterValue, Scale, ScaleAt, ScaleKind};
pub use tree::{ParameterTree, ParametersAt};
