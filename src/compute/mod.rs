pub mod engine;
pub mod kernel;
pub mod ledger;
pub mod value;
pub mod view;

pub use engine::Simulation;
pub use ledger::{CacheKey, ComputationError, Ledger, Slot};
pub use value::Value;
pub use view::EntityView;
