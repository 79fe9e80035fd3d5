//! Time spans used to key values and select legislation.
pub mod period;

pub use period::{Period, PeriodError, PeriodUnit};
