pub mod telemetry;
pub mod topology;

pub use telemetry::EvaluationStats;
pub use topology::DependencyGraph;
