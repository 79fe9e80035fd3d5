//! Microsimulation of French indirect taxes on energy.
//!
//! A [`LegislativeSystem`] pairs a registry of variables with a dated parameter
//! tree. A [`Simulation`] evaluates its variables lazily over a household
//! population, memoizing each (variable, period); a [`Reform`] derives a new
//! system without touching the one it starts from; a [`SurveyScenario`] binds
//! survey data to a reform and its baseline and aggregates the results.

pub mod analysis;
pub mod bindings;
pub mod catalogue;
pub mod compute;
pub mod config;
pub mod display;
pub mod parameters;
pub mod periods;
pub mod reform;
pub mod scenario;
pub mod store;

pub use compute::{ComputationError, Simulation, Value};
pub use config::{ConfigError, ScenarioConfig};
pub use parameters::{ParameterError, ParameterTree};
pub use periods::{Period, PeriodError, PeriodUnit};
pub use reform::{LegislativeSystem, Reform, SystemError};
pub use scenario::{ScenarioError, SurveyScenario, SurveyTable};
pub use store::{Formula, RegistryError, VariableDefinition, VariableRegistry};
