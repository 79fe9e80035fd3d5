pub mod data_frame;
pub mod parallel;
pub mod survey;
pub mod survey_scenario;

pub use data_frame::DataFrame;
pub use parallel::{run_reforms_parallel, ReformOutcome};
pub use survey::{SurveyError, SurveyTable, DEFAULT_UC_COLUMN, DEFAULT_WEIGHT_COLUMN};
pub use survey_scenario::{Initializer, ScenarioError, SurveyScenario};
