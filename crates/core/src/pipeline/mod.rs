pub mod orchestrator;
pub mod stage;

pub use orchestrator::{Collaborators, Pipeline, RunOptions};
pub use stage::{RunReport, StageOutcome, StageStatus};
