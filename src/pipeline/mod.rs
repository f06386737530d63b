pub mod orchestrator;
pub mod report;
pub mod stage;
pub mod stages;

pub use orchestrator::Orchestrator;
pub use report::{RunReport, StageReport};
pub use stage::{plan, Stage};
