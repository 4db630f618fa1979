mod drift;
mod error;
mod executor;
mod observability;
mod reactive;
mod resolve;
mod run;
mod sequential;
mod step;
mod types;

pub use drift::{drift_report, DriftEntry};
pub use error::ExecutorError;
pub use executor::Executor;
pub use observability::enrich_observability_outputs;
pub use types::{ExecutionOptions, ExecutionResult, NodeResult, OnProgress, ProgressEvent, ProgressStatus};
