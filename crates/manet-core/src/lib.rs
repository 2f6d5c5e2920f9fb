pub mod error;
pub mod experiment;
pub mod faults;
pub mod metrics;
pub mod plan;
pub mod report;
pub mod validate;

pub use error::{ExperimentError, ExportError};
pub use experiment::{run_experiment, ExperimentReport, FlowReport};
pub use metrics::{summarize, AggregateMetrics, FlowMetrics, FlowSummary};
pub use validate::validate;
