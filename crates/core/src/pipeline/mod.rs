//! End-to-end collage pipeline.
//!
//! Wires the three stages together with their queues:
//! - the fetch half (search and download) runs on the async runtime
//! - the assembly half runs on a blocking thread, fed by the payload queue

mod error;
mod runner;
mod types;

pub use error::PipelineError;
pub use runner::CollagePipeline;
pub use types::{PipelineReport, ReportSummary};
