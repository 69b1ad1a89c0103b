//! The three pipeline stages.
//!
//! ```text
//! SearchStage --LocationQueue--> DownloadStage --PayloadQueue--> AssemblyStage
//!   (async, fan-out)               (async, bounded)                (blocking thread)
//! ```
//!
//! Each stage owns the sending end of its output queue. A stage that completes
//! normally sends exactly one terminal marker; a stage that fails drops its
//! sender without one, and the next stage reports
//! [`PipelineError::UpstreamAborted`](crate::pipeline::PipelineError::UpstreamAborted).
//! When a downstream consumer hangs up early, upstream stages stop quietly.

mod assembly;
mod download;
mod search;

pub use assembly::{Assembled, AssemblyStage, AssemblySummary, StopReason};
pub use download::{DownloadError, DownloadStage, DownloadSummary};
pub use search::{SearchStage, SearchSummary};

/// Name of the queue between search and download.
pub const LOCATION_QUEUE: &str = "locations";
/// Name of the queue between download and assembly.
pub const PAYLOAD_QUEUE: &str = "payloads";
