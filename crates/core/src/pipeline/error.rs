//! Pipeline error types.

use thiserror::Error;

use crate::imaging::GridError;
use crate::photo::ServiceError;
use crate::queue::QueueError;
use crate::resolver::ResolutionError;
use crate::stages::DownloadError;

/// Errors that end a pipeline run. Any of them means no collage is produced.
#[derive(Debug, Clone, Error)]
pub enum PipelineError {
    /// The search request itself failed.
    #[error("Search failed: {0}")]
    Search(#[source] ServiceError),

    /// A photo could not be resolved and the failure policy is `abort`.
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    /// A download failed and the failure policy is `abort`.
    #[error(transparent)]
    Download(#[from] DownloadError),

    /// The producer of a queue went away without sending the terminal marker.
    #[error("Upstream stage aborted before finishing queue '{queue}'")]
    UpstreamAborted { queue: &'static str },

    /// Misuse of a queue (double finish, push after finish).
    #[error("Queue error: {0}")]
    Queue(QueueError),

    #[error(transparent)]
    Grid(#[from] GridError),

    /// The blocking assembly task could not be joined.
    #[error("Assembly task failed: {0}")]
    AssemblyPanicked(String),
}

impl From<QueueError> for PipelineError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::Disconnected(queue) => Self::UpstreamAborted { queue },
            other => Self::Queue(other),
        }
    }
}
