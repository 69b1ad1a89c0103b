//! Remote photo service abstraction.
//!
//! Two seams, one per logical collaborator:
//! - [`PhotoCatalog`]: search for photos and list the renditions of one photo.
//! - [`ContentFetcher`]: fetch the raw bytes behind a rendition's location.
//!
//! [`FlickrClient`] implements both against the Flickr REST API.

mod flickr;
mod types;

pub use flickr::FlickrClient;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the photo service.
#[derive(Debug, Clone, Error)]
pub enum ServiceError {
    /// Could not reach the service.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Request timed out.
    #[error("Request timeout")]
    Timeout,

    /// Non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The service answered with an API-level failure.
    #[error("API error {code}: {message}")]
    Api { code: i64, message: String },

    /// Response did not have the expected shape.
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Anything else (client construction, invalid URL, ...).
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    pub(crate) fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::ConnectionFailed(e.to_string())
        } else if e.is_decode() {
            Self::ParseError(e.to_string())
        } else {
            Self::Internal(e.to_string())
        }
    }
}

/// Search and metadata side of the photo service.
#[async_trait]
pub trait PhotoCatalog: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Run one search; returns at most `query.quantity` records.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<ItemRecord>, ServiceError>;

    /// List the available renditions of one photo, preferred one last.
    async fn variants(&self, id: &str) -> Result<Vec<Variant>, ServiceError>;
}

/// Raw content download.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// GET the bytes at `location`.
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, ServiceError>;
}
