//! Flickr REST API client.
//!
//! Uses two API methods:
//! - `flickr.photos.search` for the search itself
//! - `flickr.photos.getSizes` for the renditions of one photo
//!
//! Every call asks for plain JSON (`format=json&nojsoncallback=1`). Failures
//! are reported in-band as `{"stat": "fail", "code": .., "message": ..}`.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::config::FlickrConfig;
use crate::metrics;

use super::{ContentFetcher, ItemRecord, PhotoCatalog, SearchQuery, ServiceError, Variant};

const METHOD_SEARCH: &str = "flickr.photos.search";
const METHOD_SIZES: &str = "flickr.photos.getSizes";

/// Flickr photo service client.
pub struct FlickrClient {
    client: Client,
    config: FlickrConfig,
}

impl FlickrClient {
    /// Create a new client with the given configuration.
    pub fn new(config: FlickrConfig) -> Result<Self, ServiceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .user_agent(concat!("collage/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ServiceError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    /// Common query string shared by every API method.
    fn base_url(&self, method: &str) -> String {
        let endpoint = self.config.base_url.trim_end_matches('/');
        format!(
            "{}/?method={}&api_key={}&format=json&nojsoncallback=1",
            endpoint,
            method,
            urlencoding::encode(&self.config.api_key)
        )
    }

    /// Build the URL for a photo search.
    fn build_search_url(&self, query: &SearchQuery) -> String {
        format!(
            "{}&text={}&per_page={}",
            self.base_url(METHOD_SEARCH),
            urlencoding::encode(&query.text),
            query.quantity
        )
    }

    /// Build the URL listing the renditions of one photo.
    fn build_sizes_url(&self, id: &str) -> String {
        format!(
            "{}&photo_id={}",
            self.base_url(METHOD_SIZES),
            urlencoding::encode(id)
        )
    }

    /// GET an API URL and decode the JSON body.
    async fn call<T: DeserializeOwned>(
        &self,
        operation: &str,
        url: &str,
    ) -> Result<T, ServiceError> {
        let start = Instant::now();
        let result = self.call_inner(url).await;

        metrics::SERVICE_DURATION
            .with_label_values(&[operation])
            .observe(start.elapsed().as_secs_f64());
        metrics::SERVICE_REQUESTS
            .with_label_values(&[operation, if result.is_ok() { "success" } else { "error" }])
            .inc();

        result
    }

    async fn call_inner<T: DeserializeOwned>(&self, url: &str) -> Result<T, ServiceError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(ServiceError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::Http {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        let body = response.text().await.map_err(ServiceError::from_reqwest)?;
        parse_response(&body)
    }
}

#[async_trait]
impl PhotoCatalog for FlickrClient {
    fn name(&self) -> &str {
        "flickr"
    }

    async fn search(&self, query: &SearchQuery) -> Result<Vec<ItemRecord>, ServiceError> {
        debug!(text = %query.text, quantity = query.quantity, "Searching Flickr");

        let url = self.build_search_url(query);
        let response: SearchResponse = self.call("search", &url).await?;

        let records: Vec<ItemRecord> = response
            .photos
            .photo
            .into_iter()
            .map(|p| ItemRecord {
                id: p.id,
                is_public: p.ispublic == 1,
            })
            .collect();

        debug!(results = records.len(), "Flickr search complete");
        Ok(records)
    }

    async fn variants(&self, id: &str) -> Result<Vec<Variant>, ServiceError> {
        let url = self.build_sizes_url(id);
        let response: SizesResponse = self.call("sizes", &url).await?;

        Ok(response
            .sizes
            .size
            .into_iter()
            .map(|s| s.into_variant(id))
            .collect())
    }
}

#[async_trait]
impl ContentFetcher for FlickrClient {
    async fn fetch(&self, location: &str) -> Result<Vec<u8>, ServiceError> {
        let start = Instant::now();
        let result: Result<Vec<u8>, ServiceError> = async {
            let response = self
                .client
                .get(location)
                .send()
                .await
                .map_err(ServiceError::from_reqwest)?;

            let status = response.status();
            if !status.is_success() {
                warn!(location = %location, status = %status, "Content fetch rejected");
                return Err(ServiceError::Http {
                    status: status.as_u16(),
                    message: format!("GET {}", location),
                });
            }

            let bytes = response.bytes().await.map_err(ServiceError::from_reqwest)?;
            Ok(bytes.to_vec())
        }
        .await;

        metrics::SERVICE_DURATION
            .with_label_values(&["fetch"])
            .observe(start.elapsed().as_secs_f64());
        metrics::SERVICE_REQUESTS
            .with_label_values(&["fetch", if result.is_ok() { "success" } else { "error" }])
            .inc();

        result
    }
}

/// Decode a Flickr JSON body, turning `stat: fail` into [`ServiceError::Api`].
fn parse_response<T: DeserializeOwned>(body: &str) -> Result<T, ServiceError> {
    let status: FlickrStatus = serde_json::from_str(body)
        .map_err(|e| ServiceError::ParseError(format!("Invalid JSON: {}", e)))?;

    if status.stat != "ok" {
        return Err(ServiceError::Api {
            code: status.code.unwrap_or(-1),
            message: status
                .message
                .unwrap_or_else(|| format!("stat={}", status.stat)),
        });
    }

    serde_json::from_str(body).map_err(|e| ServiceError::ParseError(e.to_string()))
}

// Flickr API response types

#[derive(Debug, Deserialize)]
struct FlickrStatus {
    stat: String,
    code: Option<i64>,
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    photos: PhotoPage,
}

#[derive(Debug, Deserialize)]
struct PhotoPage {
    photo: Vec<FlickrPhoto>,
}

#[derive(Debug, Deserialize)]
struct FlickrPhoto {
    id: String,
    ispublic: u8,
}

#[derive(Debug, Deserialize)]
struct SizesResponse {
    sizes: SizeList,
}

#[derive(Debug, Deserialize)]
struct SizeList {
    size: Vec<FlickrSize>,
}

#[derive(Debug, Deserialize)]
struct FlickrSize {
    label: Option<String>,
    #[serde(default)]
    width: Dimension,
    #[serde(default)]
    height: Dimension,
    source: String,
}

/// Flickr sends dimensions as numbers or as strings depending on the rendition.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Dimension {
    Number(u64),
    Text(String),
}

impl Default for Dimension {
    fn default() -> Self {
        Dimension::Number(0)
    }
}

impl Dimension {
    /// `None` for a string that is not a number.
    fn as_u32(&self) -> Option<u32> {
        match self {
            Dimension::Number(n) => Some(u32::try_from(*n).unwrap_or(u32::MAX)),
            Dimension::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl FlickrSize {
    /// Unparsable dimensions are recorded as 0; they play no part in selection.
    fn into_variant(self, id: &str) -> Variant {
        let (width, height) = match (self.width.as_u32(), self.height.as_u32()) {
            (Some(width), Some(height)) => (width, height),
            (width, height) => {
                debug!(
                    id = %id,
                    label = ?self.label,
                    width = ?self.width,
                    height = ?self.height,
                    "Rendition has unparsable dimensions"
                );
                (width.unwrap_or(0), height.unwrap_or(0))
            }
        };
        Variant {
            label: self.label,
            width,
            height,
            location: self.source,
        }
    }
}
