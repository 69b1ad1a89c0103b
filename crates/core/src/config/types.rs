use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub grid: GridConfig,
    #[serde(default)]
    pub flickr: FlickrConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// What to search for
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Free-text search query.
    #[serde(default)]
    pub text: String,
    /// Number of results to request from the service (default: 100).
    #[serde(default = "default_quantity")]
    pub quantity: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            text: String::new(),
            quantity: default_quantity(),
        }
    }
}

fn default_quantity() -> u32 {
    100
}

/// Collage grid layout
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GridConfig {
    #[serde(default = "default_rows")]
    pub rows: u32,
    #[serde(default = "default_columns")]
    pub columns: u32,
    /// Cell size as "width,height".
    #[serde(default = "default_size")]
    pub size: String,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            rows: default_rows(),
            columns: default_columns(),
            size: default_size(),
        }
    }
}

fn default_rows() -> u32 {
    5
}

fn default_columns() -> u32 {
    5
}

fn default_size() -> String {
    "240,180".to_string()
}

/// Flickr REST API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlickrConfig {
    /// Flickr API key
    #[serde(default)]
    pub api_key: String,
    /// REST endpoint (default: https://www.flickr.com/services/rest/)
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
}

impl Default for FlickrConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
        }
    }
}

fn default_base_url() -> String {
    "https://www.flickr.com/services/rest/".to_string()
}

fn default_timeout() -> u32 {
    30
}

/// What a stage does when a single item fails to resolve or download.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The first failure aborts the whole run.
    #[default]
    Abort,
    /// Log the failure, drop the item and keep going.
    Skip,
}

/// Pipeline tuning
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Downloads in flight at once (default: 1, strictly sequential).
    #[serde(default = "default_max_downloads")]
    pub max_concurrent_downloads: usize,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_downloads: default_max_downloads(),
            failure_policy: FailurePolicy::default(),
        }
    }
}

fn default_max_downloads() -> usize {
    1
}

impl PipelineConfig {
    /// Sets the maximum concurrent downloads.
    pub fn with_max_downloads(mut self, max: usize) -> Self {
        self.max_concurrent_downloads = max;
        self
    }

    /// Sets the per-item failure policy.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }
}

/// Where the finished collage is written
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Width and height of one grid cell in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CellSize {
    pub width: u32,
    pub height: u32,
}

/// Validated settings for one collage run.
///
/// Built once by [`validate_config`](super::validate_config) or
/// [`CollageSettings::new`]; every field is known to be usable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollageSettings {
    pub text: String,
    pub quantity: u32,
    pub rows: u32,
    pub columns: u32,
    pub cell_width: u32,
    pub cell_height: u32,
    /// `"{text}_{timestamp}"`, fixed at startup.
    pub title: String,
}

/// Timestamp layout used in output titles.
pub const TITLE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

impl CollageSettings {
    /// Number of cells in the grid.
    pub fn capacity(&self) -> usize {
        self.rows as usize * self.columns as usize
    }

    pub fn cell_size(&self) -> CellSize {
        CellSize {
            width: self.cell_width,
            height: self.cell_height,
        }
    }

    pub(super) fn title_for(text: &str, started_at: NaiveDateTime) -> String {
        format!("{}_{}", text, started_at.format(TITLE_TIMESTAMP_FORMAT))
    }
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub search: SearchConfig,
    pub grid: GridConfig,
    pub flickr: SanitizedFlickrConfig,
    pub pipeline: PipelineConfig,
    pub output: OutputConfig,
}

/// Sanitized Flickr config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedFlickrConfig {
    pub base_url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            search: config.search.clone(),
            grid: config.grid.clone(),
            flickr: SanitizedFlickrConfig {
                base_url: config.flickr.base_url.clone(),
                api_key_configured: !config.flickr.api_key.is_empty(),
                timeout_secs: config.flickr.timeout_secs,
            },
            pipeline: config.pipeline.clone(),
            output: config.output.clone(),
        }
    }
}
