mod loader;
mod types;
mod validate;

pub use loader::{load_config, load_config_from_str};
pub use types::*;
pub use validate::{parse_cell_size, validate_config, MAX_CANVAS_PIXELS};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid cell size {0:?}: expected \"width,height\", e.g. \"240,180\"")]
    InvalidSize(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
