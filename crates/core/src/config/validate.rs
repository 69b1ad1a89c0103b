use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex_lite::Regex;

use super::types::{CellSize, CollageSettings, Config};
use super::ConfigError;

/// Largest collage canvas accepted, in pixels (about 800 MB as 8-bit RGB).
pub const MAX_CANVAS_PIXELS: u64 = 1 << 28;

static CELL_SIZE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(\d+)\s*,\s*(\d+)\s*$").expect("cell size pattern is valid")
});

/// Parse a `"width,height"` cell size, e.g. `"240,180"`.
pub fn parse_cell_size(size: &str) -> Result<CellSize, ConfigError> {
    let invalid = || ConfigError::InvalidSize(size.to_string());

    let caps = CELL_SIZE.captures(size).ok_or_else(invalid)?;
    let width: u32 = caps[1].parse().map_err(|_| invalid())?;
    let height: u32 = caps[2].parse().map_err(|_| invalid())?;

    if width == 0 || height == 0 {
        return Err(ConfigError::ValidationError(format!(
            "cell size must be non-zero, got {}x{}",
            width, height
        )));
    }

    Ok(CellSize { width, height })
}

impl CollageSettings {
    /// Validate raw inputs into settings for one run.
    pub fn new(
        text: &str,
        quantity: u32,
        rows: u32,
        columns: u32,
        size: &str,
        started_at: NaiveDateTime,
    ) -> Result<Self, ConfigError> {
        let cell = parse_cell_size(size)?;

        if text.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "search.text cannot be empty".to_string(),
            ));
        }
        if quantity == 0 {
            return Err(ConfigError::ValidationError(
                "search.quantity cannot be 0".to_string(),
            ));
        }
        if rows == 0 || columns == 0 {
            return Err(ConfigError::ValidationError(format!(
                "grid must have at least one row and column, got {}x{}",
                rows, columns
            )));
        }
        let too_large = || {
            ConfigError::ValidationError(format!(
                "collage of {}x{} cells of {}x{} pixels is too large",
                rows, columns, cell.width, cell.height
            ))
        };
        let width = columns.checked_mul(cell.width).ok_or_else(too_large)?;
        let height = rows.checked_mul(cell.height).ok_or_else(too_large)?;
        if u64::from(width) * u64::from(height) > MAX_CANVAS_PIXELS {
            return Err(too_large());
        }

        Ok(Self {
            text: text.to_string(),
            quantity,
            rows,
            columns,
            cell_width: cell.width,
            cell_height: cell.height,
            title: Self::title_for(text, started_at),
        })
    }
}

/// Validate configuration for a real run.
///
/// Currently validates:
/// - Cell size format and search/grid values (via [`CollageSettings::new`])
/// - Flickr API key is present and timeout is not 0
/// - At least one download may be in flight
pub fn validate_config(
    config: &Config,
    started_at: NaiveDateTime,
) -> Result<CollageSettings, ConfigError> {
    let settings = CollageSettings::new(
        &config.search.text,
        config.search.quantity,
        config.grid.rows,
        config.grid.columns,
        &config.grid.size,
        started_at,
    )?;

    if config.flickr.api_key.is_empty() {
        return Err(ConfigError::ValidationError(
            "flickr.api_key is not set (use API_KEY or COLLAGE_FLICKR__API_KEY)".to_string(),
        ));
    }
    if config.flickr.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "flickr.timeout_secs cannot be 0".to_string(),
        ));
    }
    if config.pipeline.max_concurrent_downloads == 0 {
        return Err(ConfigError::ValidationError(
            "pipeline.max_concurrent_downloads cannot be 0".to_string(),
        ));
    }

    Ok(settings)
}
