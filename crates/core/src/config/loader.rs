use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Environment prefix for configuration overrides, e.g. `COLLAGE_GRID__ROWS=4`.
const ENV_PREFIX: &str = "COLLAGE_";

/// Load configuration from defaults, an optional TOML file and the environment.
///
/// Layering, last wins:
/// 1. built-in defaults
/// 2. the TOML file at `path` (if given; it must exist)
/// 3. `COLLAGE_*` variables, nested with `__`
/// 4. the bare `API_KEY` variable for the Flickr key
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut figment = Figment::from(Serialized::defaults(Config::default()));

    if let Some(path) = path {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        figment = figment.merge(Toml::file(path));
    }

    let config: Config = figment
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
        .merge(Env::raw().only(&["API_KEY"]).map(|_| "flickr.api_key".into()))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}
