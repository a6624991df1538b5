use super::settings::Settings;
use super::validation::{self, ConfigError};
use log::debug;
use std::fs;
use std::path::Path;

const MAX_CONFIG_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot resolve config path '{0}'")]
    UnresolvablePath(String),
    #[error("config path '{0}' is outside the working directory")]
    PathTraversal(String),
    #[error("config file too large: {0} bytes (max {1} bytes)")]
    TooLarge(u64, u64),
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Loads and validates gateway configuration from the file system.
///
/// The path is `KAIROS_GATEWAY_CONFIG_PATH` if set, else `./config.json`,
/// resolved the way `config::settings::load_settings` resolves it: the
/// canonicalized path must stay within the current working directory, and
/// the file must not exceed 10MB, before the JSON is parsed and validated.
pub fn load_settings() -> Result<Settings, LoadError> {
    let config_path = std::env::var("KAIROS_GATEWAY_CONFIG_PATH").unwrap_or_else(|_| "./config.json".to_string());
    debug!("loading configuration from {config_path}");

    let path = Path::new(&config_path);
    if !path.exists() {
        return Err(LoadError::UnresolvablePath(config_path));
    }

    let canonical_path = path
        .canonicalize()
        .map_err(|_| LoadError::UnresolvablePath(config_path.clone()))?;
    let current_dir = std::env::current_dir()?;
    if !canonical_path.starts_with(&current_dir) {
        return Err(LoadError::PathTraversal(config_path));
    }

    let metadata = fs::metadata(&canonical_path)?;
    if metadata.len() > MAX_CONFIG_SIZE {
        return Err(LoadError::TooLarge(metadata.len(), MAX_CONFIG_SIZE));
    }

    let raw = fs::read_to_string(&canonical_path)?;
    let settings: Settings = serde_json::from_str(&raw)?;
    validation::validate(&settings)?;

    debug!("loaded {} routes across {} upstreams", settings.routes.len(), settings.upstreams.len());
    Ok(settings)
}
