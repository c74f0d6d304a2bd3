//! Configuration file discovery for the CLI

use std::path::{Path, PathBuf};
use tiering_lib::{EstimatorConfig, TieringError};

/// Per-user configuration file, `~/.config/fsx-tiering/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    let home = dirs_next::home_dir()?;
    Some(home.join(".config").join("fsx-tiering").join("config.toml"))
}

/// Pick the configuration file: an explicit path always wins, otherwise
/// the per-user file is used only when it exists
pub fn resolve_config_path(explicit: Option<&Path>, default: Option<PathBuf>) -> Option<PathBuf> {
    match explicit {
        Some(path) => Some(path.to_path_buf()),
        None => default.filter(|p| p.is_file()),
    }
}

/// Load the estimator configuration for this invocation
pub fn load(explicit: Option<&Path>) -> Result<EstimatorConfig, TieringError> {
    let path = resolve_config_path(explicit, default_config_path());
    match &path {
        Some(p) => tracing::info!(path = %p.display(), "Loading configuration"),
        None => tracing::debug!("No configuration file, using defaults"),
    }
    Ok(EstimatorConfig::load(path.as_deref())?)
}
