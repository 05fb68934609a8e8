pub use trackmux_core::config::*;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Locations searched, in order, when no `--config` is given.
pub const DEFAULT_PATHS: [&str; 3] = [
    "./trackmux.toml",
    "~/.config/trackmux/config.toml",
    "/etc/trackmux/config.toml",
];

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config =
        Config::from_toml(&content).with_context(|| format!("Failed to parse config file: {:?}", path))?;

    for warning in config.validate() {
        tracing::warn!("{warning}");
    }

    Ok(config)
}

/// First default location that exists.
pub fn find_default_config() -> Option<PathBuf> {
    DEFAULT_PATHS
        .iter()
        .map(|p| PathBuf::from(shellexpand::tilde(p).as_ref()))
        .find(|p| p.exists())
}

/// Load config from an explicit path or the default locations.
///
/// An explicit path must load cleanly. A file found in a default location
/// that fails to parse is logged and replaced by the defaults.
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    match find_default_config() {
        Some(path) => {
            tracing::debug!(path = %path.display(), "using config file");
            Ok(Config::load_or_default(Some(&path)))
        }
        None => Ok(Config::default()),
    }
}
