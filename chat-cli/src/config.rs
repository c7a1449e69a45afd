//! Configuration resolution for routerchat.

use anyhow::{Context, Result};
use chat_client::EngineConfig;
use std::path::{Path, PathBuf};

/// Default config file location (`<config dir>/config.toml`), if the platform
/// has a home directory.
pub fn default_config_path() -> Option<PathBuf> {
    directories::ProjectDirs::from("io", "routerchat", "routerchat")
        .map(|dirs| dirs.config_dir().join("config.toml"))
}

/// Build the engine configuration.
///
/// An explicit `path` must exist. Without one, the default location is used
/// when present, otherwise built-in defaults. `backend` overrides the base
/// URL from any source.
pub fn resolve(path: Option<&Path>, backend: Option<&str>) -> Result<EngineConfig> {
    resolve_with_default(path, backend, default_config_path())
}

fn resolve_with_default(
    path: Option<&Path>,
    backend: Option<&str>,
    default_path: Option<PathBuf>,
) -> Result<EngineConfig> {
    let mut config = match path {
        Some(path) => EngineConfig::from_file(path)?,
        None => match default_path.filter(|p| p.exists()) {
            Some(path) => {
                tracing::debug!("Using config file {}", path.display());
                EngineConfig::from_file(&path)?
            }
            None => EngineConfig::default(),
        },
    };

    if let Some(url) = backend {
        config.backend.base_url = url.to_string();
    }
    config
        .validate()
        .context("Invalid backend settings")?;
    Ok(config)
}
