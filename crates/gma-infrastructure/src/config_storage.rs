//! Config file storage.
//!
//! Reads and writes `GmaConfig` as TOML. A missing file is not an error: the
//! defaults are used and environment overrides applied on top.

use crate::paths::GmaPaths;
use gma_core::config::GmaConfig;
use gma_core::error::{GmaError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const ENV_GMA_BASE: &str = "GMA_BASE_URL";
pub const ENV_CAS_URL: &str = "GMA_CAS_URL";
pub const ENV_FORWARDED_FOR: &str = "GMA_FORWARDED_FOR";

/// TOML-backed storage for [`GmaConfig`].
#[derive(Debug, Clone)]
pub struct ConfigStorage {
    path: PathBuf,
}

impl ConfigStorage {
    /// Storage at the default location, `~/.config/gma/config.toml`.
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: GmaPaths::config_file()?,
        })
    }

    /// Storage at an explicit file path.
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Loads the file, or defaults when it does not exist.
    pub fn load(&self) -> Result<GmaConfig> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "config file not found, using defaults");
            return Ok(GmaConfig::default());
        }

        let content = fs::read_to_string(&self.path).map_err(|e| {
            GmaError::config(format!(
                "Failed to read configuration file at {}: {}",
                self.path.display(),
                e
            ))
        })?;
        let config: GmaConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Loads the file, applies process environment overrides and validates.
    pub fn load_with_env(&self) -> Result<GmaConfig> {
        let mut config = self.load()?;
        apply_env_overrides(&mut config, |key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, config: &GmaConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(config)?;
        fs::write(&self.path, content)?;
        debug!(path = %self.path.display(), "config saved");
        Ok(())
    }
}

/// Applies `GMA_BASE_URL`, `GMA_CAS_URL` and `GMA_FORWARDED_FOR` from `lookup`.
///
/// Blank values are ignored.
pub fn apply_env_overrides<F>(config: &mut GmaConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let value = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(base) = value(ENV_GMA_BASE) {
        config.gma_base = base;
    }
    if let Some(cas) = value(ENV_CAS_URL) {
        config.cas_url = cas;
    }
    if let Some(address) = value(ENV_FORWARDED_FOR) {
        config.forwarded_for = Some(address);
    }
}
