//! Where the GMA client keeps its configuration.

use gma_core::error::{GmaError, Result};
use std::path::PathBuf;

const CONFIG_FILE: &str = "config.toml";

/// ```text
/// ~/.config/gma/
/// └── config.toml     # Server URLs and report defaults (never credentials)
/// ```
pub struct GmaPaths;

impl GmaPaths {
    /// `~/.config/gma/`, or a config error when there is no home directory.
    pub fn config_dir() -> Result<PathBuf> {
        dirs::home_dir()
            .map(|home| home.join(".config").join("gma"))
            .ok_or_else(|| GmaError::config("cannot find the home directory for ~/.config/gma"))
    }

    pub fn config_file() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join(CONFIG_FILE))
    }
}
