use super::session::{load_config, storage};
use anyhow::{Result, bail};
use gma_core::config::GmaConfig;
use std::path::Path;

pub fn show(config_path: Option<&Path>) -> Result<()> {
    let storage = storage(config_path)?;
    let config = load_config(config_path)?;

    if storage.exists() {
        println!("# {}", storage.path().display());
    } else {
        println!("# {} (not found, showing defaults)", storage.path().display());
    }
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

pub fn init(config_path: Option<&Path>, force: bool) -> Result<()> {
    let storage = storage(config_path)?;
    if storage.exists() && !force {
        bail!(
            "{} already exists, use --force to overwrite it",
            storage.path().display()
        );
    }
    storage.save(&GmaConfig::default())?;
    println!("Wrote {}", storage.path().display());
    Ok(())
}
