use anyhow::{Context, Result, bail};
use gma_core::config::GmaConfig;
use gma_infrastructure::ConfigStorage;
use gma_interaction::{CredentialRelogin, GmaClient};
use std::path::Path;

pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    fn require(&self) -> Result<(&str, &str)> {
        match (self.username.as_deref(), self.password.as_deref()) {
            (Some(user), Some(pass)) if !user.is_empty() => Ok((user, pass)),
            _ => bail!("credentials required: pass --username/--password or set GMA_USERNAME and GMA_PASSWORD"),
        }
    }
}

pub fn storage(config_path: Option<&Path>) -> Result<ConfigStorage> {
    match config_path {
        Some(path) => Ok(ConfigStorage::with_path(path)),
        None => ConfigStorage::new().context("Failed to locate the GMA config directory"),
    }
}

pub fn load_config(config_path: Option<&Path>) -> Result<GmaConfig> {
    let storage = storage(config_path)?;
    storage
        .load_with_env()
        .with_context(|| format!("Failed to load config from {}", storage.path().display()))
}

/// Logs in, with relogin on session timeout using the same credentials.
pub async fn connect(config_path: Option<&Path>, credentials: &Credentials) -> Result<GmaClient> {
    let config = load_config(config_path)?;
    let (username, password) = credentials.require()?;

    let client = GmaClient::builder(config)
        .with_relogin(CredentialRelogin::new(username, password))
        .build()?;
    client.login(username, password).await?;
    Ok(client)
}

pub async fn login(config_path: Option<&Path>, credentials: &Credentials) -> Result<()> {
    let client = connect(config_path, credentials).await?;
    let user = client
        .user()
        .context("Login succeeded but no user is attached to the session")?;

    println!("Logged in to {}", client.config().gma_base);
    println!("  name:   {}", user.preferred_name);
    println!("  ren id: {}", user.ren_id);
    println!("  guid:   {}", user.guid);

    client.logout().await?;
    Ok(())
}
