//! Relogin collaborators invoked on a detected session timeout.

use crate::client::GmaClient;
use async_trait::async_trait;
use gma_core::error::Result;

/// Re-establishes the session after the executor detects a timeout.
///
/// Called with the relogin lock held, so implementations never run
/// concurrently for the same client.
#[async_trait]
pub trait ReloginHandler: Send + Sync {
    async fn relogin(&self, client: &GmaClient) -> Result<()>;
}

/// Re-runs the full CAS login with stored credentials.
pub struct CredentialRelogin {
    username: String,
    password: String,
}

impl CredentialRelogin {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

#[async_trait]
impl ReloginHandler for CredentialRelogin {
    async fn relogin(&self, client: &GmaClient) -> Result<()> {
        client.login(&self.username, &self.password).await.map(|_| ())
    }
}
