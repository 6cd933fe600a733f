//! Client configuration.

use crate::error::{GmaError, Result};
use crate::report::ReportFormat;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_GMA_BASE: &str = "http://gma.example.com/";
pub const DEFAULT_CAS_URL: &str = "https://signin.example.com/cas";
/// Quiet period before a delayed measurement save is written.
pub const DEFAULT_DELAYED_SAVE_MS: u64 = 3000;

/// Root configuration structure for `config.toml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GmaConfig {
    /// GMA Drupal site root; service paths (`?q=...`) are appended to it.
    pub gma_base: String,
    /// CAS server root; `/v1/tickets` is appended for the REST ticket API.
    pub cas_url: String,
    /// Value of the `X-Forwarded-For` header sent with every request.
    pub forwarded_for: Option<String>,
    pub report_format: ReportFormat,
    pub delayed_save_ms: u64,
    pub request_timeout_ms: Option<u64>,
}

impl Default for GmaConfig {
    fn default() -> Self {
        Self {
            gma_base: DEFAULT_GMA_BASE.to_string(),
            cas_url: DEFAULT_CAS_URL.to_string(),
            forwarded_for: None,
            report_format: ReportFormat::default(),
            delayed_save_ms: DEFAULT_DELAYED_SAVE_MS,
            request_timeout_ms: None,
        }
    }
}

impl GmaConfig {
    pub fn new(gma_base: impl Into<String>, cas_url: impl Into<String>) -> Self {
        Self {
            gma_base: gma_base.into(),
            cas_url: cas_url.into(),
            ..Self::default()
        }
    }

    pub fn with_forwarded_for(mut self, address: impl Into<String>) -> Self {
        self.forwarded_for = Some(address.into());
        self
    }

    pub fn with_report_format(mut self, format: ReportFormat) -> Self {
        self.report_format = format;
        self
    }

    pub fn with_delayed_save(mut self, delay: Duration) -> Self {
        self.delayed_save_ms = delay.as_millis() as u64;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    fn base(&self) -> String {
        if self.gma_base.ends_with('/') {
            self.gma_base.clone()
        } else {
            format!("{}/", self.gma_base)
        }
    }

    /// The CAS service URL: the Drupal home page that consumes tickets.
    pub fn gma_home(&self) -> String {
        format!("{}?q=en/node&destination=node", self.base())
    }

    pub fn cas_tickets_url(&self) -> String {
        format!("{}/v1/tickets", self.cas_url.trim_end_matches('/'))
    }

    pub fn service_url(&self, path: &str) -> String {
        format!("{}{}", self.base(), path)
    }

    pub fn delayed_save(&self) -> Duration {
        Duration::from_millis(self.delayed_save_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> Result<()> {
        if self.gma_base.trim().is_empty() {
            return Err(GmaError::config("gma_base must not be empty"));
        }
        if self.cas_url.trim().is_empty() {
            return Err(GmaError::config("cas_url must not be empty"));
        }
        if self.request_timeout_ms == Some(0) {
            return Err(GmaError::config("request_timeout_ms must be greater than zero"));
        }
        Ok(())
    }
}
