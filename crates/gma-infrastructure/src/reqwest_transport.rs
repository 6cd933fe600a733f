//! reqwest-backed [`Transport`].
//!
//! The client keeps its own cookie store and never follows redirects, so a
//! login redirect reaches the executor as-is. reqwest's cookie jar cannot be
//! emptied in place; clearing cookies swaps in a freshly built client.

use async_trait::async_trait;
use gma_core::error::{GmaError, Result};
use gma_core::transport::{HttpMethod, HttpRequest, HttpResponse, RequestBody, Transport};
use reqwest::Client;
use reqwest::redirect::Policy;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

pub struct ReqwestTransport {
    client: RwLock<Client>,
    timeout: Option<Duration>,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self> {
        Self::with_timeout(None)
    }

    /// Creates a transport whose requests fail after `timeout`.
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self> {
        Ok(Self {
            client: RwLock::new(Self::build_client(timeout)?),
            timeout,
        })
    }

    fn build_client(timeout: Option<Duration>) -> Result<Client> {
        let mut builder = Client::builder()
            .cookie_store(true)
            .redirect(Policy::none());
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        builder
            .build()
            .map_err(|e| GmaError::transport(format!("Failed to build HTTP client: {e}")))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let client = self.client.read().await.clone();
        let HttpRequest {
            method,
            url,
            headers,
            body,
        } = request;

        let mut builder = match method {
            HttpMethod::Get => client.get(&url),
            HttpMethod::Post => client.post(&url),
            HttpMethod::Put => client.put(&url),
            HttpMethod::Head => client.head(&url),
            HttpMethod::Delete => client.delete(&url),
        };
        for (name, value) in &headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(&value),
            RequestBody::Form(fields) => builder.form(&fields),
        };

        let response = builder
            .send()
            .await
            .map_err(|err| GmaError::transport(format!("{method} {url} failed: {err}")))?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|err| GmaError::transport(format!("Failed to read body of {url}: {err}")))?;

        debug!(%method, %url, status, "HTTP exchange complete");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }

    async fn clear_cookies(&self) -> Result<()> {
        let fresh = Self::build_client(self.timeout)?;
        *self.client.write().await = fresh;
        debug!("cookie store cleared");
        Ok(())
    }
}
