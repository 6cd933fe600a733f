//! Request executor.
//!
//! Every service call goes through [`GmaClient::execute`]. It attaches the
//! session headers, classifies the response, and turns an HTML login page
//! served where JSON was expected into a session timeout. A timeout on a
//! session-aware call runs the relogin collaborator once and resubmits the
//! original call exactly once; the retry's outcome is returned unchanged.

use crate::client::GmaClient;
use gma_core::envelope::Envelope;
use gma_core::error::{GmaError, Result};
use gma_core::transport::{HttpMethod, HttpRequest};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info, warn};

/// Parse-error phrasings produced when the body is an HTML page instead of
/// JSON. The first three are the browser/JS phrasings, the rest serde_json's.
static SESSION_TIMEOUT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)parse error|unexpected end of input|parse.+?unexpected|expected value|eof while parsing|trailing characters",
    )
    .expect("session timeout pattern is a valid regex")
});

/// True when a JSON parse error message looks like a login redirect.
pub fn looks_like_session_timeout(parse_error: &str) -> bool {
    SESSION_TIMEOUT_PATTERN.is_match(parse_error)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    Json,
    Html,
}

/// One logical service call, relative to `gma_base`.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCall {
    pub path: String,
    pub method: HttpMethod,
    pub payload: Option<Value>,
    pub shape: ResponseShape,
    /// Whether the call brackets the busy indicator.
    pub busy: bool,
}

impl ServiceCall {
    fn new(method: HttpMethod, path: impl Into<String>, payload: Option<Value>) -> Self {
        Self {
            path: path.into(),
            method,
            payload,
            shape: ResponseShape::Json,
            busy: true,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, path, None)
    }

    pub fn post(path: impl Into<String>, payload: Value) -> Self {
        Self::new(HttpMethod::Post, path, Some(payload))
    }

    pub fn put(path: impl Into<String>, payload: Value) -> Self {
        Self::new(HttpMethod::Put, path, Some(payload))
    }

    pub fn head(path: impl Into<String>) -> Self {
        Self::new(HttpMethod::Head, path, None)
    }

    /// Return the raw body instead of parsing JSON.
    pub fn html(mut self) -> Self {
        self.shape = ResponseShape::Html;
        self
    }

    pub fn without_busy(mut self) -> Self {
        self.busy = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    Json(Value),
    Html(String),
}

impl ParsedBody {
    pub fn into_json(self) -> Value {
        match self {
            ParsedBody::Json(value) => value,
            ParsedBody::Html(text) => Value::String(text),
        }
    }

    pub fn into_text(self) -> String {
        match self {
            ParsedBody::Json(value) => value.to_string(),
            ParsedBody::Html(text) => text,
        }
    }
}

impl GmaClient {
    /// Executes one service call.
    ///
    /// With `session_aware`, a detected session timeout is recovered at most
    /// once through the relogin collaborator. Without it, or when relogin is
    /// unavailable or fails, [`GmaError::SessionTimedOut`] is returned.
    pub async fn execute(&self, call: &ServiceCall, session_aware: bool) -> Result<ParsedBody> {
        let _busy = call.busy.then(|| self.inner.busy.enter());
        let observed_generation = self.session().generation();

        match self.attempt(call).await {
            Err(err) if session_aware && err.is_session_timed_out() => {
                self.recover_and_retry(call, observed_generation).await
            }
            Err(err) if err.is_session_timed_out() => {
                self.clear_session();
                Err(err)
            }
            other => other,
        }
    }

    /// Executes a session-aware JSON call and unwraps the service envelope.
    pub async fn call_data(&self, call: ServiceCall) -> Result<Value> {
        let body = self.execute(&call, true).await?;
        Envelope::from_value(body.into_json(), &call.path)?.into_data(&call.path)
    }

    async fn recover_and_retry(&self, call: &ServiceCall, observed_generation: u64) -> Result<ParsedBody> {
        let Some(handler) = self.inner.relogin.clone() else {
            warn!(path = %call.path, "session timed out and no relogin handler is configured");
            self.clear_session();
            return Err(GmaError::session_timed_out(&call.path));
        };

        {
            let _relogin = self.inner.relogin_lock.lock().await;
            let relogged_meanwhile = {
                let session = self.session();
                session.is_logged_in() && session.generation() != observed_generation
            };

            if relogged_meanwhile {
                debug!(path = %call.path, "session was renewed by another call, retrying");
            } else {
                info!(path = %call.path, "session timed out, attempting relogin");
                if let Err(err) = handler.relogin(self).await {
                    warn!(path = %call.path, error = %err, "relogin failed");
                    self.clear_session();
                    return Err(GmaError::session_timed_out(&call.path));
                }
            }
        }

        // Single retry: a second timeout here is returned as-is.
        self.attempt(call).await
    }

    fn build_request(&self, call: &ServiceCall) -> HttpRequest {
        let config = self.config();
        let mut request = HttpRequest::new(call.method, config.service_url(&call.path))
            .with_header("Content-Type", "application/json");

        if let Some(token) = self.csrf_token() {
            request = request.with_header("X-CSRF-Token", token);
        }
        if let Some(address) = &config.forwarded_for {
            request = request.with_header("X-Forwarded-For", address.clone());
        }
        if let Some(payload) = &call.payload {
            request = request.with_json(payload.clone());
        }
        request
    }

    async fn attempt(&self, call: &ServiceCall) -> Result<ParsedBody> {
        let request = self.build_request(call);
        debug!(method = %call.method, path = %call.path, "GMA request");

        let response = self.transport().send(request).await?;
        if response.status >= 400 {
            return Err(GmaError::service_http(response.status, &call.path));
        }

        match call.shape {
            ResponseShape::Html => Ok(ParsedBody::Html(response.body)),
            ResponseShape::Json => match serde_json::from_str::<Value>(&response.body) {
                Ok(value) => Ok(ParsedBody::Json(value)),
                Err(err) => {
                    let message = err.to_string();
                    if looks_like_session_timeout(&message) {
                        debug!(path = %call.path, status = response.status, "non-JSON body, treating as session timeout");
                        Err(GmaError::session_timed_out(&call.path))
                    } else {
                        Err(GmaError::parse("JSON", format!("{message} ({})", call.path)))
                    }
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_heuristic_matches_html_parse_errors() {
        let html_error = serde_json::from_str::<Value>("<!DOCTYPE html><html>login</html>")
            .unwrap_err()
            .to_string();
        assert!(looks_like_session_timeout(&html_error));

        let empty_error = serde_json::from_str::<Value>("").unwrap_err().to_string();
        assert!(looks_like_session_timeout(&empty_error));

        assert!(looks_like_session_timeout("SyntaxError: Unexpected end of input"));
        assert!(looks_like_session_timeout("Parse error: unexpected token <"));
    }

    #[test]
    fn test_timeout_heuristic_ignores_type_errors() {
        let type_error = serde_json::from_str::<u8>("300").unwrap_err().to_string();
        assert!(!looks_like_session_timeout(&type_error));
    }

    #[test]
    fn test_service_call_builders() {
        let call = ServiceCall::head("?q=logout").html().without_busy();
        assert_eq!(call.method, HttpMethod::Head);
        assert_eq!(call.shape, ResponseShape::Html);
        assert!(!call.busy);
        assert!(call.payload.is_none());
    }
}
