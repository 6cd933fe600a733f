//! The `{success, data, error: {errorMessage}}` envelope wrapping every
//! GMA service response.

use crate::error::{GmaError, Result};
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvelopeError {
    #[serde(rename = "errorMessage", default)]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub error: Option<EnvelopeError>,
}

impl Envelope {
    pub fn from_value(value: Value, origin: &str) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| {
            GmaError::parse("JSON", format!("unexpected response shape from {origin}: {e}"))
        })
    }

    /// Returns `data`, or a [`GmaError::ServiceLogic`] carrying the server's
    /// `errorMessage` and the originating path when `success` is false.
    pub fn into_data(self, origin: &str) -> Result<Value> {
        if self.success {
            return Ok(self.data);
        }
        let message = self
            .error
            .and_then(|e| e.error_message)
            .unwrap_or_else(|| "GMA reported a failure without an error message".to_string());
        Err(GmaError::service_logic(message, origin))
    }
}
