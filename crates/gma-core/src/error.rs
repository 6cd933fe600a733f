//! Error types for the GMA client.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The CAS / Drupal handshake step that failed during login.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AuthStage {
    /// POST credentials to the CAS ticket endpoint.
    TicketGranting,
    /// POST the service URL to the ticket-granting ticket URL.
    ServiceTicket,
    /// GET the application home page with the service ticket.
    ServiceLogin,
    /// GET the Drupal session token.
    CsrfToken,
    /// Resolve the current user after the session is established.
    UserInfo,
    /// HEAD the logout page.
    Logout,
}

impl fmt::Display for AuthStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AuthStage::TicketGranting => "ticket-granting ticket",
            AuthStage::ServiceTicket => "service ticket",
            AuthStage::ServiceLogin => "service login",
            AuthStage::CsrfToken => "CSRF token",
            AuthStage::UserInfo => "user info",
            AuthStage::Logout => "logout",
        };
        f.write_str(name)
    }
}

/// A shared error type for every GMA crate.
///
/// Server-provided messages are carried verbatim in [`GmaError::ServiceLogic`];
/// synthetic messages are only produced for transport-shape anomalies.
#[derive(Error, Debug, Clone, Serialize, Deserialize)]
pub enum GmaError {
    /// No response was received at all
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The service answered with HTTP status >= 400
    #[error("Service returned HTTP {status} for {origin}")]
    ServiceHttp { status: u16, origin: String },

    /// The service envelope reported `success: false`
    #[error("{message} (origin: {origin})")]
    ServiceLogic { message: String, origin: String },

    /// A JSON call got a login page back and no relogin recovered it
    #[error("Session timed out calling {origin}")]
    SessionTimedOut { origin: String },

    /// Serialization/deserialization error
    #[error("Parse error: {format} - {message}")]
    Parse {
        format: String, // "JSON", "TOML", etc.
        message: String,
    },

    /// A catalog needed to build a report request could not be loaded or matched
    #[error("Resolution error: {message}")]
    Resolution {
        message: String,
        #[source]
        source: Option<Box<GmaError>>,
    },

    /// A named handshake step failed
    #[error("Authentication failed during {stage}: {message}")]
    Auth { stage: AuthStage, message: String },

    /// Caller supplied unusable arguments
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// Spreadsheet payload could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GmaError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Creates a ServiceHttp error
    pub fn service_http(status: u16, origin: impl Into<String>) -> Self {
        Self::ServiceHttp {
            status,
            origin: origin.into(),
        }
    }

    /// Creates a ServiceLogic error
    pub fn service_logic(message: impl Into<String>, origin: impl Into<String>) -> Self {
        Self::ServiceLogic {
            message: message.into(),
            origin: origin.into(),
        }
    }

    /// Creates a SessionTimedOut error
    pub fn session_timed_out(origin: impl Into<String>) -> Self {
        Self::SessionTimedOut {
            origin: origin.into(),
        }
    }

    /// Creates a Parse error
    pub fn parse(format: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            format: format.into(),
            message: message.into(),
        }
    }

    /// Wraps an underlying failure in a Resolution error
    pub fn resolution(message: impl Into<String>, source: GmaError) -> Self {
        Self::Resolution {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// A catalog loaded but offers nothing to resolve against
    pub fn unresolvable(message: impl Into<String>) -> Self {
        Self::Resolution {
            message: message.into(),
            source: None,
        }
    }

    /// Creates an Auth error for the given stage
    pub fn auth(stage: AuthStage, message: impl Into<String>) -> Self {
        Self::Auth {
            stage,
            message: message.into(),
        }
    }

    /// Creates an InvalidParams error
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::InvalidParams(message.into())
    }

    /// Creates a Decode error
    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this is a SessionTimedOut error
    pub fn is_session_timed_out(&self) -> bool {
        matches!(self, Self::SessionTimedOut { .. })
    }

    /// Check if this is a Transport error
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// Check if this is an Auth error
    pub fn is_auth(&self) -> bool {
        matches!(self, Self::Auth { .. })
    }

    /// Returns the failed handshake stage for Auth errors
    pub fn auth_stage(&self) -> Option<AuthStage> {
        match self {
            Self::Auth { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Check if this is a Resolution error
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution { .. })
    }

    /// HTTP status for ServiceHttp errors, also when wrapped by resolution.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::ServiceHttp { status, .. } => Some(*status),
            Self::Resolution {
                source: Some(source),
                ..
            } => source.http_status(),
            _ => None,
        }
    }

    /// The server-provided `errorMessage`, when this error carries one.
    ///
    /// Resolution errors are unwrapped so callers see the original message.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::ServiceLogic { message, .. } => Some(message),
            Self::Resolution {
                source: Some(source),
                ..
            } => source.server_message(),
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for GmaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for GmaError {
    fn from(err: serde_json::Error) -> Self {
        Self::parse("JSON", err.to_string())
    }
}

impl From<toml::de::Error> for GmaError {
    fn from(err: toml::de::Error) -> Self {
        Self::parse("TOML", err.to_string())
    }
}

impl From<toml::ser::Error> for GmaError {
    fn from(err: toml::ser::Error) -> Self {
        Self::parse("TOML", err.to_string())
    }
}

impl From<base64::DecodeError> for GmaError {
    fn from(err: base64::DecodeError) -> Self {
        Self::decode(format!("report payload is not valid base64: {err}"))
    }
}

/// A type alias for `Result<T, GmaError>`.
pub type Result<T> = std::result::Result<T, GmaError>;
