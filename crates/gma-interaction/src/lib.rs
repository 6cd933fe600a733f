//! The GMA client: session handshake, request execution with transparent
//! relogin, service calls and the report/measurement accessors.

pub mod auth;
pub mod busy;
pub mod client;
pub mod executor;
pub mod relogin;
pub mod report;
pub mod services;

pub use busy::{BusyIndicator, NoopBusyIndicator};
pub use client::{GmaClient, GmaClientBuilder};
pub use executor::{ParsedBody, ResponseShape, ServiceCall, looks_like_session_timeout};
pub use relogin::{CredentialRelogin, ReloginHandler};
pub use report::{Assignment, Assignments, Measurement, Report, SaveOutcome, StrategyMeasurements};
pub use services::Language;
