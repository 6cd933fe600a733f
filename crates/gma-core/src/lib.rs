//! Core domain types for the GMA client.
//!
//! Nothing in this crate performs I/O. Transports, storage and the client
//! itself live in the infrastructure and interaction crates and talk to each
//! other through the types defined here.

pub mod catalog;
pub mod config;
pub mod envelope;
pub mod error;
pub mod ids;
pub mod report;
pub mod role;
pub mod session;
pub mod transport;

pub use catalog::{Catalog, CatalogEntry, Resolution, Selector};
pub use config::GmaConfig;
pub use error::{AuthStage, GmaError, Result};
pub use report::{
    CellValue, DateRange, Granularity, GraphResult, MeasurementSeries, ReportFormat,
    ReportOptions, ReportRequest, StrategyEntry,
};
pub use role::Role;
pub use session::{SessionState, User};
pub use transport::{HttpMethod, HttpRequest, HttpResponse, RequestBody, Transport};
