//! Application layer for the GMA client.
//!
//! Use cases that combine several service calls: resolving graph options
//! against the node's catalogs, generating the report and decoding the
//! returned workbook.

pub mod graph_service;
pub mod sheet_decoder;

pub use graph_service::{GraphOptions, GraphService, ReportDataSource};
pub use sheet_decoder::{CellGrid, REPORT_SHEET};
