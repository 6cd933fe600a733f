//! Graph data use case.
//!
//! Turns loosely specified graph options (selectors by id or by name, optional
//! dates and language) into a [`ReportRequest`], asks the service to generate
//! the report, and decodes the returned workbook into a [`GraphResult`].

use crate::sheet_decoder;
use async_trait::async_trait;
use chrono::{Local, Months, NaiveDate};
use gma_core::catalog::{Catalog, Selector};
use gma_core::error::{GmaError, Result};
use gma_core::report::{
    DateRange, GraphResult, ReportFormat, ReportOptions, ReportRequest, normalize_date,
};
use gma_interaction::GmaClient;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

const DATE_FORMAT: &str = "%Y%m%d";
/// Default range: from 12 months ago up to 1 month ago.
const DEFAULT_START_MONTHS_BACK: u32 = 12;
const DEFAULT_END_MONTHS_BACK: u32 = 1;

/// The service calls graph generation depends on.
#[async_trait]
pub trait ReportDataSource: Send + Sync {
    async fn language_catalog(&self) -> Result<Catalog>;
    async fn report_options(&self, node_id: &str) -> Result<ReportOptions>;
    async fn generate_report(&self, request: &ReportRequest) -> Result<Vec<u8>>;
}

#[async_trait]
impl ReportDataSource for GmaClient {
    async fn language_catalog(&self) -> Result<Catalog> {
        GmaClient::language_catalog(self).await
    }

    async fn report_options(&self, node_id: &str) -> Result<ReportOptions> {
        GmaClient::report_options(self, node_id).await
    }

    async fn generate_report(&self, request: &ReportRequest) -> Result<Vec<u8>> {
        GmaClient::generate_report(self, request).await
    }
}

/// What to graph. Only `node_id` is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphOptions {
    pub node_id: String,
    #[serde(default)]
    pub strategies: Vec<Selector>,
    #[serde(default)]
    pub measurements: Vec<Selector>,
    #[serde(default)]
    pub language: Option<Selector>,
    #[serde(default)]
    pub start_date: Option<String>,
    #[serde(default)]
    pub end_date: Option<String>,
    /// Overrides the service's configured report format.
    #[serde(default)]
    pub format: Option<ReportFormat>,
}

impl GraphOptions {
    pub fn new(node_id: impl Into<String>) -> Self {
        Self {
            node_id: node_id.into(),
            ..Self::default()
        }
    }

    pub fn with_strategy(mut self, selector: impl Into<Selector>) -> Self {
        self.strategies.push(selector.into());
        self
    }

    pub fn with_measurement(mut self, selector: impl Into<Selector>) -> Self {
        self.measurements.push(selector.into());
        self
    }

    pub fn with_language(mut self, selector: impl Into<Selector>) -> Self {
        self.language = Some(selector.into());
        self
    }

    pub fn with_start_date(mut self, date: impl Into<String>) -> Self {
        self.start_date = Some(date.into());
        self
    }

    pub fn with_end_date(mut self, date: impl Into<String>) -> Self {
        self.end_date = Some(date.into());
        self
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// Resolves graph options and produces decoded graph data.
pub struct GraphService {
    source: Arc<dyn ReportDataSource>,
    format: ReportFormat,
}

impl GraphService {
    pub fn new(source: Arc<dyn ReportDataSource>) -> Self {
        Self {
            source,
            format: ReportFormat::default(),
        }
    }

    /// Uses the client's configured report format.
    pub fn for_client(client: GmaClient) -> Self {
        let format = client.config().report_format;
        Self::new(Arc::new(client)).with_format(format)
    }

    pub fn with_format(mut self, format: ReportFormat) -> Self {
        self.format = format;
        self
    }

    /// Builds the request without generating the report.
    pub async fn resolve_report_request(&self, options: &GraphOptions) -> Result<ReportRequest> {
        let (request, _) = self.resolve_at(options, Local::now().date_naive()).await?;
        Ok(request)
    }

    pub async fn get_graph_data(&self, options: &GraphOptions) -> Result<GraphResult> {
        let (request, catalogs) = self.resolve_at(options, Local::now().date_naive()).await?;

        let payload = self.source.generate_report(&request).await?;
        let mut result =
            sheet_decoder::decode(&payload, &catalogs.strategies, &catalogs.measurements)?;
        result.node_id = request.node_id;

        info!(
            node_id = %result.node_id,
            periods = result.periods.len(),
            measurements = result.measurements.len(),
            "graph data ready"
        );
        Ok(result)
    }

    /// Resolution against a fixed `today`, returning the catalogs used.
    pub async fn resolve_at(
        &self,
        options: &GraphOptions,
        today: NaiveDate,
    ) -> Result<(ReportRequest, ReportOptions)> {
        let node_id = options.node_id.trim();
        if node_id.is_empty() {
            return Err(GmaError::invalid_params("a node id is required to generate a graph"));
        }

        let date_range = resolve_dates(options, today)?;

        let language_id = match &options.language {
            Some(selector) => self.resolve_language(selector).await?,
            None => None,
        };

        let catalogs = self.source.report_options(node_id).await.map_err(|err| {
            GmaError::resolution(format!("could not load report options for node {node_id}"), err)
        })?;

        let strategies = catalogs.strategies.resolve("strategy", &options.strategies);
        let measurements = catalogs
            .measurements
            .resolve("measurement", &options.measurements);
        if strategies.ids.is_empty() || measurements.ids.is_empty() {
            return Err(GmaError::unresolvable(format!(
                "node {node_id} reports no strategies or measurements to graph"
            )));
        }

        let request = ReportRequest {
            node_id: node_id.to_string(),
            date_range,
            strategy_ids: strategies.ids,
            measurement_ids: measurements.ids,
            language_id,
            format: options.format.unwrap_or(self.format),
        };
        debug!(?request, "resolved report request");
        Ok((request, catalogs))
    }

    /// A failed catalog fetch is an error; an unknown language is not.
    async fn resolve_language(&self, selector: &Selector) -> Result<Option<String>> {
        let catalog = self
            .source
            .language_catalog()
            .await
            .map_err(|err| GmaError::resolution("could not load the language list", err))?;

        match catalog.find_language(selector) {
            Some(entry) => Ok(Some(entry.id.clone())),
            None => {
                warn!(language = %selector, "language is not supported by GMA, using the server default");
                Ok(None)
            }
        }
    }
}

fn resolve_dates(options: &GraphOptions, today: NaiveDate) -> Result<DateRange> {
    let from = match &options.start_date {
        Some(date) => normalize_date(date)?,
        None => months_before(today, DEFAULT_START_MONTHS_BACK)?,
    };
    let to = match &options.end_date {
        Some(date) => normalize_date(date)?,
        None => months_before(today, DEFAULT_END_MONTHS_BACK)?,
    };
    Ok(DateRange { from, to })
}

fn months_before(today: NaiveDate, months: u32) -> Result<String> {
    today
        .checked_sub_months(Months::new(months))
        .map(|date| date.format(DATE_FORMAT).to_string())
        .ok_or_else(|| GmaError::invalid_params(format!("cannot go {months} months back from {today}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_default_dates() {
        let range = resolve_dates(&GraphOptions::new("5"), day(2026, 10, 17)).unwrap();
        assert_eq!(range.from, "20251017");
        assert_eq!(range.to, "20260917");
    }

    #[test]
    fn test_default_dates_clamp_to_month_end() {
        let range = resolve_dates(&GraphOptions::new("5"), day(2026, 3, 31)).unwrap();
        assert_eq!(range.from, "20250331");
        assert_eq!(range.to, "20260228");
    }

    #[test]
    fn test_explicit_dates_are_normalized() {
        let options = GraphOptions::new("5")
            .with_start_date("2025-01-01")
            .with_end_date("20250630");
        let range = resolve_dates(&options, day(2026, 10, 17)).unwrap();
        assert_eq!(range.from, "20250101");
        assert_eq!(range.to, "20250630");
    }

    #[test]
    fn test_bad_date_is_rejected() {
        let options = GraphOptions::new("5").with_start_date("last spring");
        assert!(resolve_dates(&options, day(2026, 10, 17)).is_err());
    }

    #[test]
    fn test_options_builder() {
        let options = GraphOptions::new("5")
            .with_strategy("Alpha")
            .with_strategy(2_i64)
            .with_measurement("Visits")
            .with_language("ko");
        assert_eq!(options.strategies, vec![Selector::from("Alpha"), Selector::from("2")]);
        assert_eq!(options.language, Some(Selector::from("ko")));
    }
}
