//! Report request and graph result models.

use crate::catalog::Catalog;
use crate::error::{GmaError, Result};
use crate::ids::id_to_value;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::str::FromStr;

/// Reporting interval of a generated report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    #[default]
    Monthly,
    Quarterly,
    HalfYearly,
    Yearly,
}

impl Granularity {
    /// Numeric code expected by the report generator.
    pub fn code(self) -> u8 {
        match self {
            Granularity::Monthly => 2,
            Granularity::Quarterly => 3,
            Granularity::HalfYearly => 4,
            Granularity::Yearly => 5,
        }
    }
}

impl FromStr for Granularity {
    type Err = GmaError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().replace('-', "_").as_str() {
            "monthly" => Ok(Granularity::Monthly),
            "quarterly" => Ok(Granularity::Quarterly),
            "half_yearly" => Ok(Granularity::HalfYearly),
            "yearly" => Ok(Granularity::Yearly),
            other => Err(GmaError::invalid_params(format!(
                "unknown granularity '{other}'"
            ))),
        }
    }
}

/// Layout options sent with every report request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportFormat {
    pub granularity: Granularity,
    pub show_total_column: bool,
}

/// Inclusive date range, both ends as `YYYYMMDD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: String,
    pub to: String,
}

/// Normalizes `YYYYMMDD`, `YYYY-MM-DD` or an ISO timestamp to `YYYYMMDD`.
pub fn normalize_date(input: &str) -> Result<String> {
    let date_part = input.trim().split('T').next().unwrap_or_default();
    let compact: String = date_part.chars().filter(|c| *c != '-').collect();
    if compact.len() == 8 && compact.chars().all(|c| c.is_ascii_digit()) {
        Ok(compact)
    } else {
        Err(GmaError::invalid_params(format!(
            "date '{input}' is not in YYYYMMDD or YYYY-MM-DD form"
        )))
    }
}

/// Renders a GMA `YYYYMMDD` date as `YYYY-MM-DD`. Other input is returned as is.
pub fn format_date(ymd: &str) -> String {
    if ymd.len() == 8 && ymd.chars().all(|c| c.is_ascii_digit()) {
        format!("{}-{}-{}", &ymd[0..4], &ymd[4..6], &ymd[6..8])
    } else {
        ymd.to_string()
    }
}

/// A fully resolved graph-generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRequest {
    pub node_id: String,
    pub date_range: DateRange,
    pub strategy_ids: Vec<String>,
    pub measurement_ids: Vec<String>,
    pub language_id: Option<String>,
    pub format: ReportFormat,
}

impl ReportRequest {
    /// Body of the `advancedReport/{nodeId}/generate` POST.
    pub fn to_service_payload(&self) -> Value {
        let ids = |list: &[String]| list.iter().map(|id| id_to_value(id)).collect::<Vec<_>>();

        let mut payload = json!({
            "dateRange": {
                "fixed": {
                    "from": self.date_range.from,
                    "to": self.date_range.to,
                }
            },
            "reportFormat": {
                "byReportingInterval": {
                    "showTotalColumn": self.format.show_total_column,
                    "granularity": self.format.granularity.code(),
                }
            },
            "organizationSelection": [id_to_value(&self.node_id)],
            "strategySelection": ids(&self.strategy_ids),
            "measurementSelection": {
                "calculatedList": [],
                "numericList": ids(&self.measurement_ids),
            }
        });

        if let (Some(language_id), Some(map)) = (&self.language_id, payload.as_object_mut()) {
            map.insert("languageId".to_string(), id_to_value(language_id));
        }
        payload
    }
}

/// Strategy and measurement catalogs reported for one node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportOptions {
    pub strategies: Catalog,
    pub measurements: Catalog,
}

impl ReportOptions {
    /// Parses the `data` of `advancedReport/{nodeId}/options`.
    pub fn from_value(data: &Value) -> Result<Self> {
        let strategies = Catalog::from_id_name_maps(&data["strategySelection"])?;
        let measurements =
            Catalog::from_id_name_maps(&data["measurementSelection"]["numericList"])?;
        Ok(Self {
            strategies,
            measurements,
        })
    }
}

/// One spreadsheet cell value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Number(f64),
    Text(String),
    Blank,
}

impl CellValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Blank)
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            CellValue::Number(n) => write!(f, "{n}"),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Blank => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrategyEntry {
    pub id: String,
    pub name: String,
}

/// One measurement row of a generated report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementSeries {
    /// `None` when no `"<name> - <strategy>"` key matched the catalog.
    pub id: Option<String>,
    pub name: String,
    /// `None` for rows above the first strategy row.
    pub strategy_id: Option<String>,
    /// Aligned to [`GraphResult::periods`].
    pub values: Vec<CellValue>,
}

/// Decoded graph data for one node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphResult {
    pub node_id: String,
    pub title: String,
    pub info: String,
    pub periods: Vec<String>,
    pub strategies: Vec<StrategyEntry>,
    pub measurements: Vec<MeasurementSeries>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ReportRequest {
        ReportRequest {
            node_id: "42".into(),
            date_range: DateRange {
                from: "20240101".into(),
                to: "20241201".into(),
            },
            strategy_ids: vec!["1".into(), "2".into()],
            measurement_ids: vec!["7".into()],
            language_id: None,
            format: ReportFormat::default(),
        }
    }

    #[test]
    fn test_service_payload_shape() {
        let payload = request().to_service_payload();
        assert_eq!(payload["dateRange"]["fixed"]["from"], "20240101");
        assert_eq!(payload["reportFormat"]["byReportingInterval"]["granularity"], 2);
        assert_eq!(payload["reportFormat"]["byReportingInterval"]["showTotalColumn"], false);
        assert_eq!(payload["organizationSelection"], json!([42]));
        assert_eq!(payload["strategySelection"], json!([1, 2]));
        assert_eq!(payload["measurementSelection"]["numericList"], json!([7]));
        assert_eq!(payload["measurementSelection"]["calculatedList"], json!([]));
        assert!(payload.get("languageId").is_none());
    }

    #[test]
    fn test_service_payload_with_language() {
        let mut req = request();
        req.language_id = Some("3".into());
        req.format.granularity = Granularity::Quarterly;
        let payload = req.to_service_payload();
        assert_eq!(payload["languageId"], 3);
        assert_eq!(payload["reportFormat"]["byReportingInterval"]["granularity"], 3);
    }

    #[test]
    fn test_normalize_date() {
        assert_eq!(normalize_date("20240315").unwrap(), "20240315");
        assert_eq!(normalize_date("2024-03-15").unwrap(), "20240315");
        assert_eq!(normalize_date("2014-03-11T05:00:00.000Z").unwrap(), "20140311");
        assert!(normalize_date("March").is_err());
        assert!(normalize_date("2024-3-15").is_err());
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("20240315"), "2024-03-15");
        assert_eq!(format_date("n/a"), "n/a");
    }

    #[test]
    fn test_report_options_from_value() {
        let data = json!({
            "strategySelection": [{ "1": "Alpha" }],
            "measurementSelection": {
                "numericList": [{ "10": "Calls - Alpha" }],
                "calculatedList": null
            }
        });
        let options = ReportOptions::from_value(&data).unwrap();
        assert_eq!(options.strategies.id_for_name("Alpha"), Some("1"));
        assert_eq!(options.measurements.len(), 1);
    }

    #[test]
    fn test_cell_value_display() {
        assert_eq!(CellValue::Number(4.0).to_string(), "4");
        assert_eq!(CellValue::Number(2.5).to_string(), "2.5");
        assert_eq!(CellValue::Text("Jan".into()).to_string(), "Jan");
        assert_eq!(serde_json::to_value(CellValue::Blank).unwrap(), Value::Null);
    }
}
