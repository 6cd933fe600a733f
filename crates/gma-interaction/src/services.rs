//! GMA service calls.

use crate::client::GmaClient;
use crate::executor::ServiceCall;
use crate::report::{Assignment, Assignments, Measurement, Report};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use gma_core::catalog::{Catalog, CatalogEntry};
use gma_core::error::{GmaError, Result};
use gma_core::ids::{deserialize_id, id_to_value, value_to_id};
use gma_core::report::{ReportOptions, ReportRequest, normalize_date};
use gma_core::role::Role;
use gma_core::session::User;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

const LANGUAGES_PATH: &str = "?q=gmaservices/gma_language";
/// Report searches return at most this many reports.
const MAX_REPORT_RESULTS: u32 = 10;

fn report_options_path(node_id: &str) -> String {
    format!("?q=gmaservices/gma_advancedReport/{node_id}/options")
}

fn graph_generate_path(node_id: &str) -> String {
    format!("?q=gmaservices/gma_advancedReport/{node_id}/generate")
}

/// An entry of the `gma_language` catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Language {
    #[serde(rename = "languageId", deserialize_with = "deserialize_id")]
    pub id: String,
    #[serde(rename = "languageName", default)]
    pub name: String,
}

impl GmaClient {
    /// The current user, fetched from the service.
    pub async fn get_user(&self) -> Result<User> {
        self.fetch_current_user(true).await
    }

    /// Nodes the logged-in user is assigned to under `role`.
    pub async fn get_assignments(&self, role: Role) -> Result<Assignments> {
        let ren_id = self
            .user()
            .map(|user| user.ren_id)
            .ok_or_else(|| GmaError::invalid_params("get_assignments requires a logged in user"))?;
        let path = format!(
            "?q=gmaservices/gma_user/{ren_id}/assignments/{}",
            role.as_str()
        );
        let data = self.call_data(ServiceCall::get(path)).await?;

        let mut list = Vec::new();
        if let Some(entries) = data[role.keys().segment].as_array() {
            for entry in entries {
                let Some(node_id) = value_to_id(&entry["nodeId"]) else {
                    continue;
                };
                let short_name = entry["shortName"].as_str().unwrap_or_default().to_string();
                list.push(Assignment::new(self.clone(), node_id, short_name, role));
            }
        }
        Ok(Assignments::new(list))
    }

    /// Languages supported by the server. Cached for the session.
    pub async fn get_languages(&self) -> Result<Vec<Language>> {
        let cached = self.caches().languages.clone();
        if let Some(cached) = cached {
            return Ok(cached);
        }

        let data = self.call_data(ServiceCall::get(LANGUAGES_PATH)).await?;
        if data.is_null() {
            return Err(GmaError::parse("JSON", "gma_language did not return any data"));
        }
        let languages: Vec<Language> = serde_json::from_value(data)?;
        self.caches().languages = Some(languages.clone());
        Ok(languages)
    }

    pub async fn language_catalog(&self) -> Result<Catalog> {
        let languages = self.get_languages().await?;
        Ok(Catalog::new(
            languages
                .into_iter()
                .map(|l| CatalogEntry::new(l.id, l.name))
                .collect(),
        ))
    }

    /// Strategy and measurement catalogs for a node. Cached per node for the session.
    pub async fn report_options(&self, node_id: &str) -> Result<ReportOptions> {
        let cached = self.caches().report_options.get(node_id).cloned();
        if let Some(cached) = cached {
            return Ok(cached);
        }

        let data = self
            .call_data(ServiceCall::get(report_options_path(node_id)))
            .await?;
        let options = ReportOptions::from_value(&data)?;
        self.caches()
            .report_options
            .insert(node_id.to_string(), options.clone());
        Ok(options)
    }

    pub async fn strategies_for_node(&self, node_id: &str) -> Result<Catalog> {
        Ok(self.report_options(node_id).await?.strategies)
    }

    pub async fn measurements_for_node(&self, node_id: &str) -> Result<Catalog> {
        Ok(self.report_options(node_id).await?.measurements)
    }

    /// Generates a report and returns the decoded spreadsheet bytes.
    pub async fn generate_report(&self, request: &ReportRequest) -> Result<Vec<u8>> {
        let path = graph_generate_path(&request.node_id);
        debug!(path = %path, "requesting generated report");
        let data = self
            .call_data(ServiceCall::post(path, request.to_service_payload()))
            .await?;
        let encoded = data
            .as_str()
            .ok_or_else(|| GmaError::parse("JSON", "generated report data is not a base64 string"))?;
        Ok(BASE64_STANDARD.decode(encoded.trim())?)
    }

    /// Up to ten of the user's reports for a node.
    ///
    /// The search endpoint does not always honour the node filter, so
    /// results are filtered again here.
    pub async fn get_reports_for_node(&self, node_id: &str, role: Role) -> Result<Vec<Report>> {
        let payload = json!({
            "nodeId": [id_to_value(node_id)],
            "maxResult": MAX_REPORT_RESULTS,
        });
        let data = self
            .call_data(ServiceCall::post(role.report_path("/searchOwn"), payload))
            .await?;

        let Some(entries) = data[role.keys().reports_key].as_array() else {
            return Ok(Vec::new());
        };

        let mut reports = Vec::new();
        for entry in entries {
            if value_to_id(&entry["node"]["nodeId"]).as_deref() != Some(node_id) {
                continue;
            }
            // newest last in the response, newest first here
            reports.insert(0, Report::from_search_entry(self.clone(), role, entry)?);
        }
        Ok(reports)
    }

    /// The report of `node_id` covering `date`, if any.
    ///
    /// `date` may be `YYYYMMDD`, `YYYY-MM-DD` or an ISO timestamp.
    pub async fn report_for_date(&self, node_id: &str, role: Role, date: &str) -> Result<Option<Report>> {
        let date = normalize_date(date)?;
        let payload = json!({
            "nodeId": [id_to_value(node_id)],
            "dateWithin": date,
        });
        let data = self
            .call_data(ServiceCall::post(role.report_path("/searchOwn"), payload))
            .await?;

        let total = value_to_id(&data["totalCount"])
            .and_then(|count| count.parse::<u64>().ok())
            .unwrap_or(0);
        if total == 0 {
            return Ok(None);
        }
        match data[role.keys().reports_key].get(0) {
            Some(entry) => Ok(Some(Report::from_search_entry(self.clone(), role, entry)?)),
            None => Ok(None),
        }
    }

    /// A report handle without fetching the report itself.
    pub fn get_report(&self, report_id: impl Into<String>, role: Role) -> Report {
        Report::new(self.clone(), report_id.into(), role)
    }

    /// A measurement handle, for setting a value without loading its report.
    pub fn get_measurement(
        &self,
        measurement_id: impl Into<String>,
        report_id: impl Into<String>,
        role: Role,
    ) -> Measurement {
        Measurement::detached(self.clone(), report_id.into(), measurement_id.into(), role)
    }

    pub(crate) async fn fetch_numeric_measurements(&self, report_id: &str, role: Role) -> Result<Value> {
        let path = role.report_path(&format!("/{report_id}/numeric"));
        let data = self.call_data(ServiceCall::get(path)).await?;
        Ok(data["numericMeasurements"].clone())
    }

    pub(crate) async fn put_measurements(&self, report_id: &str, role: Role, entries: Vec<Value>) -> Result<()> {
        let path = role.report_path(&format!("/{report_id}"));
        self.call_data(ServiceCall::put(path, Value::Array(entries)).without_busy())
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_json() {
        let languages: Vec<Language> = serde_json::from_value(json!([
            { "languageId": 1, "languageName": "English" },
            { "languageId": "3", "languageName": "한국어" }
        ]))
        .unwrap();
        assert_eq!(languages[0].id, "1");
        assert_eq!(languages[1].name, "한국어");
    }

    #[test]
    fn test_paths() {
        assert_eq!(report_options_path("7"), "?q=gmaservices/gma_advancedReport/7/options");
        assert_eq!(graph_generate_path("7"), "?q=gmaservices/gma_advancedReport/7/generate");
    }
}
