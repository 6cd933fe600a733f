//! Assignment, report and measurement accessors.
//!
//! These are thin handles over [`GmaClient`] service calls. A [`Report`]
//! remembers the measurements it has loaded so that [`Report::save`] can
//! write every edited value in one request. [`Measurement`] handles are
//! shared: editing a clone edits the measurement the report will save.

use crate::client::GmaClient;
use gma_core::error::{GmaError, Result};
use gma_core::ids::{id_to_value, value_to_id};
use gma_core::report::format_date;
use gma_core::role::Role;
use serde_json::{Value, json};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Result of a save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Values were written to the server.
    Saved,
    /// Nothing was edited, no request was made.
    Unchanged,
    /// A newer delayed save replaced this one before it ran.
    Cancelled,
}

// ============================================================================
// Assignments
// ============================================================================

/// The nodes a user is assigned to under one role.
#[derive(Debug, Clone, Default)]
pub struct Assignments {
    list: Vec<Assignment>,
}

impl Assignments {
    pub(crate) fn new(list: Vec<Assignment>) -> Self {
        Self { list }
    }

    pub fn list(&self) -> &[Assignment] {
        &self.list
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// `node id -> short name`
    pub fn by_id(&self) -> HashMap<String, String> {
        self.list
            .iter()
            .map(|a| (a.node_id.clone(), a.short_name.clone()))
            .collect()
    }

    /// `short name -> node id`
    pub fn by_name(&self) -> HashMap<String, String> {
        self.list
            .iter()
            .map(|a| (a.short_name.clone(), a.node_id.clone()))
            .collect()
    }

    /// Finds an assignment by node id or short name.
    pub fn find(&self, key: &str) -> Option<&Assignment> {
        self.list
            .iter()
            .find(|a| a.node_id == key || a.short_name == key)
    }
}

impl IntoIterator for Assignments {
    type Item = Assignment;
    type IntoIter = std::vec::IntoIter<Assignment>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.into_iter()
    }
}

#[derive(Clone)]
pub struct Assignment {
    client: GmaClient,
    node_id: String,
    short_name: String,
    role: Role,
}

impl fmt::Debug for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Assignment")
            .field("node_id", &self.node_id)
            .field("short_name", &self.short_name)
            .field("role", &self.role)
            .finish()
    }
}

impl Assignment {
    pub(crate) fn new(client: GmaClient, node_id: String, short_name: String, role: Role) -> Self {
        Self {
            client,
            node_id,
            short_name,
            role,
        }
    }

    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    pub fn short_name(&self) -> &str {
        &self.short_name
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub async fn reports(&self) -> Result<Vec<Report>> {
        self.client
            .get_reports_for_node(&self.node_id, self.role)
            .await
    }

    pub async fn report_for_date(&self, date: &str) -> Result<Option<Report>> {
        self.client
            .report_for_date(&self.node_id, self.role, date)
            .await
    }

    /// Measurements of the first strategy of the most recent report.
    pub async fn measurements(&self) -> Result<Vec<Measurement>> {
        let reports = self.reports().await?;
        let Some(report) = reports.first() else {
            return Ok(Vec::new());
        };
        let groups = report.measurements().await?;
        Ok(groups
            .into_iter()
            .next()
            .map(|group| group.measurements)
            .unwrap_or_default())
    }
}

// ============================================================================
// Reports
// ============================================================================

/// Measurements listed under one strategy of a report.
#[derive(Debug, Clone)]
pub struct StrategyMeasurements {
    pub strategy: String,
    pub measurements: Vec<Measurement>,
}

#[derive(Clone)]
pub struct Report {
    client: GmaClient,
    id: String,
    role: Role,
    node_id: Option<String>,
    node_name: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    /// One entry per measurement id; a later load replaces an earlier one.
    loaded: Arc<Mutex<BTreeMap<String, Measurement>>>,
}

impl fmt::Debug for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Report")
            .field("id", &self.id)
            .field("role", &self.role)
            .field("node_id", &self.node_id)
            .field("node_name", &self.node_name)
            .field("start_date", &self.start_date)
            .field("end_date", &self.end_date)
            .finish()
    }
}

impl Report {
    pub(crate) fn new(client: GmaClient, id: String, role: Role) -> Self {
        Self {
            client,
            id,
            role,
            node_id: None,
            node_name: None,
            start_date: None,
            end_date: None,
            loaded: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    /// Builds a report from one entry of a `searchOwn` response.
    pub(crate) fn from_search_entry(client: GmaClient, role: Role, entry: &Value) -> Result<Self> {
        let id_key = role.keys().id_key;
        let id = value_to_id(&entry[id_key]).ok_or_else(|| {
            GmaError::parse("JSON", format!("report search entry has no {id_key}"))
        })?;

        let mut report = Self::new(client, id, role);
        report.node_id = value_to_id(&entry["node"]["nodeId"]);
        report.node_name = entry["node"]["shortName"].as_str().map(str::to_string);
        report.start_date = value_to_id(&entry["startDate"]);
        report.end_date = value_to_id(&entry["endDate"]);
        Ok(report)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn node_id(&self) -> Option<&str> {
        self.node_id.as_deref()
    }

    pub fn node_name(&self) -> Option<&str> {
        self.node_name.as_deref()
    }

    pub fn start_date(&self) -> Option<&str> {
        self.start_date.as_deref()
    }

    pub fn end_date(&self) -> Option<&str> {
        self.end_date.as_deref()
    }

    /// `YYYY-MM-DD – YYYY-MM-DD`
    pub fn period(&self) -> String {
        format!(
            "{} – {}",
            format_date(self.start_date.as_deref().unwrap_or_default()),
            format_date(self.end_date.as_deref().unwrap_or_default())
        )
    }

    fn loaded(&self) -> MutexGuard<'_, BTreeMap<String, Measurement>> {
        self.loaded.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetches the report's numeric measurements, grouped by strategy name.
    pub async fn measurements(&self) -> Result<Vec<StrategyMeasurements>> {
        let numerics = self
            .client
            .fetch_numeric_measurements(&self.id, self.role)
            .await?;

        let mut groups = Vec::new();
        for strategy in numerics.as_array().into_iter().flatten() {
            let Some(by_name) = strategy.as_object() else {
                continue;
            };
            for (strategy_name, list) in by_name {
                let mut measurements = Vec::new();
                for info in list.as_array().into_iter().flatten() {
                    let measurement =
                        Measurement::from_numeric(self.client.clone(), &self.id, self.role, info)?;
                    self.loaded()
                        .insert(measurement.id().to_string(), measurement.clone());
                    measurements.push(measurement);
                }
                groups.push(StrategyMeasurements {
                    strategy: strategy_name.clone(),
                    measurements,
                });
            }
        }
        Ok(groups)
    }

    /// A previously loaded measurement.
    pub fn measurement(&self, measurement_id: &str) -> Option<Measurement> {
        self.loaded().get(measurement_id).cloned()
    }

    /// Writes every edited measurement in one request.
    pub async fn save(&self) -> Result<SaveOutcome> {
        let edited: Vec<(Measurement, f64)> = self
            .loaded()
            .values()
            .filter_map(|m| m.pending_value().map(|value| (m.clone(), value)))
            .collect();
        if edited.is_empty() {
            return Ok(SaveOutcome::Unchanged);
        }

        let entries = edited
            .iter()
            .map(|(measurement, value)| measurement.save_entry(*value))
            .collect();
        self.client
            .put_measurements(&self.id, self.role, entries)
            .await?;

        for (measurement, value) in &edited {
            measurement.mark_saved(*value);
        }
        debug!(report_id = %self.id, count = edited.len(), "report measurements saved");
        Ok(SaveOutcome::Saved)
    }

    /// The report of the same node covering `date`.
    pub async fn report_for_date(&self, date: &str) -> Result<Option<Report>> {
        let node_id = self.node_id.as_deref().ok_or_else(|| {
            GmaError::invalid_params(format!("report {} has no node id", self.id))
        })?;
        self.client.report_for_date(node_id, self.role, date).await
    }
}

// ============================================================================
// Measurements
// ============================================================================

#[derive(Debug, Default)]
struct MeasurementState {
    value: f64,
    dirty: bool,
}

#[derive(Debug, Default)]
struct PendingSave {
    seq: u64,
    token: Option<CancellationToken>,
}

struct MeasurementInner {
    client: GmaClient,
    report_id: String,
    measurement_id: String,
    role: Role,
    name: String,
    description: String,
    state: Mutex<MeasurementState>,
    pending: Mutex<PendingSave>,
}

/// A numeric measurement of one report.
#[derive(Clone)]
pub struct Measurement {
    inner: Arc<MeasurementInner>,
}

impl fmt::Debug for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state();
        f.debug_struct("Measurement")
            .field("report_id", &self.inner.report_id)
            .field("measurement_id", &self.inner.measurement_id)
            .field("name", &self.inner.name)
            .field("value", &state.value)
            .field("dirty", &state.dirty)
            .finish()
    }
}

/// Measurement values arrive as numbers or numeric strings.
fn parse_value(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().unwrap_or_default(),
        Value::String(s) => s.trim().parse().unwrap_or_default(),
        _ => 0.0,
    }
}

fn number_value(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < i64::MAX as f64 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

impl Measurement {
    fn build(
        client: GmaClient,
        report_id: String,
        measurement_id: String,
        role: Role,
        name: String,
        description: String,
        value: f64,
    ) -> Self {
        Self {
            inner: Arc::new(MeasurementInner {
                client,
                report_id,
                measurement_id,
                role,
                name,
                description,
                state: Mutex::new(MeasurementState {
                    value,
                    dirty: false,
                }),
                pending: Mutex::new(PendingSave::default()),
            }),
        }
    }

    pub(crate) fn detached(client: GmaClient, report_id: String, measurement_id: String, role: Role) -> Self {
        Self::build(
            client,
            report_id,
            measurement_id,
            role,
            "Measurement".to_string(),
            String::new(),
            0.0,
        )
    }

    pub(crate) fn from_numeric(client: GmaClient, report_id: &str, role: Role, info: &Value) -> Result<Self> {
        let measurement_id = value_to_id(&info["measurementId"]).ok_or_else(|| {
            GmaError::parse("JSON", format!("measurement in report {report_id} has no measurementId"))
        })?;
        Ok(Self::build(
            client,
            report_id.to_string(),
            measurement_id,
            role,
            info["measurementName"]
                .as_str()
                .unwrap_or("Measurement")
                .to_string(),
            info["measurementDescription"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
            parse_value(&info["measurementValue"]),
        ))
    }

    fn state(&self) -> MutexGuard<'_, MeasurementState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn pending(&self) -> MutexGuard<'_, PendingSave> {
        self.inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn id(&self) -> &str {
        &self.inner.measurement_id
    }

    pub fn report_id(&self) -> &str {
        &self.inner.report_id
    }

    pub fn role(&self) -> Role {
        self.inner.role
    }

    pub fn label(&self) -> &str {
        &self.inner.name
    }

    pub fn description(&self) -> &str {
        &self.inner.description
    }

    pub fn value(&self) -> f64 {
        self.state().value
    }

    /// Sets the local value. Returns true (and marks the measurement dirty)
    /// when the value actually changed.
    pub fn set_value(&self, value: f64) -> bool {
        let mut state = self.state();
        let changed = state.value != value;
        if changed {
            state.dirty = true;
        }
        state.value = value;
        changed
    }

    pub fn is_dirty(&self) -> bool {
        self.state().dirty
    }

    fn pending_value(&self) -> Option<f64> {
        let state = self.state();
        state.dirty.then_some(state.value)
    }

    fn save_entry(&self, value: f64) -> Value {
        json!({
            "measurementId": id_to_value(&self.inner.measurement_id),
            "type": "numeric",
            "value": number_value(value),
        })
    }

    /// Clears the dirty flag unless the value was edited again meanwhile.
    fn mark_saved(&self, saved_value: f64) {
        let mut state = self.state();
        if state.value == saved_value {
            state.dirty = false;
        }
    }

    /// Writes the value if it was edited; no request otherwise.
    pub async fn save(&self) -> Result<SaveOutcome> {
        let Some(value) = self.pending_value() else {
            return Ok(SaveOutcome::Unchanged);
        };
        self.inner
            .client
            .put_measurements(&self.inner.report_id, self.inner.role, vec![self.save_entry(value)])
            .await?;
        self.mark_saved(value);
        debug!(measurement_id = %self.inner.measurement_id, value, "measurement saved");
        Ok(SaveOutcome::Saved)
    }

    /// Saves after the configured quiet period.
    ///
    /// A newer `delayed_save` on the same measurement cancels this one, whose
    /// future then resolves to [`SaveOutcome::Cancelled`]. The timer runs on
    /// the tokio runtime, so the returned future does not need to be polled
    /// for the save to happen.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime, since the timer task is
    /// started with `tokio::spawn`.
    pub fn delayed_save(&self) -> impl Future<Output = Result<SaveOutcome>> + Send + 'static {
        let token = CancellationToken::new();
        let seq = {
            let mut pending = self.pending();
            if let Some(previous) = pending.token.replace(token.clone()) {
                previous.cancel();
            }
            pending.seq += 1;
            pending.seq
        };

        let (tx, rx) = oneshot::channel();
        let measurement = self.clone();
        let delay = self.inner.client.config().delayed_save();

        tokio::spawn(async move {
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => Ok(SaveOutcome::Cancelled),
                _ = tokio::time::sleep(delay) => {
                    measurement.finish_pending(seq);
                    measurement.save().await
                }
            };
            let _ = tx.send(outcome);
        });

        async move {
            rx.await
                .unwrap_or_else(|_| Err(GmaError::internal("delayed save task ended without a result")))
        }
    }

    fn finish_pending(&self, seq: u64) {
        let mut pending = self.pending();
        if pending.seq == seq {
            pending.token = None;
        }
    }
}
