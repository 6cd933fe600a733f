//! Decoder for the workbook returned by graph generation.
//!
//! Layout of the report sheet, 0-based rows, column A holding labels:
//!
//! ```text
//! row 0    title
//! row 3    info text
//! row 4    period labels, from the first populated column rightward
//! row 5..  strategy names and measurement labels, values under the periods
//! ```
//!
//! A row whose label is a known strategy name opens that strategy's section;
//! every other row is a measurement of the current section. Processing stops
//! at the first row without a label.

use calamine::{Data, DataType, Reader, open_workbook_auto_from_rs};
use gma_core::catalog::Catalog;
use gma_core::error::{GmaError, Result};
use gma_core::report::{CellValue, GraphResult, MeasurementSeries, StrategyEntry};
use std::collections::HashMap;
use std::io::Cursor;
use tracing::{debug, warn};

pub const REPORT_SHEET: &str = "generated report";

const TITLE_CELL: (u32, u32) = (0, 0);
const INFO_CELL: (u32, u32) = (3, 0);
const PERIOD_ROW: u32 = 4;
const DATA_START_ROW: u32 = 5;
const LABEL_COLUMN: u32 = 0;

/// Sparse cell grid of one sheet. Blank cells are not stored.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CellGrid {
    cells: HashMap<(u32, u32), CellValue>,
    height: u32,
    width: u32,
}

impl CellGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the report sheet of an xlsx/xls/ods payload.
    ///
    /// Falls back to the first sheet when no sheet carries the expected name.
    pub fn from_workbook(payload: &[u8]) -> Result<Self> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(payload.to_vec()))
            .map_err(|e| GmaError::decode(format!("generated report is not a readable workbook: {e}")))?;

        let names = workbook.sheet_names();
        let sheet = match names.iter().find(|name| name.as_str() == REPORT_SHEET) {
            Some(name) => name.clone(),
            None => {
                let first = names
                    .first()
                    .cloned()
                    .ok_or_else(|| GmaError::decode("generated report has no sheets"))?;
                warn!(sheet = %first, "no '{}' sheet in generated report, using the first sheet", REPORT_SHEET);
                first
            }
        };

        let range = workbook
            .worksheet_range(&sheet)
            .map_err(|e| GmaError::decode(format!("could not read sheet '{sheet}': {e}")))?;

        let mut grid = Self::new();
        if let Some((first_row, first_col)) = range.start() {
            for (row, col, data) in range.used_cells() {
                grid.set(first_row + row as u32, first_col + col as u32, cell_value(data));
            }
        }
        Ok(grid)
    }

    pub fn set(&mut self, row: u32, col: u32, value: CellValue) {
        let blank = match &value {
            CellValue::Blank => true,
            CellValue::Text(text) => text.trim().is_empty(),
            CellValue::Number(_) => false,
        };
        if blank {
            self.cells.remove(&(row, col));
            return;
        }
        self.height = self.height.max(row + 1);
        self.width = self.width.max(col + 1);
        self.cells.insert((row, col), value);
    }

    pub fn with_text(mut self, row: u32, col: u32, text: &str) -> Self {
        self.set(row, col, CellValue::Text(text.to_string()));
        self
    }

    pub fn with_number(mut self, row: u32, col: u32, number: f64) -> Self {
        self.set(row, col, CellValue::Number(number));
        self
    }

    pub fn get(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.cells.get(&(row, col))
    }

    /// Rows up to and including the last populated one.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Columns up to and including the last populated one.
    pub fn width(&self) -> u32 {
        self.width
    }

    fn text(&self, row: u32, col: u32) -> Option<String> {
        self.get(row, col).map(|value| value.to_string().trim().to_string())
    }

    fn text_at(&self, (row, col): (u32, u32)) -> String {
        self.text(row, col).unwrap_or_default()
    }
}

fn cell_value(data: &Data) -> CellValue {
    match data {
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Float(f) => CellValue::Number(*f),
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(_) => data
            .as_datetime()
            .map(|dt| CellValue::Text(dt.format("%Y-%m-%d").to_string()))
            .unwrap_or(CellValue::Blank),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
        Data::Empty => CellValue::Blank,
    }
}

/// Decodes a generated report payload.
///
/// `strategies` and `measurements` are the node's catalogs; measurement
/// names in the catalog take the form `"<label> - <strategy name>"`.
pub fn decode(payload: &[u8], strategies: &Catalog, measurements: &Catalog) -> Result<GraphResult> {
    let grid = CellGrid::from_workbook(payload)?;
    decode_grid(&grid, strategies, measurements)
}

pub fn decode_grid(grid: &CellGrid, strategies: &Catalog, measurements: &Catalog) -> Result<GraphResult> {
    let (start_col, periods) = read_periods(grid)?;

    let mut result = GraphResult {
        title: grid.text_at(TITLE_CELL),
        info: grid.text_at(INFO_CELL),
        periods,
        ..GraphResult::default()
    };

    let mut current_strategy: Option<StrategyEntry> = None;
    for row in DATA_START_ROW..grid.height() {
        let Some(label) = grid.text(row, LABEL_COLUMN) else {
            break;
        };

        if let Some(id) = strategies.id_for_name(&label) {
            let entry = StrategyEntry {
                id: id.to_string(),
                name: label,
            };
            current_strategy = Some(entry.clone());
            result.strategies.push(entry);
            continue;
        }

        let id = measurement_id(&label, current_strategy.as_ref(), strategies, measurements);
        if id.is_none() {
            debug!(row = row + 1, label = %label, "measurement row not found in catalog");
        }
        result.measurements.push(MeasurementSeries {
            id,
            values: row_values(grid, row, start_col),
            name: label,
            strategy_id: current_strategy.as_ref().map(|entry| entry.id.clone()),
        });
    }

    debug!(
        periods = result.periods.len(),
        strategies = result.strategies.len(),
        measurements = result.measurements.len(),
        "decoded generated report"
    );
    Ok(result)
}

/// First populated column of the period row and the contiguous labels from there.
fn read_periods(grid: &CellGrid) -> Result<(u32, Vec<String>)> {
    let start = (0..grid.width())
        .find(|&col| grid.get(PERIOD_ROW, col).is_some())
        .ok_or_else(|| {
            GmaError::decode(format!("no period labels in row {} of the report", PERIOD_ROW + 1))
        })?;

    let periods = (start..grid.width())
        .map_while(|col| grid.text(PERIOD_ROW, col))
        .collect();
    Ok((start, periods))
}

/// Cells from `start_col` through the row's last populated column.
fn row_values(grid: &CellGrid, row: u32, start_col: u32) -> Vec<CellValue> {
    let Some(last) = (start_col..grid.width())
        .rev()
        .find(|&col| grid.get(row, col).is_some())
    else {
        return Vec::new();
    };

    (start_col..=last)
        .map(|col| grid.get(row, col).cloned().unwrap_or(CellValue::Blank))
        .collect()
}

/// Looks up `"<label> - <strategy>"`: the current section's strategy first,
/// then every strategy in the catalog, where the last hit wins.
fn measurement_id(
    label: &str,
    current: Option<&StrategyEntry>,
    strategies: &Catalog,
    measurements: &Catalog,
) -> Option<String> {
    let lookup = |strategy: &str| measurements.id_for_name(&format!("{label} - {strategy}"));

    current
        .and_then(|strategy| lookup(&strategy.name))
        .or_else(|| {
            strategies
                .entries()
                .iter()
                .filter_map(|strategy| lookup(&strategy.name))
                .last()
        })
        .map(str::to_string)
}
