//! Rectangular tables handed to the engine by its collaborators.
//!
//! Cells are plain JSON values: the HTTP API passes them through untouched and
//! the CSV loader produces strings (or nulls for empty cells). Column names are
//! whitespace-trimmed on construction so role lookups match spreadsheet headers
//! with stray padding.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeSet;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(from = "RawTable")]
pub struct Table {
    columns: Vec<String>,
    #[schema(value_type = Vec<Vec<Object>>)]
    rows: Vec<Vec<JsonValue>>,
}

#[derive(Deserialize)]
struct RawTable {
    columns: Vec<String>,
    #[serde(default)]
    rows: Vec<Vec<JsonValue>>,
}

impl From<RawTable> for Table {
    fn from(raw: RawTable) -> Self {
        Table::new(raw.columns, raw.rows)
    }
}

/// Pads or cuts every row to `width`; also returns how many rows lost cells.
fn fit_rows(rows: Vec<Vec<JsonValue>>, width: usize) -> (Vec<Vec<JsonValue>>, usize) {
    let mut truncated = 0;
    let rows = rows
        .into_iter()
        .map(|mut row| {
            if row.len() > width {
                truncated += 1;
            }
            row.resize(width, JsonValue::Null);
            row
        })
        .collect();
    (rows, truncated)
}

impl Table {
    /// Builds a table, trimming column names and padding or truncating rows to
    /// the column count so every row is addressable by column index.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<JsonValue>>) -> Self {
        let columns: Vec<String> = columns
            .into_iter()
            .map(|name| name.trim().to_string())
            .collect();
        let (rows, truncated) = fit_rows(rows, columns.len());
        if truncated > 0 {
            tracing::warn!(
                rows = truncated,
                columns = columns.len(),
                "rows wider than the header were truncated"
            );
        }
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<JsonValue>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of the first column whose trimmed name equals `name`.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.columns.iter().position(|column| column == name)
    }

    pub fn cell(&self, row: usize, column: usize) -> &JsonValue {
        self.rows
            .get(row)
            .and_then(|cells| cells.get(column))
            .unwrap_or(&JsonValue::Null)
    }

    /// Keeps the rows for which `keep` returns true, preserving order.
    pub fn retain_rows(&self, mut keep: impl FnMut(&[JsonValue]) -> bool) -> Table {
        Table {
            columns: self.columns.clone(),
            rows: self
                .rows
                .iter()
                .filter(|row| keep(row))
                .cloned()
                .collect(),
        }
    }

    /// Sorted distinct non-empty text values of one column.
    pub fn distinct_values(&self, column: usize) -> Vec<String> {
        let values: BTreeSet<String> = self
            .rows
            .iter()
            .filter_map(|row| row.get(column).and_then(cell_text))
            .collect();
        values.into_iter().collect()
    }
}

/// Text form of a cell, trimmed; `None` for nulls and blank strings.
///
/// Numbers render without a trailing `.0` when integral so numeric subject
/// identifiers read back as `101` rather than `101.0`.
pub fn cell_text(cell: &JsonValue) -> Option<String> {
    let text = match cell {
        JsonValue::Null => return None,
        JsonValue::String(value) => value.trim().to_string(),
        JsonValue::Bool(value) => value.to_string(),
        JsonValue::Number(number) => match (number.as_i64(), number.as_f64()) {
            (Some(int), _) => int.to_string(),
            (None, Some(float)) if float.fract() == 0.0 && float.abs() < 1e15 => {
                format!("{}", float as i64)
            }
            _ => number.to_string(),
        },
        other => other.to_string(),
    };
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Numeric coercion of a cell: numbers pass through, strings are parsed.
///
/// Returns `None` for anything that is not a finite number.
pub fn cell_number(cell: &JsonValue) -> Option<f64> {
    let value = match cell {
        JsonValue::Number(number) => number.as_f64()?,
        JsonValue::String(text) => text.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

/// Reads a CSV export with a header row. Empty cells become nulls.
pub fn read_csv_table(path: &Path) -> Result<Table> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::None)
        .from_path(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    let columns: Vec<String> = reader
        .headers()
        .with_context(|| format!("failed to read header row of {}", path.display()))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record
            .with_context(|| format!("failed to read row {} of {}", idx + 1, path.display()))?;
        let row = record
            .iter()
            .map(|value| {
                if value.trim().is_empty() {
                    JsonValue::Null
                } else {
                    JsonValue::String(value.to_string())
                }
            })
            .collect();
        rows.push(row);
    }

    tracing::debug!(path = %path.display(), rows = rows.len(), columns = columns.len(), "loaded csv table");
    Ok(Table::new(columns, rows))
}
