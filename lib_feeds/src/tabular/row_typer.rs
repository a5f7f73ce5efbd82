//! # Row Typer
//!
//! Turns a `RawTable` into `TypedRecord`s. Each cell is coerced on its own:
//!
//! 1. `TRUE` / `FALSE` (any case) become booleans.
//! 2. Outside the nested-metrics column, a non-empty cell that parses as a
//!    finite number becomes a number.
//! 3. The nested-metrics column is parsed as JSON when non-empty. A parse
//!    failure is logged and reported, and the cell keeps its raw text.
//!
//! Records carrying a non-zero epoch-seconds column also get a derived ISO-8601
//! timestamp field.

use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use super::raw_table::RawTable;

/// Default name of the column holding JSON-encoded split metrics.
pub const NESTED_METRICS_COLUMN: &str = "SplitsMetric";
/// Default name of the epoch-seconds column.
pub const EPOCH_COLUMN: &str = "StartDateEpoch";
/// Default name of the derived ISO timestamp field.
pub const DERIVED_TIMESTAMP_FIELD: &str = "jsDate";

/// A single coerced cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// `TRUE` / `FALSE` cells.
    Bool(bool),
    /// Cells that parsed as a finite number.
    Number(f64),
    /// Everything else, including empty cells.
    Text(String),
    /// Parsed JSON from the nested-metrics column.
    Structured(Value),
}

impl CellValue {
    /// The numeric value, if this cell is a number.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// The text, if this cell stayed a string.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The boolean, if this cell was `TRUE` / `FALSE`.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            CellValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// True for an empty text cell.
    pub fn is_blank(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.is_empty())
    }

    /// The cell rendered back to display text. Whole numbers print without a
    /// fractional part.
    pub fn display(&self) -> String {
        match self {
            CellValue::Bool(b) => if *b { "TRUE".to_string() } else { "FALSE".to_string() },
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => format!("{}", *n as i64),
            CellValue::Number(n) => n.to_string(),
            CellValue::Text(s) => s.clone(),
            CellValue::Structured(v) => v.to_string(),
        }
    }
}

/// One typed data row, keyed by header name.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct TypedRecord {
    fields: BTreeMap<String, CellValue>,
}

impl TypedRecord {
    /// Looks up a field by column name.
    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.fields.get(column)
    }

    /// Numeric value of a column, if present and numeric.
    pub fn number(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(CellValue::as_f64)
    }

    /// Numeric value of a column, treating anything else as zero.
    pub fn number_or_zero(&self, column: &str) -> f64 {
        self.number(column).unwrap_or(0.0)
    }

    /// Text value of a column, if present and still a string.
    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(CellValue::as_str)
    }

    /// Boolean value of a column, if present and boolean.
    pub fn boolean(&self, column: &str) -> Option<bool> {
        self.get(column).and_then(CellValue::as_bool)
    }

    /// True when the column is missing or holds an empty string.
    pub fn is_blank(&self, column: &str) -> bool {
        self.get(column).map_or(true, CellValue::is_blank)
    }

    /// Display text of a column regardless of its coerced type.
    pub fn display(&self, column: &str) -> Option<String> {
        self.get(column).map(CellValue::display)
    }

    /// Parsed JSON of a nested column, if parsing succeeded.
    pub fn structured(&self, column: &str) -> Option<&Value> {
        match self.get(column) {
            Some(CellValue::Structured(v)) => Some(v),
            _ => None,
        }
    }

    /// Number of fields, derived ones included.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True when the record has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Sets a field. Used by the typer and by test fixtures.
    pub fn insert(&mut self, column: impl Into<String>, value: CellValue) {
        self.fields.insert(column.into(), value);
    }
}

impl<K: Into<String>> FromIterator<(K, CellValue)> for TypedRecord {
    fn from_iter<I: IntoIterator<Item = (K, CellValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// A non-fatal problem found while typing one row.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("row {row}, column {column}: {message}")]
pub struct TypingIssue {
    /// Zero-based data row index (header excluded).
    pub row: usize,
    /// Column the problem was found in.
    pub column: String,
    /// Human readable cause.
    pub message: String,
}

/// Output of typing a whole table.
#[derive(Debug, Clone, Default)]
pub struct TypingReport {
    /// One record per data row, in table order.
    pub records: Vec<TypedRecord>,
    /// Per-row problems that did not stop processing.
    pub issues: Vec<TypingIssue>,
}

/// Converts raw rows to typed records.
#[derive(Debug, Clone)]
pub struct RowTyper {
    nested_column: String,
    epoch_column: String,
    derived_field: String,
}

impl Default for RowTyper {
    fn default() -> Self {
        Self {
            nested_column: NESTED_METRICS_COLUMN.to_string(),
            epoch_column: EPOCH_COLUMN.to_string(),
            derived_field: DERIVED_TIMESTAMP_FIELD.to_string(),
        }
    }
}

impl RowTyper {
    /// Creates a typer with custom column names.
    pub fn new(
        nested_column: impl Into<String>,
        epoch_column: impl Into<String>,
        derived_field: impl Into<String>,
    ) -> Self {
        Self {
            nested_column: nested_column.into(),
            epoch_column: epoch_column.into(),
            derived_field: derived_field.into(),
        }
    }

    /// Types every data row of `table`, keeping row order.
    pub fn type_table(&self, table: &RawTable) -> TypingReport {
        let mut report = TypingReport {
            records: Vec::with_capacity(table.len()),
            issues: Vec::new(),
        };

        for (row_idx, row) in table.rows().iter().enumerate() {
            let mut record = TypedRecord::default();

            for (header, raw) in table.headers().iter().zip(row.iter()) {
                let value = match self.coerce(header, raw) {
                    Ok(value) => value,
                    Err(message) => {
                        let issue = TypingIssue {
                            row: row_idx,
                            column: header.clone(),
                            message,
                        };
                        tracing::warn!(%issue, "Leaving nested metrics unparsed");
                        report.issues.push(issue);
                        CellValue::Text(raw.clone())
                    }
                };
                record.insert(header.clone(), value);
            }

            if let Some(iso) = self.derived_timestamp(&record) {
                record.insert(self.derived_field.clone(), CellValue::Text(iso));
            }

            report.records.push(record);
        }

        report
    }

    fn coerce(&self, header: &str, raw: &str) -> Result<CellValue, String> {
        if raw.eq_ignore_ascii_case("TRUE") {
            return Ok(CellValue::Bool(true));
        }
        if raw.eq_ignore_ascii_case("FALSE") {
            return Ok(CellValue::Bool(false));
        }

        if header == self.nested_column {
            if raw.is_empty() {
                return Ok(CellValue::Text(String::new()));
            }
            return serde_json::from_str::<Value>(raw)
                .map(CellValue::Structured)
                .map_err(|e| format!("invalid JSON: {}", e));
        }

        Ok(parse_number(raw)
            .map(CellValue::Number)
            .unwrap_or_else(|| CellValue::Text(raw.to_string())))
    }

    fn derived_timestamp(&self, record: &TypedRecord) -> Option<String> {
        let epoch = record.number(&self.epoch_column)?;
        if epoch == 0.0 {
            return None;
        }
        let millis = (epoch * 1000.0).round() as i64;
        DateTime::<Utc>::from_timestamp_millis(millis)
            .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}
