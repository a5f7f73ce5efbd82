//! # Source Processor Contract
//!
//! Every source is summarised by one `SourceProcessor`. Processors are
//! stateless: they get the typed records of one fetch plus a `ProcessContext`
//! (the clock and display zone) and return the JSON summary that lands in the
//! cache.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::analytics::{last_activity_message, local_date, time_ago};
use crate::tabular::{RawTable, TypedRecord};

/// Why a processor rejected a table.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// The header lacks a column the processor depends on.
    #[error("missing required column '{0}'")]
    MissingColumn(String),

    /// A column exists but none of its values could be interpreted.
    #[error("invalid value in column '{column}' at row {row}: {message}")]
    InvalidValue {
        column: String,
        row: usize,
        message: String,
    },

    /// Records are structurally different from what the processor expects.
    #[error("unexpected data shape: {0}")]
    Shape(String),

    /// The summary could not be encoded as JSON.
    #[error("failed to encode summary: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Inputs shared by every processor call besides the records.
#[derive(Debug, Clone)]
pub struct ProcessContext {
    /// The instant "today" and relative times are computed against.
    pub now: DateTime<Utc>,
    /// Zone used for hours, days and captions.
    pub tz: Tz,
}

impl ProcessContext {
    pub fn new(now: DateTime<Utc>, tz: Tz) -> Self {
        Self { now, tz }
    }

    /// Context for the current instant.
    pub fn current(tz: Tz) -> Self {
        Self::new(Utc::now(), tz)
    }

    /// Local calendar date of `now`.
    pub fn today(&self) -> NaiveDate {
        local_date(&self.now, &self.tz)
    }

    /// `"5th of January (3 days ago)"` for an instant.
    pub fn activity_message(&self, at: &DateTime<Utc>) -> String {
        last_activity_message(at, &self.now, &self.tz)
    }

    /// Relative description of a local calendar date.
    pub fn ago(&self, date: NaiveDate) -> String {
        time_ago(date, self.today())
    }
}

/// One summariser per data source.
pub trait SourceProcessor: Send + Sync {
    /// Registry name, e.g. `chess`.
    fn kind(&self) -> &'static str;

    /// Columns that must be present in the header.
    fn required_columns(&self) -> &'static [&'static str];

    /// Summarises the records of one fetch.
    fn process(&self, records: &[TypedRecord], ctx: &ProcessContext) -> Result<Value, ProcessorError>;

    /// Checks the table header against [`SourceProcessor::required_columns`].
    fn validate_header(&self, table: &RawTable) -> Result<(), ProcessorError> {
        match self.required_columns().iter().find(|c| !table.has_column(c)) {
            Some(missing) => Err(ProcessorError::MissingColumn(missing.to_string())),
            None => Ok(()),
        }
    }
}

/// A chart series: parallel `labels` and `data`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Series<L: Serialize, D: Serialize> {
    pub labels: Vec<L>,
    pub data: Vec<D>,
}

/// ISO-8601 with millisecond precision, the way browsers print dates.
pub fn iso(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Pairs every record with its timestamp and sorts chronologically.
///
/// Records whose timestamp can't be read are dropped. If records exist but
/// none of them has a readable timestamp the column is reported invalid.
pub fn chronological<'a>(
    records: &'a [TypedRecord],
    column: &str,
    read: impl Fn(&TypedRecord) -> Option<DateTime<Utc>>,
) -> Result<Vec<(DateTime<Utc>, &'a TypedRecord)>, ProcessorError> {
    let mut out: Vec<_> = records
        .iter()
        .filter_map(|r| read(r).map(|ts| (ts, r)))
        .collect();

    if out.is_empty() && !records.is_empty() {
        return Err(ProcessorError::InvalidValue {
            column: column.to_string(),
            row: 0,
            message: format!(
                "no readable timestamp in {} row(s), first value {:?}",
                records.len(),
                records[0].display(column).unwrap_or_default()
            ),
        });
    }
    if out.len() < records.len() {
        tracing::debug!(
            column,
            skipped = records.len() - out.len(),
            "Dropping rows without a readable timestamp"
        );
    }

    out.sort_by_key(|(ts, _)| *ts);
    Ok(out)
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::analytics::from_epoch_seconds;

    struct Dummy;

    impl SourceProcessor for Dummy {
        fn kind(&self) -> &'static str {
            "dummy"
        }
        fn required_columns(&self) -> &'static [&'static str] {
            &["a", "b"]
        }
        fn process(&self, records: &[TypedRecord], _: &ProcessContext) -> Result<Value, ProcessorError> {
            Ok(Value::from(records.len()))
        }
    }

    #[test]
    fn header_validation_names_missing_column() {
        let table = RawTable::from_grid(vec![vec!["a".into(), "c".into()]]);
        match Dummy.validate_header(&table) {
            Err(ProcessorError::MissingColumn(col)) => assert_eq!(col, "b"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn chronological_sorts_and_drops_unreadable() {
        let recs = records(&[&["t"], &["300"], &["x"], &["100"]]);
        let sorted = chronological(&recs, "t", |r| r.number("t").and_then(from_epoch_seconds)).unwrap();
        let secs: Vec<i64> = sorted.iter().map(|(ts, _)| ts.timestamp()).collect();
        assert_eq!(secs, vec![100, 300]);
    }

    #[test]
    fn chronological_rejects_fully_unreadable_column() {
        let recs = records(&[&["t"], &["nope"], &["never"]]);
        let err = chronological(&recs, "t", |r| r.number("t").and_then(from_epoch_seconds)).unwrap_err();
        assert!(matches!(err, ProcessorError::InvalidValue { ref column, .. } if column == "t"));
    }

    #[test]
    fn context_dates_are_local() {
        let c = ctx();
        assert_eq!(c.today(), NaiveDate::from_ymd_opt(2024, 3, 15).unwrap());
        assert_eq!(c.ago(NaiveDate::from_ymd_opt(2024, 3, 13).unwrap()), "2 days ago");
    }
}
