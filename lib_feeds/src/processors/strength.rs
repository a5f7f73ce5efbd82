//! Bodyweight strength logs (pull-ups, push-ups).
//!
//! A row is a test day when both `MaxTest` and `Total` are filled in, and a
//! training day when only `Total` is.

use serde::Serialize;
use serde_json::Value;

use super::processor::{iso, ProcessContext, ProcessorError, Series, SourceProcessor};
use crate::analytics::{max_by_key, parse_dmy};
use crate::tabular::TypedRecord;

const DATE: &str = "Date";
const MAX_TEST: &str = "MaxTest";
const TOTAL: &str = "Total";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StrengthSummary {
    graph_data: Series<String, Option<f64>>,
    num_training: usize,
    num_tests: usize,
    date_of_last_training: Option<i64>,
}

/// One exercise. `max_field` names the summary key holding the best test.
pub struct StrengthProcessor {
    kind: &'static str,
    max_field: &'static str,
}

impl StrengthProcessor {
    pub fn pullups() -> Self {
        Self {
            kind: "pullups",
            max_field: "maxPullups",
        }
    }

    pub fn pushups() -> Self {
        Self {
            kind: "pushups",
            max_field: "maxPushups",
        }
    }
}

impl SourceProcessor for StrengthProcessor {
    fn kind(&self) -> &'static str {
        self.kind
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[DATE, MAX_TEST, TOTAL]
    }

    fn process(&self, records: &[TypedRecord], _ctx: &ProcessContext) -> Result<Value, ProcessorError> {
        // Sheet dates are calendar days; they are labelled at UTC midnight.
        let mut days: Vec<_> = records
            .iter()
            .filter_map(|r| {
                let date = r.display(DATE).and_then(|d| parse_dmy(&d))?;
                Some((date.and_hms_opt(0, 0, 0)?.and_utc(), r))
            })
            .collect();
        days.sort_by_key(|(ts, _)| *ts);

        let training: Vec<_> = days
            .iter()
            .filter(|(_, r)| r.is_blank(MAX_TEST) && !r.is_blank(TOTAL))
            .collect();
        let tests: Vec<_> = days
            .iter()
            .filter(|(_, r)| !r.is_blank(MAX_TEST) && !r.is_blank(TOTAL))
            .collect();

        let best = max_by_key(&tests, |(_, r)| r.number(MAX_TEST))
            .and_then(|(_, r)| r.number(MAX_TEST))
            .unwrap_or(0.0);

        let summary = StrengthSummary {
            graph_data: Series {
                labels: tests.iter().map(|(ts, _)| iso(ts)).collect(),
                data: tests.iter().map(|(_, r)| r.number(MAX_TEST)).collect(),
            },
            num_training: training.len(),
            num_tests: tests.len(),
            date_of_last_training: days.last().map(|(ts, _)| ts.timestamp_millis()),
        };

        let mut out = match serde_json::to_value(summary)? {
            Value::Object(map) => map,
            other => {
                return Err(ProcessorError::Shape(format!("summary is not an object: {}", other)));
            }
        };
        out.insert(self.max_field.to_string(), Value::from(best));
        Ok(Value::Object(out))
    }
}
