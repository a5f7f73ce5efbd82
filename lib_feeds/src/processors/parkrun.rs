//! parkrun results: fastest time, best position and the events visited.

use serde::Serialize;
use serde_json::Value;

use super::processor::{ProcessContext, ProcessorError, SourceProcessor};
use crate::analytics::{max_by_key, min_by_key, parse_flexible};
use crate::tabular::TypedRecord;

const TIME: &str = "Time";
const POSITION: &str = "Overall Position";
const EVENT: &str = "Event";
const RUN_DATE: &str = "Run Date";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ParkrunSummary {
    fastest_time: Option<String>,
    best_position: Option<f64>,
    events: Vec<String>,
    run_count: usize,
    last_run_date: Option<i64>,
}

pub struct ParkrunProcessor;

impl SourceProcessor for ParkrunProcessor {
    fn kind(&self) -> &'static str {
        "parkrun"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[TIME, POSITION, EVENT, RUN_DATE]
    }

    fn process(&self, records: &[TypedRecord], _ctx: &ProcessContext) -> Result<Value, ProcessorError> {
        let fastest_time = min_by_key(records, |r| r.display(TIME).and_then(|t| clock_seconds(&t)))
            .and_then(|r| r.display(TIME));

        let best_position = min_by_key(records, |r| r.number(POSITION)).and_then(|r| r.number(POSITION));

        let mut events: Vec<String> = Vec::new();
        for event in records.iter().filter_map(|r| r.display(EVENT)) {
            if !event.is_empty() && !events.contains(&event) {
                events.push(event);
            }
        }

        let run_dates: Vec<i64> = records
            .iter()
            .filter_map(|r| r.display(RUN_DATE).and_then(|d| parse_flexible(&d)))
            .map(|ts| ts.timestamp_millis())
            .collect();
        let last_run_date = max_by_key(&run_dates, |ms| Some(*ms as f64)).copied();

        let summary = ParkrunSummary {
            fastest_time,
            best_position,
            events,
            run_count: records.len(),
            last_run_date,
        };
        Ok(serde_json::to_value(summary)?)
    }
}

/// `"mm:ss"` or `"h:mm:ss"` to seconds.
fn clock_seconds(raw: &str) -> Option<f64> {
    let mut total = 0.0;
    let mut parts = 0;
    for part in raw.trim().split(':') {
        let n: f64 = part.trim().parse().ok()?;
        total = total * 60.0 + n;
        parts += 1;
    }
    (parts >= 2).then_some(total)
}
