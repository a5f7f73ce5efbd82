//! 5 km runs: best-effort history plus 1 km split statistics.

use serde::Serialize;
use serde_json::Value;

use super::processor::{chronological, iso, ProcessContext, ProcessorError, Series, SourceProcessor};
use crate::analytics::{from_epoch_seconds, mean, min_by_key};
use crate::tabular::TypedRecord;

const EPOCH: &str = "StartDateEpoch";
const BEST_EFFORT: &str = "BestEffort";
const SPLITS: &str = "SplitsMetric";

/// Splits between these distances (metres) count as a kilometre split.
const SPLIT_MIN_DISTANCE: f64 = 900.0;
const SPLIT_MAX_DISTANCE: f64 = 1100.0;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FiveKSummary {
    graph_data: Series<String, Option<f64>>,
    number_of_runs: usize,
    fastest_run: Option<f64>,
    average_split: Option<f64>,
    fastest_split: Option<f64>,
    last_run: Option<i64>,
}

pub struct FiveKProcessor;

impl SourceProcessor for FiveKProcessor {
    fn kind(&self) -> &'static str {
        "five_k"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[EPOCH, BEST_EFFORT]
    }

    fn process(&self, records: &[TypedRecord], _ctx: &ProcessContext) -> Result<Value, ProcessorError> {
        let runs = chronological(records, EPOCH, |r| r.number(EPOCH).and_then(from_epoch_seconds))?;

        let mut split_times = Vec::new();
        for (_, run) in &runs {
            collect_kilometre_splits(run, &mut split_times);
        }

        let fastest_run = min_by_key(&runs, |(_, r)| r.number(BEST_EFFORT))
            .and_then(|(_, r)| r.number(BEST_EFFORT));

        let summary = FiveKSummary {
            graph_data: Series {
                labels: runs.iter().map(|(ts, _)| iso(ts)).collect(),
                data: runs.iter().map(|(_, r)| r.number(BEST_EFFORT)).collect(),
            },
            number_of_runs: runs.len(),
            fastest_run,
            average_split: mean(&split_times),
            fastest_split: split_times.iter().copied().reduce(f64::min),
            last_run: runs.last().map(|(ts, _)| ts.timestamp_millis()),
        };
        Ok(serde_json::to_value(summary)?)
    }
}

/// Appends the moving times of valid kilometre splits of one run.
///
/// A blank or unparsed cell is an empty list, and so is any value that is not
/// an array. Nested arrays are flattened one level.
fn collect_kilometre_splits(run: &TypedRecord, out: &mut Vec<f64>) {
    let splits = match run.structured(SPLITS) {
        Some(Value::Array(items)) => items,
        None | Some(Value::Null) => return,
        Some(other) => {
            tracing::debug!(value = %other, "{} is not an array; run has no splits", SPLITS);
            return;
        }
    };

    let flat = splits.iter().flat_map(|item| match item {
        Value::Array(inner) => inner.iter().collect::<Vec<_>>(),
        single => vec![single],
    });

    for split in flat {
        let moving_time = split.get("moving_time").and_then(Value::as_f64).unwrap_or(0.0);
        let distance = split.get("distance").and_then(Value::as_f64).unwrap_or(0.0);
        if moving_time > 0.0 && (SPLIT_MIN_DISTANCE..=SPLIT_MAX_DISTANCE).contains(&distance) {
            out.push(moving_time);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::processor::test_support::*;
    use serde_json::json;

    #[test]
    fn summarises_runs_and_splits() {
        let late = epoch(2024, 2, 10, 9);
        let early = epoch(2024, 1, 6, 9);
        let recs = records(&[
            &["StartDateEpoch", "BestEffort", "SplitsMetric"],
            &[
                late.as_str(),
                "1250",
                r#"[{"distance":1000,"moving_time":250},{"distance":1005,"moving_time":240},{"distance":400,"moving_time":90}]"#,
            ],
            &[early.as_str(), "1300", r#"[[{"distance":950,"moving_time":270}],{"distance":1000,"moving_time":0}]"#],
        ]);

        let out = FiveKProcessor.process(&recs, &ctx()).unwrap();
        assert_eq!(out["numberOfRuns"], json!(2));
        assert_eq!(out["fastestRun"], json!(1250.0));
        assert_eq!(out["graphData"]["data"], json!([1300.0, 1250.0]));
        assert_eq!(out["graphData"]["labels"][0], json!("2024-01-06T09:00:00.000Z"));
        assert_eq!(out["fastestSplit"], json!(240.0));
        assert_eq!(out["averageSplit"], json!((250.0 + 240.0 + 270.0) / 3.0));
        assert_eq!(out["lastRun"], json!(1_707_555_600_000i64));
    }

    #[test]
    fn blank_and_malformed_splits_are_empty() {
        let t = epoch(2024, 2, 10, 9);
        let recs = records(&[
            &["StartDateEpoch", "BestEffort", "SplitsMetric"],
            &[t.as_str(), "1250", ""],
            &[t.as_str(), "1260", "[{oops"],
        ]);
        let out = FiveKProcessor.process(&recs, &ctx()).unwrap();
        assert_eq!(out["averageSplit"], Value::Null);
        assert_eq!(out["fastestSplit"], Value::Null);
        assert_eq!(out["numberOfRuns"], json!(2));
    }

    #[test]
    fn non_array_splits_count_as_no_splits() {
        let early = epoch(2024, 1, 6, 9);
        let late = epoch(2024, 2, 10, 9);
        let later = epoch(2024, 3, 2, 9);
        let recs = records(&[
            &["StartDateEpoch", "BestEffort", "SplitsMetric"],
            &[early.as_str(), "1250", r#"[{"distance":1000,"moving_time":290}]"#],
            &[late.as_str(), "1260", "{}"],
            &[later.as_str(), "1270", "12"],
        ]);
        let out = FiveKProcessor.process(&recs, &ctx()).unwrap();
        assert_eq!(out["numberOfRuns"], json!(3));
        assert_eq!(out["averageSplit"], json!(290.0));
        assert_eq!(out["fastestSplit"], json!(290.0));
    }

    #[test]
    fn header_only_degrades_to_nulls() {
        let recs = records(&[&["StartDateEpoch", "BestEffort", "SplitsMetric"]]);
        let out = FiveKProcessor.process(&recs, &ctx()).unwrap();
        assert_eq!(out["numberOfRuns"], json!(0));
        assert_eq!(out["fastestRun"], Value::Null);
        assert_eq!(out["lastRun"], Value::Null);
    }
}
