//! One-minute Dobble score tests.

use serde::Serialize;
use serde_json::Value;

use super::processor::{chronological, ProcessContext, ProcessorError, SourceProcessor};
use crate::analytics::{
    calendar_buckets, from_epoch_seconds, hour_of_day, hours_message, least_squares, max_by_key,
    point_radii, round_to, signed_fixed, Aggregate, CalendarGranularity,
};
use crate::tabular::TypedRecord;

const UNIX: &str = "unix";
const SCORE: &str = "score";
const TEST_TIME: &str = "testTime";

/// Nominal length of one test, used to turn the score trend into a rate.
const SECONDS_PER_TEST: f64 = 60.0;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DobbleSummary {
    labels: Vec<String>,
    data: Vec<f64>,
    tim_of_day_labels: Vec<u32>,
    tim_of_day_data: Vec<f64>,
    point_radius_array: Vec<u8>,
    time_message: String,
    max_score: Option<f64>,
    num_tests: usize,
    date_of_last_test_message: Option<String>,
    last_timestamp: Option<i64>,
    score_change_per_min: Option<String>,
}

pub struct DobbleProcessor;

impl SourceProcessor for DobbleProcessor {
    fn kind(&self) -> &'static str {
        "dobble"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[UNIX, SCORE, TEST_TIME]
    }

    fn process(&self, records: &[TypedRecord], ctx: &ProcessContext) -> Result<Value, ProcessorError> {
        let tests = chronological(records, UNIX, |r| r.number(UNIX).and_then(from_epoch_seconds))?;
        let scores: Vec<_> = tests.iter().map(|(ts, r)| (*ts, r.number_or_zero(SCORE))).collect();

        let months = calendar_buckets(&scores, &ctx.tz, CalendarGranularity::MonthYearShort, Aggregate::Mean);
        let tim_of_day_data: Vec<f64> = hour_of_day(&scores, &ctx.tz, Aggregate::Mean)
            .iter()
            .map(|b| round_to(b.value_or(0.0), 1))
            .collect();

        let score_values: Vec<f64> = scores.iter().map(|(_, s)| *s).collect();
        let elapsed = tests.len() as f64 * SECONDS_PER_TEST;
        let score_change_per_min =
            least_squares(&score_values).map(|trend| signed_fixed(trend.change() * (3600.0 / elapsed), 2));

        let total_time: f64 = tests.iter().map(|(_, r)| r.number_or_zero(TEST_TIME)).sum();
        let last = tests.last().map(|(ts, _)| *ts);

        let summary = DobbleSummary {
            labels: months.iter().map(|b| b.label.clone()).collect(),
            data: months.iter().map(|b| round_to(b.value, 1)).collect(),
            tim_of_day_labels: (0..24).collect(),
            point_radius_array: point_radii(&tim_of_day_data),
            tim_of_day_data,
            time_message: hours_message(total_time),
            max_score: max_by_key(&score_values, |s| Some(*s)).copied(),
            num_tests: tests.len(),
            date_of_last_test_message: last.as_ref().map(|ts| ctx.activity_message(ts)),
            last_timestamp: last.map(|ts| ts.timestamp_millis()),
            score_change_per_min,
        };
        Ok(serde_json::to_value(summary)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::processor::test_support::*;
    use serde_json::json;

    const HEADER: &[&str] = &["unix", "score", "testTime"];

    #[test]
    fn monthly_hourly_and_trend() {
        let a = epoch(2024, 2, 20, 8);
        let b = epoch(2024, 3, 1, 8);
        let c = epoch(2024, 3, 14, 18);
        let recs = records(&[
            HEADER,
            &[c.as_str(), "40", "1800"],
            &[a.as_str(), "30", "1800"],
            &[b.as_str(), "35", "3600"],
        ]);
        let out = DobbleProcessor.process(&recs, &ctx()).unwrap();

        assert_eq!(out["labels"], json!(["Feb 24", "Mar 24"]));
        assert_eq!(out["data"], json!([30.0, 37.5]));
        assert_eq!(out["timOfDayData"][8], json!(32.5));
        assert_eq!(out["timOfDayData"][18], json!(40.0));
        assert_eq!(out["pointRadiusArray"][0], json!(0));
        assert_eq!(out["pointRadiusArray"][8], json!(3));
        assert_eq!(out["maxScore"], json!(40.0));
        assert_eq!(out["numTests"], json!(3));
        assert_eq!(out["timeMessage"], json!("2 hours"));
        // +10 over three one-minute tests.
        assert_eq!(out["scoreChangePerMin"], json!("+200"));
        assert_eq!(out["dateOfLastTestMessage"], json!("14th of March (yesterday)"));
    }

    #[test]
    fn header_only_degrades_to_nulls() {
        let out = DobbleProcessor.process(&records(&[HEADER]), &ctx()).unwrap();
        assert_eq!(out["numTests"], json!(0));
        assert_eq!(out["maxScore"], Value::Null);
        assert_eq!(out["scoreChangePerMin"], Value::Null);
        assert_eq!(out["timOfDayData"].as_array().unwrap().len(), 24);
    }
}
