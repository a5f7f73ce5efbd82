//! Typing speed tests (30 second runs).

use serde::Serialize;
use serde_json::Value;

use super::processor::{chronological, ProcessContext, ProcessorError, SourceProcessor};
use crate::analytics::{
    calendar_buckets, from_epoch_millis, hour_of_day, hours_message, least_squares, max_by_key, mean,
    plain_number, point_radii, round_half_up, round_to, signed_fixed, Aggregate, CalendarGranularity,
};
use crate::tabular::TypedRecord;

const TIMESTAMP: &str = "timestamp";
const WPM: &str = "wpm";
const ACC: &str = "acc";

const SECONDS_PER_TEST: f64 = 30.0;
/// Window for the recent averages and the trend.
const RECENT_TESTS: usize = 500;
const MS_PER_DAY: f64 = 86_400_000.0;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TypingSummary {
    labels: Vec<String>,
    data: Vec<f64>,
    tim_of_day_labels: Vec<u32>,
    tim_of_day_data: Vec<f64>,
    point_radius_array: Vec<u8>,
    #[serde(rename = "maxWPM")]
    max_wpm: Option<String>,
    #[serde(rename = "avgWPM")]
    avg_wpm: Option<String>,
    #[serde(rename = "avgACC")]
    avg_acc: Option<String>,
    date_of_last_test_message: Option<String>,
    date_of_last_test: Option<i64>,
    tests_per_day: Option<String>,
    #[serde(rename = "changeInWPMPerMin")]
    change_in_wpm_per_min: Option<String>,
    total_time_message: String,
}

pub struct TypingProcessor;

impl SourceProcessor for TypingProcessor {
    fn kind(&self) -> &'static str {
        "typing"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[TIMESTAMP, WPM, ACC]
    }

    fn process(&self, records: &[TypedRecord], ctx: &ProcessContext) -> Result<Value, ProcessorError> {
        let tests = chronological(records, TIMESTAMP, |r| r.number(TIMESTAMP).and_then(from_epoch_millis))?;
        let speeds: Vec<_> = tests.iter().map(|(ts, r)| (*ts, r.number_or_zero(WPM))).collect();

        let tim_of_day_data: Vec<f64> = hour_of_day(&speeds, &ctx.tz, Aggregate::Mean)
            .iter()
            .map(|b| round_to(b.value_or(0.0), 1))
            .collect();
        let months = calendar_buckets(&speeds, &ctx.tz, CalendarGranularity::MonthYear, Aggregate::Mean);

        let recent = &tests[tests.len().saturating_sub(RECENT_TESTS)..];
        let recent_wpm: Vec<f64> = recent.iter().map(|(_, r)| r.number_or_zero(WPM)).collect();
        let recent_acc: Vec<f64> = recent.iter().map(|(_, r)| r.number_or_zero(ACC)).collect();

        let elapsed = recent.len() as f64 * SECONDS_PER_TEST;
        let change_in_wpm_per_min = least_squares(&recent_wpm)
            .map(|trend| format!("{} wpm", signed_fixed(trend.change() * (3600.0 / elapsed), 2)));

        let tests_per_day = match (recent.first(), recent.last()) {
            (Some((first, _)), Some((last, _))) => {
                let days = (*last - *first).num_milliseconds() as f64 / MS_PER_DAY;
                (days > 0.0).then(|| format!("{:.1}", recent.len() as f64 / days))
            }
            _ => None,
        };

        let all_wpm: Vec<f64> = speeds.iter().map(|(_, w)| *w).collect();
        let last = recent.last().map(|(ts, _)| *ts);

        let summary = TypingSummary {
            labels: months.iter().map(|b| b.label.clone()).collect(),
            data: months.iter().map(|b| round_to(b.value, 1)).collect(),
            tim_of_day_labels: (0..24).collect(),
            point_radius_array: point_radii(&tim_of_day_data),
            tim_of_day_data,
            max_wpm: max_by_key(&all_wpm, |w| Some(*w)).map(|w| format!("{} wpm", plain_number(*w))),
            avg_wpm: mean(&recent_wpm).map(|w| format!("{:.2} wpm", w)),
            avg_acc: mean(&recent_acc).map(|a| format!("{} %", round_half_up(a) as i64)),
            date_of_last_test_message: last.as_ref().map(|ts| ctx.activity_message(ts)),
            date_of_last_test: last.map(|ts| ts.timestamp_millis()),
            tests_per_day,
            change_in_wpm_per_min,
            total_time_message: hours_message(tests.len() as f64 * SECONDS_PER_TEST),
        };
        Ok(serde_json::to_value(summary)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::processor::test_support::*;
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    const HEADER: &[&str] = &["timestamp", "wpm", "acc"];

    fn ms(y: i32, m: u32, d: u32, h: u32) -> String {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap().timestamp_millis().to_string()
    }

    #[test]
    fn averages_and_rates() {
        let (a, b, c) = (ms(2024, 1, 10, 9), ms(2024, 3, 12, 9), ms(2024, 3, 14, 21));
        let recs = records(&[
            HEADER,
            &[b.as_str(), "90", "96"],
            &[a.as_str(), "80", "94"],
            &[c.as_str(), "100", "97"],
        ]);
        let out = TypingProcessor.process(&recs, &ctx()).unwrap();

        assert_eq!(out["labels"], json!(["Jan 2024", "Mar 2024"]));
        assert_eq!(out["data"], json!([80.0, 95.0]));
        assert_eq!(out["timOfDayData"][9], json!(85.0));
        assert_eq!(out["timOfDayData"][21], json!(100.0));
        assert_eq!(out["maxWPM"], json!("100 wpm"));
        assert_eq!(out["avgWPM"], json!("90.00 wpm"));
        assert_eq!(out["avgACC"], json!("96 %"));
        // +20 wpm over three 30 second tests.
        assert_eq!(out["changeInWPMPerMin"], json!("+800 wpm"));
        assert_eq!(out["totalTimeMessage"], json!("0 hours"));
        assert_eq!(out["dateOfLastTestMessage"], json!("14th of March (yesterday)"));
        assert!(out["testsPerDay"].is_string());
    }

    #[test]
    fn recent_window_is_capped() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let stamps: Vec<String> = (0..600)
            .map(|i| (start + Duration::hours(i)).timestamp_millis().to_string())
            .collect();
        let mut grid: Vec<Vec<&str>> = vec![HEADER.to_vec()];
        for (i, s) in stamps.iter().enumerate() {
            grid.push(vec![s.as_str(), if i < 100 { "10" } else { "50" }, "90"]);
        }
        let refs: Vec<&[&str]> = grid.iter().map(Vec::as_slice).collect();
        let out = TypingProcessor.process(&records(&refs), &ctx()).unwrap();

        assert_eq!(out["avgWPM"], json!("50.00 wpm"));
        assert_eq!(out["changeInWPMPerMin"], json!("+0 wpm"));
        // 500 tests over 499 hours.
        assert_eq!(out["testsPerDay"], json!("24.0"));
        assert_eq!(out["totalTimeMessage"], json!("5 hours"));
    }

    #[test]
    fn single_test_has_no_rate_per_day() {
        let t = ms(2024, 3, 14, 9);
        let out = TypingProcessor.process(&records(&[HEADER, &[t.as_str(), "70", "95"]]), &ctx()).unwrap();
        assert_eq!(out["testsPerDay"], Value::Null);
        assert_eq!(out["changeInWPMPerMin"], json!("+0 wpm"));
    }

    #[test]
    fn header_only_degrades_to_nulls() {
        let out = TypingProcessor.process(&records(&[HEADER]), &ctx()).unwrap();
        assert_eq!(out["maxWPM"], Value::Null);
        assert_eq!(out["avgWPM"], Value::Null);
        assert_eq!(out["totalTimeMessage"], json!("0 hours"));
    }
}
