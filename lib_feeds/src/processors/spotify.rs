//! Daily listening minutes: recent fortnight, monthly totals, weekday means.

use chrono::Months;
use serde::Serialize;
use serde_json::Value;

use super::processor::{chronological, ProcessContext, ProcessorError, Series, SourceProcessor};
use crate::analytics::{
    calendar_buckets, parse_flexible, round_half_up, weekday_buckets, Aggregate, CalendarGranularity,
};
use crate::tabular::TypedRecord;

const DATE: &str = "Date";
const VALUE: &str = "Value";

const RECENT_DAYS: usize = 14;
const HISTORY_MONTHS: u32 = 36;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpotifySummary {
    last_two_weeks: Series<String, f64>,
    all_weeks: Series<String, f64>,
    by_day: Series<String, f64>,
    date_of_last_test_message: Option<String>,
    date_of_last_test: Option<i64>,
}

pub struct SpotifyProcessor;

impl SourceProcessor for SpotifyProcessor {
    fn kind(&self) -> &'static str {
        "spotify"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[DATE, VALUE]
    }

    fn process(&self, records: &[TypedRecord], ctx: &ProcessContext) -> Result<Value, ProcessorError> {
        let days = chronological(records, DATE, |r| r.display(DATE).and_then(|d| parse_flexible(&d)))?;
        let samples: Vec<_> = days.iter().map(|(ts, r)| (*ts, r.number_or_zero(VALUE))).collect();

        let recent = &samples[samples.len().saturating_sub(RECENT_DAYS)..];
        let last_two_weeks = Series {
            labels: recent
                .iter()
                .map(|(ts, _)| ts.with_timezone(&ctx.tz).format("%b %-d").to_string())
                .collect(),
            data: recent.iter().map(|(_, v)| *v).collect(),
        };

        let cutoff = ctx.now.checked_sub_months(Months::new(HISTORY_MONTHS)).unwrap_or(ctx.now);
        let history: Vec<_> = samples.iter().copied().filter(|(ts, _)| *ts >= cutoff).collect();
        let months = calendar_buckets(&history, &ctx.tz, CalendarGranularity::MonthYear, Aggregate::Sum);
        let all_weeks = Series {
            labels: months.iter().map(|b| b.label.clone()).collect(),
            data: months.iter().map(|b| b.value).collect(),
        };

        let weekdays = weekday_buckets(&samples, &ctx.tz, Aggregate::Mean);
        let by_day = Series {
            labels: weekdays.iter().map(|b| b.label.clone()).collect(),
            data: weekdays.iter().map(|b| round_half_up(b.value)).collect(),
        };

        let last = samples.last().map(|(ts, _)| *ts);
        let summary = SpotifySummary {
            last_two_weeks,
            all_weeks,
            by_day,
            date_of_last_test_message: last.as_ref().map(|ts| ctx.activity_message(ts)),
            date_of_last_test: last.map(|ts| ts.timestamp_millis()),
        };
        Ok(serde_json::to_value(summary)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::processor::test_support::*;
    use serde_json::json;

    #[test]
    fn recent_monthly_and_weekday_views() {
        let mut grid: Vec<Vec<String>> = vec![vec!["Date".into(), "Value".into()]];
        // 1 Feb .. 14 Mar 2024, 10 minutes a day, plus one very old row.
        let mut day = chrono::NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        while day <= chrono::NaiveDate::from_ymd_opt(2024, 3, 14).unwrap() {
            grid.push(vec![day.format("%Y-%m-%d").to_string(), "10".into()]);
            day = day.succ_opt().unwrap();
        }
        grid.push(vec!["2019-06-01".into(), "999".into()]);
        let rows: Vec<Vec<&str>> = grid.iter().map(|r| r.iter().map(String::as_str).collect()).collect();
        let refs: Vec<&[&str]> = rows.iter().map(Vec::as_slice).collect();

        let out = SpotifyProcessor.process(&records(&refs), &ctx()).unwrap();

        assert_eq!(out["lastTwoWeeks"]["labels"].as_array().unwrap().len(), 14);
        assert_eq!(out["lastTwoWeeks"]["labels"][0], json!("Mar 1"));
        assert_eq!(out["lastTwoWeeks"]["labels"][13], json!("Mar 14"));
        assert_eq!(out["allWeeks"]["labels"], json!(["Feb 2024", "Mar 2024"]));
        assert_eq!(out["allWeeks"]["data"], json!([290.0, 140.0]));
        assert_eq!(out["byDay"]["labels"][0], json!("Mon"));
        assert_eq!(out["dateOfLastTestMessage"], json!("14th of March (yesterday)"));
    }

    #[test]
    fn weekday_means_include_old_rows() {
        // 2019-06-03 was a Monday.
        let recs = records(&[&["Date", "Value"], &["2019-06-03", "30"], &["2024-03-11", "10"]]);
        let out = SpotifyProcessor.process(&recs, &ctx()).unwrap();
        assert_eq!(out["byDay"], json!({"labels": ["Mon"], "data": [20.0]}));
        assert_eq!(out["allWeeks"]["labels"], json!(["Mar 2024"]));
    }

    #[test]
    fn header_only_degrades_to_empty_series() {
        let out = SpotifyProcessor.process(&records(&[&["Date", "Value"]]), &ctx()).unwrap();
        assert_eq!(out["lastTwoWeeks"]["data"], json!([]));
        assert_eq!(out["dateOfLastTest"], Value::Null);
    }
}
