//! Language lessons: totals, current streak and session length history.

use serde::Serialize;
use serde_json::Value;

use super::processor::{chronological, iso, ProcessContext, ProcessorError, SourceProcessor};
use crate::analytics::{from_epoch_seconds, hours_message, round_half_up, trailing_streak};
use crate::tabular::TypedRecord;

const DATE: &str = "date";
const XP: &str = "gainedXp";
const LESSONS: &str = "numLessons";
const SESSION: &str = "totalSessionTime";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionGraph {
    labels: Vec<String>,
    graph_data: Vec<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DuolingoSummary {
    duo_total: String,
    duo_lessons: f64,
    duo_streak: String,
    time_since_last_duo: Option<String>,
    graph_data: SessionGraph,
    last_lesson_date: Option<i64>,
}

pub struct DuolingoProcessor;

impl SourceProcessor for DuolingoProcessor {
    fn kind(&self) -> &'static str {
        "duolingo"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[DATE, XP, LESSONS, SESSION]
    }

    fn process(&self, records: &[TypedRecord], ctx: &ProcessContext) -> Result<Value, ProcessorError> {
        let days = chronological(records, DATE, |r| r.number(DATE).and_then(from_epoch_seconds))?;

        let total_session: f64 = days.iter().map(|(_, r)| r.number_or_zero(SESSION)).sum();
        let lessons: f64 = days.iter().map(|(_, r)| r.number_or_zero(LESSONS)).sum();
        let streak = trailing_streak(&days, |(_, r)| r.number_or_zero(LESSONS) > 0.0);

        let last = days.last().map(|(ts, _)| *ts);
        let summary = DuolingoSummary {
            duo_total: hours_message(total_session),
            duo_lessons: lessons,
            duo_streak: format!("{} days", streak),
            time_since_last_duo: last.as_ref().map(|ts| ctx.activity_message(ts)),
            graph_data: SessionGraph {
                labels: days.iter().map(|(ts, _)| iso(ts)).collect(),
                graph_data: days
                    .iter()
                    .map(|(_, r)| round_half_up(r.number_or_zero(SESSION) / 60.0).max(1.0))
                    .collect(),
            },
            last_lesson_date: last.map(|ts| ts.timestamp_millis()),
        };
        Ok(serde_json::to_value(summary)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::processor::test_support::*;
    use serde_json::json;

    const HEADER: &[&str] = &["date", "gainedXp", "numLessons", "totalSessionTime"];

    #[test]
    fn streak_counts_back_from_latest_day() {
        let d = |day| epoch(2024, 3, day, 8);
        let (d10, d11, d12, d13) = (d(10), d(11), d(12), d(13));
        let recs = records(&[
            HEADER,
            &[d13.as_str(), "30", "2", "900"],
            &[d10.as_str(), "20", "1", "600"],
            &[d11.as_str(), "", "", ""],
            &[d12.as_str(), "10", "1", "20"],
        ]);
        let out = DuolingoProcessor.process(&recs, &ctx()).unwrap();
        assert_eq!(out["duoStreak"], json!("2 days"));
        assert_eq!(out["duoLessons"], json!(4.0));
        assert_eq!(out["duoTotal"], json!("0 hours"));
        assert_eq!(out["graphData"]["graphData"], json!([10.0, 1.0, 1.0, 15.0]));
        assert_eq!(out["timeSinceLastDuo"], json!("13th of March (2 days ago)"));
    }

    #[test]
    fn header_only_degrades_to_zeroes() {
        let out = DuolingoProcessor.process(&records(&[HEADER]), &ctx()).unwrap();
        assert_eq!(out["duoStreak"], json!("0 days"));
        assert_eq!(out["lastLessonDate"], Value::Null);
    }
}
