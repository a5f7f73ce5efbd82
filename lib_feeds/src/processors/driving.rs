//! Driving log: totals and how long ago the last drive was.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use super::processor::{chronological, ProcessContext, ProcessorError, SourceProcessor};
use crate::analytics::{from_epoch_millis, group_decimal, hours_message, local_date};
use crate::tabular::TypedRecord;

const MILES: &str = "totalMiles";
const SECONDS: &str = "totalSeconds";
const START: &str = "startTimestamp";
const END: &str = "endTimestamp";

/// Date the driving licence was issued (2021-07-21).
pub const DEFAULT_LICENCE_EPOCH: i64 = 1_626_864_660;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DrivingSummary {
    time_spent_driving: String,
    miles_driven: String,
    time_since_last_drive: Option<String>,
    time_driving: String,
    date_of_last_drive: Option<i64>,
}

pub struct DrivingProcessor {
    licensed_since: DateTime<Utc>,
}

impl DrivingProcessor {
    pub fn new(licensed_since: DateTime<Utc>) -> Self {
        Self { licensed_since }
    }
}

impl Default for DrivingProcessor {
    fn default() -> Self {
        Self {
            licensed_since: DateTime::<Utc>::from_timestamp(DEFAULT_LICENCE_EPOCH, 0).unwrap_or_default(),
        }
    }
}

impl SourceProcessor for DrivingProcessor {
    fn kind(&self) -> &'static str {
        "driving"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[MILES, SECONDS, START, END]
    }

    fn process(&self, records: &[TypedRecord], ctx: &ProcessContext) -> Result<Value, ProcessorError> {
        let total_miles: f64 = records.iter().map(|r| r.number_or_zero(MILES)).sum();
        let total_seconds: f64 = records.iter().map(|r| r.number_or_zero(SECONDS)).sum();

        let drives = chronological(records, START, |r| r.number(START).and_then(from_epoch_millis))?;
        let last_end = drives
            .last()
            .and_then(|(_, r)| r.number(END))
            .and_then(from_epoch_millis);

        let licence_age = ctx.ago(local_date(&self.licensed_since, &ctx.tz));

        let summary = DrivingSummary {
            time_spent_driving: hours_message(total_seconds),
            miles_driven: format!("{} miles", group_decimal(total_miles, 2, 3)),
            time_since_last_drive: last_end.as_ref().map(|ts| ctx.activity_message(ts)),
            time_driving: licence_age.replace(" ago", ""),
            date_of_last_drive: last_end.map(|ts| ts.timestamp_millis()),
        };
        Ok(serde_json::to_value(summary)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processors::processor::test_support::*;
    use chrono::TimeZone;
    use serde_json::json;

    const HEADER: &[&str] = &["startTimestamp", "endTimestamp", "totalMiles", "totalSeconds"];

    #[test]
    fn totals_and_last_drive() {
        let recs = records(&[
            HEADER,
            &["1709290800000", "1709294400000", "1200.5", "3600"],
            &["1710158400000", "1710162000000", "34.25", "5400"],
            &["1709550000000", "1709553600000", "10", "1800"],
        ]);
        let out = DrivingProcessor::default().process(&recs, &ctx()).unwrap();
        assert_eq!(out["timeSpentDriving"], json!("3 hours"));
        assert_eq!(out["milesDriven"], json!("1,244.75 miles"));
        assert_eq!(out["dateOfLastDrive"], json!(1_710_162_000_000i64));
        assert_eq!(out["timeSinceLastDrive"], json!("11th of March (4 days ago)"));
        assert_eq!(out["timeDriving"], json!("3 years"));
    }

    #[test]
    fn licence_date_is_configurable() {
        let p = DrivingProcessor::new(Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
        let out = p.process(&records(&[HEADER]), &ctx()).unwrap();
        assert_eq!(out["timeDriving"], json!("2 weeks"));
    }

    #[test]
    fn header_only_degrades_to_zeroes() {
        let out = DrivingProcessor::default().process(&records(&[HEADER]), &ctx()).unwrap();
        assert_eq!(out["timeSpentDriving"], json!("0 hours"));
        assert_eq!(out["milesDriven"], json!("0.00 miles"));
        assert_eq!(out["timeSinceLastDrive"], Value::Null);
        assert_eq!(out["dateOfLastDrive"], Value::Null);
    }
}
