//! # Bucketing
//!
//! Grouping of `(timestamp, value)` samples by local hour, calendar label or
//! weekday. Timestamps are UTC; grouping happens in the display time zone.

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

/// How a bucket's values are reduced to one number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Mean,
    Max,
    Min,
    Count,
}

impl Aggregate {
    /// Reduces `values`. Empty input yields `None`.
    pub fn apply(self, values: &[f64]) -> Option<f64> {
        if values.is_empty() {
            return None;
        }
        let v = match self {
            Aggregate::Sum => values.iter().sum(),
            Aggregate::Mean => values.iter().sum::<f64>() / values.len() as f64,
            Aggregate::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            Aggregate::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregate::Count => values.len() as f64,
        };
        Some(v)
    }
}

/// One hour of the day. `value` is `None` when no sample fell into it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HourBucket {
    pub hour: u32,
    pub value: Option<f64>,
}

impl HourBucket {
    /// The aggregate, or `placeholder` for an empty hour.
    pub fn value_or(&self, placeholder: f64) -> f64 {
        self.value.unwrap_or(placeholder)
    }
}

/// Groups samples by local hour. Always returns 24 buckets, hour 0 first.
pub fn hour_of_day(samples: &[(DateTime<Utc>, f64)], tz: &Tz, aggregate: Aggregate) -> Vec<HourBucket> {
    let mut grouped: [Vec<f64>; 24] = Default::default();
    for (ts, value) in samples {
        let hour = ts.with_timezone(tz).hour() as usize;
        grouped[hour].push(*value);
    }

    grouped
        .iter()
        .enumerate()
        .map(|(hour, values)| HourBucket {
            hour: hour as u32,
            value: aggregate.apply(values),
        })
        .collect()
}

/// Chart marker sizes: 3 where the value is non-zero, 0 elsewhere.
pub fn point_radii(values: &[f64]) -> Vec<u8> {
    values.iter().map(|v| if *v != 0.0 { 3 } else { 0 }).collect()
}

/// Label format used for calendar grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarGranularity {
    /// `05/01/2024`
    Day,
    /// `05/01/24`
    DayShort,
    /// `Jan 2024`
    MonthYear,
    /// `Jan 24`
    MonthYearShort,
}

impl CalendarGranularity {
    fn pattern(self) -> &'static str {
        match self {
            CalendarGranularity::Day => "%d/%m/%Y",
            CalendarGranularity::DayShort => "%d/%m/%y",
            CalendarGranularity::MonthYear => "%b %Y",
            CalendarGranularity::MonthYearShort => "%b %y",
        }
    }

    /// Label of `ts` in the given zone.
    pub fn label(self, ts: &DateTime<Utc>, tz: &Tz) -> String {
        ts.with_timezone(tz).format(self.pattern()).to_string()
    }
}

/// One calendar group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarBucket {
    pub label: String,
    /// Earliest timestamp seen in this group.
    pub first: DateTime<Utc>,
    pub value: f64,
    pub count: usize,
}

/// Groups samples by calendar label and orders the groups by their earliest
/// timestamp, so "Dec 2023" precedes "Jan 2024".
pub fn calendar_buckets(
    samples: &[(DateTime<Utc>, f64)],
    tz: &Tz,
    granularity: CalendarGranularity,
    aggregate: Aggregate,
) -> Vec<CalendarBucket> {
    let mut groups: HashMap<String, (DateTime<Utc>, Vec<f64>)> = HashMap::new();
    for (ts, value) in samples {
        let entry = groups
            .entry(granularity.label(ts, tz))
            .or_insert_with(|| (*ts, Vec::new()));
        if *ts < entry.0 {
            entry.0 = *ts;
        }
        entry.1.push(*value);
    }

    let mut buckets: Vec<CalendarBucket> = groups
        .into_iter()
        .filter_map(|(label, (first, values))| {
            aggregate.apply(&values).map(|value| CalendarBucket {
                label,
                first,
                value,
                count: values.len(),
            })
        })
        .collect();
    buckets.sort_by(|a, b| a.first.cmp(&b.first).then_with(|| a.label.cmp(&b.label)));
    buckets
}

/// One populated weekday.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeekdayBucket {
    /// Short English name, `Mon` .. `Sun`.
    pub label: String,
    pub value: f64,
}

/// Groups samples by local weekday; populated days only, Monday first.
pub fn weekday_buckets(samples: &[(DateTime<Utc>, f64)], tz: &Tz, aggregate: Aggregate) -> Vec<WeekdayBucket> {
    let mut grouped: [Vec<f64>; 7] = Default::default();
    for (ts, value) in samples {
        let day = ts.with_timezone(tz).weekday().num_days_from_monday() as usize;
        grouped[day].push(*value);
    }

    let mut day = Weekday::Mon;
    let mut out = Vec::new();
    for values in grouped.iter() {
        if let Some(value) = aggregate.apply(values) {
            out.push(WeekdayBucket {
                label: day.to_string(),
                value,
            });
        }
        day = day.succ();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono_tz::Europe::London;
    use chrono_tz::UTC;

    fn at(y: i32, m: u32, d: u32, h: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, 0, 0).unwrap()
    }

    #[test]
    fn aggregates() {
        let v = [1.0, 4.0, 2.0];
        assert_eq!(Aggregate::Sum.apply(&v), Some(7.0));
        assert_eq!(Aggregate::Max.apply(&v), Some(4.0));
        assert_eq!(Aggregate::Min.apply(&v), Some(1.0));
        assert_eq!(Aggregate::Count.apply(&v), Some(3.0));
        assert_eq!(Aggregate::Mean.apply(&[]), None);
    }

    #[test]
    fn hour_buckets_always_have_24_entries() {
        for samples in [vec![], vec![(at(2024, 1, 5, 9), 1.0)]] {
            let buckets = hour_of_day(&samples, &UTC, Aggregate::Mean);
            assert_eq!(buckets.len(), 24);
            assert!(buckets.iter().enumerate().all(|(i, b)| b.hour == i as u32));
        }
    }

    #[test]
    fn hour_buckets_use_local_time_and_fill_gaps() {
        // 09:00 UTC in July is 10:00 in London.
        let samples = vec![(at(2024, 7, 1, 9), 50.0), (at(2024, 7, 2, 9), 100.0)];
        let buckets = hour_of_day(&samples, &London, Aggregate::Mean);
        assert_eq!(buckets[10].value, Some(75.0));
        assert_eq!(buckets[9].value, None);
        assert_eq!(buckets[9].value_or(0.0), 0.0);
    }

    #[test]
    fn radii_mark_nonzero_points() {
        assert_eq!(point_radii(&[0.0, 12.5, 0.0, -3.0]), vec![0, 3, 0, 3]);
    }

    #[test]
    fn calendar_buckets_cross_year_boundary_in_order() {
        let samples = vec![
            (at(2024, 1, 3, 12), 4.0),
            (at(2023, 12, 30, 12), 2.0),
            (at(2024, 1, 20, 12), 6.0),
        ];
        let buckets = calendar_buckets(&samples, &UTC, CalendarGranularity::MonthYear, Aggregate::Mean);
        let labels: Vec<_> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["Dec 2023", "Jan 2024"]);
        assert_eq!(buckets[1].value, 5.0);
        assert_eq!(buckets[1].count, 2);
    }

    #[test]
    fn calendar_labels() {
        let ts = at(2024, 1, 5, 12);
        assert_eq!(CalendarGranularity::Day.label(&ts, &UTC), "05/01/2024");
        assert_eq!(CalendarGranularity::DayShort.label(&ts, &UTC), "05/01/24");
        assert_eq!(CalendarGranularity::MonthYearShort.label(&ts, &UTC), "Jan 24");
    }

    #[test]
    fn weekdays_are_monday_first_and_skip_empty_days() {
        let samples = vec![
            (at(2024, 1, 7, 12), 10.0), // Sunday
            (at(2024, 1, 1, 12), 2.0),  // Monday
            (at(2024, 1, 8, 12), 4.0),  // Monday
        ];
        let buckets = weekday_buckets(&samples, &UTC, Aggregate::Mean);
        assert_eq!(
            buckets,
            vec![
                WeekdayBucket { label: "Mon".into(), value: 3.0 },
                WeekdayBucket { label: "Sun".into(), value: 10.0 },
            ]
        );
    }
}
