//! # Analytics Module
//!
//! Small, pure building blocks shared by every source processor. Nothing in
//! here knows about spreadsheets or the cache; inputs are plain numbers,
//! timestamps and closures.
//!
//! ## Contained Modules:
//!
//! - **`trend`**: Least-squares line over a 1-based index, used for every
//!   "change per hour/minute" metric.
//! - **`buckets`**: Hour-of-day (always 24 entries), calendar and weekday
//!   grouping with a pluggable aggregate.
//! - **`streak`**: Trailing run length of a predicate.
//! - **`extrema`**: Max/min by a numeric key with an explicit empty guard.
//! - **`timefmt`**: Relative time ("3 days ago"), ordinal dates ("5th of
//!   January") and sheet date parsing.
//! - **`numeric`**: Mean, rounding, signed rate strings, "N hours" and grouped
//!   decimal formatting.

/// Least-squares trend line.
pub mod trend;
/// Hour, calendar and weekday bucketing.
pub mod buckets;
/// Trailing streak detection.
pub mod streak;
/// Max/min selection.
pub mod extrema;
/// Date parsing and human readable time formatting.
pub mod timefmt;
/// Numeric helpers.
pub mod numeric;

pub use buckets::{
    calendar_buckets, hour_of_day, point_radii, weekday_buckets, Aggregate, CalendarBucket,
    CalendarGranularity, HourBucket, WeekdayBucket,
};
pub use extrema::{max_by_key, min_by_key};
pub use numeric::{
    group_decimal, hours_message, mean, plain_number, round_half_up, round_to, signed_fixed,
};
pub use streak::trailing_streak;
pub use timefmt::{
    format_ordinal_date, from_epoch_millis, from_epoch_seconds, last_activity_message, local_at,
    local_date, local_midnight, parse_dmy, parse_flexible, time_ago,
};
pub use trend::{least_squares, TrendLine};
