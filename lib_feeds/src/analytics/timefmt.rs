//! # Time Formatting
//!
//! Human readable dates for dashboard captions and lenient parsing of the
//! date shapes found in the sheets.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;

/// Local calendar date of `ts` in `tz`.
pub fn local_date(ts: &DateTime<Utc>, tz: &Tz) -> NaiveDate {
    ts.with_timezone(tz).date_naive()
}

/// Relative description of `then` seen from `today`, by calendar day.
///
/// 0 days is "today", 1 is "yesterday", 2 to 6 are "N days ago", then whole
/// weeks up to 4, calendar months up to 11 and whole years after that. Dates
/// after `today` are reported as "today".
pub fn time_ago(then: NaiveDate, today: NaiveDate) -> String {
    let days = (today - then).num_days();
    if days <= 0 {
        return "today".to_string();
    }
    if days == 1 {
        return "yesterday".to_string();
    }
    if days < 7 {
        return format!("{} days ago", days);
    }

    let weeks = days / 7;
    if weeks < 5 {
        return plural_ago(weeks, "week");
    }

    let months = (today.year() - then.year()) as i64 * 12 + today.month() as i64 - then.month() as i64;
    if (1..12).contains(&months) {
        return plural_ago(months, "month");
    }

    let years = (today.year() - then.year()) as i64;
    if years >= 1 {
        return plural_ago(years, "year");
    }
    format!("{} days ago", days)
}

fn plural_ago(n: i64, unit: &str) -> String {
    if n == 1 {
        format!("1 {} ago", unit)
    } else {
        format!("{} {}s ago", n, unit)
    }
}

/// "st", "nd", "rd" or "th" for a day of the month.
pub fn ordinal_suffix(day: u32) -> &'static str {
    if (4..=20).contains(&day) {
        return "th";
    }
    match day % 10 {
        1 => "st",
        2 => "nd",
        3 => "rd",
        _ => "th",
    }
}

/// "5th of January".
pub fn format_ordinal_date(date: NaiveDate) -> String {
    format!("{}{} of {}", date.day(), ordinal_suffix(date.day()), date.format("%B"))
}

/// `"<ordinal date> (<relative time>)"` for an instant, both parts in `tz`.
pub fn last_activity_message(at: &DateTime<Utc>, now: &DateTime<Utc>, tz: &Tz) -> String {
    let day = local_date(at, tz);
    format!("{} ({})", format_ordinal_date(day), time_ago(day, local_date(now, tz)))
}

/// Parses a `dd/mm/yyyy` sheet date.
pub fn parse_dmy(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y").ok()
}

/// Midnight of `date` in `tz`, as UTC.
pub fn local_midnight(date: NaiveDate, tz: &Tz) -> Option<DateTime<Utc>> {
    local_at(date, 0, tz)
}

/// `hour:00` of `date` in `tz`, as UTC. The earliest instant wins across a DST
/// fold.
pub fn local_at(date: NaiveDate, hour: u32, tz: &Tz) -> Option<DateTime<Utc>> {
    let naive = date.and_hms_opt(hour, 0, 0)?;
    tz.from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Epoch seconds to UTC.
pub fn from_epoch_seconds(secs: f64) -> Option<DateTime<Utc>> {
    from_epoch_millis(secs * 1000.0)
}

/// Epoch milliseconds to UTC.
pub fn from_epoch_millis(millis: f64) -> Option<DateTime<Utc>> {
    if !millis.is_finite() {
        return None;
    }
    DateTime::<Utc>::from_timestamp_millis(millis.round() as i64)
}

/// Lenient date parsing: RFC 3339 timestamps, `yyyy-mm-dd hh:mm:ss`,
/// `yyyy-mm-dd` and `dd/mm/yyyy`. Zone-less values are read as UTC.
pub fn parse_flexible(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    for pattern in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, pattern) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| parse_dmy(raw))
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Europe::London;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn relative_time_boundaries() {
        let today = d(2024, 3, 15);
        assert_eq!(time_ago(d(2024, 3, 15), today), "today");
        assert_eq!(time_ago(d(2024, 3, 14), today), "yesterday");
        assert_eq!(time_ago(d(2024, 3, 9), today), "6 days ago");
        assert_eq!(time_ago(d(2024, 3, 8), today), "1 week ago");
        assert_eq!(time_ago(d(2024, 2, 15), today), "4 weeks ago");
        assert_eq!(time_ago(d(2024, 2, 1), today), "1 month ago");
        assert_eq!(time_ago(d(2023, 5, 1), today), "10 months ago");
        assert_eq!(time_ago(d(2023, 3, 1), today), "1 year ago");
        assert_eq!(time_ago(d(2021, 1, 1), today), "3 years ago");
    }

    #[test]
    fn thirty_four_days_is_still_weeks() {
        let today = d(2024, 3, 15);
        assert_eq!(time_ago(today - chrono::Duration::days(34), today), "4 weeks ago");
        assert_eq!(time_ago(today - chrono::Duration::days(35), today), "1 month ago");
    }

    #[test]
    fn future_dates_read_as_today() {
        assert_eq!(time_ago(d(2024, 3, 20), d(2024, 3, 15)), "today");
    }

    #[test]
    fn ordinal_suffixes() {
        let cases = [(1, "st"), (2, "nd"), (3, "rd"), (4, "th"), (11, "th"), (12, "th"), (13, "th"), (21, "st"), (22, "nd"), (23, "rd"), (30, "th"), (31, "st")];
        for (day, suffix) in cases {
            assert_eq!(ordinal_suffix(day), suffix, "day {}", day);
        }
        assert_eq!(format_ordinal_date(d(2024, 1, 5)), "5th of January");
        assert_eq!(format_ordinal_date(d(2024, 9, 22)), "22nd of September");
    }

    #[test]
    fn activity_message_uses_local_day() {
        // 23:30 UTC on 30 June is already 1 July in London.
        let at = Utc.with_ymd_and_hms(2024, 6, 30, 23, 30, 0).unwrap();
        let now = Utc.with_ymd_and_hms(2024, 7, 2, 12, 0, 0).unwrap();
        assert_eq!(last_activity_message(&at, &now, &London), "1st of July (yesterday)");
    }

    #[test]
    fn parses_sheet_dates() {
        assert_eq!(parse_dmy("05/01/2024"), Some(d(2024, 1, 5)));
        assert_eq!(parse_dmy("2024-01-05"), None);
        let iso = parse_flexible("2024-01-05").unwrap();
        assert_eq!(iso, Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap());
        assert_eq!(parse_flexible("05/01/2024"), Some(iso));
        assert!(parse_flexible("2024-01-05T10:00:00.000Z").is_some());
        assert!(parse_flexible("not a date").is_none());
    }

    #[test]
    fn local_hour_in_winter_and_summer() {
        let winter = local_at(d(2024, 1, 5), 8, &London).unwrap();
        let summer = local_at(d(2024, 7, 5), 8, &London).unwrap();
        assert_eq!(winter, Utc.with_ymd_and_hms(2024, 1, 5, 8, 0, 0).unwrap());
        assert_eq!(summer, Utc.with_ymd_and_hms(2024, 7, 5, 7, 0, 0).unwrap());
    }
}
