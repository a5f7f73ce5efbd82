//! Numeric helpers and the small string formats the dashboard expects.

/// Arithmetic mean, `None` for empty input.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

/// Rounds to the nearest integer with halves going towards +∞ (so -2.5 is -2).
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Rounds to `decimals` places using [`round_half_up`].
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    round_half_up(value * factor) / factor
}

/// A rate with an explicit sign, rounded to `decimals` places with trailing
/// zeros dropped: `+1.25`, `-0.4`, `+20`.
///
/// Zero and values that round to zero get a `+`.
pub fn signed_fixed(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value.abs());
    let trimmed = if fixed.contains('.') {
        fixed.trim_end_matches('0').trim_end_matches('.')
    } else {
        fixed.as_str()
    };
    let sign = if value < 0.0 && trimmed != "0" { '-' } else { '+' };
    format!("{}{}", sign, trimmed)
}

/// Renders a number without a trailing `.0` when it is whole: `42`, `42.5`.
pub fn plain_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

/// `"N hours"` from a number of seconds, rounded to whole hours.
pub fn hours_message(seconds: f64) -> String {
    format!("{} hours", round_half_up(seconds / 3600.0) as i64)
}

/// Thousands-grouped decimal with between `min_frac` and `max_frac` fraction
/// digits: `group_decimal(1234.5, 2, 3)` is `"1,234.50"`.
pub fn group_decimal(value: f64, min_frac: usize, max_frac: usize) -> String {
    let max_frac = max_frac.max(min_frac);
    let formatted = format!("{:.*}", max_frac, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, f),
        None => (formatted.as_str(), ""),
    };

    let mut frac = frac_part.to_string();
    while frac.len() > min_frac && frac.ends_with('0') {
        frac.pop();
    }

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    if frac.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac)
    }
}
