//! Linear least-squares fit over values indexed `1..=n`.

use serde::Serialize;

/// A fitted line, reduced to its two anchor points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrendLine {
    /// m in `y = m·x + b`.
    pub slope: f64,
    /// b in `y = m·x + b`.
    pub intercept: f64,
    /// `(1, fitted(1))`.
    pub start: (f64, f64),
    /// `(n, fitted(n))`.
    pub end: (f64, f64),
}

impl TrendLine {
    /// Fitted value at the last point minus fitted value at the first.
    pub fn change(&self) -> f64 {
        self.end.1 - self.start.1
    }

    /// Fitted value at `x`.
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Fits `y = m·x + b` through `(i + 1, values[i])`.
///
/// Returns `None` for empty input. A single value has a zero denominator; the
/// slope is then 0 and both anchors sit on that value.
pub fn least_squares(values: &[f64]) -> Option<TrendLine> {
    if values.is_empty() {
        return None;
    }

    let n = values.len() as f64;
    let (mut sum_x, mut sum_y, mut sum_xx, mut sum_xy) = (0.0, 0.0, 0.0, 0.0);
    for (i, y) in values.iter().enumerate() {
        let x = (i + 1) as f64;
        sum_x += x;
        sum_y += y;
        sum_xx += x * x;
        sum_xy += x * y;
    }

    let denominator = n * sum_xx - sum_x * sum_x;
    let slope = if denominator == 0.0 {
        0.0
    } else {
        (n * sum_xy - sum_x * sum_y) / denominator
    };
    let intercept = sum_y / n - slope * sum_x / n;

    let line = TrendLine {
        slope,
        intercept,
        start: (1.0, 0.0),
        end: (n, 0.0),
    };
    Some(TrendLine {
        start: (1.0, line.at(1.0)),
        end: (n, line.at(n)),
        ..line
    })
}
