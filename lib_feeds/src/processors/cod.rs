//! Head-to-head game log between two players, `A` and `B` in the sheet.
//! Totals and the daily view are keyed by the players' names, which the
//! dashboard reads.
//!
//! Player B's numbers are negated in the chart views so the two series sit
//! either side of the axis.

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use super::processor::{chronological, ProcessContext, ProcessorError, SourceProcessor};
use crate::analytics::{
    format_ordinal_date, from_epoch_seconds, hour_of_day, local_at, local_date, round_half_up, Aggregate,
};
use crate::tabular::TypedRecord;

const TIMESTAMP: &str = "UnixTimestamp";
const WINNER: &str = "Winner";

/// Local hour the "last game" instant is pinned to.
const LAST_GAME_HOUR: u32 = 8;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HourlyView {
    win_percentages_a: Vec<f64>,
    win_percentages_b: Vec<f64>,
    hours: Vec<u32>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct NormalView {
    #[serde(rename = "dataArchie")]
    data_a: Vec<u32>,
    #[serde(rename = "dataBen")]
    data_b: Vec<i64>,
    labels: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunningView {
    running_data: Vec<i64>,
    labels: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GameIndexView {
    win_percentages_by_index_a: Vec<f64>,
    win_percentages_by_index_b: Vec<f64>,
    indices: Vec<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CodSummary {
    #[serde(rename = "totalArchie")]
    total_a: u32,
    #[serde(rename = "totalBen")]
    total_b: u32,
    hourly_view: HourlyView,
    normal_view: NormalView,
    running_view: RunningView,
    game_index_view: GameIndexView,
    date_of_last_test_message: Option<String>,
    date_of_last_test: Option<i64>,
}

#[derive(Default)]
struct Tally {
    a: u32,
    b: u32,
    total: u32,
}

impl Tally {
    fn add(&mut self, winner: Option<&str>) {
        match winner {
            Some("A") => self.a += 1,
            Some("B") => self.b += 1,
            _ => {}
        }
        self.total += 1;
    }

    fn percent_a(&self) -> f64 {
        percent(self.a, self.total)
    }

    fn percent_b_negated(&self) -> f64 {
        round_half_up(-(self.b as f64 / self.total.max(1) as f64) * 100.0)
    }
}

fn percent(part: u32, total: u32) -> f64 {
    if total == 0 {
        0.0
    } else {
        round_half_up(part as f64 / total as f64 * 100.0)
    }
}

pub struct CodProcessor;

impl SourceProcessor for CodProcessor {
    fn kind(&self) -> &'static str {
        "cod"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[TIMESTAMP, WINNER]
    }

    fn process(&self, records: &[TypedRecord], ctx: &ProcessContext) -> Result<Value, ProcessorError> {
        let games = chronological(records, TIMESTAMP, |r| r.number(TIMESTAMP).and_then(from_epoch_seconds))?;

        let indicator = |player: &str| -> Vec<_> {
            games
                .iter()
                .map(|(ts, r)| (*ts, if r.text(WINNER) == Some(player) { 100.0 } else { 0.0 }))
                .collect()
        };
        let hourly_a = hour_of_day(&indicator("A"), &ctx.tz, Aggregate::Mean);
        let hourly_b = hour_of_day(&indicator("B"), &ctx.tz, Aggregate::Mean);
        let hourly_view = HourlyView {
            win_percentages_a: hourly_a.iter().map(|b| round_half_up(b.value_or(0.0))).collect(),
            win_percentages_b: hourly_b.iter().map(|b| round_half_up(-b.value_or(0.0))).collect(),
            hours: (0..24).collect(),
        };

        // Per day tallies in chronological order, plus tallies by the game's
        // 1-based position within its day.
        let mut days: Vec<(NaiveDate, Tally)> = Vec::new();
        let mut by_index: Vec<Tally> = Vec::new();
        for (ts, record) in &games {
            let day = local_date(ts, &ctx.tz);
            if days.last().map(|(d, _)| *d) != Some(day) {
                days.push((day, Tally::default()));
            }
            let winner = record.text(WINNER);
            let Some((_, tally)) = days.last_mut() else { continue };
            tally.add(winner);

            let position = tally.total as usize;
            if by_index.len() < position {
                by_index.resize_with(position, Tally::default);
            }
            by_index[position - 1].add(winner);
        }

        let labels: Vec<String> = days.iter().map(|(d, _)| d.format("%d/%m/%Y").to_string()).collect();
        let mut running = 0i64;
        let running_data = days
            .iter()
            .map(|(_, t)| {
                running += t.a as i64 - t.b as i64;
                running
            })
            .collect();

        let last_day = days.last().map(|(d, _)| *d);
        let summary = CodSummary {
            total_a: days.iter().map(|(_, t)| t.a).sum(),
            total_b: days.iter().map(|(_, t)| t.b).sum(),
            hourly_view,
            normal_view: NormalView {
                data_a: days.iter().map(|(_, t)| t.a).collect(),
                data_b: days.iter().map(|(_, t)| -(t.b as i64)).collect(),
                labels: labels.clone(),
            },
            running_view: RunningView { running_data, labels },
            game_index_view: GameIndexView {
                win_percentages_by_index_a: by_index.iter().map(Tally::percent_a).collect(),
                win_percentages_by_index_b: by_index.iter().map(Tally::percent_b_negated).collect(),
                indices: (1..=by_index.len()).collect(),
            },
            date_of_last_test_message: last_day.map(|d| format!("{} ({})", format_ordinal_date(d), ctx.ago(d))),
            date_of_last_test: last_day
                .and_then(|d| local_at(d, LAST_GAME_HOUR, &ctx.tz))
                .map(|ts| ts.timestamp_millis()),
        };
        Ok(serde_json::to_value(summary)?)
    }
}
