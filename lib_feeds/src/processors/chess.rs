//! Online chess games: rating progression, hour-of-day form, time played.

use serde::Serialize;
use serde_json::Value;

use super::processor::{chronological, ProcessContext, ProcessorError, SourceProcessor};
use crate::analytics::{
    calendar_buckets, from_epoch_seconds, hour_of_day, hours_message, least_squares, max_by_key,
    point_radii, round_to, signed_fixed, Aggregate, CalendarGranularity,
};
use crate::tabular::TypedRecord;

const START: &str = "startTime";
const RATING: &str = "myRating";
const RESULT: &str = "myResult";
const ACCURACY: &str = "myAccuracy";
const LENGTH: &str = "gameLength";

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GameStatsByHour {
    labels_by_hour: Vec<u32>,
    data_by_hour: Vec<f64>,
    accuracy_by_hour: Vec<f64>,
    point_radius_array: Vec<u8>,
    accpoint_radius_array: Vec<u8>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DailyBest {
    labels: Vec<String>,
    graph_data: Vec<f64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ChessSummary {
    highest_rating: Option<f64>,
    num_games: usize,
    time_message: String,
    change_in_score_per_hour: Option<String>,
    time_since_last_game: Option<String>,
    game_stats_by_hour: GameStatsByHour,
    data_by_day: DailyBest,
    date_of_last_game: Option<i64>,
}

pub struct ChessProcessor;

impl SourceProcessor for ChessProcessor {
    fn kind(&self) -> &'static str {
        "chess"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[START, RATING, RESULT, ACCURACY, LENGTH]
    }

    fn process(&self, records: &[TypedRecord], ctx: &ProcessContext) -> Result<Value, ProcessorError> {
        let games = chronological(records, START, |r| r.number(START).and_then(from_epoch_seconds))?;

        let ratings: Vec<_> = games
            .iter()
            .filter_map(|(ts, r)| r.number(RATING).map(|v| (*ts, v)))
            .collect();
        let wins: Vec<_> = games
            .iter()
            .map(|(ts, r)| (*ts, if r.text(RESULT) == Some("win") { 100.0 } else { 0.0 }))
            .collect();
        let accuracy: Vec<_> = games.iter().map(|(ts, r)| (*ts, r.number_or_zero(ACCURACY))).collect();

        let data_by_hour: Vec<f64> = hour_of_day(&wins, &ctx.tz, Aggregate::Mean)
            .iter()
            .map(|b| round_to(b.value_or(0.0), 1))
            .collect();
        let accuracy_by_hour: Vec<f64> = hour_of_day(&accuracy, &ctx.tz, Aggregate::Mean)
            .iter()
            .map(|b| round_to(b.value_or(0.0), 1))
            .collect();

        let daily = calendar_buckets(&ratings, &ctx.tz, CalendarGranularity::DayShort, Aggregate::Max);

        let total_length: f64 = games.iter().map(|(_, r)| r.number_or_zero(LENGTH)).sum();
        let rating_values: Vec<f64> = ratings.iter().map(|(_, v)| *v).collect();
        let change_in_score_per_hour = least_squares(&rating_values)
            .filter(|_| total_length > 0.0)
            .map(|trend| signed_fixed(trend.change() * (3600.0 / total_length), 2));

        let last = games.last().map(|(ts, _)| *ts);
        let summary = ChessSummary {
            highest_rating: max_by_key(&rating_values, |v| Some(*v)).copied(),
            num_games: games.len(),
            time_message: hours_message(total_length),
            change_in_score_per_hour,
            time_since_last_game: last.as_ref().map(|ts| ctx.activity_message(ts)),
            game_stats_by_hour: GameStatsByHour {
                labels_by_hour: (0..24).collect(),
                point_radius_array: point_radii(&data_by_hour),
                accpoint_radius_array: point_radii(&accuracy_by_hour),
                data_by_hour,
                accuracy_by_hour,
            },
            data_by_day: DailyBest {
                labels: daily.iter().map(|b| b.label.clone()).collect(),
                graph_data: daily.iter().map(|b| b.value).collect(),
            },
            date_of_last_game: last.map(|ts| ts.timestamp_millis()),
        };
        Ok(serde_json::to_value(summary)?)
    }
}
