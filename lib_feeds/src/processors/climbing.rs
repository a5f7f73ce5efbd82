//! Bouldering log: grades, sessions and per-grade success rates.
//!
//! Grades are V-scale strings; a trailing `+` is ignored.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;
use serde_json::Value;

use super::processor::{iso, ProcessContext, ProcessorError, SourceProcessor};
use crate::analytics::{format_ordinal_date, local_midnight, max_by_key, parse_dmy};
use crate::tabular::TypedRecord;

const GRADE: &str = "Grade";
const ATTEMPTS: &str = "Attempts";
const SUCCESS: &str = "Success";
const DATE: &str = "Date";

/// How many most recent sessions the running view covers.
const RUNNING_SESSIONS: usize = 10;

/// Rank of a V-grade; unknown grades rank 0.
pub fn grade_rank(grade: &str) -> u32 {
    match grade {
        "VB" => 0,
        "V0" => 1,
        "V1" => 3,
        "V2" => 4,
        "V3" => 5,
        "V4" => 6,
        "V5" => 7,
        "V6" => 8,
        "V7" => 9,
        "V8" => 10,
        "V9" => 11,
        _ => 0,
    }
}

struct Climb {
    date: NaiveDate,
    grade: String,
    attempts: f64,
    success: bool,
}

impl Climb {
    fn flashed(&self) -> bool {
        self.success && self.attempts == 1.0
    }
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct RunningView {
    latest_labels: Vec<String>,
    attempts: Vec<f64>,
    successes: Vec<usize>,
    flashes: Vec<usize>,
    best_grade: Vec<String>,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct ByGradeView {
    by_grade_labels: Vec<String>,
    by_grade_attempts: Vec<f64>,
    by_grade_successes: Vec<usize>,
    by_grade_flashes: Vec<usize>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClimbingSummary {
    highest_grade: Option<String>,
    climbing_sessions: usize,
    time_since_last_climb: Option<String>,
    last_climb_date: Option<i64>,
    running: RunningView,
    by_grade: ByGradeView,
}

pub struct ClimbingProcessor;

impl SourceProcessor for ClimbingProcessor {
    fn kind(&self) -> &'static str {
        "climbing"
    }

    fn required_columns(&self) -> &'static [&'static str] {
        &[GRADE, ATTEMPTS, SUCCESS, DATE]
    }

    fn process(&self, records: &[TypedRecord], ctx: &ProcessContext) -> Result<Value, ProcessorError> {
        let climbs = read_climbs(records)?;

        let highest_grade = max_by_key(&climbs, |c| Some(grade_rank(&c.grade) as f64)).map(|c| c.grade.clone());

        let mut sessions: BTreeMap<NaiveDate, Vec<&Climb>> = BTreeMap::new();
        for climb in &climbs {
            sessions.entry(climb.date).or_default().push(climb);
        }

        let mut running = RunningView::default();
        for (date, day) in sessions.iter().rev().take(RUNNING_SESSIONS).rev() {
            let label = local_midnight(*date, &ctx.tz)
                .map(|ts| iso(&ts))
                .unwrap_or_else(|| date.to_string());
            running.latest_labels.push(label);
            running.attempts.push(day.iter().map(|c| c.attempts).sum());
            running.successes.push(day.iter().filter(|c| c.success).count());
            running.flashes.push(day.iter().filter(|c| c.flashed()).count());
            running.best_grade.push(
                max_by_key(day, |c| Some(grade_rank(&c.grade) as f64))
                    .map(|c| c.grade.clone())
                    .unwrap_or_default(),
            );
        }

        let last_day = sessions.keys().next_back().copied();

        let summary = ClimbingSummary {
            highest_grade,
            climbing_sessions: sessions.len(),
            time_since_last_climb: last_day.map(|d| format!("{} ({})", format_ordinal_date(d), ctx.ago(d))),
            last_climb_date: last_day
                .and_then(|d| local_midnight(d, &ctx.tz))
                .map(|ts| ts.timestamp_millis()),
            running,
            by_grade: by_grade(&climbs),
        };
        Ok(serde_json::to_value(summary)?)
    }
}

fn read_climbs(records: &[TypedRecord]) -> Result<Vec<Climb>, ProcessorError> {
    let mut climbs = Vec::with_capacity(records.len());
    for record in records {
        let Some(date) = record.display(DATE).and_then(|d| parse_dmy(&d)) else {
            continue;
        };
        let grade = record
            .display(GRADE)
            .unwrap_or_default()
            .split('+')
            .next()
            .unwrap_or_default()
            .trim()
            .to_string();
        climbs.push(Climb {
            date,
            grade,
            attempts: record.number_or_zero(ATTEMPTS),
            success: record.boolean(SUCCESS).unwrap_or(false),
        });
    }

    if climbs.is_empty() && !records.is_empty() {
        return Err(ProcessorError::InvalidValue {
            column: DATE.to_string(),
            row: 0,
            message: "no dd/mm/yyyy dates found".to_string(),
        });
    }
    climbs.sort_by_key(|c| c.date);
    Ok(climbs)
}

fn by_grade(climbs: &[Climb]) -> ByGradeView {
    let mut totals: Vec<(String, f64, usize, usize)> = Vec::new();
    for climb in climbs {
        let idx = match totals.iter().position(|t| t.0 == climb.grade) {
            Some(idx) => idx,
            None => {
                totals.push((climb.grade.clone(), 0.0, 0, 0));
                totals.len() - 1
            }
        };
        let entry = &mut totals[idx];
        entry.1 += climb.attempts;
        if climb.success {
            entry.2 += 1;
        }
        if climb.flashed() {
            entry.3 += 1;
        }
    }
    totals.sort_by_key(|t| grade_rank(&t.0));

    let mut view = ByGradeView::default();
    for (grade, attempts, successes, flashes) in totals {
        view.by_grade_labels.push(grade);
        view.by_grade_attempts.push(attempts);
        view.by_grade_successes.push(successes);
        view.by_grade_flashes.push(flashes);
    }
    view
}
