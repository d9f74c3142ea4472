//! Read-only aggregation over workout history.
//!
//! Every function takes the history slice and an explicit `now` so results
//! are reproducible; nothing here mutates state.

use crate::{Exercise, ProgressionType, WorkoutExerciseInstance, WorkoutSession};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

/// Headline numbers for the analytics screen
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WorkoutStats {
    pub total_workouts: usize,
    pub average_workouts_per_week: f64,
    pub heaviest_lift: f64,
    pub longest_streak: u32,
}

/// Workouts started in one week-long bucket
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct WeeklyWorkoutCount {
    pub week_start: DateTime<Utc>,
    pub workout_count: usize,
}

/// Value charted per session for one exercise
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalyticsMetric {
    /// Working weight (first set)
    Weight,
    /// Final-set reps for AMRAP/Free, total reps for Pyramid
    Reps,
    /// Total kilograms moved
    Volume,
}

impl std::str::FromStr for AnalyticsMetric {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "weight" => Ok(AnalyticsMetric::Weight),
            "reps" => Ok(AnalyticsMetric::Reps),
            "volume" => Ok(AnalyticsMetric::Volume),
            other => Err(crate::Error::Other(format!("Unknown metric: {}", other))),
        }
    }
}

/// One point of an exercise progression series
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProgressionPoint {
    pub date: DateTime<Utc>,
    pub value: f64,
}

/// Longest trailing window any query looks at (about ten years)
pub const MAX_WINDOW_WEEKS: u32 = 520;

/// Start of the trailing window of `weeks` weeks ending at `now`
///
/// Windows are capped at [`MAX_WINDOW_WEEKS`], and the start saturates at the
/// earliest representable time instead of overflowing.
pub fn window_start(now: DateTime<Utc>, weeks: u32) -> DateTime<Utc> {
    Duration::try_weeks(i64::from(weeks.min(MAX_WINDOW_WEEKS)))
        .and_then(|span| now.checked_sub_signed(span))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

pub fn total_workouts(history: &[WorkoutSession]) -> usize {
    history.len()
}

/// Sessions in the trailing window divided by the window length in weeks
pub fn average_workouts_per_week(
    history: &[WorkoutSession],
    window_weeks: u32,
    now: DateTime<Utc>,
) -> f64 {
    let start = window_start(now, window_weeks);
    let recent = history.iter().filter(|s| s.start_time >= start).count();

    let days = (now - start).num_days();
    let weeks = ((days + 6) / 7).max(1);

    recent as f64 / weeks as f64
}

/// Heaviest weight on any set of any session, 0 if there are none
pub fn heaviest_lift(history: &[WorkoutSession]) -> f64 {
    history
        .iter()
        .flat_map(|s| s.exercise_instances())
        .flat_map(|i| i.sets.iter())
        .map(|set| set.weight)
        .fold(0.0, f64::max)
}

/// Longest run of sessions on consecutive (or the same) calendar days
///
/// Days are UTC calendar days.
pub fn longest_streak(history: &[WorkoutSession]) -> u32 {
    let mut days: Vec<_> = history.iter().map(|s| s.start_time.date_naive()).collect();
    days.sort();

    let mut longest = 0;
    let mut current = 0;
    let mut last_day: Option<NaiveDate> = None;

    for day in days {
        current = match last_day {
            Some(last) if (day - last).num_days() <= 1 => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        last_day = Some(day);
    }

    longest
}

pub fn workout_stats(history: &[WorkoutSession], window_weeks: u32, now: DateTime<Utc>) -> WorkoutStats {
    WorkoutStats {
        total_workouts: total_workouts(history),
        average_workouts_per_week: average_workouts_per_week(history, window_weeks, now),
        heaviest_lift: heaviest_lift(history),
        longest_streak: longest_streak(history),
    }
}

/// Workouts per week over the trailing `weeks`, oldest bucket first
///
/// Buckets are half-open 7-day windows starting `weeks` weeks before `now`;
/// at most [`MAX_WINDOW_WEEKS`] buckets are produced.
pub fn workout_frequency(
    history: &[WorkoutSession],
    weeks: u32,
    now: DateTime<Utc>,
) -> Vec<WeeklyWorkoutCount> {
    let weeks = weeks.min(MAX_WINDOW_WEEKS);
    let start = window_start(now, weeks);

    (0..i64::from(weeks))
        .map(|offset| {
            let week_start = start + Duration::weeks(offset);
            let week_end = week_start + Duration::weeks(1);
            let workout_count = history
                .iter()
                .filter(|s| s.start_time >= week_start && s.start_time < week_end)
                .count();
            WeeklyWorkoutCount {
                week_start,
                workout_count,
            }
        })
        .collect()
}

/// The instance in a session that corresponds to `exercise`
///
/// Matches on the exercise id first, then falls back to the first instance
/// with the same name (sessions recorded before ids were kept aligned).
pub fn find_matching_instance<'a>(
    session: &'a WorkoutSession,
    exercise: &Exercise,
) -> Option<&'a WorkoutExerciseInstance> {
    let instances = session.exercise_instances();
    instances
        .iter()
        .find(|i| i.exercise.id == exercise.id)
        .or_else(|| instances.iter().find(|i| i.exercise.name == exercise.name))
}

fn metric_value(instance: &WorkoutExerciseInstance, metric: AnalyticsMetric) -> f64 {
    match metric {
        AnalyticsMetric::Weight => instance.sets.first().map(|s| s.weight).unwrap_or(0.0),
        AnalyticsMetric::Reps => match instance.effective_progression_type() {
            ProgressionType::Amrap | ProgressionType::Free => instance
                .sets
                .last()
                .and_then(|s| s.actual_reps)
                .map(f64::from)
                .unwrap_or(0.0),
            ProgressionType::Pyramid => instance
                .sets
                .iter()
                .filter_map(|s| s.actual_reps)
                .map(f64::from)
                .sum(),
        },
        AnalyticsMetric::Volume => instance
            .sets
            .iter()
            .filter_map(|s| s.actual_reps.map(|r| s.weight * f64::from(r)))
            .sum(),
    }
}

/// Per-session metric series for one exercise over the trailing `weeks`
///
/// Sessions without the exercise, and values of zero, produce no point.
pub fn exercise_progression(
    history: &[WorkoutSession],
    exercise: &Exercise,
    metric: AnalyticsMetric,
    weeks: u32,
    now: DateTime<Utc>,
) -> Vec<ProgressionPoint> {
    let start = window_start(now, weeks);

    let mut recent: Vec<_> = history.iter().filter(|s| s.start_time >= start).collect();
    recent.sort_by_key(|s| s.start_time);

    recent
        .into_iter()
        .filter_map(|session| {
            let instance = find_matching_instance(session, exercise)?;
            let value = metric_value(instance, metric);
            (value > 0.0).then(|| ProgressionPoint {
                date: session.start_time,
                value,
            })
        })
        .collect()
}
