//! Export of the stored collections.
//!
//! Two formats:
//! - a JSON bundle of exercises, templates and history that reads back
//!   losslessly
//! - a CSV matrix of history with one row per exercise and one column per
//!   session, for spreadsheets

use crate::store::{load_json, save_json};
use crate::{Exercise, ProgressionType, Result, WorkoutSession, WorkoutTemplate};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Every stored collection in one document
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct ExportBundle {
    #[serde(default)]
    pub exercises: Vec<Exercise>,
    #[serde(default)]
    pub workout_templates: Vec<WorkoutTemplate>,
    #[serde(default)]
    pub workout_history: Vec<WorkoutSession>,
}

impl ExportBundle {
    pub fn new(
        exercises: &[Exercise],
        workout_templates: &[WorkoutTemplate],
        workout_history: &[WorkoutSession],
    ) -> Self {
        Self {
            exercises: exercises.to_vec(),
            workout_templates: workout_templates.to_vec(),
            workout_history: workout_history.to_vec(),
        }
    }
}

/// Write the bundle as pretty JSON, atomically
pub fn write_json_bundle(bundle: &ExportBundle, path: &Path) -> Result<()> {
    save_json(path, bundle)?;
    tracing::info!(
        "Exported {} exercises, {} templates, {} sessions to {:?}",
        bundle.exercises.len(),
        bundle.workout_templates.len(),
        bundle.workout_history.len(),
        path
    );
    Ok(())
}

/// Read a bundle back; a missing or unparseable file reads as empty
pub fn read_json_bundle(path: &Path) -> Result<ExportBundle> {
    Ok(load_json(path)?.unwrap_or_default())
}

/// Exercises appearing in `sessions`, unique by id, sorted by name
fn unique_exercises(sessions: &[&WorkoutSession]) -> Vec<Exercise> {
    let mut seen = HashSet::new();
    let mut exercises: Vec<Exercise> = sessions
        .iter()
        .flat_map(|s| s.exercise_instances())
        .filter(|i| seen.insert(i.exercise.id))
        .map(|i| i.exercise.clone())
        .collect();
    exercises.sort_by(|a, b| a.name.cmp(&b.name));
    exercises
}

/// Spreadsheet cell for one exercise in one session
///
/// AMRAP and Free show the last completed set; Pyramid shows the first set's
/// weight with every completed set's reps. Empty when the exercise was not
/// performed.
fn performance_cell(exercise: &Exercise, session: &WorkoutSession) -> String {
    let Some(instance) = session
        .exercise_instances()
        .iter()
        .find(|i| i.exercise.id == exercise.id)
    else {
        return String::new();
    };

    let completed = instance.completed_sets();
    match instance.effective_progression_type() {
        ProgressionType::Amrap | ProgressionType::Free => completed
            .last()
            .and_then(|set| set.actual_reps.map(|reps| format!("{:.1}kg, reps={}", set.weight, reps)))
            .unwrap_or_default(),
        ProgressionType::Pyramid => match completed.first() {
            Some(first) => {
                let reps: Vec<String> = completed
                    .iter()
                    .filter_map(|s| s.actual_reps)
                    .map(|r| r.to_string())
                    .collect();
                format!("{:.1}kg, reps={}", first.weight, reps.join(","))
            }
            None => String::new(),
        },
    }
}

/// Write history as an exercise-by-session CSV matrix
///
/// Columns are sessions oldest first, headed by their start date
/// (`YYYY-MM-DD`). Returns the number of exercise rows written.
pub fn write_history_csv(sessions: &[WorkoutSession], path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut sorted: Vec<&WorkoutSession> = sessions.iter().collect();
    sorted.sort_by_key(|s| s.start_time);
    let exercises = unique_exercises(&sorted);

    let mut writer = csv::Writer::from_path(path)?;

    let mut header = vec!["Exercise".to_string()];
    header.extend(sorted.iter().map(|s| s.start_time.format("%Y-%m-%d").to_string()));
    writer.write_record(&header)?;

    for exercise in &exercises {
        let mut row = vec![exercise.name.clone()];
        row.extend(sorted.iter().map(|s| performance_cell(exercise, s)));
        writer.write_record(&row)?;
    }

    writer.flush()?;
    tracing::info!(
        "Wrote {} exercises across {} sessions to {:?}",
        exercises.len(),
        sorted.len(),
        path
    );
    Ok(exercises.len())
}
