//! Default catalog of exercises and workout templates.
//!
//! Seeded into empty collections the first time the app runs.

use crate::types::*;

/// Name of the template seeded on first run
pub const DEFAULT_TEMPLATE_NAME: &str = "Full Body Workout";

/// Builds the default exercise list
///
/// Each call produces fresh ids.
pub fn default_exercises() -> Vec<Exercise> {
    vec![
        Exercise::new("Squat", ProgressionType::Amrap, false, 60.0),
        Exercise::new("Deadlift", ProgressionType::Amrap, false, 80.0),
        Exercise::new("Pull up", ProgressionType::Pyramid, true, 0.0).with_base_reps(8),
        Exercise::new("Push-up", ProgressionType::Amrap, true, 20.0),
        Exercise::new("Kettlebell swing", ProgressionType::Pyramid, false, 24.0).with_base_reps(15),
        Exercise::new("Overhead Press", ProgressionType::Amrap, true, 20.0),
    ]
}

/// Builds the default full-body template from whichever of Push-up, Squat
/// and Deadlift exist in `exercises`
///
/// Returns `None` when none of them are present.
pub fn default_template(exercises: &[Exercise]) -> Option<WorkoutTemplate> {
    let instances: Vec<_> = ["Push-up", "Squat", "Deadlift"]
        .iter()
        .filter_map(|name| exercises.iter().find(|e| e.name == *name))
        .cloned()
        .map(WorkoutExerciseInstance::new)
        .collect();

    if instances.is_empty() {
        tracing::warn!("No default exercises found to build the default template");
        return None;
    }

    Some(WorkoutTemplate::new(
        DEFAULT_TEMPLATE_NAME,
        BodyPart::Full,
        instances,
    ))
}

/// Check an exercise list for problems worth reporting
///
/// Returns one message per problem; an empty list means the catalog is valid.
/// Duplicate names are reported because they make name-based lookups
/// ambiguous, not because they are forbidden.
pub fn validate_exercises(exercises: &[Exercise]) -> Vec<String> {
    let mut errors = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for exercise in exercises {
        if exercise.name.trim().is_empty() {
            errors.push(format!("Exercise {} has an empty name", exercise.id));
        }
        if !exercise.current_weight.is_finite() || exercise.current_weight < 0.0 {
            errors.push(format!(
                "Exercise '{}' has invalid weight {}",
                exercise.name, exercise.current_weight
            ));
        }
        if exercise.progression_type == ProgressionType::Pyramid && exercise.base_reps == 0 {
            errors.push(format!("Pyramid exercise '{}' has zero base reps", exercise.name));
        }
        if !seen.insert(exercise.name.as_str()) {
            errors.push(format!("Duplicate exercise name '{}'", exercise.name));
        }
    }

    errors
}
