//! Boundary adapters for data written by older versions.
//!
//! Templates used to store their exercises as a list of plain
//! `LegacyWorkoutExercise` wrappers. They are migrated into
//! `exercise_instances` the first time they are decoded; the legacy field is
//! never written again.

use crate::{BodyPart, Exercise, WorkoutExerciseInstance, WorkoutSet, WorkoutTemplate};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

/// The pre-instance exercise wrapper
#[derive(Clone, Debug, Deserialize)]
pub struct LegacyWorkoutExercise {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub exercise: Exercise,
    #[serde(default)]
    pub sets: Vec<WorkoutSet>,
    #[serde(default)]
    pub is_completed: bool,
}

impl LegacyWorkoutExercise {
    /// Wrap with default overrides taken from the exercise itself
    pub fn into_instance(self) -> WorkoutExerciseInstance {
        let weight = self.exercise.current_weight;
        let base_reps = self.exercise.base_reps;
        WorkoutExerciseInstance::new(self.exercise)
            .with_amrap_weight(weight)
            .with_pyramid_base_reps(base_reps)
    }
}

/// Template as it may appear on disk, in either schema
#[derive(Clone, Debug, Deserialize)]
pub struct StoredTemplate {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub focus: BodyPart,
    #[serde(default)]
    pub exercises: Vec<LegacyWorkoutExercise>,
    #[serde(default)]
    pub exercise_instances: Vec<WorkoutExerciseInstance>,
    #[serde(default = "Utc::now")]
    pub created_date: DateTime<Utc>,
}

impl From<StoredTemplate> for WorkoutTemplate {
    fn from(stored: StoredTemplate) -> Self {
        migrate_legacy_template(stored)
    }
}

/// Convert a stored template into the single in-memory schema
///
/// Legacy `exercises` are used only when `exercise_instances` is empty.
pub fn migrate_legacy_template(stored: StoredTemplate) -> WorkoutTemplate {
    let exercise_instances = if stored.exercise_instances.is_empty() && !stored.exercises.is_empty()
    {
        tracing::info!(
            "Migrating template '{}' from {} legacy exercises",
            stored.name,
            stored.exercises.len()
        );
        stored
            .exercises
            .into_iter()
            .map(LegacyWorkoutExercise::into_instance)
            .collect()
    } else {
        stored.exercise_instances
    };

    WorkoutTemplate {
        id: stored.id,
        name: stored.name,
        focus: stored.focus,
        exercise_instances,
        created_date: stored.created_date,
    }
}

/// Fill in `body_part` from the legacy `is_upper_body` flag
///
/// Returns true if any exercise changed.
pub fn migrate_body_part(exercises: &mut [Exercise]) -> bool {
    let mut changed = false;
    for exercise in exercises.iter_mut().filter(|e| e.body_part.is_none()) {
        exercise.body_part = Some(if exercise.is_upper_body {
            BodyPart::Upper
        } else {
            BodyPart::Lower
        });
        changed = true;
    }
    if changed {
        tracing::info!("Backfilled body part from legacy upper-body flag");
    }
    changed
}
