//! Progression logic for deciding next session's weight and reps.
//!
//! This module implements the progression rules for the three schemes:
//! - AMRAP: weight follows the reps of the final (to-failure) set
//! - Pyramid: last session's achieved reps become the next prescription
//! - Free: nothing changes automatically
//!
//! The calculators are pure; [`apply_progression`] is the dispatch used at
//! session end and writes its result onto the exercise it is given.

use crate::config::ProgressionConfig;
use crate::{BodyPart, Exercise, ProgressionType, WorkoutExerciseInstance, WorkoutSet};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Resolve whether an exercise counts as upper body
///
/// Precedence: the exercise's own body part, then an upper or lower workout
/// focus, then the legacy upper-body flag.
pub fn is_upper_body_exercise(exercise: &Exercise, workout_focus: BodyPart) -> bool {
    if let Some(body_part) = exercise.body_part {
        return body_part == BodyPart::Upper;
    }

    match workout_focus {
        BodyPart::Upper => true,
        BodyPart::Lower => false,
        BodyPart::Full => exercise.is_upper_body,
    }
}

/// Next working weight for an AMRAP exercise, using the default rules
///
/// - fewer than 5 reps on the failure set: weight unchanged
/// - 5 to 9 reps: +1.0 kg upper body, +2.5 kg lower body
/// - 10 or more: +2.0 kg upper body, +5.0 kg lower body
pub fn calculate_amrap_progression(
    exercise: &Exercise,
    final_set_reps: u32,
    workout_focus: BodyPart,
) -> f64 {
    calculate_amrap_progression_with(
        &ProgressionConfig::default(),
        exercise,
        final_set_reps,
        workout_focus,
    )
}

/// Next working weight for an AMRAP exercise under the given rules
pub fn calculate_amrap_progression_with(
    rules: &ProgressionConfig,
    exercise: &Exercise,
    final_set_reps: u32,
    workout_focus: BodyPart,
) -> f64 {
    if final_set_reps < rules.min_reps_to_progress {
        return exercise.current_weight;
    }

    let upper = is_upper_body_exercise(exercise, workout_focus);
    let increment = if final_set_reps < rules.large_jump_reps {
        if upper {
            rules.upper_small_increment
        } else {
            rules.lower_small_increment
        }
    } else if upper {
        rules.upper_large_increment
    } else {
        rules.lower_large_increment
    };

    exercise.current_weight + increment
}

/// Reps achieved on each completed set, in set order
///
/// Sets without an actual rep count are dropped. No averaging or clamping:
/// this exact sequence is next session's prescription.
pub fn calculate_pyramid_progression(_exercise: &Exercise, completed_sets: &[&WorkoutSet]) -> Vec<u32> {
    completed_sets.iter().filter_map(|s| s.actual_reps).collect()
}

/// What the dispatch did to one exercise
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressionChange {
    /// AMRAP weight recalculated (possibly to the same value)
    Weight {
        from: f64,
        to: f64,
        final_set_reps: u32,
    },
    /// Pyramid reps replaced
    Reps {
        from: Option<Vec<u32>>,
        to: Vec<u32>,
    },
    /// Free progression: only the workout date moved
    Manual,
    /// AMRAP final set had no reps recorded; weight left alone
    MissingFinalReps,
    /// Nothing was completed, nothing was touched
    NoCompletedSets,
}

/// Result of running the dispatch for one exercise instance
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ProgressionOutcome {
    pub exercise_id: Uuid,
    pub exercise_name: String,
    pub progression_type: ProgressionType,
    pub change: ProgressionChange,
}

/// Run the progression dispatch for one instance against its canonical exercise
///
/// Keyed on the instance's effective progression type. An instance with no
/// completed sets leaves the exercise untouched; otherwise
/// `last_workout_date` is set to `now` in every branch.
pub fn apply_progression(
    rules: &ProgressionConfig,
    exercise: &mut Exercise,
    instance: &WorkoutExerciseInstance,
    workout_focus: BodyPart,
    now: DateTime<Utc>,
) -> ProgressionOutcome {
    let progression_type = instance.effective_progression_type();
    let completed_sets = instance.completed_sets();

    let change = if completed_sets.is_empty() {
        ProgressionChange::NoCompletedSets
    } else {
        let change = match progression_type {
            ProgressionType::Amrap => match completed_sets.last().and_then(|s| s.actual_reps) {
                Some(final_set_reps) => {
                    let from = exercise.current_weight;
                    let to = calculate_amrap_progression_with(
                        rules,
                        exercise,
                        final_set_reps,
                        workout_focus,
                    );
                    exercise.current_weight = to;
                    ProgressionChange::Weight {
                        from,
                        to,
                        final_set_reps,
                    }
                }
                None => ProgressionChange::MissingFinalReps,
            },
            ProgressionType::Pyramid => {
                let to = calculate_pyramid_progression(exercise, &completed_sets);
                let from = exercise.current_reps.replace(to.clone());
                ProgressionChange::Reps { from, to }
            }
            ProgressionType::Free => ProgressionChange::Manual,
        };
        exercise.last_workout_date = Some(now);
        change
    };

    match &change {
        ProgressionChange::Weight { from, to, final_set_reps } => tracing::info!(
            "AMRAP progression for {}: {}kg -> {}kg (final set: {} reps)",
            exercise.name,
            from,
            to,
            final_set_reps
        ),
        ProgressionChange::Reps { to, .. } => {
            tracing::info!("Pyramid progression for {}: reps now {:?}", exercise.name, to)
        }
        ProgressionChange::Manual => {
            tracing::info!("Free progression for {}: no automatic change", exercise.name)
        }
        ProgressionChange::MissingFinalReps => tracing::warn!(
            "AMRAP progression for {} skipped: final set has no reps",
            exercise.name
        ),
        ProgressionChange::NoCompletedSets => {
            tracing::debug!("No completed sets for {}", exercise.name)
        }
    }

    ProgressionOutcome {
        exercise_id: exercise.id,
        exercise_name: exercise.name.clone(),
        progression_type,
        change,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn amrap(upper: bool) -> Exercise {
        Exercise::new("Press", ProgressionType::Amrap, upper, 40.0)
    }

    fn completed(reps: &[u32], weight: f64) -> Vec<WorkoutSet> {
        reps.iter()
            .map(|r| {
                let mut set = WorkoutSet::new(5, weight);
                set.complete(*r, Utc::now());
                set
            })
            .collect()
    }

    #[test]
    fn test_amrap_below_five_keeps_weight() {
        for reps in 0..5 {
            assert_eq!(calculate_amrap_progression(&amrap(true), reps, BodyPart::Full), 40.0);
            assert_eq!(calculate_amrap_progression(&amrap(false), reps, BodyPart::Full), 40.0);
        }
    }

    #[test]
    fn test_amrap_small_increment() {
        assert_eq!(calculate_amrap_progression(&amrap(true), 7, BodyPart::Full), 41.0);
        assert_eq!(calculate_amrap_progression(&amrap(false), 7, BodyPart::Full), 42.5);
        assert_eq!(calculate_amrap_progression(&amrap(true), 5, BodyPart::Full), 41.0);
        assert_eq!(calculate_amrap_progression(&amrap(true), 9, BodyPart::Full), 41.0);
    }

    #[test]
    fn test_amrap_large_increment() {
        assert_eq!(calculate_amrap_progression(&amrap(true), 12, BodyPart::Full), 42.0);
        assert_eq!(calculate_amrap_progression(&amrap(false), 12, BodyPart::Full), 45.0);
        assert_eq!(calculate_amrap_progression(&amrap(false), 10, BodyPart::Full), 45.0);
    }

    #[test]
    fn test_body_part_precedence() {
        // Exercise body part beats workout focus
        let lower = amrap(true).with_body_part(BodyPart::Lower);
        assert!(!is_upper_body_exercise(&lower, BodyPart::Upper));

        // Workout focus beats the legacy flag
        assert!(is_upper_body_exercise(&amrap(false), BodyPart::Upper));
        assert!(!is_upper_body_exercise(&amrap(true), BodyPart::Lower));

        // Full focus falls through to the legacy flag
        assert!(is_upper_body_exercise(&amrap(true), BodyPart::Full));
        assert!(!is_upper_body_exercise(&amrap(false), BodyPart::Full));

        // A full-body exercise is not upper body
        let full = amrap(true).with_body_part(BodyPart::Full);
        assert!(!is_upper_body_exercise(&full, BodyPart::Upper));
    }

    #[test]
    fn test_custom_rules() {
        let rules = ProgressionConfig {
            lower_small_increment: 2.0,
            ..ProgressionConfig::default()
        };
        assert_eq!(
            calculate_amrap_progression_with(&rules, &amrap(false), 6, BodyPart::Full),
            42.0
        );
    }

    #[test]
    fn test_pyramid_replays_actual_reps() {
        let exercise = Exercise::new("Pull up", ProgressionType::Pyramid, true, 0.0);
        let mut sets = completed(&[10, 7, 5, 5], 0.0);
        // Planned reps are irrelevant
        sets[0].planned_reps = 3;
        let refs: Vec<&WorkoutSet> = sets.iter().collect();

        assert_eq!(calculate_pyramid_progression(&exercise, &refs), vec![10, 7, 5, 5]);
    }

    #[test]
    fn test_pyramid_drops_sets_without_reps() {
        let exercise = Exercise::new("Pull up", ProgressionType::Pyramid, true, 0.0);
        let mut sets = completed(&[8, 6], 0.0);
        sets[1].actual_reps = None;
        let refs: Vec<&WorkoutSet> = sets.iter().collect();

        assert_eq!(calculate_pyramid_progression(&exercise, &refs), vec![8]);
    }

    #[test]
    fn test_apply_amrap_uses_last_completed_set() {
        let rules = ProgressionConfig::default();
        let mut exercise = amrap(false);
        let mut instance = WorkoutExerciseInstance::new(exercise.clone());
        instance.sets = completed(&[5, 5, 5, 11], 40.0);
        instance.sets.push(WorkoutSet::new(5, 40.0)); // never completed

        let now = Utc::now();
        let outcome = apply_progression(&rules, &mut exercise, &instance, BodyPart::Full, now);

        assert_eq!(exercise.current_weight, 45.0);
        assert_eq!(exercise.last_workout_date, Some(now));
        assert_eq!(
            outcome.change,
            ProgressionChange::Weight {
                from: 40.0,
                to: 45.0,
                final_set_reps: 11
            }
        );
    }

    #[test]
    fn test_apply_amrap_missing_reps_still_dates() {
        let rules = ProgressionConfig::default();
        let mut exercise = amrap(true);
        let mut instance = WorkoutExerciseInstance::new(exercise.clone());
        instance.sets = completed(&[5], 40.0);
        instance.sets[0].actual_reps = None;

        let outcome = apply_progression(&rules, &mut exercise, &instance, BodyPart::Full, Utc::now());

        assert_eq!(outcome.change, ProgressionChange::MissingFinalReps);
        assert_eq!(exercise.current_weight, 40.0);
        assert!(exercise.last_workout_date.is_some());
    }

    #[test]
    fn test_apply_pyramid_empty_completed_reps() {
        let rules = ProgressionConfig::default();
        let mut exercise = Exercise::new("Pull up", ProgressionType::Pyramid, true, 0.0);
        exercise.current_reps = Some(vec![8, 6]);
        let mut instance = WorkoutExerciseInstance::new(exercise.clone());
        instance.sets = completed(&[9], 0.0);
        instance.sets[0].actual_reps = None;

        apply_progression(&rules, &mut exercise, &instance, BodyPart::Full, Utc::now());

        assert_eq!(exercise.current_reps, Some(vec![]));
    }

    #[test]
    fn test_apply_free_only_moves_date() {
        let rules = ProgressionConfig::default();
        let mut exercise = Exercise::new("Curl", ProgressionType::Free, true, 12.0);
        exercise.current_reps = Some(vec![1, 2]);
        let before = exercise.clone();
        let mut instance = WorkoutExerciseInstance::new(exercise.clone());
        instance.sets = completed(&[5, 5, 5, 20], 12.0);

        let outcome = apply_progression(&rules, &mut exercise, &instance, BodyPart::Upper, Utc::now());

        assert_eq!(outcome.change, ProgressionChange::Manual);
        assert_eq!(exercise.current_weight, before.current_weight);
        assert_eq!(exercise.current_reps, before.current_reps);
        assert!(exercise.last_workout_date.is_some());
    }

    #[test]
    fn test_apply_no_completed_sets_touches_nothing() {
        let rules = ProgressionConfig::default();
        let mut exercise = amrap(true);
        let before = exercise.clone();
        let mut instance = WorkoutExerciseInstance::new(exercise.clone());
        instance.sets = vec![WorkoutSet::new(5, 40.0)];

        let outcome = apply_progression(&rules, &mut exercise, &instance, BodyPart::Full, Utc::now());

        assert_eq!(outcome.change, ProgressionChange::NoCompletedSets);
        assert_eq!(exercise, before);
    }

    #[test]
    fn test_dispatch_follows_instance_override() {
        let rules = ProgressionConfig::default();
        // Canonical exercise is pyramid, but this instance runs it as AMRAP
        let mut exercise = Exercise::new("Row", ProgressionType::Pyramid, true, 30.0);
        let mut instance =
            WorkoutExerciseInstance::new(exercise.clone()).with_progression_type(ProgressionType::Amrap);
        instance.sets = completed(&[5, 5, 5, 6], 30.0);

        apply_progression(&rules, &mut exercise, &instance, BodyPart::Full, Utc::now());

        assert_eq!(exercise.current_weight, 31.0);
        assert_eq!(exercise.current_reps, None);
    }
}
