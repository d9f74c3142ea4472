//! Planned set generation for a freshly started exercise instance.

use crate::{ProgressionType, WorkoutExerciseInstance, WorkoutSet};

/// Reps for the straight sets before the AMRAP/Free failure set
pub const STRAIGHT_SET_REPS: u32 = 5;
/// Number of straight sets before the failure set
pub const STRAIGHT_SET_COUNT: usize = 3;
/// Percentages of base reps used when a pyramid has no history yet
pub const PYRAMID_LADDER_PERCENTAGES: [u32; 4] = [100, 70, 50, 50];

/// `pct` percent of `base_reps`, floored
///
/// Never more than `base_reps` for the ladder percentages, so the narrowing
/// back to `u32` is lossless.
fn ladder_reps(base_reps: u32, pct: u32) -> u32 {
    let reps = u64::from(base_reps) * u64::from(pct) / 100;
    u32::try_from(reps).unwrap_or(u32::MAX)
}

/// Build the planned sets for an exercise instance
///
/// - AMRAP / Free: three sets of 5 then one set to failure
/// - Pyramid: one set per rep count from last session, or a 100/70/50/50%
///   ladder of the base reps (floored) when there is no history
///
/// Every set carries the instance's effective weight.
pub fn generate_sets_for_exercise_instance(instance: &WorkoutExerciseInstance) -> Vec<WorkoutSet> {
    let weight = instance.effective_weight();

    let sets: Vec<WorkoutSet> = match instance.effective_progression_type() {
        ProgressionType::Amrap | ProgressionType::Free => std::iter::repeat(STRAIGHT_SET_REPS)
            .take(STRAIGHT_SET_COUNT)
            .chain(std::iter::once(0))
            .map(|reps| WorkoutSet::new(reps, weight))
            .collect(),

        ProgressionType::Pyramid => match instance.exercise.current_reps.as_deref() {
            Some(previous) if !previous.is_empty() => previous
                .iter()
                .map(|reps| WorkoutSet::new(*reps, weight))
                .collect(),
            _ => {
                let base_reps = instance.effective_base_reps();
                PYRAMID_LADDER_PERCENTAGES
                    .iter()
                    .map(|pct| WorkoutSet::new(ladder_reps(base_reps, *pct), weight))
                    .collect()
            }
        },
    };

    tracing::debug!(
        "Generated sets for {}: {:?}",
        instance.exercise.name,
        sets.iter().map(|s| s.planned_reps).collect::<Vec<_>>()
    );

    sets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Exercise;

    fn planned(sets: &[WorkoutSet]) -> Vec<u32> {
        sets.iter().map(|s| s.planned_reps).collect()
    }

    #[test]
    fn test_amrap_sets() {
        let exercise = Exercise::new("Squat", ProgressionType::Amrap, false, 60.0);
        let sets = generate_sets_for_exercise_instance(&WorkoutExerciseInstance::new(exercise));

        assert_eq!(planned(&sets), vec![5, 5, 5, 0]);
        assert!(sets.iter().all(|s| s.weight == 60.0 && !s.is_completed));
        assert!(sets[3].is_to_failure());
    }

    #[test]
    fn test_amrap_sets_use_override_weight() {
        let exercise = Exercise::new("Squat", ProgressionType::Amrap, false, 60.0);
        let instance = WorkoutExerciseInstance::new(exercise).with_amrap_weight(70.0);
        let sets = generate_sets_for_exercise_instance(&instance);

        assert!(sets.iter().all(|s| s.weight == 70.0));
    }

    #[test]
    fn test_free_sets_match_amrap_shape() {
        let exercise = Exercise::new("Curl", ProgressionType::Free, true, 12.0);
        let sets = generate_sets_for_exercise_instance(&WorkoutExerciseInstance::new(exercise));

        assert_eq!(planned(&sets), vec![5, 5, 5, 0]);
        assert!(sets.iter().all(|s| s.weight == 12.0));
    }

    #[test]
    fn test_pyramid_ladder_without_history() {
        let exercise = Exercise::new("Pull up", ProgressionType::Pyramid, true, 0.0).with_base_reps(10);
        let sets = generate_sets_for_exercise_instance(&WorkoutExerciseInstance::new(exercise));

        assert_eq!(planned(&sets), vec![10, 7, 5, 5]);
    }

    #[test]
    fn test_pyramid_ladder_floors() {
        let exercise = Exercise::new("Kettlebell swing", ProgressionType::Pyramid, false, 24.0)
            .with_base_reps(15);
        let sets = generate_sets_for_exercise_instance(&WorkoutExerciseInstance::new(exercise));

        // 70% of 15 = 10.5, 50% of 15 = 7.5
        assert_eq!(planned(&sets), vec![15, 10, 7, 7]);
        assert!(sets.iter().all(|s| s.weight == 24.0));
    }

    #[test]
    fn test_pyramid_ladder_with_huge_base_reps() {
        let exercise = Exercise::new("Dips", ProgressionType::Pyramid, true, 0.0)
            .with_base_reps(50_000_000);
        let sets = generate_sets_for_exercise_instance(&WorkoutExerciseInstance::new(exercise));
        assert_eq!(planned(&sets), vec![50_000_000, 35_000_000, 25_000_000, 25_000_000]);

        let exercise = Exercise::new("Dips", ProgressionType::Pyramid, true, 0.0)
            .with_base_reps(u32::MAX);
        let sets = generate_sets_for_exercise_instance(&WorkoutExerciseInstance::new(exercise));
        assert_eq!(sets[0].planned_reps, u32::MAX);
        assert_eq!(sets[2].planned_reps, u32::MAX / 2);
    }

    #[test]
    fn test_pyramid_ladder_uses_base_reps_override() {
        let exercise = Exercise::new("Pull up", ProgressionType::Pyramid, true, 0.0).with_base_reps(10);
        let instance = WorkoutExerciseInstance::new(exercise).with_pyramid_base_reps(8);
        let sets = generate_sets_for_exercise_instance(&instance);

        assert_eq!(planned(&sets), vec![8, 5, 4, 4]);
    }

    #[test]
    fn test_pyramid_replays_previous_reps() {
        let mut exercise = Exercise::new("Pull up", ProgressionType::Pyramid, true, 0.0);
        exercise.current_reps = Some(vec![12, 9, 6, 6]);
        let sets = generate_sets_for_exercise_instance(&WorkoutExerciseInstance::new(exercise));

        assert_eq!(planned(&sets), vec![12, 9, 6, 6]);
    }

    #[test]
    fn test_pyramid_replay_keeps_any_length() {
        let mut exercise = Exercise::new("Dips", ProgressionType::Pyramid, true, 0.0);
        exercise.current_reps = Some(vec![11, 8]);
        let sets = generate_sets_for_exercise_instance(&WorkoutExerciseInstance::new(exercise));

        assert_eq!(planned(&sets), vec![11, 8]);
    }

    #[test]
    fn test_pyramid_empty_history_falls_back_to_ladder() {
        let mut exercise = Exercise::new("Dips", ProgressionType::Pyramid, true, 0.0).with_base_reps(10);
        exercise.current_reps = Some(vec![]);
        let sets = generate_sets_for_exercise_instance(&WorkoutExerciseInstance::new(exercise));

        assert_eq!(planned(&sets), vec![10, 7, 5, 5]);
    }
}
