//! Core domain types for LazyGym.
//!
//! This module defines the fundamental types used throughout the system:
//! - Exercises and their progression scheme
//! - Sets, exercise instances and workout templates
//! - Workout sessions and the aggregate gym state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// Enumerations
// ============================================================================

/// How an exercise advances from one session to the next
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ProgressionType {
    /// 3x5 plus one set to failure; weight follows the failure set
    Amrap,
    /// Replays last session's reps, or a percentage ladder of base reps
    Pyramid,
    /// Same sets as Amrap, progressed manually
    Free,
}

impl ProgressionType {
    pub const ALL: [ProgressionType; 3] = [
        ProgressionType::Amrap,
        ProgressionType::Pyramid,
        ProgressionType::Free,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            ProgressionType::Amrap => "AMRAP",
            ProgressionType::Pyramid => "Pyramid",
            ProgressionType::Free => "Free",
        }
    }
}

impl std::str::FromStr for ProgressionType {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "amrap" => Ok(ProgressionType::Amrap),
            "pyramid" => Ok(ProgressionType::Pyramid),
            "free" => Ok(ProgressionType::Free),
            other => Err(crate::Error::Other(format!(
                "Unknown progression type: {}",
                other
            ))),
        }
    }
}

/// Body region an exercise trains, also used as a workout's focus
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum BodyPart {
    Upper,
    Lower,
    #[default]
    Full,
}

impl BodyPart {
    pub fn display_name(&self) -> &'static str {
        match self {
            BodyPart::Upper => "Upper",
            BodyPart::Lower => "Lower",
            BodyPart::Full => "Full",
        }
    }
}

impl std::str::FromStr for BodyPart {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s.to_lowercase().as_str() {
            "upper" => Ok(BodyPart::Upper),
            "lower" => Ok(BodyPart::Lower),
            "full" | "full_body" | "fullbody" => Ok(BodyPart::Full),
            other => Err(crate::Error::Other(format!("Unknown body part: {}", other))),
        }
    }
}

// ============================================================================
// Exercise
// ============================================================================

fn default_base_reps() -> u32 {
    10
}

/// A canonical exercise definition and its progression state
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Exercise {
    pub id: Uuid,
    pub name: String,
    pub progression_type: ProgressionType,
    /// Deprecated alias of `body_part`, kept for stored data that predates it
    #[serde(default)]
    pub is_upper_body: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_part: Option<BodyPart>,
    /// Working weight in kilograms
    pub current_weight: f64,
    #[serde(default = "default_base_reps")]
    pub base_reps: u32,
    /// Reps achieved on each set of the last pyramid session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_reps: Option<Vec<u32>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_workout_date: Option<DateTime<Utc>>,
}

impl Exercise {
    pub fn new(
        name: impl Into<String>,
        progression_type: ProgressionType,
        is_upper_body: bool,
        current_weight: f64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            progression_type,
            is_upper_body,
            body_part: None,
            current_weight,
            base_reps: default_base_reps(),
            current_reps: None,
            last_workout_date: None,
        }
    }

    pub fn with_base_reps(mut self, base_reps: u32) -> Self {
        self.base_reps = base_reps;
        self
    }

    pub fn with_body_part(mut self, body_part: BodyPart) -> Self {
        self.body_part = Some(body_part);
        self
    }
}

// ============================================================================
// Sets
// ============================================================================

/// One planned (and possibly performed) set
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSet {
    pub id: Uuid,
    /// Target reps; 0 means "to failure"
    pub planned_reps: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_reps: Option<u32>,
    pub weight: f64,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkoutSet {
    pub fn new(planned_reps: u32, weight: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            planned_reps,
            actual_reps: None,
            weight,
            is_completed: false,
            completed_at: None,
        }
    }

    pub fn is_to_failure(&self) -> bool {
        self.planned_reps == 0
    }

    /// Record the performed reps. Callers check `is_completed` first.
    pub fn complete(&mut self, actual_reps: u32, at: DateTime<Utc>) {
        self.actual_reps = Some(actual_reps);
        self.completed_at = Some(at);
        self.is_completed = true;
    }
}

// ============================================================================
// Exercise instances and templates
// ============================================================================

/// An exercise as it appears inside a template or session, with overrides
///
/// `exercise` is a snapshot; its `id` is the key back into the canonical
/// exercise collection.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutExerciseInstance {
    pub id: Uuid,
    pub exercise: Exercise,
    pub progression_type: ProgressionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amrap_weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pyramid_base_reps: Option<u32>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub sets: Vec<WorkoutSet>,
    #[serde(default)]
    pub is_completed: bool,
}

impl WorkoutExerciseInstance {
    /// Wrap an exercise with no overrides
    pub fn new(exercise: Exercise) -> Self {
        let progression_type = exercise.progression_type;
        Self {
            id: Uuid::new_v4(),
            exercise,
            progression_type,
            amrap_weight: None,
            pyramid_base_reps: None,
            notes: String::new(),
            sets: Vec::new(),
            is_completed: false,
        }
    }

    pub fn with_progression_type(mut self, progression_type: ProgressionType) -> Self {
        self.progression_type = progression_type;
        self
    }

    pub fn with_amrap_weight(mut self, weight: f64) -> Self {
        self.amrap_weight = Some(weight);
        self
    }

    pub fn with_pyramid_base_reps(mut self, base_reps: u32) -> Self {
        self.pyramid_base_reps = Some(base_reps);
        self
    }

    pub fn effective_progression_type(&self) -> ProgressionType {
        self.progression_type
    }

    /// Working weight for this instance
    pub fn effective_weight(&self) -> f64 {
        match (self.progression_type, self.amrap_weight) {
            (ProgressionType::Amrap, Some(weight)) => weight,
            _ => self.exercise.current_weight,
        }
    }

    pub fn effective_base_reps(&self) -> u32 {
        match (self.progression_type, self.pyramid_base_reps) {
            (ProgressionType::Pyramid, Some(base_reps)) => base_reps,
            _ => self.exercise.base_reps,
        }
    }

    pub fn completed_sets(&self) -> Vec<&WorkoutSet> {
        self.sets.iter().filter(|s| s.is_completed).collect()
    }

    /// Recompute `is_completed` from the sets
    pub fn refresh_completion(&mut self) {
        self.is_completed = !self.sets.is_empty() && self.sets.iter().all(|s| s.is_completed);
    }
}

/// A reusable workout definition
///
/// Decoding goes through [`crate::migration::StoredTemplate`] so that
/// templates stored in the legacy `exercises` shape are migrated on load.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(from = "crate::migration::StoredTemplate")]
pub struct WorkoutTemplate {
    pub id: Uuid,
    pub name: String,
    pub focus: BodyPart,
    pub exercise_instances: Vec<WorkoutExerciseInstance>,
    pub created_date: DateTime<Utc>,
}

impl WorkoutTemplate {
    pub fn new(
        name: impl Into<String>,
        focus: BodyPart,
        exercise_instances: Vec<WorkoutExerciseInstance>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            focus,
            exercise_instances,
            created_date: Utc::now(),
        }
    }
}

// ============================================================================
// Sessions and state
// ============================================================================

/// A performed (or in-progress) workout
///
/// Owns a private copy of its template; edits to the template definition do
/// not reach an in-flight or historical session.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WorkoutSession {
    pub id: Uuid,
    pub template: WorkoutTemplate,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub is_completed: bool,
}

impl WorkoutSession {
    pub fn new(template: WorkoutTemplate, start_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            template,
            start_time,
            end_time: None,
            is_completed: false,
        }
    }

    pub fn exercise_instances(&self) -> &[WorkoutExerciseInstance] {
        &self.template.exercise_instances
    }

    pub fn finish(&mut self, at: DateTime<Utc>) {
        self.end_time = Some(at);
        self.is_completed = true;
    }
}

/// Everything the coordinator owns: three collections plus the active slot
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GymState {
    pub exercises: Vec<Exercise>,
    pub templates: Vec<WorkoutTemplate>,
    pub history: Vec<WorkoutSession>,
    pub active_session: Option<WorkoutSession>,
}
