//! Error types for the lazygym_core library.

use std::io;
use uuid::Uuid;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for lazygym_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// An operation needed an active session but none is running
    #[error("No workout session is active")]
    NoActiveSession,

    /// Only one session may be active at a time
    #[error("A workout session is already active")]
    SessionAlreadyActive,

    #[error("Exercise index {index} out of range (session has {len} exercises)")]
    ExerciseIndexOutOfRange { index: usize, len: usize },

    #[error("Set index {index} out of range (exercise has {len} sets)")]
    SetIndexOutOfRange { index: usize, len: usize },

    /// Completion fields are written exactly once
    #[error("Set {set_index} of exercise {exercise_index} is already completed")]
    SetAlreadyCompleted {
        exercise_index: usize,
        set_index: usize,
    },

    /// No exercise instance with this id in the active session
    #[error("Exercise instance {0} not found in the active session")]
    ExerciseInstanceNotFound(Uuid),

    /// Canonical exercise lookup failed
    #[error("Exercise not found: {0}")]
    ExerciseNotFound(String),

    /// Workout template lookup failed
    #[error("Workout template not found: {0}")]
    TemplateNotFound(String),

    /// Weights must be finite and not negative
    #[error("Invalid weight: {0}")]
    InvalidWeight(f64),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for errors caused by the caller addressing state that does not
    /// exist or is in the wrong phase, as opposed to I/O or decoding faults.
    pub fn is_state_error(&self) -> bool {
        matches!(
            self,
            Error::NoActiveSession
                | Error::SessionAlreadyActive
                | Error::ExerciseIndexOutOfRange { .. }
                | Error::SetIndexOutOfRange { .. }
                | Error::SetAlreadyCompleted { .. }
                | Error::ExerciseInstanceNotFound(_)
                | Error::ExerciseNotFound(_)
                | Error::TemplateNotFound(_)
                | Error::InvalidWeight(_)
        )
    }
}
