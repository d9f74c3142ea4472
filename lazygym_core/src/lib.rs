#![forbid(unsafe_code)]

//! Core domain model and business logic for the LazyGym workout tracker.
//!
//! This crate provides:
//! - Domain types (exercises, templates, sessions, sets)
//! - Progression engine (AMRAP, Pyramid, Free)
//! - Set generation for new sessions
//! - Session/store coordinator with pluggable persistence
//! - Analytics over workout history
//! - Default catalog, legacy migration and export

pub mod types;
pub mod error;
pub mod config;
pub mod logging;
pub mod migration;
pub mod progression;
pub mod sets;
pub mod history;
pub mod store;
pub mod catalog;
pub mod analytics;
pub mod coordinator;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use config::Config;
pub use progression::{apply_progression, calculate_amrap_progression, calculate_pyramid_progression};
pub use sets::generate_sets_for_exercise_instance;
pub use store::{FileStore, MemoryStore, Persistence};
pub use coordinator::{Coordinator, ProgressionWarning, SessionSummary, StoreEvent};
pub use analytics::{AnalyticsMetric, ProgressionPoint, WeeklyWorkoutCount, WorkoutStats};
pub use export::ExportBundle;
