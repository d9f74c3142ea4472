//! Session and store coordinator.
//!
//! The [`Coordinator`] owns the whole [`GymState`] and is the only thing that
//! mutates it. Each operation validates against the current state, applies
//! its change in memory, then writes the affected records through the
//! [`Persistence`] backend:
//!
//! 1. A failed operation (bad index, no active session, ...) returns an error
//!    and leaves everything untouched.
//! 2. A failed write is logged and marks the coordinator dirty; memory stays
//!    authoritative and [`Coordinator::flush`] retries.
//! 3. After every successful mutation a [`StoreEvent`] is sent to subscribers.

use crate::analytics::{self, AnalyticsMetric, ProgressionPoint, WeeklyWorkoutCount, WorkoutStats};
use crate::progression::{apply_progression, ProgressionChange, ProgressionOutcome};
use crate::sets::generate_sets_for_exercise_instance;
use crate::store::Persistence;
use crate::{
    catalog, migration, BodyPart, Config, Error, Exercise, GymState, Result, WorkoutExerciseInstance,
    WorkoutSession, WorkoutSet, WorkoutTemplate,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::mpsc::{channel, Receiver, Sender};
use uuid::Uuid;

/// Published after each successful mutation
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreEvent {
    ExerciseAdded(Uuid),
    ExerciseUpdated(Uuid),
    ExerciseDeleted(Uuid),
    TemplateAdded(Uuid),
    TemplateUpdated(Uuid),
    TemplateDeleted(Uuid),
    SessionStarted(Uuid),
    SetCompleted {
        session_id: Uuid,
        exercise_index: usize,
        set_index: usize,
    },
    SetWeightUpdated {
        session_id: Uuid,
        instance_id: Uuid,
        set_index: usize,
    },
    SessionEnded(Uuid),
}

/// Non-fatal problems found while applying progression
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProgressionWarning {
    /// No canonical exercise matches the instance; it was skipped
    ExerciseNotFound {
        instance_id: Uuid,
        exercise_name: String,
    },
    /// AMRAP instance whose last completed set has no reps
    MissingFinalReps { exercise_name: String },
}

impl std::fmt::Display for ProgressionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProgressionWarning::ExerciseNotFound { exercise_name, .. } => {
                write!(f, "no stored exercise matches '{}', progression skipped", exercise_name)
            }
            ProgressionWarning::MissingFinalReps { exercise_name } => {
                write!(f, "'{}' final set has no reps, weight unchanged", exercise_name)
            }
        }
    }
}

/// What `end_session` did
#[derive(Clone, Debug, Serialize)]
pub struct SessionSummary {
    pub session: WorkoutSession,
    pub outcomes: Vec<ProgressionOutcome>,
    pub warnings: Vec<ProgressionWarning>,
}

/// Index of the canonical exercise an instance snapshot refers to
///
/// Id first; if the id is unknown, the first exercise with the same name.
/// With duplicate names the name fallback is ambiguous and picks the first.
fn resolve_exercise_index(exercises: &[Exercise], snapshot: &Exercise) -> Option<usize> {
    exercises
        .iter()
        .position(|e| e.id == snapshot.id)
        .or_else(|| exercises.iter().position(|e| e.name == snapshot.name))
}

/// Reject weights that cannot round-trip through the JSON records
fn check_weight(weight: f64) -> Result<()> {
    if weight.is_finite() && weight >= 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidWeight(weight))
    }
}

/// Single-writer owner of the gym state
pub struct Coordinator<S: Persistence> {
    state: GymState,
    config: Config,
    store: S,
    subscribers: Vec<Sender<StoreEvent>>,
    dirty: bool,
}

impl<S: Persistence> Coordinator<S> {
    /// Load state from `store`, seeding defaults and running configured
    /// migrations
    pub fn open(mut store: S, config: Config) -> Result<Self> {
        let mut state = store.load()?;

        let mut exercises_changed = false;
        if config.catalog.seed_defaults && state.exercises.is_empty() {
            tracing::info!("No exercises stored, adding defaults");
            state.exercises = catalog::default_exercises();
            exercises_changed = true;
        }
        if config.migration.backfill_body_part {
            exercises_changed |= migration::migrate_body_part(&mut state.exercises);
        }
        if exercises_changed {
            store.save_exercises(&state.exercises)?;
        }

        if config.catalog.seed_defaults && state.templates.is_empty() {
            if let Some(template) = catalog::default_template(&state.exercises) {
                tracing::info!("No workout templates stored, adding '{}'", template.name);
                state.templates.push(template);
                store.save_templates(&state.templates)?;
            }
        }

        for problem in catalog::validate_exercises(&state.exercises) {
            tracing::warn!("Exercise catalog: {}", problem);
        }

        tracing::info!(
            "Opened gym state: {} exercises, {} templates, {} sessions, active: {}",
            state.exercises.len(),
            state.templates.len(),
            state.history.len(),
            state.active_session.is_some()
        );

        Ok(Self {
            state,
            config,
            store,
            subscribers: Vec::new(),
            dirty: false,
        })
    }

    // ------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> &GymState {
        &self.state
    }

    pub fn exercises(&self) -> &[Exercise] {
        &self.state.exercises
    }

    pub fn templates(&self) -> &[WorkoutTemplate] {
        &self.state.templates
    }

    pub fn history(&self) -> &[WorkoutSession] {
        &self.state.history
    }

    pub fn active_session(&self) -> Option<&WorkoutSession> {
        self.state.active_session.as_ref()
    }

    /// True when some write failed and memory is ahead of storage
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn find_exercise(&self, id: Uuid) -> Option<&Exercise> {
        self.state.exercises.iter().find(|e| e.id == id)
    }

    /// First exercise with this name, case-insensitive
    pub fn find_exercise_by_name(&self, name: &str) -> Option<&Exercise> {
        self.state
            .exercises
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn find_template(&self, id: Uuid) -> Option<&WorkoutTemplate> {
        self.state.templates.iter().find(|t| t.id == id)
    }

    /// First template with this name, case-insensitive
    pub fn find_template_by_name(&self, name: &str) -> Option<&WorkoutTemplate> {
        self.state
            .templates
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Receive a [`StoreEvent`] after every successful mutation
    pub fn subscribe(&mut self) -> Receiver<StoreEvent> {
        let (tx, rx) = channel();
        self.subscribers.push(tx);
        rx
    }

    fn publish(&mut self, event: StoreEvent) {
        tracing::debug!("Publishing {:?}", event);
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn persist<F>(&mut self, what: &str, write: F)
    where
        F: FnOnce(&mut S, &GymState) -> Result<()>,
    {
        if let Err(e) = write(&mut self.store, &self.state) {
            tracing::error!("Failed to persist {}: {}. Keeping in-memory state.", what, e);
            self.dirty = true;
        }
    }

    /// Write every record, clearing the dirty flag on success
    pub fn flush(&mut self) -> Result<()> {
        self.store.save_exercises(&self.state.exercises)?;
        self.store.save_templates(&self.state.templates)?;
        self.store.save_history(&self.state.history)?;
        self.store
            .save_active_session(self.state.active_session.as_ref())?;
        self.dirty = false;
        tracing::info!("Flushed gym state to storage");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Exercises
    // ------------------------------------------------------------------

    pub fn add_exercise(&mut self, exercise: Exercise) -> Result<Uuid> {
        check_weight(exercise.current_weight)?;
        let id = exercise.id;
        tracing::info!("Adding exercise '{}'", exercise.name);
        self.state.exercises.push(exercise);
        self.persist("exercises", |store, state| store.save_exercises(&state.exercises));
        self.publish(StoreEvent::ExerciseAdded(id));
        Ok(id)
    }

    /// Replace the stored exercise with the same id
    pub fn update_exercise(&mut self, exercise: Exercise) -> Result<()> {
        check_weight(exercise.current_weight)?;
        let id = exercise.id;
        let slot = self
            .state
            .exercises
            .iter_mut()
            .find(|e| e.id == id)
            .ok_or_else(|| Error::ExerciseNotFound(id.to_string()))?;
        *slot = exercise;
        self.persist("exercises", |store, state| store.save_exercises(&state.exercises));
        self.publish(StoreEvent::ExerciseUpdated(id));
        Ok(())
    }

    /// Remove an exercise; templates keep their snapshots of it
    pub fn delete_exercise(&mut self, id: Uuid) -> Result<Exercise> {
        let index = self
            .state
            .exercises
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::ExerciseNotFound(id.to_string()))?;
        let removed = self.state.exercises.remove(index);
        tracing::info!("Deleted exercise '{}'", removed.name);
        self.persist("exercises", |store, state| store.save_exercises(&state.exercises));
        self.publish(StoreEvent::ExerciseDeleted(id));
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------

    /// Build a template whose instances wrap the given stored exercises
    pub fn build_template(
        &self,
        name: impl Into<String>,
        focus: BodyPart,
        exercise_ids: &[Uuid],
    ) -> Result<WorkoutTemplate> {
        let instances = exercise_ids
            .iter()
            .map(|id| {
                self.find_exercise(*id)
                    .cloned()
                    .map(WorkoutExerciseInstance::new)
                    .ok_or_else(|| Error::ExerciseNotFound(id.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(WorkoutTemplate::new(name, focus, instances))
    }

    pub fn add_template(&mut self, template: WorkoutTemplate) -> Uuid {
        let id = template.id;
        tracing::info!("Adding workout template '{}'", template.name);
        self.state.templates.push(template);
        self.persist("templates", |store, state| store.save_templates(&state.templates));
        self.publish(StoreEvent::TemplateAdded(id));
        id
    }

    /// Replace the stored template with the same id
    ///
    /// Running and historical sessions keep their own copies.
    pub fn update_template(&mut self, template: WorkoutTemplate) -> Result<()> {
        let id = template.id;
        let slot = self
            .state
            .templates
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| Error::TemplateNotFound(id.to_string()))?;
        *slot = template;
        self.persist("templates", |store, state| store.save_templates(&state.templates));
        self.publish(StoreEvent::TemplateUpdated(id));
        Ok(())
    }

    pub fn delete_template(&mut self, id: Uuid) -> Result<WorkoutTemplate> {
        let index = self
            .state
            .templates
            .iter()
            .position(|t| t.id == id)
            .ok_or_else(|| Error::TemplateNotFound(id.to_string()))?;
        let removed = self.state.templates.remove(index);
        tracing::info!("Deleted workout template '{}'", removed.name);
        self.persist("templates", |store, state| store.save_templates(&state.templates));
        self.publish(StoreEvent::TemplateDeleted(id));
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// Start a session from a stored template
    pub fn start_session(&mut self, template_id: Uuid) -> Result<&WorkoutSession> {
        let template = self
            .find_template(template_id)
            .cloned()
            .ok_or_else(|| Error::TemplateNotFound(template_id.to_string()))?;
        self.start_session_from(&template)
    }

    /// Start a session from a private copy of `template`
    ///
    /// Each instance's exercise is refreshed from the stored exercises so the
    /// session sees current weights and reps; instances without sets get
    /// generated ones. Fails if a session is already active.
    pub fn start_session_from(&mut self, template: &WorkoutTemplate) -> Result<&WorkoutSession> {
        if self.state.active_session.is_some() {
            return Err(Error::SessionAlreadyActive);
        }

        let mut snapshot = template.clone();
        for instance in &mut snapshot.exercise_instances {
            match resolve_exercise_index(&self.state.exercises, &instance.exercise) {
                Some(index) => instance.exercise = self.state.exercises[index].clone(),
                None => tracing::warn!(
                    "Exercise '{}' is no longer stored; using the template's copy",
                    instance.exercise.name
                ),
            }
            if instance.sets.is_empty() {
                instance.sets = generate_sets_for_exercise_instance(instance);
            }
            instance.refresh_completion();
        }

        let session = WorkoutSession::new(snapshot, Utc::now());
        let session_id = session.id;
        tracing::info!("Started session {} from '{}'", session_id, template.name);

        self.state.active_session = Some(session);
        self.persist("active session", |store, state| {
            store.save_active_session(state.active_session.as_ref())
        });
        self.publish(StoreEvent::SessionStarted(session_id));

        self.state.active_session.as_ref().ok_or(Error::NoActiveSession)
    }

    /// Record the reps performed on one set of the active session
    ///
    /// Marks the exercise instance completed when this was its last open set.
    pub fn complete_set(
        &mut self,
        exercise_index: usize,
        set_index: usize,
        actual_reps: u32,
    ) -> Result<WorkoutSet> {
        let now = Utc::now();
        let session = self
            .state
            .active_session
            .as_mut()
            .ok_or(Error::NoActiveSession)?;
        let session_id = session.id;

        let instances = &mut session.template.exercise_instances;
        let len = instances.len();
        let instance = instances
            .get_mut(exercise_index)
            .ok_or(Error::ExerciseIndexOutOfRange {
                index: exercise_index,
                len,
            })?;

        let set_len = instance.sets.len();
        let set = instance
            .sets
            .get_mut(set_index)
            .ok_or(Error::SetIndexOutOfRange {
                index: set_index,
                len: set_len,
            })?;
        if set.is_completed {
            return Err(Error::SetAlreadyCompleted {
                exercise_index,
                set_index,
            });
        }

        set.complete(actual_reps, now);
        let completed = set.clone();
        instance.refresh_completion();

        tracing::debug!(
            "Completed set {} of {} with {} reps",
            set_index + 1,
            instance.exercise.name,
            actual_reps
        );

        self.persist("active session", |store, state| {
            store.save_active_session(state.active_session.as_ref())
        });
        self.publish(StoreEvent::SetCompleted {
            session_id,
            exercise_index,
            set_index,
        });

        Ok(completed)
    }

    /// Change the weight of one set in the active session
    ///
    /// `instance_id` is the exercise instance id; the id of the exercise it
    /// wraps is accepted as well.
    pub fn update_set_weight(&mut self, instance_id: Uuid, set_index: usize, new_weight: f64) -> Result<()> {
        check_weight(new_weight)?;
        let session = self
            .state
            .active_session
            .as_mut()
            .ok_or(Error::NoActiveSession)?;
        let session_id = session.id;

        let instances = &mut session.template.exercise_instances;
        let position = instances
            .iter()
            .position(|i| i.id == instance_id)
            .or_else(|| instances.iter().position(|i| i.exercise.id == instance_id))
            .ok_or(Error::ExerciseInstanceNotFound(instance_id))?;
        let instance = &mut instances[position];

        let set_len = instance.sets.len();
        let set = instance
            .sets
            .get_mut(set_index)
            .ok_or(Error::SetIndexOutOfRange {
                index: set_index,
                len: set_len,
            })?;
        set.weight = new_weight;

        tracing::info!(
            "Updated weight for {} set {} to {}kg",
            instance.exercise.name,
            set_index + 1,
            new_weight
        );
        let instance_id = instance.id;

        self.persist("active session", |store, state| {
            store.save_active_session(state.active_session.as_ref())
        });
        self.publish(StoreEvent::SetWeightUpdated {
            session_id,
            instance_id,
            set_index,
        });
        Ok(())
    }

    /// Finish the active session and apply progression
    ///
    /// For every instance with completed sets, the matching stored exercise
    /// (by id, else by name) is progressed according to the instance's
    /// progression type. The session is appended to history and the active
    /// slot cleared. Used for both "complete" and "exit".
    pub fn end_session(&mut self) -> Result<SessionSummary> {
        let mut session = self
            .state
            .active_session
            .clone()
            .ok_or(Error::NoActiveSession)?;
        let now = Utc::now();
        session.finish(now);

        let mut exercises = self.state.exercises.clone();
        let focus = session.template.focus;
        let mut outcomes = Vec::new();
        let mut warnings = Vec::new();

        for instance in &session.template.exercise_instances {
            if instance.completed_sets().is_empty() {
                tracing::debug!("No completed sets for {}, skipping", instance.exercise.name);
                continue;
            }

            let Some(index) = resolve_exercise_index(&exercises, &instance.exercise) else {
                tracing::warn!(
                    "No stored exercise matches '{}', skipping progression",
                    instance.exercise.name
                );
                warnings.push(ProgressionWarning::ExerciseNotFound {
                    instance_id: instance.id,
                    exercise_name: instance.exercise.name.clone(),
                });
                continue;
            };

            let outcome = apply_progression(
                &self.config.progression,
                &mut exercises[index],
                instance,
                focus,
                now,
            );
            if outcome.change == ProgressionChange::MissingFinalReps {
                warnings.push(ProgressionWarning::MissingFinalReps {
                    exercise_name: outcome.exercise_name.clone(),
                });
            }
            outcomes.push(outcome);
        }

        let session_id = session.id;
        self.state.exercises = exercises;
        self.state.history.push(session.clone());
        self.state.active_session = None;

        self.persist("exercises", |store, state| store.save_exercises(&state.exercises));
        self.persist("history", |store, _| store.append_history(&session));
        self.persist("active session", |store, _| store.save_active_session(None));
        self.publish(StoreEvent::SessionEnded(session_id));

        tracing::info!(
            "Ended session {}: {} progression updates, {} warnings",
            session_id,
            outcomes.len(),
            warnings.len()
        );

        Ok(SessionSummary {
            session,
            outcomes,
            warnings,
        })
    }

    // ------------------------------------------------------------------
    // Analytics
    // ------------------------------------------------------------------

    pub fn stats(&self) -> WorkoutStats {
        self.stats_at(Utc::now())
    }

    pub fn stats_at(&self, now: DateTime<Utc>) -> WorkoutStats {
        analytics::workout_stats(
            &self.state.history,
            self.config.analytics.stats_window_weeks,
            now,
        )
    }

    /// Weekly workout counts; `weeks` defaults to the configured timeframe
    pub fn frequency(&self, weeks: Option<u32>) -> Vec<WeeklyWorkoutCount> {
        let weeks = weeks.unwrap_or(self.config.analytics.default_timeframe_weeks);
        analytics::workout_frequency(&self.state.history, weeks, Utc::now())
    }

    /// Metric series for one exercise; `weeks` defaults to the configured
    /// timeframe
    pub fn progression(
        &self,
        exercise: &Exercise,
        metric: AnalyticsMetric,
        weeks: Option<u32>,
    ) -> Vec<ProgressionPoint> {
        let weeks = weeks.unwrap_or(self.config.analytics.default_timeframe_weeks);
        analytics::exercise_progression(&self.state.history, exercise, metric, weeks, Utc::now())
    }
}
