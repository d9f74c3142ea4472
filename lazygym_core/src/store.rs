//! Durable storage for the gym state, with file locking.
//!
//! The state is kept as independent records in one data directory:
//! - `exercises.json` and `workout_templates.json` (JSON arrays)
//! - `workout_history.jsonl` (append-only, see [`crate::history`])
//! - `active_session.json` (present only while a workout is running)

use crate::history::HistoryLog;
use crate::{Error, Exercise, GymState, Result, WorkoutSession, WorkoutTemplate};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

pub const EXERCISES_FILE: &str = "exercises.json";
pub const TEMPLATES_FILE: &str = "workout_templates.json";
pub const HISTORY_FILE: &str = "workout_history.jsonl";
pub const ACTIVE_SESSION_FILE: &str = "active_session.json";

/// Storage backend used by the coordinator
pub trait Persistence {
    /// Load everything; missing records load as empty
    fn load(&mut self) -> Result<GymState>;

    fn save_exercises(&mut self, exercises: &[Exercise]) -> Result<()>;

    fn save_templates(&mut self, templates: &[WorkoutTemplate]) -> Result<()>;

    /// Record one finished session
    fn append_history(&mut self, session: &WorkoutSession) -> Result<()>;

    /// Replace the stored history wholesale
    fn save_history(&mut self, history: &[WorkoutSession]) -> Result<()>;

    /// Store or clear the active session record
    fn save_active_session(&mut self, session: Option<&WorkoutSession>) -> Result<()>;
}

/// File-backed store rooted at a data directory
pub struct FileStore {
    dir: PathBuf,
    history: HistoryLog,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let history = HistoryLog::new(dir.join(HISTORY_FILE));
        Self { dir, history }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

impl Persistence for FileStore {
    fn load(&mut self) -> Result<GymState> {
        Ok(GymState {
            exercises: load_json(&self.path(EXERCISES_FILE))?.unwrap_or_default(),
            templates: load_json(&self.path(TEMPLATES_FILE))?.unwrap_or_default(),
            history: self.history.read_all()?,
            active_session: load_json(&self.path(ACTIVE_SESSION_FILE))?,
        })
    }

    fn save_exercises(&mut self, exercises: &[Exercise]) -> Result<()> {
        save_json(&self.path(EXERCISES_FILE), &exercises)
    }

    fn save_templates(&mut self, templates: &[WorkoutTemplate]) -> Result<()> {
        save_json(&self.path(TEMPLATES_FILE), &templates)
    }

    fn append_history(&mut self, session: &WorkoutSession) -> Result<()> {
        self.history.append(session)
    }

    fn save_history(&mut self, history: &[WorkoutSession]) -> Result<()> {
        self.history.rewrite(history)
    }

    fn save_active_session(&mut self, session: Option<&WorkoutSession>) -> Result<()> {
        let path = self.path(ACTIVE_SESSION_FILE);
        match session {
            Some(session) => save_json(&path, session),
            None => {
                if path.exists() {
                    std::fs::remove_file(&path)?;
                    tracing::debug!("Cleared active session record {:?}", path);
                }
                Ok(())
            }
        }
    }
}

/// In-memory store; nothing survives the process
#[derive(Debug, Default)]
pub struct MemoryStore {
    pub state: GymState,
}

impl MemoryStore {
    pub fn new(state: GymState) -> Self {
        Self { state }
    }
}

impl Persistence for MemoryStore {
    fn load(&mut self) -> Result<GymState> {
        Ok(self.state.clone())
    }

    fn save_exercises(&mut self, exercises: &[Exercise]) -> Result<()> {
        self.state.exercises = exercises.to_vec();
        Ok(())
    }

    fn save_templates(&mut self, templates: &[WorkoutTemplate]) -> Result<()> {
        self.state.templates = templates.to_vec();
        Ok(())
    }

    fn append_history(&mut self, session: &WorkoutSession) -> Result<()> {
        self.state.history.push(session.clone());
        Ok(())
    }

    fn save_history(&mut self, history: &[WorkoutSession]) -> Result<()> {
        self.state.history = history.to_vec();
        Ok(())
    }

    fn save_active_session(&mut self, session: Option<&WorkoutSession>) -> Result<()> {
        self.state.active_session = session.cloned();
        Ok(())
    }
}

/// Load a JSON record with shared locking
///
/// Returns `None` if the file doesn't exist. An unreadable file is logged and
/// treated as absent. A file that is read but fails to parse is moved aside
/// (see [`quarantine`]) first, so a later save cannot replace the only copy.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        tracing::debug!("No record at {:?}", path);
        return Ok(None);
    }

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!("Unable to open {:?}: {}. Treating as empty.", path, e);
            return Ok(None);
        }
    };

    if let Err(e) = file.lock_shared() {
        tracing::warn!("Unable to lock {:?}: {}. Treating as empty.", path, e);
        return Ok(None);
    }

    let mut contents = String::new();
    let mut reader = std::io::BufReader::new(&file);
    if let Err(e) = reader.read_to_string(&mut contents) {
        let _ = file.unlock();
        tracing::warn!("Failed to read {:?}: {}. Treating as empty.", path, e);
        return Ok(None);
    }

    file.unlock()?;

    match serde_json::from_str::<T>(&contents) {
        Ok(value) => {
            tracing::debug!("Loaded {:?}", path);
            Ok(Some(value))
        }
        Err(_) if contents.trim().is_empty() => {
            tracing::warn!("Record {:?} is empty. Treating as absent.", path);
            Ok(None)
        }
        Err(e) => {
            let backup = quarantine(path)?;
            tracing::warn!(
                "Failed to parse {:?}: {}. Moved it to {:?}, treating as empty.",
                path,
                e,
                backup
            );
            Ok(None)
        }
    }
}

/// Rename an unparseable record to `<file>.corrupt`, numbering the backup
/// when earlier ones exist
pub fn quarantine(path: &Path) -> Result<PathBuf> {
    let file_name = path
        .file_name()
        .ok_or_else(|| Error::Other(format!("record path {:?} has no file name", path)))?
        .to_string_lossy()
        .into_owned();

    let mut backup = path.with_file_name(format!("{}.corrupt", file_name));
    let mut n = 1;
    while backup.exists() {
        backup = path.with_file_name(format!("{}.corrupt.{}", file_name, n));
        n += 1;
    }

    std::fs::rename(path, &backup)?;
    Ok(backup)
}

/// Save a JSON record atomically, see [`write_atomic`]
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    write_atomic(path, |writer| {
        serde_json::to_writer_pretty(&mut *writer, value)?;
        Ok(())
    })?;
    tracing::debug!("Saved {:?}", path);
    Ok(())
}

/// Replace `path` with whatever `write` produces, without a window in which
/// readers see a partial file
///
/// The contents go to a locked temp file in the same directory, which is
/// synced and then renamed over `path`.
pub fn write_atomic<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let parent = path
        .parent()
        .ok_or_else(|| Error::Other(format!("record path {:?} has no parent", path)))?;
    std::fs::create_dir_all(parent)?;

    let temp = NamedTempFile::new_in(parent)?;
    temp.as_file().lock_exclusive()?;
    {
        let mut writer = std::io::BufWriter::new(temp.as_file());
        write(&mut writer)?;
        writer.flush()?;
    }
    temp.as_file().sync_all()?;
    temp.as_file().unlock()?;

    temp.persist(path).map_err(|e| Error::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BodyPart, ProgressionType, WorkoutExerciseInstance};
    use chrono::Utc;

    fn sample_state() -> GymState {
        let squat = Exercise::new("Squat", ProgressionType::Amrap, false, 60.0);
        let template = WorkoutTemplate::new(
            "Legs",
            BodyPart::Lower,
            vec![WorkoutExerciseInstance::new(squat.clone())],
        );
        let mut done = WorkoutSession::new(template.clone(), Utc::now());
        done.finish(Utc::now());
        let active = WorkoutSession::new(template.clone(), Utc::now());

        GymState {
            exercises: vec![squat],
            templates: vec![template],
            history: vec![done],
            active_session: Some(active),
        }
    }

    fn persist_all(store: &mut impl Persistence, state: &GymState) {
        store.save_exercises(&state.exercises).unwrap();
        store.save_templates(&state.templates).unwrap();
        for session in &state.history {
            store.append_history(session).unwrap();
        }
        store.save_active_session(state.active_session.as_ref()).unwrap();
    }

    #[test]
    fn test_file_store_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = sample_state();

        let mut store = FileStore::new(temp_dir.path());
        persist_all(&mut store, &state);

        let loaded = FileStore::new(temp_dir.path()).load().unwrap();
        assert_eq!(loaded, state);
    }

    #[test]
    fn test_empty_dir_loads_default() {
        let temp_dir = tempfile::tempdir().unwrap();
        let loaded = FileStore::new(temp_dir.path().join("fresh")).load().unwrap();
        assert_eq!(loaded, GymState::default());
    }

    #[test]
    fn test_clearing_active_session_removes_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = sample_state();
        let mut store = FileStore::new(temp_dir.path());

        store.save_active_session(state.active_session.as_ref()).unwrap();
        assert!(temp_dir.path().join(ACTIVE_SESSION_FILE).exists());

        store.save_active_session(None).unwrap();
        assert!(!temp_dir.path().join(ACTIVE_SESSION_FILE).exists());
        assert!(store.load().unwrap().active_session.is_none());
    }

    #[test]
    fn test_corrupted_collection_is_moved_aside() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(EXERCISES_FILE);
        std::fs::write(&path, "{ invalid json }").unwrap();

        let loaded = FileStore::new(temp_dir.path()).load().unwrap();
        assert!(loaded.exercises.is_empty());
        assert!(!path.exists());

        let backup = temp_dir.path().join("exercises.json.corrupt");
        assert_eq!(std::fs::read_to_string(backup).unwrap(), "{ invalid json }");
    }

    #[test]
    fn test_quarantine_keeps_earlier_backups() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(ACTIVE_SESSION_FILE);

        std::fs::write(&path, "first").unwrap();
        assert!(load_json::<WorkoutSession>(&path).unwrap().is_none());
        std::fs::write(&path, "second").unwrap();
        assert!(load_json::<WorkoutSession>(&path).unwrap().is_none());

        let dir = temp_dir.path();
        assert_eq!(std::fs::read_to_string(dir.join("active_session.json.corrupt")).unwrap(), "first");
        assert_eq!(std::fs::read_to_string(dir.join("active_session.json.corrupt.1")).unwrap(), "second");
    }

    #[test]
    fn test_null_weight_record_survives_a_later_save() {
        let temp_dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(temp_dir.path());
        let mut lifts = vec![Exercise::new("MyLift", ProgressionType::Amrap, true, 80.0)];
        lifts[0].current_weight = f64::NAN;
        store.save_exercises(&lifts).unwrap();

        // serde_json writes NaN as null, which does not load back
        assert!(store.load().unwrap().exercises.is_empty());
        store.save_exercises(&[]).unwrap();

        let backup = std::fs::read_to_string(temp_dir.path().join("exercises.json.corrupt")).unwrap();
        assert!(backup.contains("MyLift"));
    }

    #[test]
    fn test_empty_record_is_not_quarantined() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(TEMPLATES_FILE);
        std::fs::write(&path, "  \n").unwrap();

        assert!(load_json::<Vec<WorkoutTemplate>>(&path).unwrap().is_none());
        assert!(path.exists());
        assert!(!temp_dir.path().join("workout_templates.json.corrupt").exists());
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join(EXERCISES_FILE);

        save_json(&path, &Vec::<Exercise>::new()).unwrap();

        assert!(path.exists());
        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != EXERCISES_FILE)
            .collect();
        assert!(extras.is_empty(), "Expected only {}, found extras: {:?}", EXERCISES_FILE, extras);
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let state = sample_state();
        let mut store = MemoryStore::default();
        persist_all(&mut store, &state);
        assert_eq!(store.load().unwrap(), state);
    }
}
