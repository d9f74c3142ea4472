//! Append-only workout history log.
//!
//! Finished sessions are stored one JSON object per line. Writers (appends
//! and whole-log rewrites) serialize on an exclusive lock held on a sidecar
//! `<log>.lock` file. The log itself is replaced by rename during a rewrite,
//! so a lock on the log's own inode would not keep a waiting appender from
//! writing into the unlinked copy.

use crate::store::write_atomic;
use crate::{Result, WorkoutSession};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

/// JSONL-backed history of finished sessions
pub struct HistoryLog {
    path: PathBuf,
    lock_path: PathBuf,
}

/// Held while writing; the lock is released when dropped
pub(crate) struct WriteGuard(File);

impl Drop for WriteGuard {
    fn drop(&mut self) {
        if let Err(e) = self.0.unlock() {
            tracing::warn!("Failed to release history lock: {}", e);
        }
    }
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut lock_name = path.file_name().unwrap_or_default().to_os_string();
        lock_name.push(".lock");
        let lock_path = path.with_file_name(lock_name);
        Self { path, lock_path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Block until no other writer holds the log
    pub(crate) fn lock_for_write(&self) -> Result<WriteGuard> {
        if let Some(parent) = self.lock_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .open(&self.lock_path)?;
        file.lock_exclusive()?;
        Ok(WriteGuard(file))
    }

    /// Append one session as a JSON line
    pub fn append(&self, session: &WorkoutSession) -> Result<()> {
        let mut line = serde_json::to_vec(session)?;
        line.push(b'\n');

        let _guard = self.lock_for_write()?;
        // One write call per line so readers never see half a record
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?
            .write_all(&line)?;

        tracing::debug!("Appended session {} to history", session.id);
        Ok(())
    }

    /// Replace the whole log atomically
    ///
    /// Used to resynchronize the file with memory after a failed append.
    pub fn rewrite(&self, sessions: &[WorkoutSession]) -> Result<()> {
        let _guard = self.lock_for_write()?;
        self.rewrite_locked(sessions)
    }

    /// Rewrite while the caller already holds [`Self::lock_for_write`]
    pub(crate) fn rewrite_locked(&self, sessions: &[WorkoutSession]) -> Result<()> {
        write_atomic(&self.path, |writer| {
            for session in sessions {
                serde_json::to_writer(&mut *writer, session)?;
                writer.write_all(b"\n")?;
            }
            Ok(())
        })?;

        tracing::debug!("Rewrote history with {} sessions", sessions.len());
        Ok(())
    }

    /// Read every session in the log
    pub fn read_all(&self) -> Result<Vec<WorkoutSession>> {
        read_sessions(&self.path)
    }
}

/// Read all sessions from a history file
///
/// Blank lines are ignored. Lines that fail to parse, typically the tail of
/// an append cut short by a crash, are skipped with a warning.
pub fn read_sessions(path: &Path) -> Result<Vec<WorkoutSession>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut sessions = Vec::new();
    let mut skipped = 0;
    for (index, line) in BufReader::new(file).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<WorkoutSession>(&line) {
            Ok(session) => sessions.push(session),
            Err(e) => {
                skipped += 1;
                tracing::warn!("Skipping history line {}: {}", index + 1, e);
            }
        }
    }

    tracing::debug!(
        "Read {} sessions from {:?} ({} skipped)",
        sessions.len(),
        path,
        skipped
    );
    Ok(sessions)
}
