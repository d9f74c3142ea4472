//! Corruption recovery tests for the lazygym binary.
//!
//! These tests verify the system can handle:
//! - Corrupted collection files
//! - Corrupted or partial history lines
//! - A corrupted active session record
//! - Empty files and unreadable files

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::io::Write as IoWrite;
use std::path::Path;
use tempfile::TempDir;

fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

fn lazygym(data_dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("lazygym"));
    cmd.arg("--data-dir")
        .arg(data_dir)
        .env("XDG_CONFIG_HOME", data_dir.join("config-home"))
        .env_remove("RUST_LOG");
    cmd
}

fn finish_one_workout(data_dir: &Path) {
    lazygym(data_dir)
        .args(["start", "Full Body Workout"])
        .assert()
        .success();
    lazygym(data_dir)
        .args(["complete", "1", "1", "5"])
        .assert()
        .success();
    lazygym(data_dir).arg("end").assert().success();
}

#[test]
fn test_corrupted_exercises_file() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    fs::write(data_dir.join("exercises.json"), "{ invalid json }}}}")
        .expect("Failed to write corrupted exercises");

    // Unparseable collection loads as empty and is reseeded
    lazygym(data_dir)
        .args(["exercise", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Squat"));

    let contents = fs::read_to_string(data_dir.join("exercises.json")).unwrap();
    let parsed: Result<serde_json::Value, _> = serde_json::from_str(&contents);
    assert!(parsed.is_ok(), "Exercises should be valid JSON again");

    // The unparseable original is kept next to the new file
    let backup = fs::read_to_string(data_dir.join("exercises.json.corrupt")).unwrap();
    assert_eq!(backup, "{ invalid json }}}}");
}

#[test]
fn test_unloadable_exercises_are_not_overwritten_by_seeding() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    // A weight stored as null parses as a broken collection
    let stored = r#"[{
        "id": "8f9619ff-8b86-d011-b42d-00c04fc964ff",
        "name": "MyLift",
        "progression_type": "amrap",
        "is_upper_body": true,
        "current_weight": null
    }]"#;
    fs::write(data_dir.join("exercises.json"), stored).unwrap();

    lazygym(data_dir).args(["exercise", "list"]).assert().success();

    let backup = fs::read_to_string(data_dir.join("exercises.json.corrupt")).unwrap();
    assert!(backup.contains("MyLift"), "User exercise was lost");
}

#[test]
fn test_corrupted_history_line_ignored_during_read() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    finish_one_workout(data_dir);

    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(data_dir.join("workout_history.jsonl"))
        .unwrap();
    writeln!(file, "{{ invalid json }}").unwrap();
    drop(file);

    lazygym(data_dir)
        .arg("stats")
        .assert()
        .success()
        .stdout(predicate::str::contains("Total workouts:     1"));
}

#[test]
fn test_partial_history_line() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    finish_one_workout(data_dir);

    // Simulate a crash in the middle of an append
    let mut file = fs::OpenOptions::new()
        .append(true)
        .open(data_dir.join("workout_history.jsonl"))
        .unwrap();
    write!(file, r#"{{"id":"partial"#).unwrap();
    drop(file);

    lazygym(data_dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("Full Body Workout"));
}

#[test]
fn test_corrupted_active_session() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    fs::write(data_dir.join("active_session.json"), "corrupted").unwrap();

    lazygym(data_dir)
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No workout session is active"));

    // A new workout replaces the broken record
    lazygym(data_dir)
        .args(["start", "Full Body Workout"])
        .assert()
        .success();

    let contents = fs::read_to_string(data_dir.join("active_session.json")).unwrap();
    let parsed: Result<serde_json::Value, _> = serde_json::from_str(&contents);
    assert!(parsed.is_ok(), "Active session should be valid JSON");
}

#[test]
fn test_empty_files() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    fs::write(data_dir.join("workout_history.jsonl"), "").unwrap();
    fs::write(data_dir.join("workout_templates.json"), "").unwrap();

    lazygym(data_dir)
        .args(["template", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Full Body Workout"));

    lazygym(data_dir)
        .arg("history")
        .assert()
        .success()
        .stdout(predicate::str::contains("No workouts yet."));
}

#[test]
fn test_legacy_template_is_migrated() {
    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    // Templates written before exercise instances existed
    let legacy = r#"[{
        "id": "6f9619ff-8b86-d011-b42d-00c04fc964ff",
        "name": "Old Legs",
        "focus": "lower",
        "created_date": "2025-01-01T00:00:00Z",
        "exercises": [{
            "id": "7f9619ff-8b86-d011-b42d-00c04fc964ff",
            "exercise": {
                "id": "8f9619ff-8b86-d011-b42d-00c04fc964ff",
                "name": "Squat",
                "progression_type": "amrap",
                "is_upper_body": false,
                "current_weight": 70.0
            },
            "sets": [],
            "is_completed": false
        }]
    }]"#;
    fs::write(data_dir.join("workout_templates.json"), legacy).unwrap();

    lazygym(data_dir)
        .args(["template", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Old Legs (Lower): Squat"));

    // The legacy exercise weight becomes the instance's AMRAP weight
    lazygym(data_dir)
        .args(["start", "Old Legs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("5 reps @ 70.0kg"));
}

#[test]
fn test_permission_denied_exercises() {
    // Skip on Windows (permission model is different)
    if cfg!(windows) {
        return;
    }

    let temp_dir = setup_test_dir();
    let data_dir = temp_dir.path();

    lazygym(data_dir).args(["exercise", "list"]).assert().success();

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let path = data_dir.join("exercises.json");
        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o000);
        fs::set_permissions(&path, perms).unwrap();

        // Unreadable collection is treated as empty, never a crash
        lazygym(data_dir)
            .args(["template", "list"])
            .assert()
            .success();

        let mut perms = fs::metadata(&path).unwrap().permissions();
        perms.set_mode(0o644);
        fs::set_permissions(&path, perms).unwrap();
    }
}
