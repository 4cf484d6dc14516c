//! CLI integration tests for todo
//!
//! These tests drive the binary end to end: project setup, task editing,
//! and the scheduling queries built on top of the stored tasks.

use chrono::{DateTime, Utc};
use predicates::prelude::*;
use serde_json::Value;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Get a command instance for the todo binary, isolated from user config
fn todo_cmd(home: &Path) -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::new(assert_cmd::cargo::cargo_bin!("todo"));
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("TODO_LOG");
    cmd
}

/// Create a temporary directory and initialize a todo project
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    todo_cmd(dir.path()).arg("init").arg(dir.path()).assert().success();
    dir
}

/// Run a command in the project and parse its JSON stdout
fn run_json(dir: &TempDir, args: &[&str]) -> Value {
    let output = todo_cmd(dir.path())
        .current_dir(dir.path())
        .args(args)
        .args(["--format", "json"])
        .output()
        .unwrap();
    assert!(
        output.status.success(),
        "command {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    serde_json::from_slice(&output.stdout).unwrap()
}

fn add(dir: &TempDir, args: &[&str]) {
    todo_cmd(dir.path())
        .current_dir(dir.path())
        .args(["task", "add"])
        .args(args)
        .assert()
        .success();
}

fn ids(value: &Value) -> Vec<u64> {
    value
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_u64().unwrap())
        .collect()
}

fn start_of(schedule: &Value, id: u64) -> DateTime<Utc> {
    let row = schedule
        .as_array()
        .unwrap()
        .iter()
        .find(|row| row["id"].as_u64() == Some(id))
        .unwrap();
    row["earliest_start"].as_str().unwrap().parse().unwrap()
}

// =============================================================================
// Initialization Tests
// =============================================================================

#[test]
fn test_init_creates_structure() {
    let dir = TempDir::new().unwrap();

    todo_cmd(dir.path())
        .arg("init")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Initialized todo project"));

    assert!(dir.path().join(".todo").is_dir());
    assert!(dir.path().join(".todo/config.toml").is_file());
    assert!(dir.path().join(".todo/tasks.jsonl").is_file());
}

#[test]
fn test_init_is_idempotent() {
    let dir = TempDir::new().unwrap();

    todo_cmd(dir.path()).arg("init").arg(dir.path()).assert().success();
    todo_cmd(dir.path()).arg("init").arg(dir.path()).assert().success();
}

#[test]
fn test_commands_outside_project_fail() {
    let dir = TempDir::new().unwrap();

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .args(["task", "list"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("todo init"));
}

// =============================================================================
// Task Tests
// =============================================================================

#[test]
fn test_add_assigns_sequential_ids() {
    let dir = setup_project();

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .args(["task", "add", "Buy paint"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created task 1: Buy paint"));

    let created = run_json(
        &dir,
        &["task", "add", "Paint walls", "--after", "1", "--duration", "2"],
    );
    assert_eq!(created["id"], 2);
    assert_eq!(created["duration"], 2);
    assert_eq!(ids(&created["depends_on"]), vec![1]);
}

#[test]
fn test_add_rejects_empty_title() {
    let dir = setup_project();

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .args(["task", "add", "   "])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Title is required"));
}

#[test]
fn test_add_rejects_zero_duration() {
    let dir = setup_project();

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .args(["task", "add", "Nap", "--duration", "0"])
        .assert()
        .failure();
}

#[test]
fn test_add_rejects_missing_dependency() {
    let dir = setup_project();
    add(&dir, &["First"]);

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .args(["task", "add", "Second", "--after", "9"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Dependency task 9 does not exist"));

    let list = run_json(&dir, &["task", "list"]);
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[test]
fn test_dep_rejects_cycle() {
    let dir = setup_project();
    add(&dir, &["A"]);
    add(&dir, &["B", "--after", "1"]);
    add(&dir, &["C", "--after", "2"]);

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .args(["task", "dep", "1", "3"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("circular dependency"));

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .args(["task", "dep", "2", "2"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("circular dependency"));

    let shown = run_json(&dir, &["task", "show", "1"]);
    assert!(ids(&shown["depends_on"]).is_empty());
}

#[test]
fn test_dep_and_undep() {
    let dir = setup_project();
    add(&dir, &["A"]);
    add(&dir, &["B"]);

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .args(["task", "dep", "2", "1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2 now depends on 1"));

    let shown = run_json(&dir, &["task", "show", "1"]);
    assert_eq!(ids(&shown["dependents"]), vec![2]);

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .args(["task", "undep", "2", "1"])
        .assert()
        .success();

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .args(["task", "undep", "2", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("does not depend on"));
}

#[test]
fn test_rm_detaches_dependents() {
    let dir = setup_project();
    add(&dir, &["A"]);
    add(&dir, &["B", "--after", "1"]);

    let removed = run_json(&dir, &["task", "rm", "1"]);
    assert_eq!(ids(&removed["detached"]), vec![2]);

    let shown = run_json(&dir, &["task", "show", "2"]);
    assert!(ids(&shown["depends_on"]).is_empty());

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .args(["task", "show", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Task not found: 1"));
}

#[test]
fn test_list_marks_critical_tasks() {
    let dir = setup_project();
    add(&dir, &["A", "--duration", "2"]);
    add(&dir, &["B", "--duration", "3", "--after", "1"]);
    add(&dir, &["C"]);

    let list = run_json(&dir, &["task", "list"]);
    let rows = list.as_array().unwrap();
    assert_eq!(rows.len(), 3);

    let critical: Vec<u64> = rows
        .iter()
        .filter(|row| row["critical"] == true)
        .map(|row| row["id"].as_u64().unwrap())
        .collect();
    assert_eq!(critical.len(), 2);
    assert!(critical.contains(&1) && critical.contains(&2));

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .args(["task", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("on the critical path"));
}

#[test]
fn test_list_flags_overdue_tasks() {
    let dir = setup_project();
    add(&dir, &["Old", "--due", "2000-01-01"]);
    add(&dir, &["Future", "--due", "2999-01-01"]);

    let list = run_json(&dir, &["task", "list"]);
    let overdue: Vec<u64> = list
        .as_array()
        .unwrap()
        .iter()
        .filter(|row| row["overdue"] == true)
        .map(|row| row["id"].as_u64().unwrap())
        .collect();
    assert_eq!(overdue, vec![1]);
}

// =============================================================================
// Scheduling Tests
// =============================================================================

#[test]
fn test_critical_path_picks_longest_chain() {
    let dir = setup_project();
    add(&dir, &["A", "--duration", "2"]);
    add(&dir, &["B", "--duration", "3", "--after", "1"]);
    add(&dir, &["C", "--duration", "1"]);

    let path = run_json(&dir, &["critical-path"]);
    assert_eq!(ids(&path["path"]), vec![1, 2]);
    assert_eq!(path["length_days"], 5);
    assert_eq!(path["starved"], 0);

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .arg("critical-path")
        .assert()
        .success()
        .stdout(predicate::str::contains("Critical path (2 tasks, 5 days)"));
}

#[test]
fn test_critical_path_empty_project() {
    let dir = setup_project();

    let path = run_json(&dir, &["critical-path"]);
    assert!(ids(&path["path"]).is_empty());

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .arg("critical-path")
        .assert()
        .success()
        .stdout(predicate::str::contains("No critical path"));
}

#[test]
fn test_schedule_chain_offsets() {
    let dir = setup_project();
    add(&dir, &["A", "--duration", "2"]);
    add(&dir, &["B", "--duration", "3", "--after", "1"]);
    add(&dir, &["C", "--after", "2"]);
    add(&dir, &["D"]);

    let schedule = run_json(&dir, &["schedule"]);
    let a = start_of(&schedule, 1);
    assert_eq!(start_of(&schedule, 2) - a, chrono::TimeDelta::days(2));
    assert_eq!(start_of(&schedule, 3) - a, chrono::TimeDelta::days(5));
    assert_eq!(start_of(&schedule, 4), a);
}

#[test]
fn test_available_excludes_cycle_closers() {
    let dir = setup_project();
    add(&dir, &["A"]);
    add(&dir, &["B", "--after", "1"]);
    add(&dir, &["C", "--after", "2"]);
    add(&dir, &["D"]);

    let for_first = run_json(&dir, &["available", "1"]);
    let candidates: Vec<u64> = for_first
        .as_array()
        .unwrap()
        .iter()
        .map(|row| row["id"].as_u64().unwrap())
        .collect();
    assert_eq!(candidates, vec![4]);

    let for_new = run_json(&dir, &["available"]);
    assert_eq!(for_new.as_array().unwrap().len(), 4);
}

// =============================================================================
// Corrupted Store Tests
// =============================================================================

fn write_cyclic_store(dir: &TempDir) {
    let lines = [
        r#"{"id":1,"title":"A","dependency_ids":"[2]","created_at":"2024-01-01T00:00:00Z"}"#,
        r#"{"id":2,"title":"B","dependency_ids":"[1]","created_at":"2024-01-02T00:00:00Z"}"#,
        r#"{"id":3,"title":"C","duration":4,"created_at":"2024-01-03T00:00:00Z"}"#,
    ];
    fs::write(dir.path().join(".todo/tasks.jsonl"), lines.join("\n") + "\n").unwrap();
}

#[test]
fn test_critical_path_skips_cycles_silently() {
    let dir = setup_project();
    write_cyclic_store(&dir);

    let path = run_json(&dir, &["critical-path"]);
    assert_eq!(ids(&path["path"]), vec![3]);
    assert_eq!(path["starved"], 2);
}

#[test]
fn test_critical_path_strict_reports_cycles() {
    let dir = setup_project();
    write_cyclic_store(&dir);

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .args(["critical-path", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Dependency cycles detected: [1, 2]"));
}

#[test]
fn test_missing_dependency_blocks_dependents() {
    let dir = setup_project();
    let lines = [
        r#"{"id":1,"title":"A","duration":2,"created_at":"2024-01-01T00:00:00Z"}"#,
        r#"{"id":2,"title":"B","dependency_ids":"[99]","created_at":"2024-01-02T00:00:00Z"}"#,
    ];
    fs::write(dir.path().join(".todo/tasks.jsonl"), lines.join("\n") + "\n").unwrap();

    let path = run_json(&dir, &["critical-path"]);
    assert_eq!(ids(&path["path"]), vec![1]);
    assert_eq!(path["length_days"], 2);
    assert_eq!(path["starved"], 1);

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .args(["critical-path", "--strict"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("depends on task 99, which does not exist"));

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .args(["task", "show", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Earliest start: unschedulable"));
}

#[test]
fn test_schedule_survives_cycles() {
    let dir = setup_project();
    write_cyclic_store(&dir);

    let schedule = run_json(&dir, &["schedule"]);
    assert_eq!(schedule.as_array().unwrap().len(), 3);
    assert_eq!(start_of(&schedule, 1), start_of(&schedule, 3));
}

#[test]
fn test_check_reports_problems() {
    let dir = setup_project();
    write_cyclic_store(&dir);

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .arg("check")
        .assert()
        .failure()
        .stdout(predicate::str::contains("Cycle: 1 -> 2"))
        .stderr(predicate::str::contains("dependency problem"));
}

#[test]
fn test_check_clean_project() {
    let dir = setup_project();
    add(&dir, &["A"]);
    add(&dir, &["B", "--after", "1"]);

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("no problems found"));
}

#[test]
fn test_strict_config_applies_without_flag() {
    let dir = setup_project();
    write_cyclic_store(&dir);
    fs::write(
        dir.path().join(".todo/config.toml"),
        "[schedule]\nstrict_cycles = true\n",
    )
    .unwrap();

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .arg("critical-path")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Dependency cycles detected"));
}

#[test]
fn test_verbose_logs_to_stderr() {
    let dir = setup_project();

    todo_cmd(dir.path())
        .current_dir(dir.path())
        .args(["--verbose", "schedule", "--format", "json"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with("[]"))
        .stderr(predicate::str::contains("DEBUG"));
}
