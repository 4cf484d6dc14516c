//! # Scheduling Engine
//!
//! Pure functions over a [`TaskSet`] snapshot:
//!
//! | Component | Entry points |
//! |-----------|--------------|
//! | Cycle detector | [`would_create_cycle`], [`available_dependencies`] |
//! | Earliest start | [`earliest_start`], [`all_earliest_starts`] |
//! | Critical path | [`critical_path`], [`critical_path_report`], [`critical_path_strict`] |
//! | Validation | [`validate_dependencies`] |
//!
//! Nothing here performs I/O or keeps state between calls. The "now" used
//! as the scheduling baseline is always passed in by the caller.
//!
//! [`Scheduler`] bundles a [`ScheduleConfig`] and a baseline instant for
//! callers that want the configured behavior (strict cycle handling and the
//! task-count guard) without threading both through every call.

mod critical_path;
mod cycle;
mod earliest_start;
mod validate;

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Task, TaskId, TaskSet};

pub use critical_path::{critical_path, critical_path_report, critical_path_strict, CriticalPath};
pub use cycle::{available_dependencies, would_create_cycle};
pub use earliest_start::{all_earliest_starts, earliest_start, finish_date, EarliestStartCalculator};
pub use validate::{validate_dependencies, ValidationError};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScheduleError {
    #[error("Circular dependency detected at task {task}")]
    Cycle { task: TaskId },

    #[error("Task {task} depends on task {dependency}, which does not exist")]
    MissingDependency { task: TaskId, dependency: TaskId },

    #[error("Dependency cycles detected: {}", format_cycles(.0))]
    CyclesDetected(Vec<Vec<TaskId>>),

    #[error("Schedule for task {task} falls outside the supported date range")]
    DateOutOfRange { task: TaskId },

    #[error("Task set has {count} tasks, more than the configured limit of {limit}")]
    TooManyTasks { count: usize, limit: usize },
}

fn format_cycles(cycles: &[Vec<TaskId>]) -> String {
    let mut out = String::new();
    for (i, cycle) in cycles.iter().enumerate() {
        if i > 0 {
            out.push_str("; ");
        }
        let ids: Vec<String> = cycle.iter().map(ToString::to_string).collect();
        let _ = write!(out, "[{}]", ids.join(", "));
    }
    out
}

/// Scheduling behavior loaded from the `[schedule]` config section
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Fail critical-path queries when tasks are stuck behind a dependency
    /// cycle instead of silently leaving them out
    pub strict_cycles: bool,

    /// Largest task set the engine will accept
    pub max_tasks: usize,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            strict_cycles: false,
            max_tasks: 10_000,
        }
    }
}

/// Scheduling engine bound to a configuration and a baseline instant
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: ScheduleConfig,
    baseline: DateTime<Utc>,
}

impl Scheduler {
    /// Creates a scheduler that treats `baseline` as "now"
    pub fn new(config: ScheduleConfig, baseline: DateTime<Utc>) -> Self {
        Self { config, baseline }
    }

    /// The instant root tasks start at
    pub fn baseline(&self) -> DateTime<Utc> {
        self.baseline
    }

    /// The active configuration
    pub fn config(&self) -> &ScheduleConfig {
        &self.config
    }

    fn check_size(&self, tasks: &TaskSet) -> Result<(), ScheduleError> {
        if tasks.len() > self.config.max_tasks {
            return Err(ScheduleError::TooManyTasks {
                count: tasks.len(),
                limit: self.config.max_tasks,
            });
        }
        Ok(())
    }

    /// Earliest start of one task
    pub fn earliest_start(
        &self,
        tasks: &TaskSet,
        task_id: TaskId,
    ) -> Result<DateTime<Utc>, ScheduleError> {
        self.check_size(tasks)?;
        earliest_start(tasks, task_id, self.baseline)
    }

    /// Earliest start of every task, falling back to the baseline per task
    pub fn earliest_starts(
        &self,
        tasks: &TaskSet,
    ) -> Result<BTreeMap<TaskId, DateTime<Utc>>, ScheduleError> {
        self.check_size(tasks)?;
        Ok(all_earliest_starts(tasks, self.baseline))
    }

    /// Critical path, failing on stuck tasks when strict mode is on
    pub fn critical_path(&self, tasks: &TaskSet) -> Result<CriticalPath, ScheduleError> {
        self.check_size(tasks)?;
        if self.config.strict_cycles {
            critical_path_strict(tasks)
        } else {
            Ok(critical_path_report(tasks))
        }
    }

    /// Tasks that may become prerequisites of `task_id`
    pub fn available_dependencies<'a>(
        &self,
        tasks: &'a TaskSet,
        task_id: TaskId,
    ) -> Result<Vec<&'a Task>, ScheduleError> {
        self.check_size(tasks)?;
        Ok(available_dependencies(tasks, task_id))
    }

    /// Checks a proposed prerequisite list before it is stored
    pub fn validate(
        &self,
        tasks: &TaskSet,
        task_id: Option<TaskId>,
        proposed: &[TaskId],
    ) -> Result<(), ValidationError> {
        validate_dependencies(tasks, task_id, proposed)
    }
}
