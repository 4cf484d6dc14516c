//! Task domain model
//!
//! A task is a schedulable unit of work with a duration (in whole days) and
//! zero or more prerequisite tasks. Prerequisites are persisted as an encoded
//! string (a JSON array of task IDs) and decoded on every read.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::id::TaskId;

/// Duration assumed when none is stored or the stored value is not positive
pub const DEFAULT_DURATION_DAYS: u32 = 1;

#[derive(Debug, Error, PartialEq)]
pub enum TaskError {
    #[error("Title is required")]
    EmptyTitle,

    #[error("Duration must be at least one day, got {0}")]
    InvalidDuration(i64),
}

/// Decodes a stored dependency field into task IDs
///
/// Absent, blank or malformed data yields an empty list: a task whose
/// dependencies cannot be read is treated as a root task.
pub fn parse_dependency_ids(encoded: Option<&str>) -> Vec<TaskId> {
    let Some(raw) = encoded else {
        return Vec::new();
    };
    if raw.trim().is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<Vec<TaskId>>(raw) {
        Ok(ids) => ids,
        Err(err) => {
            tracing::debug!(encoded = raw, error = %err, "ignoring malformed dependency data");
            Vec::new()
        }
    }
}

/// Encodes task IDs for storage; an empty list is stored as absent
pub fn encode_dependency_ids(ids: &[TaskId]) -> Option<String> {
    if ids.is_empty() {
        return None;
    }
    // A slice of integers always serializes
    serde_json::to_string(ids).ok()
}

/// Returns true if the stored dependency field is present but cannot be decoded
pub fn is_malformed_dependency_data(encoded: Option<&str>) -> bool {
    match encoded {
        None => false,
        Some(raw) if raw.trim().is_empty() => false,
        Some(raw) => serde_json::from_str::<Vec<TaskId>>(raw).is_err(),
    }
}

fn default_duration() -> i64 {
    i64::from(DEFAULT_DURATION_DAYS)
}

/// A todo item that can take part in the dependency schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier
    pub id: TaskId,

    /// Human-readable title
    pub title: String,

    /// Planned duration in days
    #[serde(default = "default_duration")]
    pub duration: i64,

    /// Encoded prerequisite task IDs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependency_ids: Option<String>,

    /// Optional due date
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<NaiveDate>,

    /// Decorative image URL
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    /// When the task was created
    pub created_at: DateTime<Utc>,
}

impl Task {
    /// Creates a new root task with the default duration
    pub fn new(id: TaskId, title: impl Into<String>) -> Result<Self, TaskError> {
        let title = title.into();
        let title = title.trim();
        if title.is_empty() {
            return Err(TaskError::EmptyTitle);
        }

        Ok(Self {
            id,
            title: title.to_string(),
            duration: default_duration(),
            dependency_ids: None,
            due_date: None,
            image_url: None,
            created_at: Utc::now(),
        })
    }

    /// Sets the planned duration in days
    pub fn with_duration(mut self, days: i64) -> Result<Self, TaskError> {
        if days <= 0 {
            return Err(TaskError::InvalidDuration(days));
        }
        self.duration = days;
        Ok(self)
    }

    /// Sets the prerequisite tasks
    pub fn with_dependencies(mut self, ids: &[TaskId]) -> Self {
        self.set_dependencies(ids);
        self
    }

    /// Sets the due date
    pub fn with_due_date(mut self, due: NaiveDate) -> Self {
        self.due_date = Some(due);
        self
    }

    /// Duration used for scheduling; non-positive or oversized values fall back to one day
    pub fn effective_duration(&self) -> u32 {
        u32::try_from(self.duration)
            .ok()
            .filter(|days| *days > 0)
            .unwrap_or(DEFAULT_DURATION_DAYS)
    }

    /// Decoded prerequisite IDs, in stored order
    pub fn dependency_ids(&self) -> Vec<TaskId> {
        parse_dependency_ids(self.dependency_ids.as_deref())
    }

    /// Replaces the prerequisite list
    pub fn set_dependencies(&mut self, ids: &[TaskId]) {
        self.dependency_ids = encode_dependency_ids(ids);
    }

    /// Appends a prerequisite; returns false if it was already present
    pub fn add_dependency(&mut self, id: TaskId) -> bool {
        let mut ids = self.dependency_ids();
        if ids.contains(&id) {
            return false;
        }
        ids.push(id);
        self.set_dependencies(&ids);
        true
    }

    /// Removes a prerequisite; returns false if it was not present
    pub fn remove_dependency(&mut self, id: TaskId) -> bool {
        let mut ids = self.dependency_ids();
        let before = ids.len();
        ids.retain(|dep| *dep != id);
        if ids.len() == before {
            return false;
        }
        self.set_dependencies(&ids);
        true
    }

    /// Returns true if the due date lies before `today`
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.due_date.is_some_and(|due| due < today)
    }
}
