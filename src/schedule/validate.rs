//! Validation of proposed dependency lists

use thiserror::Error;

use super::cycle::would_create_cycle;
use crate::domain::{TaskId, TaskSet};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum ValidationError {
    #[error("Dependency task {0} does not exist")]
    DependencyNotFound(TaskId),

    #[error("Task {task} cannot depend on task {dependency}: that would create a circular dependency")]
    CycleDetected { task: TaskId, dependency: TaskId },
}

/// Checks a proposed dependency list for `task_id` against the current set
///
/// Every proposed ID must exist. When the task already has an ID, every
/// proposed edge is also cycle-checked. A simple cycle through the task
/// leaves it by exactly one edge, so checking edges one at a time is
/// enough. `None` stands for a task that has not been created yet, which
/// nothing can depend on.
pub fn validate_dependencies(
    tasks: &TaskSet,
    task_id: Option<TaskId>,
    proposed: &[TaskId],
) -> Result<(), ValidationError> {
    if let Some(missing) = proposed.iter().find(|id| !tasks.contains(**id)) {
        return Err(ValidationError::DependencyNotFound(*missing));
    }

    let Some(task_id) = task_id else {
        return Ok(());
    };

    for &dependency in proposed {
        if would_create_cycle(tasks, task_id, dependency) {
            return Err(ValidationError::CycleDetected {
                task: task_id,
                dependency,
            });
        }
    }

    Ok(())
}
