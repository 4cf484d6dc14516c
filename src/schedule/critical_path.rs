//! Critical path over relative project days
//!
//! Kahn's topological traversal with longest-path tracking. Every root task
//! starts at day 0; a dependent starts at the latest end offset among its
//! prerequisites. The path ends at the first task (in processing order) to
//! reach the largest end offset and is rebuilt from predecessor links.
//!
//! A predecessor link is overwritten whenever a prerequisite's end offset
//! matches the dependent's current start, so among equally late
//! prerequisites the one processed last wins.

use std::collections::{HashMap, VecDeque};

use serde::Serialize;

use super::ScheduleError;
use crate::domain::{DependencyGraph, TaskId, TaskSet};

/// Result of a critical-path computation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CriticalPath {
    /// Tasks on the path, root first
    pub tasks: Vec<TaskId>,

    /// End offset of the last task on the path, in days
    pub length_days: u64,

    /// Number of tasks the traversal reached
    pub processed: usize,

    /// Number of tasks in the input
    pub total: usize,
}

impl CriticalPath {
    /// Number of tasks never reached because they sit on or behind a cycle
    pub fn starved(&self) -> usize {
        self.total.saturating_sub(self.processed)
    }

    /// Returns true if the task is on the path
    pub fn contains(&self, task_id: TaskId) -> bool {
        self.tasks.contains(&task_id)
    }
}

/// Ordered task IDs on the critical path; empty for an empty set
pub fn critical_path(tasks: &TaskSet) -> Vec<TaskId> {
    critical_path_report(tasks).tasks
}

/// Critical path with its length and traversal coverage
///
/// Tasks on a dependency cycle, or waiting on a task outside the set, never
/// become ready and are left out without error. So are their dependents.
pub fn critical_path_report(tasks: &TaskSet) -> CriticalPath {
    let mut dependents: HashMap<TaskId, Vec<TaskId>> = HashMap::with_capacity(tasks.len());
    let mut in_degree: HashMap<TaskId, usize> = HashMap::with_capacity(tasks.len());

    for id in tasks.ids() {
        dependents.insert(id, Vec::new());
        in_degree.insert(id, 0);
    }

    for task in tasks {
        for dep in task.dependency_ids() {
            // A missing prerequisite never finishes, so its edge is never released
            if tasks.contains(dep) {
                dependents.entry(dep).or_default().push(task.id);
            }
            *in_degree.entry(task.id).or_insert(0) += 1;
        }
    }

    let mut start: HashMap<TaskId, u64> = HashMap::with_capacity(tasks.len());
    let mut predecessor: HashMap<TaskId, TaskId> = HashMap::new();
    let mut queue: VecDeque<TaskId> = VecDeque::new();

    for id in tasks.ids() {
        if in_degree.get(&id).copied().unwrap_or(0) == 0 {
            queue.push_back(id);
            start.insert(id, 0);
        }
    }

    let mut max_end: u64 = 0;
    let mut terminus: Option<TaskId> = None;
    let mut processed = 0usize;

    while let Some(current) = queue.pop_front() {
        processed += 1;
        let current_end = start
            .get(&current)
            .copied()
            .unwrap_or(0)
            .saturating_add(u64::from(tasks.duration_of(current)));

        if current_end > max_end {
            max_end = current_end;
            terminus = Some(current);
        }

        let Some(neighbors) = dependents.get(&current) else {
            continue;
        };

        for &neighbor in neighbors {
            let remaining = in_degree.entry(neighbor).or_insert(0);
            *remaining = remaining.saturating_sub(1);
            let ready = *remaining == 0;

            let neighbor_start = start.get(&neighbor).copied().unwrap_or(0).max(current_end);
            start.insert(neighbor, neighbor_start);

            if ready {
                queue.push_back(neighbor);
            }

            if neighbor_start == current_end {
                predecessor.insert(neighbor, current);
            }
        }
    }

    if processed < tasks.len() {
        tracing::debug!(
            processed,
            total = tasks.len(),
            "critical path skipped tasks stuck behind a dependency cycle"
        );
    }

    let mut path = Vec::new();
    let mut cursor = terminus;
    while let Some(id) = cursor {
        if path.len() > tasks.len() {
            break;
        }
        path.push(id);
        cursor = predecessor.get(&id).copied();
    }
    path.reverse();

    CriticalPath {
        tasks: path,
        length_days: max_end,
        processed,
        total: tasks.len(),
    }
}

/// Critical path that fails instead of leaving out tasks stuck on a cycle
pub fn critical_path_strict(tasks: &TaskSet) -> Result<CriticalPath, ScheduleError> {
    let report = critical_path_report(tasks);
    if report.starved() == 0 {
        return Ok(report);
    }

    let cycles = DependencyGraph::from_task_set(tasks).cycles();
    if cycles.is_empty() {
        if let Some(&(task, dependency)) = tasks.dangling_references().first() {
            return Err(ScheduleError::MissingDependency { task, dependency });
        }
    }
    Err(ScheduleError::CyclesDetected(cycles))
}
