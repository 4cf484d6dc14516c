//! Earliest-start dates
//!
//! A task with no prerequisites starts at the baseline. Any other task
//! starts once its last prerequisite finishes: the latest of
//! `start(dep) + duration(dep)` over its dependencies, never before the
//! baseline. Durations are whole days.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, TimeDelta, Utc};

use super::ScheduleError;
use crate::domain::{TaskId, TaskSet};

/// Adds a duration in days to a start instant
pub fn finish_date(start: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    start.checked_add_signed(TimeDelta::try_days(i64::from(days))?)
}

#[derive(Debug, Clone)]
enum Visit {
    Active,
    Done(DateTime<Utc>),
    Failed(ScheduleError),
}

struct Frame {
    node: TaskId,
    deps: Vec<TaskId>,
    next: usize,
    latest: DateTime<Utc>,
}

/// Computes earliest starts over one task set snapshot
///
/// Results are memoized, so computing every task in a set visits each
/// dependency edge once. A task whose walk reaches a dependency cycle fails
/// with [`ScheduleError::Cycle`], as does every task that depends on it.
/// A dependency on a task outside the set never finishes, so the dependent
/// fails with [`ScheduleError::MissingDependency`].
pub struct EarliestStartCalculator<'a> {
    tasks: &'a TaskSet,
    baseline: DateTime<Utc>,
    visits: HashMap<TaskId, Visit>,
}

impl<'a> EarliestStartCalculator<'a> {
    pub fn new(tasks: &'a TaskSet, baseline: DateTime<Utc>) -> Self {
        Self {
            tasks,
            baseline,
            visits: HashMap::with_capacity(tasks.len()),
        }
    }

    /// Earliest start of a single task
    ///
    /// Tasks outside the set are treated as roots.
    pub fn earliest_start(&mut self, task_id: TaskId) -> Result<DateTime<Utc>, ScheduleError> {
        match self.visits.get(&task_id) {
            Some(Visit::Done(start)) => return Ok(*start),
            Some(Visit::Failed(err)) => return Err(err.clone()),
            _ => {}
        }

        self.visits.insert(task_id, Visit::Active);
        let mut stack = vec![self.frame(task_id)];

        while let Some(frame) = stack.last_mut() {
            let Some(&dep) = frame.deps.get(frame.next) else {
                let (node, latest) = (frame.node, frame.latest);
                stack.pop();
                self.visits.insert(node, Visit::Done(latest));
                continue;
            };

            if !self.tasks.contains(dep) {
                let err = ScheduleError::MissingDependency {
                    task: frame.node,
                    dependency: dep,
                };
                return Err(self.fail(&stack, err));
            }

            match self.visits.get(&dep).cloned() {
                Some(Visit::Done(dep_start)) => {
                    frame.next += 1;
                    let Some(dep_end) = finish_date(dep_start, self.tasks.duration_of(dep)) else {
                        let err = ScheduleError::DateOutOfRange { task: dep };
                        return Err(self.fail(&stack, err));
                    };
                    if dep_end > frame.latest {
                        frame.latest = dep_end;
                    }
                }
                Some(Visit::Active) => {
                    let err = ScheduleError::Cycle { task: dep };
                    return Err(self.fail(&stack, err));
                }
                Some(Visit::Failed(err)) => {
                    return Err(self.fail(&stack, err));
                }
                None => {
                    // Revisited as Done once the dependency's own frame completes
                    self.visits.insert(dep, Visit::Active);
                    let child = self.frame(dep);
                    stack.push(child);
                }
            }
        }

        match self.visits.get(&task_id) {
            Some(Visit::Done(start)) => Ok(*start),
            Some(Visit::Failed(err)) => Err(err.clone()),
            _ => Ok(self.baseline),
        }
    }

    fn frame(&self, node: TaskId) -> Frame {
        Frame {
            node,
            deps: self.tasks.dependencies_of(node),
            next: 0,
            latest: self.baseline,
        }
    }

    /// Marks every task on the active path as failed
    fn fail(&mut self, stack: &[Frame], err: ScheduleError) -> ScheduleError {
        for frame in stack {
            self.visits.insert(frame.node, Visit::Failed(err.clone()));
        }
        err
    }
}

/// Earliest start of a single task, with `baseline` as "now"
pub fn earliest_start(
    tasks: &TaskSet,
    task_id: TaskId,
    baseline: DateTime<Utc>,
) -> Result<DateTime<Utc>, ScheduleError> {
    EarliestStartCalculator::new(tasks, baseline).earliest_start(task_id)
}

/// Earliest start of every task in the set
///
/// Never fails as a whole: a task that cannot be scheduled is logged and
/// given the baseline.
pub fn all_earliest_starts(
    tasks: &TaskSet,
    baseline: DateTime<Utc>,
) -> BTreeMap<TaskId, DateTime<Utc>> {
    let mut calculator = EarliestStartCalculator::new(tasks, baseline);

    tasks
        .ids()
        .map(|id| {
            let start = calculator.earliest_start(id).unwrap_or_else(|err| {
                tracing::warn!(
                    task = %id,
                    error = %err,
                    "cannot compute earliest start, using baseline"
                );
                baseline
            });
            (id, start)
        })
        .collect()
}
