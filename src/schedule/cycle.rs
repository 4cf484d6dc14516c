//! Cycle detection for proposed dependency edges

use std::collections::HashMap;

use crate::domain::{Task, TaskId, TaskSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    OnPath,
    Done,
}

struct Frame {
    node: TaskId,
    successors: Vec<TaskId>,
    next: usize,
}

/// Returns true if `source` depending on `proposed` would close a cycle
///
/// Walks the dependency graph depth-first from `source` as it would look
/// with `proposed` appended to `source`'s dependencies. A `source` outside
/// the set starts with the proposed edge only; unknown dependencies are
/// leaves.
pub fn would_create_cycle(tasks: &TaskSet, source: TaskId, proposed: TaskId) -> bool {
    let successors = |node: TaskId| {
        let mut deps = tasks.dependencies_of(node);
        if node == source {
            deps.push(proposed);
        }
        deps
    };

    let mut marks: HashMap<TaskId, Mark> = HashMap::new();
    marks.insert(source, Mark::OnPath);
    let mut stack = vec![Frame {
        node: source,
        successors: successors(source),
        next: 0,
    }];

    while let Some(frame) = stack.last_mut() {
        let Some(&dep) = frame.successors.get(frame.next) else {
            marks.insert(frame.node, Mark::Done);
            stack.pop();
            continue;
        };
        frame.next += 1;

        match marks.get(&dep).copied() {
            Some(Mark::OnPath) => {
                tracing::debug!(%source, %proposed, via = %dep, "dependency would close a cycle");
                return true;
            }
            Some(Mark::Done) => {}
            None => {
                marks.insert(dep, Mark::OnPath);
                stack.push(Frame {
                    node: dep,
                    successors: successors(dep),
                    next: 0,
                });
            }
        }
    }

    false
}

/// Tasks that `task_id` could depend on without creating a cycle
pub fn available_dependencies(tasks: &TaskSet, task_id: TaskId) -> Vec<&Task> {
    tasks
        .iter()
        .filter(|candidate| {
            candidate.id != task_id && !would_create_cycle(tasks, task_id, candidate.id)
        })
        .collect()
}
