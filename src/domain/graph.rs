//! Task sets and dependency graphs
//!
//! [`TaskSet`] is the read-only snapshot every scheduling call receives.
//! [`DependencyGraph`] is a petgraph view over a snapshot used to report
//! integrity problems (cycles) that the scheduling engine itself only
//! tolerates.

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use std::collections::HashMap;

use super::id::TaskId;
use super::task::{is_malformed_dependency_data, Task, DEFAULT_DURATION_DAYS};

/// An ordered collection of tasks keyed by ID
///
/// Iteration follows insertion order, which is the order the scheduling
/// engine seeds its traversals in. Inserting a task whose ID is already
/// present replaces it in place.
#[derive(Debug, Clone, Default)]
pub struct TaskSet {
    tasks: Vec<Task>,
    index: HashMap<TaskId, usize>,
}

impl TaskSet {
    /// Creates an empty task set
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a task
    pub fn insert(&mut self, task: Task) {
        match self.index.get(&task.id) {
            Some(&pos) => {
                if let Some(slot) = self.tasks.get_mut(pos) {
                    *slot = task;
                }
            }
            None => {
                self.index.insert(task.id, self.tasks.len());
                self.tasks.push(task);
            }
        }
    }

    /// Looks up a task by ID
    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.index.get(&id).and_then(|&pos| self.tasks.get(pos))
    }

    /// Returns true if the set contains the task
    pub fn contains(&self, id: TaskId) -> bool {
        self.index.contains_key(&id)
    }

    /// Returns the number of tasks
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    /// Returns true if the set is empty
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Iterates over tasks in insertion order
    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.iter()
    }

    /// Iterates over task IDs in insertion order
    pub fn ids(&self) -> impl Iterator<Item = TaskId> + '_ {
        self.tasks.iter().map(|t| t.id)
    }

    /// Decoded dependencies of a task; unknown tasks have none
    pub fn dependencies_of(&self, id: TaskId) -> Vec<TaskId> {
        self.get(id).map(Task::dependency_ids).unwrap_or_default()
    }

    /// Scheduling duration of a task; unknown tasks take the default
    pub fn duration_of(&self, id: TaskId) -> u32 {
        self.get(id)
            .map(Task::effective_duration)
            .unwrap_or(DEFAULT_DURATION_DAYS)
    }

    /// Dependency references that point at tasks outside the set, as
    /// `(task, missing dependency)` pairs
    pub fn dangling_references(&self) -> Vec<(TaskId, TaskId)> {
        self.tasks
            .iter()
            .flat_map(|task| {
                task.dependency_ids()
                    .into_iter()
                    .filter(|dep| !self.contains(*dep))
                    .map(move |dep| (task.id, dep))
            })
            .collect()
    }

    /// Tasks whose stored dependency field cannot be decoded
    pub fn malformed_tasks(&self) -> Vec<TaskId> {
        self.tasks
            .iter()
            .filter(|task| is_malformed_dependency_data(task.dependency_ids.as_deref()))
            .map(|task| task.id)
            .collect()
    }
}

impl FromIterator<Task> for TaskSet {
    fn from_iter<I: IntoIterator<Item = Task>>(iter: I) -> Self {
        let mut set = Self::new();
        for task in iter {
            set.insert(task);
        }
        set
    }
}

impl<'a> IntoIterator for &'a TaskSet {
    type Item = &'a Task;
    type IntoIter = std::slice::Iter<'a, Task>;

    fn into_iter(self) -> Self::IntoIter {
        self.tasks.iter()
    }
}

/// A dependency graph over a task set
///
/// Edges run from prerequisite to dependent. References to tasks outside
/// the set are left out.
#[derive(Debug, Default)]
pub struct DependencyGraph {
    /// The underlying directed graph
    graph: DiGraph<TaskId, ()>,

    /// Map from TaskId to node index
    node_map: HashMap<TaskId, NodeIndex>,
}

impl DependencyGraph {
    /// Builds a graph from a task set
    pub fn from_task_set(tasks: &TaskSet) -> Self {
        let mut graph = DiGraph::with_capacity(tasks.len(), tasks.len());
        let mut node_map = HashMap::with_capacity(tasks.len());

        for id in tasks.ids() {
            node_map.insert(id, graph.add_node(id));
        }

        for task in tasks {
            let Some(&to) = node_map.get(&task.id) else {
                continue;
            };
            for dep in task.dependency_ids() {
                if let Some(&from) = node_map.get(&dep) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        Self { graph, node_map }
    }

    /// Returns the tasks taking part in each dependency cycle
    ///
    /// Every cycle is reported as one strongly connected component with its
    /// IDs sorted; components are sorted by their smallest ID.
    pub fn cycles(&self) -> Vec<Vec<TaskId>> {
        let mut cycles: Vec<Vec<TaskId>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|component| match component.as_slice() {
                [single] => self.graph.find_edge(*single, *single).is_some(),
                _ => true,
            })
            .map(|component| {
                let mut ids: Vec<TaskId> = component
                    .into_iter()
                    .filter_map(|idx| self.graph.node_weight(idx).copied())
                    .collect();
                ids.sort();
                ids
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// Returns the direct dependents of a task (tasks that depend on it)
    pub fn dependents(&self, task_id: TaskId) -> Vec<TaskId> {
        let Some(&idx) = self.node_map.get(&task_id) else {
            return vec![];
        };

        let mut dependents: Vec<TaskId> = self
            .graph
            .neighbors_directed(idx, petgraph::Direction::Outgoing)
            .filter_map(|n| self.graph.node_weight(n).copied())
            .collect();
        dependents.sort();
        dependents.dedup();
        dependents
    }

    /// Returns the number of tasks in the graph
    pub fn len(&self) -> usize {
        self.node_map.len()
    }

    /// Returns true if the graph is empty
    pub fn is_empty(&self) -> bool {
        self.node_map.is_empty()
    }
}
