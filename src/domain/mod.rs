//! Domain models for the todo list
//!
//! Contains the core business logic without any I/O concerns.

mod graph;
mod id;
mod task;

pub use graph::{DependencyGraph, TaskSet};
pub use id::{IdError, TaskId};
pub use task::{
    encode_dependency_ids, is_malformed_dependency_data, parse_dependency_ids, Task, TaskError,
    DEFAULT_DURATION_DAYS,
};
