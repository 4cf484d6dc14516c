//! Todo CLI - a local-first todo list with dependency scheduling
//!
//! Tasks carry a duration in days and may depend on other tasks. The
//! [`schedule`] module answers three questions about such a list: would a
//! new dependency close a cycle, when can each task start at the earliest,
//! and which chain of tasks determines the overall finish.

pub mod cli;
pub mod domain;
pub mod schedule;
pub mod storage;

pub use domain::{Task, TaskId, TaskSet};
pub use schedule::{CriticalPath, ScheduleConfig, ScheduleError, Scheduler, ValidationError};
