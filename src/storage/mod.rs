//! # Storage Layer
//!
//! Persistence for the todo list with git-friendly file formats.
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks | JSONL (one JSON per line) | `.todo/tasks.jsonl` |
//! | Config | TOML | `.todo/config.toml` |
//!
//! [`TaskStore`] uses file locking (`fs2`) for concurrent access and
//! rewrites atomically (temp file + rename). The scheduling engine never
//! touches storage; callers load a [`crate::domain::TaskSet`] snapshot and
//! pass it in.

mod config;
mod jsonl;
mod project;

pub use config::{
    is_valid_date_format, Config, ConfigError, DisplayConfig, GlobalConfig, OutputFormat,
    ProjectConfig,
};
pub use jsonl::TaskStore;
pub use project::{Project, ProjectError};
