//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Core | Project management | `init`, `check` |
//! | Task | Editing the todo list | `task add`, `task dep`, `task rm` |
//! | Query | Scheduling views | `schedule`, `critical-path`, `available` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! Without the flag, `default_format` from the global config applies.
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug logs on stderr, or set `TODO_LOG`:
//! ```bash
//! todo --verbose critical-path
//! TODO_LOG=todo_cli=trace todo schedule
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod logging;
mod output;
mod query;
mod task;

pub use app::{run, Cli, Commands};
pub use logging::{init_logging, LOG_ENV};
pub use output::{format_date, Output, OutputFormat};
