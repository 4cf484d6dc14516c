//! Main CLI application structure

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};

use super::logging::init_logging;
use super::output::{Output, OutputFormat};
use super::{query, task};
use crate::domain::TaskId;
use crate::storage::{Config, Project};

#[derive(Parser)]
#[command(name = "todo")]
#[command(author, version, about = "Local-first todo list with dependency scheduling")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, else text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new todo project
    Init {
        /// Path to initialize (defaults to current directory)
        #[arg(default_value = ".")]
        path: String,
    },

    /// Manage tasks
    #[command(subcommand)]
    Task(task::TaskCommands),

    /// Show earliest start and finish for every task
    Schedule,

    /// Show the longest dependency chain
    CriticalPath {
        /// Fail if any task is stuck behind a dependency cycle or a missing task
        #[arg(long)]
        strict: bool,
    },

    /// List tasks that can become prerequisites of a task
    Available {
        /// Task that would gain the dependency (omit for a new task)
        id: Option<TaskId>,
    },

    /// Check stored tasks for malformed or inconsistent dependencies
    Check,
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let format = match cli.format {
        Some(format) => format,
        None => default_format(),
    };
    let output = Output::new(format);

    // One "now" per invocation keeps every date in the output consistent
    let now = Utc::now();
    tracing::debug!(baseline = %now, "todo starting");

    match cli.command {
        Commands::Init { path } => {
            output.verbose_ctx("init", &format!("Initializing project at: {}", path));
            let project = Project::init(&path)?;
            output.verbose_ctx(
                "init",
                &format!("Created .todo directory at: {}", project.todo_dir().display()),
            );
            if output.is_json() {
                output.data(&serde_json::json!({
                    "initialized": true,
                    "root": project.root().display().to_string(),
                }));
            } else {
                output.success(&format!(
                    "Initialized todo project at {}",
                    project.root().display()
                ));
            }
        }

        Commands::Task(cmd) => task::run(cmd, &output, now)?,

        Commands::Schedule => query::schedule(&output, now)?,

        Commands::CriticalPath { strict } => {
            output.verbose_ctx("critical-path", &format!("strict={}", strict));
            query::critical_path(&output, now, strict)?
        }

        Commands::Available { id } => query::available(&output, now, id)?,

        Commands::Check => query::check(&output)?,
    }

    tracing::debug!("command completed successfully");
    Ok(())
}

/// Output format from the global config, or text if it cannot be read
fn default_format() -> OutputFormat {
    match Config::load() {
        Ok(config) => config.global.default_format.into(),
        Err(err) => {
            let reason = format!("{:#}", err);
            tracing::warn!(error = %reason, "ignoring unreadable configuration");
            OutputFormat::default()
        }
    }
}
