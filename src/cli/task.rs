//! Task CLI commands

use anyhow::Result;
use chrono::{DateTime, NaiveDate, Utc};
use clap::Subcommand;

use super::output::{format_date, Output};
use super::query::Workspace;
use crate::domain::{DependencyGraph, Task, TaskId};
use crate::schedule::{finish_date, ScheduleError};

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Add a task
    ///
    /// Examples:
    ///   todo task add "Buy paint"
    ///   todo task add "Paint walls" --after 1 --duration 2
    ///   todo task add "Hang pictures" --after 2 --due 2024-11-01
    Add {
        /// Task title
        title: String,

        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<NaiveDate>,

        /// Planned duration in days
        #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(i64).range(1..))]
        duration: i64,

        /// Task that must finish first (repeatable)
        #[arg(long = "after", value_name = "ID")]
        after: Vec<TaskId>,

        /// Image URL shown with the task
        #[arg(long)]
        image: Option<String>,
    },

    /// List tasks, newest first
    List,

    /// Show task details
    Show {
        /// Task ID
        id: TaskId,
    },

    /// Delete a task
    Rm {
        /// Task ID
        id: TaskId,
    },

    /// Add a dependency between tasks
    Dep {
        /// Task that will wait
        task: TaskId,

        /// Task that must finish first
        depends_on: TaskId,
    },

    /// Remove a dependency
    Undep {
        /// Task to release
        task: TaskId,

        /// Dependency to remove
        depends_on: TaskId,
    },
}

pub fn run(cmd: TaskCommands, output: &Output, now: DateTime<Utc>) -> Result<()> {
    match cmd {
        TaskCommands::Add {
            title,
            due,
            duration,
            after,
            image,
        } => add_task(output, now, &title, due, duration, &after, image),
        TaskCommands::List => list_tasks(output, now),
        TaskCommands::Show { id } => show_task(output, now, id),
        TaskCommands::Rm { id } => remove_task(output, now, id),
        TaskCommands::Dep { task, depends_on } => add_dependency(output, now, task, depends_on),
        TaskCommands::Undep { task, depends_on } => {
            remove_dependency(output, now, task, depends_on)
        }
    }
}

fn add_task(
    output: &Output,
    now: DateTime<Utc>,
    title: &str,
    due: Option<NaiveDate>,
    duration: i64,
    after: &[TaskId],
    image: Option<String>,
) -> Result<()> {
    let ws = Workspace::open(now)?;
    let store = ws.project.task_store();

    let mut dependencies: Vec<TaskId> = Vec::with_capacity(after.len());
    for dep in after {
        if !dependencies.contains(dep) {
            dependencies.push(*dep);
        }
    }

    // Validated against the store as it is while the new ID is reserved
    let task = store.create(|id, tasks| {
        ws.scheduler.validate(tasks, Some(id), &dependencies)?;

        let mut task = Task::new(id, title)?
            .with_duration(duration)?
            .with_dependencies(&dependencies);
        if let Some(due) = due {
            task = task.with_due_date(due);
        }
        task.image_url = image;
        Ok(task)
    })?;
    output.verbose_ctx(
        "task add",
        &format!("Stored task {} in {}", task.id, store.path().display()),
    );

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": task.id,
            "title": task.title,
            "duration": task.duration,
            "depends_on": task.dependency_ids(),
            "due_date": task.due_date,
            "image_url": task.image_url,
        }));
    } else {
        output.success(&format!("Created task {}: {}", task.id, task.title));
    }

    Ok(())
}

fn list_tasks(output: &Output, now: DateTime<Utc>) -> Result<()> {
    let ws = Workspace::open(now)?;
    let starts = ws.scheduler.earliest_starts(&ws.tasks)?;

    let critical = match ws.scheduler.critical_path(&ws.tasks) {
        Ok(path) => path.tasks,
        Err(err) => {
            output.warning(&format!("Critical path unavailable: {}", err));
            Vec::new()
        }
    };

    let mut tasks: Vec<&Task> = ws.tasks.iter().collect();
    tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

    let today = now.date_naive();

    if output.is_json() {
        let items: Vec<_> = tasks
            .iter()
            .map(|t| {
                serde_json::json!({
                    "id": t.id,
                    "title": t.title,
                    "duration": t.effective_duration(),
                    "depends_on": t.dependency_ids(),
                    "due_date": t.due_date,
                    "overdue": t.is_overdue(today),
                    "earliest_start": starts.get(&t.id),
                    "critical": critical.contains(&t.id),
                    "image_url": t.image_url,
                })
            })
            .collect();
        output.data(&items);
    } else if tasks.is_empty() {
        println!("No tasks");
    } else {
        println!(
            "{:<2}{:<6} {:<5} {:<14} {:<16} TITLE",
            "", "ID", "DAYS", "START", "DUE"
        );
        println!("{}", "-".repeat(70));

        for task in tasks {
            let marker = if critical.contains(&task.id) { "*" } else { "" };
            let start = starts
                .get(&task.id)
                .map(|s| ws.show_date(*s))
                .unwrap_or_else(|| "-".to_string());
            let due = match task.due_date {
                Some(due) if task.is_overdue(today) => {
                    format!("{} !", format_date(due, ws.date_format()))
                }
                Some(due) => format_date(due, ws.date_format()),
                None => "-".to_string(),
            };
            println!(
                "{:<2}{:<6} {:<5} {:<14} {:<16} {}",
                marker,
                task.id,
                task.effective_duration(),
                start,
                due,
                task.title
            );
        }

        if !critical.is_empty() {
            println!();
            println!("* on the critical path, ! overdue");
        }
    }

    Ok(())
}

fn show_task(output: &Output, now: DateTime<Utc>, id: TaskId) -> Result<()> {
    let ws = Workspace::open(now)?;
    let task = ws
        .tasks
        .get(id)
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))?;

    let dependencies = task.dependency_ids();
    let dependents = DependencyGraph::from_task_set(&ws.tasks).dependents(id);

    let start = match ws.scheduler.earliest_start(&ws.tasks, id) {
        Ok(start) => Some(start),
        Err(
            err @ (ScheduleError::Cycle { .. }
            | ScheduleError::MissingDependency { .. }
            | ScheduleError::DateOutOfRange { .. }),
        ) => {
            output.warning(&err.to_string());
            None
        }
        Err(err) => return Err(err.into()),
    };
    let finish = start.and_then(|s| finish_date(s, task.effective_duration()));

    let critical = match ws.scheduler.critical_path(&ws.tasks) {
        Ok(path) => path.contains(id),
        Err(err) => {
            output.warning(&format!("Critical path unavailable: {}", err));
            false
        }
    };

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": task.id,
            "title": task.title,
            "duration": task.effective_duration(),
            "depends_on": dependencies,
            "dependents": dependents,
            "due_date": task.due_date,
            "overdue": task.is_overdue(now.date_naive()),
            "image_url": task.image_url,
            "created_at": task.created_at,
            "earliest_start": start,
            "finish": finish,
            "critical": critical,
        }));
        return Ok(());
    }

    println!("Task: {}", task.id);
    println!("Title: {}", task.title);
    println!("Duration: {} day(s)", task.effective_duration());
    println!("Created: {}", task.created_at.format("%Y-%m-%d %H:%M"));
    if let Some(due) = task.due_date {
        let flag = if task.is_overdue(now.date_naive()) { " (overdue)" } else { "" };
        println!("Due: {}{}", format_date(due, ws.date_format()), flag);
    }
    if let Some(url) = &task.image_url {
        println!("Image: {}", url);
    }

    match start {
        Some(start) => println!("Earliest start: {}", ws.show_date(start)),
        None => println!("Earliest start: unschedulable"),
    }
    if let Some(finish) = finish {
        println!("Finish: {}", ws.show_date(finish));
    }
    if critical {
        println!("On the critical path");
    }

    if !dependencies.is_empty() {
        println!("\nDepends on:");
        for dep in &dependencies {
            match ws.tasks.get(*dep) {
                Some(t) => println!("  {} {}", dep, t.title),
                None => println!("  {} (missing)", dep),
            }
        }
    }

    if !dependents.is_empty() {
        println!("\nBlocks:");
        for dependent in &dependents {
            let title = ws.tasks.get(*dependent).map(|t| t.title.as_str()).unwrap_or("?");
            println!("  {} {}", dependent, title);
        }
    }

    Ok(())
}

fn remove_task(output: &Output, now: DateTime<Utc>, id: TaskId) -> Result<()> {
    let ws = Workspace::open(now)?;
    let store = ws.project.task_store();

    let detached = store
        .remove(id)?
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", id))?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "removed": id,
            "detached": detached,
        }));
    } else {
        output.success(&format!("Removed task {}", id));
        if !detached.is_empty() {
            let ids: Vec<String> = detached.iter().map(|d| d.to_string()).collect();
            println!("No longer waiting on it: {}", ids.join(", "));
        }
    }

    Ok(())
}

fn add_dependency(
    output: &Output,
    now: DateTime<Utc>,
    task_id: TaskId,
    depends_on: TaskId,
) -> Result<()> {
    let ws = Workspace::open(now)?;

    let mut task = ws
        .tasks
        .get(task_id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", task_id))?;

    ws.scheduler.validate(&ws.tasks, Some(task_id), &[depends_on])?;

    if !task.add_dependency(depends_on) {
        output.success(&format!("{} already depends on {}", task_id, depends_on));
        return Ok(());
    }
    ws.project.task_store().update(&task)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "task": task_id,
            "depends_on": depends_on,
        }));
    } else {
        output.success(&format!("{} now depends on {}", task_id, depends_on));
    }

    Ok(())
}

fn remove_dependency(
    output: &Output,
    now: DateTime<Utc>,
    task_id: TaskId,
    depends_on: TaskId,
) -> Result<()> {
    let ws = Workspace::open(now)?;

    let mut task = ws
        .tasks
        .get(task_id)
        .cloned()
        .ok_or_else(|| anyhow::anyhow!("Task not found: {}", task_id))?;

    if !task.remove_dependency(depends_on) {
        anyhow::bail!("Task {} does not depend on {}", task_id, depends_on);
    }
    ws.project.task_store().update(&task)?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "task": task_id,
            "removed_dependency": depends_on,
        }));
    } else {
        output.success(&format!(
            "Removed dependency: {} no longer depends on {}",
            task_id, depends_on
        ));
    }

    Ok(())
}
