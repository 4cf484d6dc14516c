//! Schedule queries (schedule, critical-path, available, check)
//!
//! Every query loads a snapshot of the task store and runs the scheduling
//! engine against it with a single baseline instant.

use anyhow::Result;
use chrono::{DateTime, Utc};

use super::output::{format_date, Output};
use crate::domain::{DependencyGraph, TaskId, TaskSet};
use crate::schedule::{finish_date, CriticalPath, ScheduleConfig, Scheduler};
use crate::storage::Project;

/// A loaded project with its task snapshot and a scheduler bound to "now"
pub(super) struct Workspace {
    pub project: Project,
    pub tasks: TaskSet,
    pub scheduler: Scheduler,
}

impl Workspace {
    /// Opens the current project and loads every task
    pub fn open(now: DateTime<Utc>) -> Result<Self> {
        Self::open_with(now, |_| {})
    }

    /// Like [`Workspace::open`], letting the caller adjust the scheduling config
    pub fn open_with(
        now: DateTime<Utc>,
        adjust: impl FnOnce(&mut ScheduleConfig),
    ) -> Result<Self> {
        let project = Project::open_current()?;
        let tasks = project.task_store().load_set()?;

        let mut config = project.config().project.schedule.clone();
        adjust(&mut config);
        tracing::debug!(
            root = %project.root().display(),
            tasks = tasks.len(),
            strict = config.strict_cycles,
            "loaded project"
        );

        Ok(Self {
            project,
            tasks,
            scheduler: Scheduler::new(config, now),
        })
    }

    /// Configured display format for dates
    pub fn date_format(&self) -> &str {
        &self.project.config().project.display.date_format
    }

    /// Formats an instant as a calendar date for text output
    pub fn show_date(&self, at: DateTime<Utc>) -> String {
        format_date(at.date_naive(), self.date_format())
    }
}

/// Show earliest start and finish for every task
pub fn schedule(output: &Output, now: DateTime<Utc>) -> Result<()> {
    let ws = Workspace::open(now)?;
    let starts = ws.scheduler.earliest_starts(&ws.tasks)?;
    output.verbose_ctx("schedule", &format!("Scheduled {} tasks", starts.len()));

    let rows: Vec<_> = ws
        .tasks
        .iter()
        .map(|task| {
            let start = starts.get(&task.id).copied().unwrap_or(now);
            let finish = finish_date(start, task.effective_duration());
            (task, start, finish)
        })
        .collect();

    if output.is_json() {
        let items: Vec<_> = rows
            .iter()
            .map(|(task, start, finish)| {
                serde_json::json!({
                    "id": task.id,
                    "title": task.title,
                    "duration": task.effective_duration(),
                    "depends_on": task.dependency_ids(),
                    "earliest_start": start,
                    "finish": finish,
                })
            })
            .collect();
        output.data(&items);
    } else if rows.is_empty() {
        println!("No tasks");
    } else {
        println!("{:<6} {:<5} {:<14} {:<14} TITLE", "ID", "DAYS", "START", "FINISH");
        println!("{}", "-".repeat(70));
        for (task, start, finish) in &rows {
            let finish = finish
                .map(|f| ws.show_date(f))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "{:<6} {:<5} {:<14} {:<14} {}",
                task.id,
                task.effective_duration(),
                ws.show_date(*start),
                finish,
                task.title
            );
        }
    }

    Ok(())
}

/// Show the longest dependency chain
pub fn critical_path(output: &Output, now: DateTime<Utc>, strict: bool) -> Result<()> {
    let ws = Workspace::open_with(now, |config| {
        config.strict_cycles |= strict;
    })?;
    let path = ws.scheduler.critical_path(&ws.tasks)?;

    output.verbose_ctx(
        "critical-path",
        &format!(
            "Processed {} of {} tasks, path has {} tasks",
            path.processed,
            path.total,
            path.tasks.len()
        ),
    );

    if output.is_json() {
        output.data(&path_json(&ws.tasks, &path));
        return Ok(());
    }

    if path.tasks.is_empty() {
        println!("No critical path (no schedulable tasks)");
    } else {
        println!(
            "Critical path ({} tasks, {} days):",
            path.tasks.len(),
            path.length_days
        );
        for (step, id) in path.tasks.iter().enumerate() {
            let title = ws.tasks.get(*id).map(|t| t.title.as_str()).unwrap_or("?");
            println!(
                "  {}. #{} {} ({}d)",
                step + 1,
                id,
                title,
                ws.tasks.duration_of(*id)
            );
        }
    }

    if path.starved() > 0 {
        output.warning(&format!(
            "{} task(s) wait on a dependency cycle or a missing task and were left out",
            path.starved()
        ));
    }

    Ok(())
}

fn path_json(tasks: &TaskSet, path: &CriticalPath) -> serde_json::Value {
    let steps: Vec<_> = path
        .tasks
        .iter()
        .map(|id| {
            serde_json::json!({
                "id": id,
                "title": tasks.get(*id).map(|t| t.title.clone()),
                "duration": tasks.duration_of(*id),
            })
        })
        .collect();

    serde_json::json!({
        "path": path.tasks,
        "steps": steps,
        "length_days": path.length_days,
        "processed": path.processed,
        "total": path.total,
        "starved": path.starved(),
    })
}

/// List tasks that can become prerequisites of a task
pub fn available(output: &Output, now: DateTime<Utc>, id: Option<TaskId>) -> Result<()> {
    let ws = Workspace::open(now)?;

    let candidates: Vec<_> = match id {
        Some(id) => {
            if !ws.tasks.contains(id) {
                anyhow::bail!("Task not found: {}", id);
            }
            ws.scheduler.available_dependencies(&ws.tasks, id)?
        }
        // A task that does not exist yet can depend on anything
        None => ws.tasks.iter().collect(),
    };

    output.verbose_ctx(
        "available",
        &format!("{} of {} tasks are candidates", candidates.len(), ws.tasks.len()),
    );

    if output.is_json() {
        let items: Vec<_> = candidates
            .iter()
            .map(|t| {
                serde_json::json!({
                    "id": t.id,
                    "title": t.title,
                })
            })
            .collect();
        output.data(&items);
    } else if candidates.is_empty() {
        println!("No tasks available as dependencies");
    } else {
        println!("{:<6} TITLE", "ID");
        println!("{}", "-".repeat(40));
        for task in candidates {
            println!("{:<6} {}", task.id, task.title);
        }
    }

    Ok(())
}

/// Report malformed dependency data, dangling references and cycles
pub fn check(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let tasks = project.task_store().load_set()?;

    let malformed = tasks.malformed_tasks();
    let dangling = tasks.dangling_references();
    let cycles = DependencyGraph::from_task_set(&tasks).cycles();
    let issues = malformed.len() + dangling.len() + cycles.len();

    output.verbose_ctx("check", &format!("Checked {} tasks", tasks.len()));

    if output.is_json() {
        let dangling_items: Vec<_> = dangling
            .iter()
            .map(|(task, missing)| {
                serde_json::json!({
                    "task": task,
                    "missing": missing,
                })
            })
            .collect();
        output.data(&serde_json::json!({
            "ok": issues == 0,
            "tasks": tasks.len(),
            "malformed": malformed,
            "dangling": dangling_items,
            "cycles": cycles,
        }));
    } else {
        for id in &malformed {
            println!("Task {}: unreadable dependency data (treated as no dependencies)", id);
        }
        for (task, missing) in &dangling {
            println!("Task {}: depends on missing task {}", task, missing);
        }
        for cycle in &cycles {
            let members: Vec<String> = cycle.iter().map(|id| id.to_string()).collect();
            println!("Cycle: {}", members.join(" -> "));
        }
        if issues == 0 {
            output.success(&format!("{} tasks checked, no problems found", tasks.len()));
        }
    }

    if issues > 0 {
        anyhow::bail!("Found {} dependency problem(s)", issues);
    }

    Ok(())
}
