//! JSONL storage for tasks
//!
//! Tasks are stored in `.todo/tasks.jsonl` with one JSON object per line.
//! Uses file locking for concurrent access safety.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use fs2::FileExt;

use crate::domain::{Task, TaskId, TaskSet};

/// Store for task data in JSONL format
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    /// Creates a new task store at the given path
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates the default store for a project
    pub fn for_project(project_root: &Path) -> Self {
        Self::new(project_root.join(".todo").join("tasks.jsonl"))
    }

    /// Returns the path to the store file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads all tasks from the store
    ///
    /// Later lines win over earlier lines with the same ID.
    pub fn read_all(&self) -> Result<HashMap<TaskId, Task>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }

        let file = File::open(&self.path)
            .with_context(|| format!("Failed to open task store: {}", self.path.display()))?;

        // Acquire shared lock for reading
        file.lock_shared()
            .context("Failed to acquire read lock on task store")?;

        // Lock is released when file is dropped
        parse_tasks(&file)
    }

    /// Reads all tasks as a scheduling snapshot ordered by ID
    pub fn load_set(&self) -> Result<TaskSet> {
        Ok(snapshot(self.read_all()?))
    }

    /// Creates a task with the next free ID
    ///
    /// Reading the current tasks, assigning `max + 1` and appending happen
    /// under one exclusive lock, so concurrent creators never share an ID.
    /// `build` receives the assigned ID and the tasks as they were at that
    /// moment; an error from it leaves the store unchanged.
    pub fn create<F>(&self, build: F) -> Result<Task>
    where
        F: FnOnce(TaskId, &TaskSet) -> Result<Task>,
    {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open task store: {}", self.path.display()))?;

        file.lock_exclusive()
            .context("Failed to acquire write lock on task store")?;

        let existing = parse_tasks(&file)?;
        let id = existing
            .keys()
            .max()
            .map(|id| id.next())
            .unwrap_or(TaskId::new(1));
        let snapshot = snapshot(existing);

        let task = build(id, &snapshot)?;
        if task.id != id {
            anyhow::bail!("Task was built with ID {} instead of the assigned {}", task.id, id);
        }

        let mut writer = BufWriter::new(&file);
        let line = serde_json::to_string(&task).context("Failed to serialize task")?;
        writeln!(writer, "{}", line).context("Failed to write task")?;
        writer.flush().context("Failed to flush task store")?;

        Ok(task)
    }

    /// Writes all tasks to the store (full rewrite)
    pub fn write_all(&self, tasks: &HashMap<TaskId, Task>) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        // Write to temp file first
        let temp_path = self.path.with_extension("jsonl.tmp");

        {
            let file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&temp_path)
                .with_context(|| format!("Failed to create temp file: {}", temp_path.display()))?;

            // Acquire exclusive lock
            file.lock_exclusive()
                .context("Failed to acquire write lock on task store")?;

            let mut writer = BufWriter::new(&file);

            // Sort by ID for consistent output
            let mut sorted: Vec<_> = tasks.values().collect();
            sorted.sort_by_key(|t| t.id);

            for task in sorted {
                let line = serde_json::to_string(task).context("Failed to serialize task")?;
                writeln!(writer, "{}", line).context("Failed to write task")?;
            }

            writer.flush().context("Failed to flush task store")?;
        }

        // Atomic rename
        fs::rename(&temp_path, &self.path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                temp_path.display(),
                self.path.display()
            )
        })?;

        Ok(())
    }

    /// Updates a single task (reads all, updates, writes all)
    pub fn update(&self, task: &Task) -> Result<()> {
        let mut tasks = self.read_all()?;
        tasks.insert(task.id, task.clone());
        self.write_all(&tasks)
    }

    /// Removes a task and strips it from every other task's dependencies
    ///
    /// Returns the IDs of tasks that lost the dependency, or `None` if the
    /// task did not exist.
    pub fn remove(&self, task_id: TaskId) -> Result<Option<Vec<TaskId>>> {
        let mut tasks = self.read_all()?;
        if tasks.remove(&task_id).is_none() {
            return Ok(None);
        }

        let mut detached: Vec<TaskId> = tasks
            .values_mut()
            .filter_map(|task| task.remove_dependency(task_id).then_some(task.id))
            .collect();
        detached.sort();

        self.write_all(&tasks)?;
        Ok(Some(detached))
    }
}

/// Parses JSONL task lines; later lines win over earlier ones with the same ID
fn parse_tasks(file: &File) -> Result<HashMap<TaskId, Task>> {
    let reader = BufReader::new(file);
    let mut tasks = HashMap::new();

    for (line_num, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read line {}", line_num + 1))?;

        if line.trim().is_empty() {
            continue;
        }

        let task: Task = serde_json::from_str(&line)
            .with_context(|| format!("Failed to parse task at line {}", line_num + 1))?;

        tasks.insert(task.id, task);
    }

    Ok(tasks)
}

fn snapshot(tasks: HashMap<TaskId, Task>) -> TaskSet {
    let mut tasks: Vec<Task> = tasks.into_values().collect();
    tasks.sort_by_key(|t| t.id);
    tasks.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn make_task(id: u64) -> Task {
        Task::new(TaskId::new(id), format!("Task {}", id)).unwrap()
    }

    /// Appends a raw line the way an older or concurrent writer would
    fn push(store: &TaskStore, task: &Task) {
        fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(store.path())
            .unwrap();
        writeln!(file, "{}", serde_json::to_string(task).unwrap()).unwrap();
    }

    #[test]
    fn read_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        let tasks = store.read_all().unwrap();
        assert!(tasks.is_empty());
    }

    #[test]
    fn write_and_read_tasks() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        let task1 = make_task(1);
        let task2 = make_task(2).with_duration(3).unwrap();

        let mut tasks = HashMap::new();
        tasks.insert(task1.id, task1.clone());
        tasks.insert(task2.id, task2.clone());

        store.write_all(&tasks).unwrap();

        let loaded = store.read_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get(&task1.id).unwrap().title, task1.title);
        assert_eq!(loaded.get(&task2.id).unwrap().duration, 3);
    }

    #[test]
    fn later_lines_win() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        push(&store, &make_task(1));
        push(&store, &make_task(2));
        push(&store, &make_task(1).with_duration(4).unwrap());

        let loaded = store.read_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[&TaskId::new(1)].duration, 4);
    }

    #[test]
    fn create_assigns_next_id() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        let first = store.create(|id, _| Ok(Task::new(id, "First")?)).unwrap();
        assert_eq!(first.id, TaskId::new(1));

        push(&store, &make_task(7));
        let next = store
            .create(|id, existing| {
                assert_eq!(existing.len(), 2);
                Ok(Task::new(id, "Next")?)
            })
            .unwrap();
        assert_eq!(next.id, TaskId::new(8));
    }

    #[test]
    fn back_to_back_creates_never_share_an_id() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.jsonl");

        let a = TaskStore::new(&path).create(|id, _| Ok(Task::new(id, "A")?)).unwrap();
        let b = TaskStore::new(&path).create(|id, _| Ok(Task::new(id, "B")?)).unwrap();
        assert_ne!(a.id, b.id);

        let loaded = TaskStore::new(&path).read_all().unwrap();
        assert_eq!(loaded.len(), 2);
    }

    #[test]
    fn concurrent_creates_keep_every_task() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.jsonl");

        let handles: Vec<_> = (0..8)
            .map(|n| {
                let path = path.clone();
                std::thread::spawn(move || {
                    TaskStore::new(path)
                        .create(|id, _| Ok(Task::new(id, format!("Worker {}", n))?))
                        .unwrap()
                        .id
                })
            })
            .collect();

        let mut ids: Vec<TaskId> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 8);
        assert_eq!(TaskStore::new(&path).read_all().unwrap().len(), 8);
    }

    #[test]
    fn failed_create_leaves_store_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));
        push(&store, &make_task(1));

        let result = store.create(|_, _| anyhow::bail!("rejected"));
        assert!(result.is_err());
        assert_eq!(store.read_all().unwrap().len(), 1);
    }

    #[test]
    fn load_set_orders_by_id() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        push(&store, &make_task(3));
        push(&store, &make_task(1));
        push(&store, &make_task(2));

        let set = store.load_set().unwrap();
        assert_eq!(
            set.ids().collect::<Vec<_>>(),
            vec![TaskId::new(1), TaskId::new(2), TaskId::new(3)]
        );
    }

    #[test]
    fn update_task() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        push(&store, &make_task(1));
        let mut task = make_task(2);
        push(&store, &task);

        task.add_dependency(TaskId::new(1));
        store.update(&task).unwrap();

        let loaded = store.read_all().unwrap();
        let loaded_task = loaded.get(&task.id).unwrap();
        assert_eq!(loaded_task.dependency_ids(), vec![TaskId::new(1)]);
    }

    #[test]
    fn remove_task_detaches_dependents() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        let task1 = make_task(1);
        let task2 = make_task(2).with_dependencies(&[TaskId::new(1)]);
        let task3 = make_task(3).with_dependencies(&[TaskId::new(2), TaskId::new(1)]);

        let mut tasks = HashMap::new();
        for task in [task1, task2, task3] {
            tasks.insert(task.id, task);
        }
        store.write_all(&tasks).unwrap();

        let detached = store.remove(TaskId::new(1)).unwrap();
        assert_eq!(detached, Some(vec![TaskId::new(2), TaskId::new(3)]));

        let loaded = store.read_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert!(!loaded.contains_key(&TaskId::new(1)));
        assert!(loaded[&TaskId::new(2)].dependency_ids().is_empty());
        assert_eq!(loaded[&TaskId::new(3)].dependency_ids(), vec![TaskId::new(2)]);
    }

    #[test]
    fn remove_missing_task() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));
        push(&store, &make_task(1));

        assert_eq!(store.remove(TaskId::new(5)).unwrap(), None);
    }

    #[test]
    fn creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("nested").join("dir").join("tasks.jsonl"));

        push(&store, &make_task(1));

        assert!(store.path().exists());
    }

    #[test]
    fn atomic_write() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonl"));

        let task = make_task(1);
        let mut tasks = HashMap::new();
        tasks.insert(task.id, task.clone());
        store.write_all(&tasks).unwrap();

        // Temp file should not exist after write
        let temp_path = store.path().with_extension("jsonl.tmp");
        assert!(!temp_path.exists());
    }

    #[test]
    fn malformed_line_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("tasks.jsonl");
        fs::write(&path, "{not json}\n").unwrap();

        let err = TaskStore::new(&path).read_all().unwrap_err();
        assert!(format!("{:#}", err).contains("line 1"));
    }
}
