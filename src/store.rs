// Task collection owner: mutations, views, and write-through persistence

use crate::codec;
use crate::error::{Error, Result, StorageError};
use crate::filter::{self, SortOrder, TaskFilter};
use crate::kv::KvStore;
use crate::task::Task;
use tracing::{debug, info, warn};

/// Storage key holding the serialized collection
pub const TASKS_KEY: &str = "tasks";

/// Counts shown alongside a view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub completed: usize,
    pub incomplete: usize,
}

/// Authoritative task collection backed by a [`KvStore`]
///
/// Every successful mutation writes the full collection back under one key.
/// Each mutation re-reads the stored collection under the backend's write lock,
/// applies the change, and writes it before releasing the lock, so stores in
/// other threads or processes sharing the same storage never lose each other's
/// changes.
///
/// If a write fails the mutation stays applied in memory, the error is
/// returned, and the store is marked dirty until a later write succeeds.
pub struct TaskStore<S: KvStore> {
    storage: S,
    key: String,
    tasks: Vec<Task>,
    dirty: bool,
}

impl<S: KvStore> TaskStore<S> {
    /// Load the collection stored under [`TASKS_KEY`]
    ///
    /// An absent value yields an empty collection. A value that fails to decode
    /// is reported as [`Error::MalformedStorage`] and left untouched in storage.
    pub fn hydrate(storage: S) -> Result<Self> {
        Self::hydrate_with_key(storage, TASKS_KEY)
    }

    /// Same as [`TaskStore::hydrate`] but reading from a custom key
    pub fn hydrate_with_key(storage: S, key: &str) -> Result<Self> {
        let tasks = match storage.get(key)? {
            Some(raw) => codec::decode(&raw)?,
            None => {
                debug!(key, "No stored tasks, starting empty");
                Vec::new()
            }
        };

        info!(key, count = tasks.len(), "Hydrated task store");

        Ok(Self {
            storage,
            key: key.to_string(),
            tasks,
            dirty: false,
        })
    }

    // ========================================================================
    // Read API
    // ========================================================================

    /// Full collection in creation order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// True when the last write to storage failed and has not been redone
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub fn into_storage(self) -> S {
        self.storage
    }

    /// Filtered, due-date ordered snapshot of the collection.
    ///
    /// Recomputed on every call; never touches storage.
    pub fn view(&self, filter: TaskFilter, order: SortOrder) -> Vec<Task> {
        filter::project(&self.tasks, filter, order)
    }

    pub fn stats(&self) -> Stats {
        let completed = self.tasks.iter().filter(|task| task.completed).count();
        Stats {
            total: self.tasks.len(),
            completed,
            incomplete: self.tasks.len() - completed,
        }
    }

    // ========================================================================
    // Mutations
    // ========================================================================

    /// Append a new incomplete task
    pub fn create(&mut self, name: &str, due_date: &str) -> Result<Task> {
        Self::validate(name, due_date)?;

        let task = Task::new(name, due_date);
        self.mutate(|tasks| {
            debug!(id = %task.id, name, due_date, "create: appending task");
            tasks.push(task.clone());
            Ok(task)
        })
    }

    /// Replace a task's name and due date, keeping its id, status, priority, and position
    pub fn update(&mut self, id: &str, name: &str, due_date: &str) -> Result<Task> {
        Self::validate(name, due_date)?;

        self.mutate(|tasks| {
            let task = find_mut(tasks, id)?;
            task.name = name.to_string();
            task.due_date = due_date.to_string();
            debug!(id, name, due_date, "update: task edited");
            Ok(task.clone())
        })
    }

    /// Flip a task between incomplete and completed
    pub fn toggle_completed(&mut self, id: &str) -> Result<Task> {
        self.mutate(|tasks| {
            let task = find_mut(tasks, id)?;
            task.completed = !task.completed;
            debug!(id, completed = task.completed, "toggle_completed: status flipped");
            Ok(task.clone())
        })
    }

    /// Remove a task, returning it.
    ///
    /// Deleting an id that is not present is an [`Error::NotFound`] and does not write.
    pub fn delete(&mut self, id: &str) -> Result<Task> {
        self.mutate(|tasks| {
            let index = tasks
                .iter()
                .position(|task| task.id == id)
                .ok_or_else(|| Error::NotFound(id.to_string()))?;
            debug!(id, "delete: task removed");
            Ok(tasks.remove(index))
        })
    }

    /// Write the collection back to storage.
    ///
    /// After a failed write this stores the unsaved in-memory state; otherwise
    /// it rewrites the latest stored collection and reloads it.
    pub fn flush(&mut self) -> Result<()> {
        self.mutate(|_| Ok(()))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn validate(name: &str, due_date: &str) -> Result<()> {
        if name.is_empty() {
            return Err(Error::Validation { field: "Task name" });
        }
        if due_date.is_empty() {
            return Err(Error::Validation { field: "Due date" });
        }
        Ok(())
    }

    /// Apply `op` to the latest collection and write the result, all under the
    /// backend's write lock.
    ///
    /// The base is the stored collection, re-read under the lock so changes made
    /// by other handles on the same storage are never overwritten. While the
    /// store is dirty the unsaved in-memory collection is the base instead.
    /// If `op` fails nothing is written and the in-memory state is unchanged.
    fn mutate<T>(&mut self, op: impl FnOnce(&mut Vec<Task>) -> Result<T>) -> Result<T> {
        let mut op = Some(op);
        let mut staged: Option<Result<(Vec<Task>, T)>> = None;
        let dirty = self.dirty;
        let local = &self.tasks;

        let written = self.storage.update(&self.key, &mut |current| {
            let op = op.take()?;

            let base = if dirty {
                Ok(local.clone())
            } else {
                current.as_deref().map(codec::decode).transpose().map(Option::unwrap_or_default)
            };
            let step = base.and_then(|mut tasks| {
                let value = op(&mut tasks)?;
                Ok((tasks, value))
            });

            let raw = match &step {
                Ok((tasks, _)) => match codec::encode(tasks) {
                    Ok(raw) => Some(raw),
                    Err(e) => {
                        staged = Some(Err(e.into()));
                        return None;
                    }
                },
                Err(_) => None,
            };
            staged = Some(step);
            raw
        });

        match (staged, written) {
            (Some(Ok((tasks, value))), Ok(())) => {
                self.tasks = tasks;
                self.dirty = false;
                debug!(key = %self.key, count = self.tasks.len(), "Persisted tasks");
                Ok(value)
            }
            (Some(Ok((tasks, _))), Err(e)) => {
                warn!(key = %self.key, error = %e, "Failed to persist tasks; in-memory state kept");
                self.tasks = tasks;
                self.dirty = true;
                Err(e.into())
            }
            (Some(Err(e)), _) => Err(e),
            (None, Err(e)) => Err(e.into()),
            (None, Ok(())) => Err(StorageError::Unavailable(format!(
                "backend skipped the update of key '{}'",
                self.key
            ))
            .into()),
        }
    }
}

fn find_mut<'a>(tasks: &'a mut [Task], id: &str) -> Result<&'a mut Task> {
    tasks
        .iter_mut()
        .find(|task| task.id == id)
        .ok_or_else(|| Error::NotFound(id.to_string()))
}
