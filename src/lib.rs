// tasklist - Local task list with filtering, sorting, and key-value persistence

pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod kv;
pub mod store;
pub mod task;

// Re-export main types for convenience
pub use config::{Backend, Config};
pub use error::{Error, Result, StorageError};
pub use filter::{SortOrder, TaskFilter};
pub use kv::{FileKv, KvStore, MemoryKv, SqliteKv};
pub use store::{Stats, TASKS_KEY, TaskStore};
pub use task::{Priority, Task};
