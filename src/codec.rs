// Serialized form of the task collection

use crate::error::{Error, Result, StorageError};
use crate::task::Task;
use std::collections::HashSet;
use tracing::debug;

/// Encode the full collection as a JSON array
pub fn encode(tasks: &[Task]) -> Result<String, StorageError> {
    Ok(serde_json::to_string(tasks)?)
}

/// Decode a stored collection.
///
/// The whole blob must parse; a single bad record or a repeated id rejects it.
pub fn decode(raw: &str) -> Result<Vec<Task>> {
    let tasks: Vec<Task> = serde_json::from_str(raw).map_err(|e| Error::MalformedStorage(e.to_string()))?;

    let mut seen = HashSet::with_capacity(tasks.len());
    for task in &tasks {
        if !seen.insert(task.id.as_str()) {
            return Err(Error::MalformedStorage(format!("duplicate task id: {}", task.id)));
        }
    }

    debug!(count = tasks.len(), "Decoded task collection");
    Ok(tasks)
}
