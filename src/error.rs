// Error types for task list operations

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by [`crate::TaskStore`] operations
#[derive(Error, Debug)]
pub enum Error {
    /// A required field was empty; nothing was changed
    #[error("{field} cannot be empty")]
    Validation { field: &'static str },

    /// No task with the given id exists; nothing was changed
    #[error("Task not found: {0}")]
    NotFound(String),

    /// Reading or writing durable storage failed
    #[error("Persistence failed: {0}")]
    Persistence(#[from] StorageError),

    /// The stored collection could not be decoded
    #[error("Stored task data is malformed: {0}")]
    MalformedStorage(String),
}

impl Error {
    /// True for errors caused by user input rather than the environment
    pub fn is_user_error(&self) -> bool {
        matches!(self, Error::Validation { .. } | Error::NotFound(_))
    }
}

/// Errors raised by a [`crate::KvStore`] backend
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Invalid storage key: {0}")]
    InvalidKey(String),

    #[error("IO error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to acquire lock on {0}")]
    Lock(PathBuf),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Failed to encode tasks: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_message() {
        let err = Error::Validation { field: "name" };
        assert_eq!(err.to_string(), "name cannot be empty");
        assert!(err.is_user_error());
    }

    #[test]
    fn test_storage_error_converts_to_persistence() {
        let err: Error = StorageError::Unavailable("disk gone".to_string()).into();
        assert!(matches!(err, Error::Persistence(_)));
        assert!(!err.is_user_error());
        assert!(err.to_string().contains("disk gone"));
    }

    #[test]
    fn test_encode_failure_is_persistence() {
        let json_err = serde_json::from_str::<i32>("x").unwrap_err();
        let err: Error = StorageError::from(json_err).into();
        assert!(matches!(err, Error::Persistence(StorageError::Encode(_))));
        assert!(err.to_string().contains("Failed to encode tasks"));
    }

    #[test]
    fn test_not_found_is_user_error() {
        assert!(Error::NotFound("abc".to_string()).is_user_error());
        assert!(!Error::MalformedStorage("bad".to_string()).is_user_error());
    }
}
