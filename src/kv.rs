// Key-value storage backends for the serialized task collection

use crate::error::StorageError;
use fs2::FileExt;
use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Opaque get/set-by-key durable store.
///
/// Each `set` replaces the whole value stored under `key`; there are no partial updates.
pub trait KvStore {
    /// Read the value stored under `key`, or `None` if nothing has been stored yet
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value
    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Read-modify-write `key` under the backend's write lock.
    ///
    /// `apply` is called once with the current value and returns the value to
    /// store, or `None` to leave storage untouched. No other writer can change
    /// `key` between the read and the write.
    fn update(
        &mut self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<(), StorageError>;
}

impl<K: KvStore + ?Sized> KvStore for Box<K> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn update(
        &mut self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<(), StorageError> {
        (**self).update(key, apply)
    }
}

/// Validate a storage key.
///
/// Keys double as file names for [`FileKv`], so they are restricted to a safe character set.
pub fn validate_key(key: &str) -> Result<(), StorageError> {
    if key.is_empty() {
        return Err(StorageError::InvalidKey("key cannot be empty".to_string()));
    }
    if key.len() > 64 {
        return Err(StorageError::InvalidKey(format!("{} (max 64 chars)", key)));
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
        return Err(StorageError::InvalidKey(format!(
            "{} (must be alphanumeric with _/-)",
            key
        )));
    }
    Ok(())
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Volatile store, for tests and embedding
#[derive(Debug, Default, Clone)]
pub struct MemoryKv {
    entries: HashMap<String, String>,
}

impl MemoryKv {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryKv {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn update(
        &mut self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<(), StorageError> {
        validate_key(key)?;
        if let Some(value) = apply(self.entries.get(key).cloned()) {
            self.entries.insert(key.to_string(), value);
        }
        Ok(())
    }
}

// ============================================================================
// File backend
// ============================================================================

/// One file per key (`{key}.json`) inside a directory.
///
/// Writes hold an exclusive lock on `.{key}.lock`, go to a temp file first, and
/// are renamed into place, so a reader sees either the old or the new value.
/// [`KvStore::update`] keeps the lock across its read and write, which
/// serializes read-modify-write cycles across processes sharing the directory.
#[derive(Debug, Clone)]
pub struct FileKv {
    dir: PathBuf,
}

impl FileKv {
    /// Open a file store rooted at `dir`, creating the directory if needed
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        info!(dir = ?dir, "Opened file store");
        Ok(Self { dir })
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    fn temp_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!(".{}.json.tmp", key))
    }

    /// Take the exclusive write lock for `key`; released when the file is dropped
    fn lock(&self, key: &str) -> Result<File, StorageError> {
        let lock_path = self.dir.join(format!(".{}.lock", key));
        let lock_file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .map_err(|e| StorageError::io(&lock_path, e))?;

        lock_file.lock_exclusive().map_err(|_| StorageError::Lock(lock_path))?;
        Ok(lock_file)
    }

    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.value_path(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(path, e)),
        }
    }

    /// Caller must hold the lock for `key`
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let temp_path = self.temp_path(key);
        let mut temp = File::create(&temp_path).map_err(|e| StorageError::io(&temp_path, e))?;
        temp.write_all(value.as_bytes())
            .and_then(|_| temp.sync_all())
            .map_err(|e| StorageError::io(&temp_path, e))?;
        drop(temp);

        let path = self.value_path(key);
        fs::rename(&temp_path, &path).map_err(|e| StorageError::io(&path, e))?;

        debug!(key, bytes = value.len(), "Wrote value to file store");
        Ok(())
    }
}

impl KvStore for FileKv {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;
        self.read(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let _lock = self.lock(key)?;
        self.write(key, value)
    }

    fn update(
        &mut self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<(), StorageError> {
        validate_key(key)?;
        let _lock = self.lock(key)?;

        match apply(self.read(key)?) {
            Some(value) => self.write(key, &value),
            None => Ok(()),
        }
    }
}

// ============================================================================
// SQLite backend
// ============================================================================

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const UPSERT_SQL: &str = "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
     ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at";

/// Values kept in a single `kv` table of a SQLite database
pub struct SqliteKv {
    db: Connection,
}

impl SqliteKv {
    /// Open or create a database at `path`
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let db = Connection::open(path)?;
        // Concurrent writers wait for each other instead of failing with SQLITE_BUSY
        db.busy_timeout(BUSY_TIMEOUT)?;
        let store = Self { db };
        store.create_schema()?;
        info!(path = ?path, "Opened SQLite store");
        Ok(store)
    }

    #[cfg(test)]
    fn open_in_memory() -> Result<Self, StorageError> {
        let store = Self {
            db: Connection::open_in_memory()?,
        };
        store.create_schema()?;
        Ok(store)
    }

    fn create_schema(&self) -> Result<(), StorageError> {
        debug!("Creating kv schema");
        self.db.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS kv (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at INTEGER NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl KvStore for SqliteKv {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        validate_key(key)?;

        let value = self
            .db
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get::<_, String>(0))
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StorageError> {
        validate_key(key)?;

        let tx = self.db.transaction()?;
        tx.execute(UPSERT_SQL, rusqlite::params![key, value, now_ms()])?;
        tx.commit()?;

        debug!(key, bytes = value.len(), "Wrote value to SQLite store");
        Ok(())
    }

    fn update(
        &mut self,
        key: &str,
        apply: &mut dyn FnMut(Option<String>) -> Option<String>,
    ) -> Result<(), StorageError> {
        validate_key(key)?;

        // IMMEDIATE takes the write lock before the read
        let tx = self.db.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let current = tx
            .query_row("SELECT value FROM kv WHERE key = ?1", [key], |row| row.get::<_, String>(0))
            .optional()?;

        if let Some(value) = apply(current) {
            tx.execute(UPSERT_SQL, rusqlite::params![key, value, now_ms()])?;
            debug!(key, bytes = value.len(), "Updated value in SQLite store");
        }

        tx.commit()?;
        Ok(())
    }
}

/// Milliseconds since the Unix epoch, stamped on each SQLite row
fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}
