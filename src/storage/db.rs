use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use ring::digest;
use rusqlite::{Connection, OpenFlags};
use thiserror::Error;
use tracing::{debug, info};

use super::cache::{CacheKey, ViewCache};
use super::lock::{LockError, WriteLock};
use super::schema::SCHEMA;
use crate::state_machine::WriterState;

const BUSY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Lock error: {0}")]
    Lock(#[from] LockError),
    #[error("Photo already indexed: {0}")]
    DuplicatePath(String),
    #[error("Index is read-only: another process holds the write lock")]
    ReadOnly,
}

/// Handle to the photo index of one root. Cheap to clone; clones share the
/// write lock, the writer role and the view cache.
pub struct Database {
    db_path: Arc<PathBuf>,
    existed: bool,
    lock: Arc<WriteLock>,
    state: Arc<WriterState>,
    pub(super) cache: Arc<ViewCache>,
}

impl Clone for Database {
    fn clone(&self) -> Self {
        Self {
            db_path: Arc::clone(&self.db_path),
            existed: self.existed,
            lock: Arc::clone(&self.lock),
            state: Arc::clone(&self.state),
            cache: Arc::clone(&self.cache),
        }
    }
}

/// Index file name for a root: hex SHA-256 of its path.
pub fn index_name(root: &Path) -> String {
    let hash = digest::digest(&digest::SHA256, root.to_string_lossy().as_bytes());
    let hex: String = hash.as_ref().iter().map(|b| format!("{b:02x}")).collect();
    format!("{hex}.db")
}

impl Database {
    /// Open the index for `root` inside `data_dir`. The instance starts
    /// read-only; call [`Database::try_acquire_write_lock`] to write.
    pub fn open<P: AsRef<Path>>(data_dir: P, root: &Path) -> Result<Self, DatabaseError> {
        Self::open_file(data_dir.as_ref().join(index_name(root)))
    }

    /// Open an index at an explicit file path.
    pub fn open_file(db_path: PathBuf) -> Result<Self, DatabaseError> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let existed = db_path.exists();

        let mut lock_path = db_path.clone().into_os_string();
        lock_path.push(".lock");

        debug!(path = %db_path.display(), existed, "Opening photo index");

        let db = Self {
            db_path: Arc::new(db_path),
            existed,
            lock: Arc::new(WriteLock::new(PathBuf::from(lock_path))),
            state: Arc::new(WriterState::new()),
            cache: Arc::new(ViewCache::new()),
        };

        // Readers of a brand new index see empty tables rather than errors.
        db.connect()?.execute_batch(SCHEMA)?;
        Ok(db)
    }

    pub fn path(&self) -> &Path {
        &self.db_path
    }

    /// True if no index file existed when this handle was opened.
    pub fn is_empty(&self) -> bool {
        !self.existed
    }

    pub fn is_writable(&self) -> bool {
        self.state.is_writer()
    }

    /// Non-blocking attempt to become the writer. On success the schema is
    /// ensured and writes are permitted.
    pub fn try_acquire_write_lock(&self) -> Result<bool, DatabaseError> {
        if !self.lock.try_acquire()? {
            return Ok(false);
        }
        self.promote()?;
        Ok(true)
    }

    /// Block until the write lock is obtained, then promote this instance.
    pub fn wait_for_write_lock(&self) -> Result<(), DatabaseError> {
        self.lock.acquire()?;
        self.promote()
    }

    /// Drop the write lock and return to read-only mode.
    pub fn release_write_lock(&self) -> Result<(), DatabaseError> {
        self.state.demote();
        self.lock.release()?;
        Ok(())
    }

    fn promote(&self) -> Result<(), DatabaseError> {
        let conn = self.open_connection(OpenFlags::default())?;
        let mode: String = conn.query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))?;
        conn.execute_batch(SCHEMA)?;
        if self.state.promote() {
            info!(path = %self.db_path.display(), journal_mode = %mode, "Acquired index write lock");
        }
        Ok(())
    }

    fn open_connection(&self, flags: OpenFlags) -> Result<Connection, DatabaseError> {
        let conn = Connection::open_with_flags(self.db_path.as_path(), flags)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Ok(conn)
    }

    /// A fresh connection for one read operation.
    pub(super) fn connect(&self) -> Result<Connection, DatabaseError> {
        self.open_connection(OpenFlags::default())
    }

    /// A fresh connection for one write operation; refused while read-only.
    pub(super) fn connect_for_write(&self) -> Result<Connection, DatabaseError> {
        if !self.state.is_writer() {
            return Err(DatabaseError::ReadOnly);
        }
        self.connect()
    }

    /// Recompute years, labels and tags and install them as one unit.
    pub fn rebuild_cache(&self) -> Result<(), DatabaseError> {
        let generation = self.cache.generation();
        let mut entries = HashMap::new();
        for key in CacheKey::ALL {
            entries.insert(key, self.load_aggregate(key)?);
        }
        if !self.cache.install(generation, entries) {
            debug!("Cache rebuild superseded by a concurrent write");
        }
        Ok(())
    }
}
