//! Keeps the index in step with the real photo tree: a full scan or a
//! reconciliation at startup, then live filesystem events.

pub mod walker;
pub mod watcher;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use thiserror::Error;

use crate::storage::DatabaseError;

pub use walker::{SyncReport, Walker};
pub use watcher::WatcherHandle;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    InitialScan,
    Reconciliation,
}

/// A change to apply to the index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The file is gone (deleted or moved away).
    Removed(PathBuf),
    /// The file appeared or its content changed.
    Updated(PathBuf),
}

/// Last-modified time of a file as a local `YYYYMMDDHHMMSS` stamp.
pub fn last_modified(path: &Path) -> std::io::Result<String> {
    let modified = std::fs::metadata(path)?.modified()?;
    let local: DateTime<Local> = modified.into();
    Ok(local.format("%Y%m%d%H%M%S").to_string())
}

/// Index key for a path. Paths that no longer exist keep their file name
/// under the canonical parent. None for paths that are not valid UTF-8, which
/// are never indexed.
pub(crate) fn index_key(path: &Path) -> Option<String> {
    let resolved = match path.canonicalize() {
        Ok(canonical) => canonical,
        Err(_) => match (path.parent(), path.file_name()) {
            (Some(parent), Some(name)) => parent
                .canonicalize()
                .map(|parent| parent.join(name))
                .unwrap_or_else(|_| path.to_path_buf()),
            _ => path.to_path_buf(),
        },
    };
    resolved.to_str().map(str::to_string)
}
