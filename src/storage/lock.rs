//! Advisory exclusive lock on `<db>.lock`.

use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("Lock file error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Cross-process write lock. Holding the open, locked file is holding the lock;
/// dropping it releases the lock.
#[derive(Debug)]
pub struct WriteLock {
    path: PathBuf,
    held: Mutex<Option<File>>,
}

impl WriteLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            held: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_held(&self) -> bool {
        self.held.lock().is_some()
    }

    fn open_file(&self) -> Result<File, LockError> {
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&self.path)
            .map_err(|source| LockError::Io {
                path: self.path.clone(),
                source,
            })
    }

    /// Attempt to take the lock without blocking. Returns false if another
    /// holder exists.
    pub fn try_acquire(&self) -> Result<bool, LockError> {
        let mut held = self.held.lock();
        if held.is_some() {
            return Ok(true);
        }

        let file = self.open_file()?;
        match file.try_lock() {
            Ok(()) => {
                *held = Some(file);
                Ok(true)
            }
            Err(TryLockError::WouldBlock) => Ok(false),
            Err(TryLockError::Error(source)) => Err(LockError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }

    /// Block until the lock is obtained.
    pub fn acquire(&self) -> Result<(), LockError> {
        if self.is_held() {
            return Ok(());
        }

        // Wait outside the mutex so is_held() stays answerable meanwhile.
        let file = self.open_file()?;
        file.lock().map_err(|source| LockError::Io {
            path: self.path.clone(),
            source,
        })?;

        let mut held = self.held.lock();
        if held.is_none() {
            *held = Some(file);
        }
        Ok(())
    }

    /// Release the lock if held.
    pub fn release(&self) -> Result<(), LockError> {
        if let Some(file) = self.held.lock().take() {
            file.unlock().map_err(|source| LockError::Io {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(())
    }
}
