//! Filesystem operations over the views, independent of the kernel protocol.
//!
//! # Architecture
//!
//! - `PhotoFs`: routes virtual paths to views and owns open file handles
//! - `ScratchArea`: temporary files behind write-back siblings
//! - `InodeTable`: inode <-> virtual path mapping for the FUSE adapter
//! - `PhotoFuse`: `fuser::Filesystem` implementation (`fuse` feature)

#[cfg(feature = "fuse")]
mod fuse;
mod inode_table;
mod scratch;

use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::os::unix::fs::FileExt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, info};

#[cfg(feature = "fuse")]
pub use fuse::PhotoFuse;
pub use inode_table::InodeTable;
pub use scratch::ScratchArea;

use crate::storage::{Database, DatabaseError};
use crate::views::naming::{decode_photo_name, decode_scratch_name, ScratchName};
use crate::views::{Entry, View, ViewError, ViewRegistry};

#[derive(Debug, Error)]
pub enum FsError {
    #[error("No such file or directory")]
    NotFound,
    #[error("Not a directory")]
    NotDirectory,
    #[error("Is a directory")]
    IsDirectory,
    #[error("Read-only: another instance owns the index")]
    ReadOnly,
    #[error("Operation not permitted")]
    NotPermitted,
    #[error("Bad file handle {0}")]
    BadHandle(u64),
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ViewError> for FsError {
    fn from(e: ViewError) -> Self {
        match e {
            ViewError::NotFound => FsError::NotFound,
            ViewError::NotDirectory => FsError::NotDirectory,
            ViewError::Database(e) => FsError::Database(e),
            ViewError::Io(e) => FsError::Io(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenMode {
    Read,
    Write,
    ReadWrite,
}

impl OpenMode {
    pub fn writes(&self) -> bool {
        !matches!(self, OpenMode::Read)
    }

    fn options(&self) -> OpenOptions {
        let mut options = OpenOptions::new();
        match self {
            OpenMode::Read => options.read(true),
            OpenMode::Write => options.write(true),
            OpenMode::ReadWrite => options.read(true).write(true),
        };
        options
    }
}

/// A virtual path split into its view and the view-relative segments.
pub enum Route<'a> {
    Root,
    View(Arc<dyn View>, Vec<&'a str>),
}

/// An open file and, for write-back siblings, the virtual path it was opened
/// through.
struct OpenFile {
    file: Arc<File>,
    scratch: Option<String>,
}

pub struct PhotoFs {
    db: Database,
    views: ViewRegistry,
    scratch: ScratchArea,
    handles: Mutex<HashMap<u64, OpenFile>>,
    next_handle: AtomicU64,
}

impl PhotoFs {
    pub fn new(db: Database, views: ViewRegistry) -> Result<Self, FsError> {
        Ok(Self {
            db,
            views,
            scratch: ScratchArea::new()?,
            handles: Mutex::new(HashMap::new()),
            next_handle: AtomicU64::new(1),
        })
    }

    pub fn is_writable(&self) -> bool {
        self.db.is_writable()
    }

    fn ensure_writable(&self) -> Result<(), FsError> {
        if self.db.is_writable() {
            Ok(())
        } else {
            Err(FsError::ReadOnly)
        }
    }

    pub fn route<'a>(&self, path: &'a str) -> Result<Route<'a>, FsError> {
        let mut segments = path.split('/').filter(|s| !s.is_empty());
        let Some(name) = segments.next() else {
            return Ok(Route::Root);
        };
        let view = self.views.get(name).ok_or(FsError::NotFound)?;
        Ok(Route::View(view, segments.collect()))
    }

    /// Decoded write-back sibling name, if `path` is one and the photo it
    /// shadows exists.
    fn sibling(&self, path: &str) -> Result<Option<ScratchName>, FsError> {
        let Some(name) = path.rsplit('/').next().and_then(decode_scratch_name) else {
            return Ok(None);
        };
        if self.db.real_path(name.id)?.is_none() {
            return Ok(None);
        }
        Ok(Some(name))
    }

    /// Scratch file behind a write-back sibling name, registering it for
    /// writing.
    fn scratch_for(&self, path: &str) -> Result<Option<PathBuf>, FsError> {
        if let Some(scratch) = self.scratch.get(path) {
            return Ok(Some(scratch));
        }
        Ok(self
            .sibling(path)?
            .map(|name| self.scratch.register(path, &name)))
    }

    /// Scratch file behind a sibling name, without registering it.
    fn scratch_location(&self, path: &str) -> Result<Option<PathBuf>, FsError> {
        if let Some(scratch) = self.scratch.get(path) {
            return Ok(Some(scratch));
        }
        Ok(self.sibling(path)?.map(|name| self.scratch.location(&name)))
    }

    fn has_open_handles(&self, path: &str) -> bool {
        self.handles
            .lock()
            .values()
            .any(|open| open.scratch.as_deref() == Some(path))
    }

    /// Real file behind a photo path.
    fn real_path(&self, path: &str) -> Result<PathBuf, FsError> {
        let Route::View(view, segments) = self.route(path)? else {
            return Err(FsError::IsDirectory);
        };
        match view.resolve(&segments)? {
            Entry::RealFile(_) => {}
            Entry::Directory => return Err(FsError::IsDirectory),
            Entry::NotFound => return Err(FsError::NotFound),
        }
        let id = segments
            .last()
            .and_then(|name| decode_photo_name(name))
            .ok_or(FsError::NotFound)?;
        self.db.real_path(id)?.ok_or(FsError::NotFound)
    }

    pub fn resolve_attributes(&self, path: &str) -> Result<Entry, FsError> {
        match self.route(path)? {
            Route::Root => Ok(Entry::Directory),
            Route::View(view, segments) => {
                if let Some(scratch) = self.scratch_location(path)? {
                    return Ok(Entry::RealFile(self.scratch.attributes(&scratch)?));
                }
                Ok(view.resolve(&segments)?)
            }
        }
    }

    pub fn list_children(&self, path: &str) -> Result<Vec<String>, FsError> {
        match self.route(path)? {
            Route::Root => Ok(self.views.names()),
            Route::View(view, segments) => Ok(view.list(&segments)?),
        }
    }

    fn register_handle(&self, file: File, scratch: Option<&str>) -> u64 {
        let fh = self.next_handle.fetch_add(1, Ordering::Relaxed);
        let open = OpenFile {
            file: Arc::new(file),
            scratch: scratch.map(str::to_string),
        };
        self.handles.lock().insert(fh, open);
        fh
    }

    fn handle(&self, fh: u64) -> Result<Arc<File>, FsError> {
        self.handles
            .lock()
            .get(&fh)
            .map(|open| Arc::clone(&open.file))
            .ok_or(FsError::BadHandle(fh))
    }

    pub fn open(&self, path: &str, mode: OpenMode) -> Result<u64, FsError> {
        if self.scratch_location(path)?.is_some() {
            self.ensure_writable()?;
            let scratch = self.scratch_for(path)?.ok_or(FsError::NotFound)?;
            let file = OpenOptions::new()
                .read(true)
                .write(true)
                .create(true)
                .truncate(false)
                .open(&scratch)?;
            return Ok(self.register_handle(file, Some(path)));
        }

        let real = self.real_path(path)?;
        if mode.writes() {
            self.ensure_writable()?;
        }
        let file = mode.options().open(&real)?;
        debug!(path, real = %real.display(), ?mode, "Opened photo");
        Ok(self.register_handle(file, None))
    }

    /// Create a write-back sibling. Only sibling names of indexed photos can
    /// be created.
    pub fn create(&self, path: &str) -> Result<u64, FsError> {
        self.ensure_writable()?;
        let scratch = self.scratch_for(path)?.ok_or(FsError::NotPermitted)?;
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(&scratch)?;
        Ok(self.register_handle(file, Some(path)))
    }

    pub fn read(&self, fh: u64, len: usize, offset: u64) -> Result<Vec<u8>, FsError> {
        let file = self.handle(fh)?;
        let mut buf = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            let n = file.read_at(&mut buf[filled..], offset + filled as u64)?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        buf.truncate(filled);
        Ok(buf)
    }

    pub fn write(&self, fh: u64, data: &[u8], offset: u64) -> Result<usize, FsError> {
        let file = self.handle(fh)?;
        file.write_all_at(data, offset)?;
        Ok(data.len())
    }

    /// Close a handle. A write-back sibling that was never written is
    /// forgotten once its last handle closes.
    pub fn release(&self, fh: u64) -> Result<(), FsError> {
        let open = self
            .handles
            .lock()
            .remove(&fh)
            .ok_or(FsError::BadHandle(fh))?;
        if let Some(path) = open.scratch {
            self.discard_unwritten(&path)?;
        }
        Ok(())
    }

    fn discard_unwritten(&self, path: &str) -> Result<(), FsError> {
        if !self.has_open_handles(path) && self.scratch.discard_if_unwritten(path)? {
            debug!(path, "Dropped unwritten write-back sibling");
        }
        Ok(())
    }

    pub fn truncate(&self, path: &str, len: u64) -> Result<(), FsError> {
        self.ensure_writable()?;
        match self.scratch_for(path)? {
            Some(scratch) => {
                OpenOptions::new()
                    .write(true)
                    .create(true)
                    .truncate(false)
                    .open(scratch)?
                    .set_len(len)?;
                self.discard_unwritten(path)
            }
            None => {
                OpenOptions::new()
                    .write(true)
                    .open(self.real_path(path)?)?
                    .set_len(len)?;
                Ok(())
            }
        }
    }

    /// Removing photos through the mount is ignored.
    pub fn unlink(&self, path: &str) -> Result<(), FsError> {
        debug!(path, "Ignoring unlink");
        Ok(())
    }

    /// Move a write-back sibling onto the photo named by `new`.
    pub fn rename(&self, old: &str, new: &str) -> Result<(), FsError> {
        self.ensure_writable()?;
        let scratch = self.scratch_for(old)?.ok_or(FsError::NotPermitted)?;
        let real = self.real_path(new)?;

        let moved = match std::fs::rename(&scratch, &real) {
            Err(e) if e.kind() == std::io::ErrorKind::CrossesDevices => {
                std::fs::copy(&scratch, &real).and_then(|_| std::fs::remove_file(&scratch))
            }
            other => other,
        };
        if let Err(e) = moved {
            if e.kind() == std::io::ErrorKind::NotFound {
                // Nothing was ever written through the sibling
                self.discard_unwritten(old)?;
            }
            return Err(e.into());
        }
        self.scratch.take(old);
        info!(from = old, real = %real.display(), "Wrote back edited photo");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{record, test_db};
    use crate::views::naming::photo_name;

    fn setup() -> (tempfile::TempDir, PhotoFs, String) {
        let (dir, db) = test_db();
        let real = dir.path().join("a.jpg");
        std::fs::write(&real, b"original").unwrap();
        let id = db
            .store_photo(&record(real.to_str().unwrap(), "20130704100000"), &[])
            .unwrap();
        let fs = PhotoFs::new(db.clone(), ViewRegistry::new(db, "select")).unwrap();
        (dir, fs, format!("/date/2013/all/{}", photo_name(id, 1, 1)))
    }

    #[test]
    fn sibling_lookups_do_not_register() {
        let (_dir, fs, photo) = setup();
        let sibling = format!("{photo}77");

        assert!(matches!(
            fs.resolve_attributes(&sibling).unwrap(),
            Entry::RealFile(_)
        ));
        assert!(fs.scratch.is_empty());
    }

    #[test]
    fn unwritten_sibling_is_dropped_on_release() {
        let (_dir, fs, photo) = setup();
        let sibling = format!("{photo}77");

        let fh = fs.create(&sibling).unwrap();
        assert_eq!(fs.scratch.len(), 1);
        fs.release(fh).unwrap();
        assert!(fs.scratch.is_empty());

        let fh = fs.create(&sibling).unwrap();
        fs.write(fh, b"edited", 0).unwrap();
        fs.release(fh).unwrap();
        assert_eq!(fs.scratch.len(), 1);
    }

    #[test]
    fn sibling_kept_while_another_handle_is_open() {
        let (_dir, fs, photo) = setup();
        let sibling = format!("{photo}77");

        let first = fs.create(&sibling).unwrap();
        let second = fs.open(&sibling, OpenMode::Write).unwrap();
        fs.release(first).unwrap();
        assert_eq!(fs.scratch.len(), 1);

        fs.write(second, b"edited", 0).unwrap();
        fs.release(second).unwrap();
        assert_eq!(fs.scratch.len(), 1);
    }

    #[test]
    fn failed_move_keeps_the_sibling() {
        let (dir, fs, photo) = setup();
        let sibling = format!("{photo}77");
        let fh = fs.create(&sibling).unwrap();
        fs.write(fh, b"edited", 0).unwrap();
        fs.release(fh).unwrap();

        // A directory in the photo's place makes the move fail
        let real = dir.path().join("a.jpg");
        std::fs::remove_file(&real).unwrap();
        std::fs::create_dir(&real).unwrap();
        assert!(fs.rename(&sibling, &photo).is_err());
        assert_eq!(fs.scratch.len(), 1);

        std::fs::remove_dir(&real).unwrap();
        std::fs::write(&real, b"original").unwrap();
        fs.rename(&sibling, &photo).unwrap();
        assert_eq!(std::fs::read(&real).unwrap(), b"edited");
        assert!(fs.scratch.is_empty());
    }

    #[test]
    fn renaming_an_unwritten_sibling_fails_cleanly() {
        let (dir, fs, photo) = setup();
        let sibling = format!("{photo}77");

        assert!(matches!(fs.rename(&sibling, &photo), Err(FsError::Io(_))));
        assert!(fs.scratch.is_empty());
        assert_eq!(std::fs::read(dir.path().join("a.jpg")).unwrap(), b"original");
    }
}
