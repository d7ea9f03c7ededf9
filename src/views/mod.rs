//! The four browsing views and the resolution rules they share.

mod albums;
mod camera;
mod date;
pub mod naming;
mod tags;

use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use thiserror::Error;

pub use albums::AlbumView;
pub use camera::CameraView;
pub use date::DateView;
pub use tags::TagView;

use crate::storage::{Database, DatabaseError};

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("Not found")]
    NotFound,
    #[error("Not a directory")]
    NotDirectory,
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Attributes mirrored from a real file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileAttributes {
    pub mode: u32,
    pub size: u64,
    pub uid: u32,
    pub gid: u32,
    pub nlink: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

fn unix_time(secs: i64, nanos: i64) -> SystemTime {
    if secs < 0 {
        return UNIX_EPOCH;
    }
    UNIX_EPOCH + Duration::new(secs as u64, nanos.clamp(0, 999_999_999) as u32)
}

impl From<&std::fs::Metadata> for FileAttributes {
    fn from(meta: &std::fs::Metadata) -> Self {
        Self {
            mode: meta.permissions().mode(),
            size: meta.len(),
            uid: meta.uid(),
            gid: meta.gid(),
            nlink: 1,
            atime: unix_time(meta.atime(), meta.atime_nsec()),
            mtime: unix_time(meta.mtime(), meta.mtime_nsec()),
            ctime: unix_time(meta.ctime(), meta.ctime_nsec()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Directory,
    RealFile(FileAttributes),
    NotFound,
}

/// A browsing view over the index. Paths are given as segments relative to
/// the view's own directory.
pub trait View: Send + Sync {
    /// Directory name of the view under the mount root
    fn name(&self) -> &'static str;

    fn db(&self) -> &Database;

    /// Whether a non-empty, non-photo path names a directory of this view.
    fn resolve_directory(&self, segments: &[&str]) -> Result<bool, ViewError>;

    /// Children of a directory already known to exist.
    fn children(&self, segments: &[&str]) -> Result<Vec<String>, ViewError>;

    fn resolve(&self, segments: &[&str]) -> Result<Entry, ViewError> {
        let Some(last) = segments.last() else {
            return Ok(Entry::Directory);
        };

        if let Some(id) = naming::decode_photo_name(last) {
            let Some(path) = self.db().real_path(id)? else {
                return Ok(Entry::NotFound);
            };
            return match std::fs::metadata(&path) {
                Ok(meta) => Ok(Entry::RealFile(FileAttributes::from(&meta))),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Entry::NotFound),
                Err(e) => Err(e.into()),
            };
        }

        if self.resolve_directory(segments)? {
            Ok(Entry::Directory)
        } else {
            Ok(Entry::NotFound)
        }
    }

    fn list(&self, segments: &[&str]) -> Result<Vec<String>, ViewError> {
        match self.resolve(segments)? {
            Entry::Directory => self.children(segments),
            Entry::RealFile(_) => Err(ViewError::NotDirectory),
            Entry::NotFound => Err(ViewError::NotFound),
        }
    }
}

/// The fixed set of views, in root listing order.
pub struct ViewRegistry {
    views: Vec<Arc<dyn View>>,
}

impl ViewRegistry {
    pub fn new(db: Database, select_tag: &str) -> Self {
        let views: Vec<Arc<dyn View>> = vec![
            Arc::new(DateView::new(db.clone())),
            Arc::new(AlbumView::new(db.clone(), select_tag)),
            Arc::new(TagView::new(db.clone())),
            Arc::new(CameraView::new(db)),
        ];
        Self { views }
    }

    pub fn names(&self) -> Vec<String> {
        self.views.iter().map(|v| v.name().to_string()).collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn View>> {
        self.views.iter().find(|v| v.name() == name).cloned()
    }
}
