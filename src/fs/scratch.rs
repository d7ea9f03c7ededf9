//! Private scratch files backing write-back siblings (`"07 (0x2b).jpg123"`).
//! Editors write the sibling, then rename it over the photo; the rename moves
//! the scratch file onto the real path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tempfile::TempDir;

use crate::views::naming::ScratchName;
use crate::views::FileAttributes;

const SCRATCH_MODE: u32 = 0o100644;

#[derive(Debug)]
pub struct ScratchArea {
    dir: TempDir,
    entries: Mutex<HashMap<String, PathBuf>>,
}

impl ScratchArea {
    pub fn new() -> std::io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("photo-fs-").tempdir()?;
        Ok(Self {
            dir,
            entries: Mutex::new(HashMap::new()),
        })
    }

    pub fn dir(&self) -> &Path {
        self.dir.path()
    }

    /// Where the scratch file for `name` lives, registered or not.
    pub fn location(&self, name: &ScratchName) -> PathBuf {
        self.dir
            .path()
            .join(format!("0x{:x}{}", name.id, name.suffix))
    }

    /// Scratch file for a virtual path, allocated on first use.
    pub fn register(&self, virtual_path: &str, name: &ScratchName) -> PathBuf {
        self.entries
            .lock()
            .entry(virtual_path.to_string())
            .or_insert_with(|| self.location(name))
            .clone()
    }

    pub fn get(&self, virtual_path: &str) -> Option<PathBuf> {
        self.entries.lock().get(virtual_path).cloned()
    }

    pub fn take(&self, virtual_path: &str) -> Option<PathBuf> {
        self.entries.lock().remove(virtual_path)
    }

    /// Forget a virtual path if nothing was ever written to its scratch
    /// file. Returns true if the entry was dropped.
    pub fn discard_if_unwritten(&self, virtual_path: &str) -> std::io::Result<bool> {
        let mut entries = self.entries.lock();
        let Some(scratch) = entries.get(virtual_path) else {
            return Ok(false);
        };
        match std::fs::metadata(scratch) {
            Ok(meta) if meta.len() > 0 => return Ok(false),
            Ok(_) => std::fs::remove_file(scratch)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        entries.remove(virtual_path);
        Ok(true)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Regular-file attributes for a scratch entry, whether or not anything
    /// has been written yet.
    pub fn attributes(&self, scratch: &Path) -> std::io::Result<FileAttributes> {
        let meta = match std::fs::metadata(scratch) {
            Ok(meta) => meta,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let mut attrs = FileAttributes::from(&std::fs::metadata(self.dir.path())?);
                attrs.mode = SCRATCH_MODE;
                attrs.size = 0;
                return Ok(attrs);
            }
            Err(e) => return Err(e),
        };
        let mut attrs = FileAttributes::from(&meta);
        attrs.mode = SCRATCH_MODE;
        Ok(attrs)
    }
}
