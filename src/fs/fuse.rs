use std::ffi::OsStr;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, FileType, Filesystem, ReplyAttr, ReplyCreate, ReplyData, ReplyDirectory,
    ReplyEmpty, ReplyEntry, ReplyOpen, ReplyWrite, Request, TimeOrNow,
};
use tracing::{debug, warn};

use super::inode_table::{join, InodeTable};
use super::{FsError, OpenMode, PhotoFs};
use crate::views::naming::is_photo_name;
use crate::views::{Entry, FileAttributes};

const TTL: Duration = Duration::from_secs(1);
const BLOCK_SIZE: u32 = 512;

impl FsError {
    pub fn errno(&self) -> libc::c_int {
        match self {
            FsError::NotFound => libc::ENOENT,
            FsError::NotDirectory => libc::ENOTDIR,
            FsError::IsDirectory => libc::EISDIR,
            FsError::ReadOnly => libc::EROFS,
            FsError::NotPermitted => libc::EPERM,
            FsError::BadHandle(_) => libc::EBADF,
            FsError::Database(_) => libc::EIO,
            FsError::Io(e) => e.raw_os_error().unwrap_or(libc::EIO),
        }
    }
}

impl OpenMode {
    pub fn from_flags(flags: i32) -> Self {
        match flags & libc::O_ACCMODE {
            libc::O_RDONLY => OpenMode::Read,
            libc::O_WRONLY => OpenMode::Write,
            _ => OpenMode::ReadWrite,
        }
    }
}

/// `fuser` adapter over [`PhotoFs`].
pub struct PhotoFuse {
    fs: Arc<PhotoFs>,
    inodes: InodeTable,
    uid: u32,
    gid: u32,
    mounted_at: SystemTime,
}

impl PhotoFuse {
    /// Directories are reported as owned by `uid`/`gid`.
    pub fn new(fs: Arc<PhotoFs>, uid: u32, gid: u32) -> Self {
        Self {
            fs,
            inodes: InodeTable::new(),
            uid,
            gid,
            mounted_at: SystemTime::now(),
        }
    }

    fn directory_attr(&self, ino: u64) -> FileAttr {
        FileAttr {
            ino,
            size: 4096,
            blocks: 8,
            atime: self.mounted_at,
            mtime: self.mounted_at,
            ctime: self.mounted_at,
            crtime: self.mounted_at,
            kind: FileType::Directory,
            perm: 0o755,
            nlink: 2,
            uid: self.uid,
            gid: self.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }

    fn file_attr(&self, ino: u64, attrs: &FileAttributes) -> FileAttr {
        FileAttr {
            ino,
            size: attrs.size,
            blocks: attrs.size.div_ceil(BLOCK_SIZE as u64),
            atime: attrs.atime,
            mtime: attrs.mtime,
            ctime: attrs.ctime,
            crtime: attrs.ctime,
            kind: FileType::RegularFile,
            perm: (attrs.mode & 0o7777) as u16,
            nlink: attrs.nlink,
            uid: attrs.uid,
            gid: attrs.gid,
            rdev: 0,
            blksize: BLOCK_SIZE,
            flags: 0,
        }
    }

    fn attr(&self, ino: u64, path: &str) -> Result<FileAttr, FsError> {
        match self.fs.resolve_attributes(path)? {
            Entry::Directory => Ok(self.directory_attr(ino)),
            Entry::RealFile(attrs) => Ok(self.file_attr(ino, &attrs)),
            Entry::NotFound => Err(FsError::NotFound),
        }
    }

    fn path(&self, ino: u64) -> Result<String, FsError> {
        self.inodes
            .path(ino)
            .map(str::to_string)
            .ok_or(FsError::NotFound)
    }

    fn child_path(&self, parent: u64, name: &OsStr) -> Result<String, FsError> {
        let name = name.to_str().ok_or(FsError::NotFound)?;
        Ok(join(&self.path(parent)?, name))
    }
}

fn log_failure(op: &str, path: &str, e: &FsError) {
    match e {
        FsError::NotFound | FsError::ReadOnly | FsError::NotPermitted => {
            debug!(op, path, error = %e, "Filesystem request refused")
        }
        _ => warn!(op, path, error = %e, "Filesystem request failed"),
    }
}

impl Filesystem for PhotoFuse {
    fn lookup(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let Some((ino, path)) = name
            .to_str()
            .and_then(|name| self.inodes.child(parent, name))
        else {
            return reply.error(libc::ENOENT);
        };
        match self.attr(ino, &path) {
            Ok(attr) => reply.entry(&TTL, &attr, 0),
            Err(e) => {
                // No entry reached the kernel, so nothing will be forgotten
                self.inodes.forget(ino, 1);
                if !matches!(e, FsError::NotFound) {
                    log_failure("lookup", &path, &e);
                }
                reply.error(e.errno())
            }
        }
    }

    fn forget(&mut self, _req: &Request<'_>, ino: u64, nlookup: u64) {
        self.inodes.forget(ino, nlookup);
    }

    fn getattr(&mut self, _req: &Request<'_>, ino: u64, _fh: Option<u64>, reply: ReplyAttr) {
        let result = self.path(ino).and_then(|path| self.attr(ino, &path));
        match result {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => reply.error(e.errno()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn setattr(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        _mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        let result = self.path(ino).and_then(|path| {
            if let Some(size) = size {
                self.fs.truncate(&path, size)?;
            }
            self.attr(ino, &path)
        });
        match result {
            Ok(attr) => reply.attr(&TTL, &attr),
            Err(e) => {
                log_failure("setattr", &format!("inode {ino}"), &e);
                reply.error(e.errno())
            }
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let path = match self.path(ino) {
            Ok(path) => path,
            Err(e) => return reply.error(e.errno()),
        };
        let children = match self.fs.list_children(&path) {
            Ok(children) => children,
            Err(e) => {
                log_failure("readdir", &path, &e);
                return reply.error(e.errno());
            }
        };

        self.inodes.retain_listed(&path, &children);
        let mut entries = vec![
            (ino, FileType::Directory, ".".to_string()),
            (ino, FileType::Directory, "..".to_string()),
        ];
        for name in children {
            let child = self.inodes.inode(&join(&path, &name));
            let kind = if is_photo_name(&name) {
                FileType::RegularFile
            } else {
                FileType::Directory
            };
            entries.push((child, kind, name));
        }

        for (i, (child, kind, name)) in entries.into_iter().enumerate().skip(offset as usize) {
            if reply.add(child, (i + 1) as i64, kind, name) {
                break;
            }
        }
        reply.ok();
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let result = self
            .path(ino)
            .and_then(|path| self.fs.open(&path, OpenMode::from_flags(flags)));
        match result {
            Ok(fh) => reply.opened(fh, 0),
            Err(e) => {
                log_failure("open", &format!("inode {ino}"), &e);
                reply.error(e.errno())
            }
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        match self.fs.read(fh, size as usize, offset.max(0) as u64) {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        match self.fs.write(fh, data, offset.max(0) as u64) {
            Ok(written) => reply.written(written as u32),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        match self.fs.release(fh) {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let result = self
            .child_path(parent, name)
            .and_then(|path| self.fs.unlink(&path));
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        _flags: u32,
        reply: ReplyEmpty,
    ) {
        let paths = self
            .child_path(parent, name)
            .and_then(|old| Ok((old, self.child_path(newparent, newname)?)));
        let (old, new) = match paths {
            Ok(paths) => paths,
            Err(e) => return reply.error(e.errno()),
        };
        match self.fs.rename(&old, &new) {
            Ok(()) => {
                self.inodes.rename(&old, &new);
                reply.ok()
            }
            Err(e) => {
                log_failure("rename", &old, &e);
                reply.error(e.errno())
            }
        }
    }

    fn create(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let path = match self.child_path(parent, name) {
            Ok(path) => path,
            Err(e) => return reply.error(e.errno()),
        };
        let ino = self.inodes.inode(&path);
        let result = self
            .fs
            .create(&path)
            .and_then(|fh| Ok((fh, self.attr(ino, &path)?)));
        match result {
            Ok((fh, attr)) => {
                self.inodes.lookup(&path);
                reply.created(&TTL, &attr, 0, fh, 0)
            }
            Err(e) => {
                log_failure("create", &path, &e);
                reply.error(e.errno())
            }
        }
    }
}
