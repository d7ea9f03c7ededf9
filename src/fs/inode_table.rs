//! Inode numbers for virtual paths.
//!
//! An inode is handed out the first time a path is looked up or listed. The
//! kernel's lookup count keeps it alive; listed-only paths are evicted when a
//! later listing of their directory no longer returns them, since ordinals
//! shift whenever the index changes.

use std::collections::{HashMap, HashSet};

#[derive(Debug)]
pub struct InodeTable {
    by_path: HashMap<String, u64>,
    by_inode: HashMap<u64, String>,
    /// Outstanding kernel lookups per inode
    lookups: HashMap<u64, u64>,
    /// Known child paths per directory path
    children: HashMap<String, HashSet<String>>,
    next: u64,
}

impl Default for InodeTable {
    fn default() -> Self {
        Self::new()
    }
}

fn parent_of(path: &str) -> &str {
    match path.rsplit_once('/') {
        Some(("", _)) | None => "/",
        Some((parent, _)) => parent,
    }
}

impl InodeTable {
    pub const ROOT: u64 = 1;

    pub fn new() -> Self {
        let mut by_path = HashMap::new();
        let mut by_inode = HashMap::new();
        by_path.insert("/".to_string(), Self::ROOT);
        by_inode.insert(Self::ROOT, "/".to_string());
        Self {
            by_path,
            by_inode,
            lookups: HashMap::new(),
            children: HashMap::new(),
            next: Self::ROOT + 1,
        }
    }

    /// Inode for a path, allocating one if needed. Does not count as a
    /// kernel lookup.
    pub fn inode(&mut self, path: &str) -> u64 {
        if let Some(inode) = self.by_path.get(path) {
            return *inode;
        }
        let inode = self.next;
        self.next += 1;
        self.by_path.insert(path.to_string(), inode);
        self.by_inode.insert(inode, path.to_string());
        self.children
            .entry(parent_of(path).to_string())
            .or_default()
            .insert(path.to_string());
        inode
    }

    /// Inode for a path handed to the kernel in an entry reply.
    pub fn lookup(&mut self, path: &str) -> u64 {
        let inode = self.inode(path);
        *self.lookups.entry(inode).or_insert(0) += 1;
        inode
    }

    pub fn path(&self, inode: u64) -> Option<&str> {
        self.by_inode.get(&inode).map(String::as_str)
    }

    /// Look up `name` inside the directory `parent`.
    pub fn child(&mut self, parent: u64, name: &str) -> Option<(u64, String)> {
        let path = join(self.path(parent)?, name);
        Some((self.lookup(&path), path))
    }

    /// Drop `nlookup` kernel references; the inode goes once none remain.
    pub fn forget(&mut self, inode: u64, nlookup: u64) {
        if inode == Self::ROOT {
            return;
        }
        let remaining = match self.lookups.get_mut(&inode) {
            Some(count) => {
                *count = count.saturating_sub(nlookup);
                *count
            }
            None => 0,
        };
        if remaining == 0 {
            self.lookups.remove(&inode);
            self.remove(inode);
        }
    }

    /// Evict children of `parent` missing from its latest listing, unless the
    /// kernel still holds them.
    pub fn retain_listed(&mut self, parent: &str, names: &[String]) {
        let Some(known) = self.children.get(parent) else {
            return;
        };
        let listed: HashSet<String> = names.iter().map(|name| join(parent, name)).collect();
        let stale: Vec<u64> = known
            .iter()
            .filter(|path| !listed.contains(*path))
            .filter_map(|path| self.by_path.get(path).copied())
            .filter(|inode| !self.lookups.contains_key(inode))
            .collect();
        for inode in stale {
            self.remove(inode);
        }
    }

    /// Point the inode of `old` at `new` after a rename.
    pub fn rename(&mut self, old: &str, new: &str) {
        let Some(inode) = self.by_path.remove(old) else {
            return;
        };
        self.unlink_child(old);
        if let Some(previous) = self.by_path.insert(new.to_string(), inode) {
            if previous != inode && !self.lookups.contains_key(&previous) {
                self.by_inode.remove(&previous);
            }
        }
        self.by_inode.insert(inode, new.to_string());
        self.children
            .entry(parent_of(new).to_string())
            .or_default()
            .insert(new.to_string());
    }

    fn remove(&mut self, inode: u64) {
        let Some(path) = self.by_inode.remove(&inode) else {
            return;
        };
        if self.by_path.get(&path) == Some(&inode) {
            self.by_path.remove(&path);
            self.unlink_child(&path);
        }
    }

    fn unlink_child(&mut self, path: &str) {
        let parent = parent_of(path);
        if let Some(siblings) = self.children.get_mut(parent) {
            siblings.remove(path);
            if siblings.is_empty() {
                self.children.remove(parent);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.by_inode.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_inode.is_empty()
    }
}

pub fn join(parent: &str, name: &str) -> String {
    if parent == "/" {
        format!("/{name}")
    } else {
        format!("{parent}/{name}")
    }
}
