use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::event::{AccessKind, AccessMode, CreateKind, ModifyKind, RenameMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::{SyncError, SyncEvent, Walker};

/// Running live watch. Dropping the watcher closes the event channel, which
/// ends the processing task.
pub struct WatcherHandle {
    watcher: RecommendedWatcher,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    pub async fn stop(self) {
        drop(self.watcher);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Watcher task failed");
        }
    }
}

/// Translate a raw notification into index changes.
pub fn translate(event: &Event) -> Vec<SyncEvent> {
    let updated = |p: &PathBuf| SyncEvent::Updated(p.clone());
    let removed = |p: &PathBuf| SyncEvent::Removed(p.clone());

    match &event.kind {
        EventKind::Create(CreateKind::Folder) => Vec::new(),
        EventKind::Create(_) => event
            .paths
            .iter()
            .filter(|p| !p.is_dir())
            .map(updated)
            .collect(),
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => {
            event.paths.iter().map(updated).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
            event.paths.iter().map(removed).collect()
        }
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
            event.paths.iter().map(updated).collect()
        }
        // Backends that pair renames also report both halves on their own
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => Vec::new(),
        EventKind::Modify(ModifyKind::Name(_)) => event
            .paths
            .iter()
            .map(|p| if p.exists() { updated(p) } else { removed(p) })
            .collect(),
        EventKind::Remove(_) => event.paths.iter().map(removed).collect(),
        _ => Vec::new(),
    }
}

/// Targets of symlinked directories anywhere below `root`.
fn symlinked_dirs(root: &Path) -> Vec<PathBuf> {
    WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.path_is_symlink() && e.file_type().is_dir())
        .filter_map(|e| e.path().canonicalize().ok())
        .collect()
}

/// Watch the walker's root, and every symlinked subtree, applying changes
/// one at a time in arrival order.
pub fn start(walker: Arc<Walker>) -> Result<WatcherHandle, SyncError> {
    let (tx, mut rx) = mpsc::unbounded_channel::<SyncEvent>();

    let mut watcher = RecommendedWatcher::new(
        move |result: Result<Event, notify::Error>| match result {
            Ok(event) => {
                for change in translate(&event) {
                    let _ = tx.send(change);
                }
            }
            Err(e) => warn!(error = %e, "Filesystem watch error"),
        },
        notify::Config::default(),
    )?;

    let root = walker.root().to_path_buf();
    watcher.watch(&root, RecursiveMode::Recursive)?;
    for dir in symlinked_dirs(&root) {
        debug!(path = %dir.display(), "Watching symlinked directory");
        if let Err(e) = watcher.watch(&dir, RecursiveMode::Recursive) {
            warn!(path = %dir.display(), error = %e, "Failed to watch symlinked directory");
        }
    }
    info!(root = %root.display(), "Watching photo tree");

    let task = tokio::task::spawn_blocking(move || {
        while let Some(change) = rx.blocking_recv() {
            if let Err(e) = walker.apply(&change) {
                warn!(event = ?change, error = %e, "Failed to apply filesystem change");
            }
        }
        debug!("Watcher channel closed");
    });

    Ok(WatcherHandle { watcher, task })
}
