use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, error, info, warn};
use walkdir::WalkDir;

use super::{index_key, last_modified, SyncError, SyncEvent, SyncPhase};
use crate::metadata::MetadataExtractor;
use crate::storage::{Database, DatabaseError};

/// Outcome counts of a scan or reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub phase: SyncPhase,
    /// Newly indexed files
    pub stored: usize,
    /// Files re-indexed because their last-modified time changed
    pub updated: usize,
    /// Records dropped because the file is gone
    pub removed: usize,
    /// Files left as they were
    pub unchanged: usize,
    /// Files whose metadata could not be read
    pub skipped: usize,
}

impl SyncReport {
    fn new(phase: SyncPhase) -> Self {
        Self {
            phase,
            stored: 0,
            updated: 0,
            removed: 0,
            unchanged: 0,
            skipped: 0,
        }
    }
}

pub struct Walker {
    root: PathBuf,
    db: Database,
    extractor: Arc<dyn MetadataExtractor>,
}

impl Walker {
    pub fn new(root: impl Into<PathBuf>, db: Database, extractor: Arc<dyn MetadataExtractor>) -> Self {
        Self {
            root: root.into(),
            db,
            extractor,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full scan for a fresh index, reconciliation otherwise.
    pub fn sync(&self) -> Result<SyncReport, SyncError> {
        if self.db.is_empty() && self.db.photo_count()? == 0 {
            self.initial_scan()
        } else {
            self.reconcile()
        }
    }

    pub fn initial_scan(&self) -> Result<SyncReport, SyncError> {
        info!(root = %self.root.display(), "Indexing photo tree");
        let mut report = SyncReport::new(SyncPhase::InitialScan);
        self.walk(&HashMap::new(), &mut report)?;
        self.db.rebuild_cache()?;
        info!(stored = report.stored, skipped = report.skipped, "Initial scan complete");
        Ok(report)
    }

    /// Drop records of vanished files, then re-index only files that are new
    /// or whose last-modified time changed.
    pub fn reconcile(&self) -> Result<SyncReport, SyncError> {
        info!(root = %self.root.display(), "Reconciling photo index");
        let mut report = SyncReport::new(SyncPhase::Reconciliation);
        self.db.rebuild_cache()?;

        let mut known = self.db.all_last_modified()?;
        let gone: Vec<String> = known
            .keys()
            .filter(|path| !Path::new(path.as_str()).is_file())
            .cloned()
            .collect();
        for path in gone {
            debug!(path = %path, "Removing vanished photo");
            self.db.delete_photo(&path)?;
            known.remove(&path);
            report.removed += 1;
        }

        self.walk(&known, &mut report)?;
        self.db.rebuild_cache()?;
        info!(
            stored = report.stored,
            updated = report.updated,
            removed = report.removed,
            unchanged = report.unchanged,
            skipped = report.skipped,
            "Reconciliation complete"
        );
        Ok(report)
    }

    fn walk(
        &self,
        known: &HashMap<String, String>,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let mut seen = HashSet::new();
        for entry in WalkDir::new(&self.root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "Skipping unreadable entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            let path = match entry.path().canonicalize() {
                Ok(path) => path,
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "Skipping unresolvable path");
                    continue;
                }
            };
            if !seen.insert(path.clone()) {
                continue;
            }
            self.index_file(&path, known, report)?;
        }
        Ok(())
    }

    fn index_file(
        &self,
        path: &Path,
        known: &HashMap<String, String>,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let Some(key) = path.to_str().map(str::to_string) else {
            error!(path = %path.display(), "Skipping photo with a non UTF-8 path");
            report.skipped += 1;
            return Ok(());
        };
        let modified = match last_modified(path) {
            Ok(modified) => modified,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to stat photo");
                report.skipped += 1;
                return Ok(());
            }
        };

        let previous = known.get(&key);
        if previous == Some(&modified) {
            report.unchanged += 1;
            return Ok(());
        }

        let meta = match self.extractor.extract(path) {
            Ok(meta) => meta,
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed adding photo");
                report.skipped += 1;
                return Ok(());
            }
        };

        let (record, tags) = meta.into_record(key.clone(), modified);
        if previous.is_some() {
            self.db.delete_photo(&key)?;
        }
        match self.db.store_photo(&record, &tags) {
            Ok(_) if previous.is_some() => report.updated += 1,
            Ok(_) => report.stored += 1,
            Err(DatabaseError::DuplicatePath(path)) => {
                error!(path = %path, "Failed adding photo: already indexed");
                report.skipped += 1;
            }
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }

    /// Apply one live change. Files whose metadata cannot be read are
    /// ignored.
    pub fn apply(&self, event: &SyncEvent) -> Result<(), SyncError> {
        match event {
            SyncEvent::Removed(path) => {
                let Some(key) = index_key(path) else {
                    return Ok(());
                };
                if self.db.delete_photo(&key)? {
                    debug!(path = %key, "Removed photo");
                }
            }
            SyncEvent::Updated(path) => {
                let Ok(path) = path.canonicalize() else {
                    return Ok(());
                };
                if !path.is_file() {
                    return Ok(());
                }
                let Ok(meta) = self.extractor.extract(&path) else {
                    return Ok(());
                };
                let Ok(modified) = last_modified(&path) else {
                    return Ok(());
                };

                let Some(key) = path.to_str().map(str::to_string) else {
                    return Ok(());
                };
                let (record, tags) = meta.into_record(key.clone(), modified);
                self.db.delete_photo(&key)?;
                self.db.store_photo(&record, &tags)?;
                debug!(path = %key, "Indexed photo");
            }
        }
        Ok(())
    }
}
