//! Background machinery of a running instance: index ownership, the initial
//! scan or reconciliation, the live watcher and the periodic cache rebuild.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::metadata::MetadataExtractor;
use crate::storage::{Database, DatabaseError};
use crate::sync::{watcher, Walker, WatcherHandle};

pub struct Service {
    db: Database,
    rebuild: JoinHandle<()>,
    indexing: JoinHandle<()>,
    watcher: Arc<Mutex<Option<WatcherHandle>>>,
}

impl Service {
    /// Open the index for `config.root` and start the background tasks. Must
    /// be called within a tokio runtime.
    pub fn start(
        config: &Config,
        extractor: Arc<dyn MetadataExtractor>,
    ) -> Result<Self, DatabaseError> {
        let db = Database::open(&config.data_dir, &config.root)?;
        info!(path = %db.path().display(), "Photo index opened");

        let walker = Arc::new(Walker::new(config.root.clone(), db.clone(), extractor));
        let watcher = Arc::new(Mutex::new(None));

        let rebuild = spawn_cache_rebuild(
            db.clone(),
            Duration::from_secs(config.cache_rebuild_interval_secs),
        );

        let indexing = if db.try_acquire_write_lock()? {
            info!("Acquired index lock, will write and update it");
            tokio::spawn(run_indexing(walker, Arc::clone(&watcher)))
        } else {
            warn!("Another instance owns the index; serving read-only until it exits");
            let (tx, rx) = oneshot::channel();
            let waiter = db.clone();
            std::thread::Builder::new()
                .name("photo-fs-lock-wait".to_string())
                .spawn(move || {
                    let _ = tx.send(waiter.wait_for_write_lock());
                })?;

            let watcher = Arc::clone(&watcher);
            tokio::spawn(async move {
                match rx.await {
                    Ok(Ok(())) => {
                        info!("Acquired index lock, leaving read-only mode");
                        run_indexing(walker, watcher).await;
                    }
                    Ok(Err(e)) => error!(error = %e, "Failed waiting for index lock"),
                    Err(_) => error!("Index lock waiter exited"),
                }
            })
        };

        Ok(Self {
            db,
            rebuild,
            indexing,
            watcher,
        })
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn is_writable(&self) -> bool {
        self.db.is_writable()
    }

    /// Stop background work and give up the index lock.
    pub async fn shutdown(self) {
        self.rebuild.abort();
        self.indexing.abort();
        // The indexing task may be installing the watcher right now
        let _ = self.indexing.await;

        let watcher = self.watcher.lock().take();
        if let Some(watcher) = watcher {
            watcher.stop().await;
        }

        if let Err(e) = self.db.release_write_lock() {
            warn!(error = %e, "Failed to release index lock");
        }
        info!("Photo service stopped");
    }
}

async fn run_indexing(walker: Arc<Walker>, slot: Arc<Mutex<Option<WatcherHandle>>>) {
    let scan = Arc::clone(&walker);
    match tokio::task::spawn_blocking(move || scan.sync()).await {
        Ok(Ok(report)) => info!(?report, "Photo index synchronized"),
        Ok(Err(e)) => error!(error = %e, "Photo index synchronization failed"),
        Err(e) => error!(error = %e, "Photo index synchronization panicked"),
    }

    match watcher::start(walker) {
        Ok(handle) => *slot.lock() = Some(handle),
        Err(e) => error!(error = %e, "Failed to start filesystem watcher"),
    }
}

fn spawn_cache_rebuild(db: Database, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.tick().await;
        loop {
            interval.tick().await;
            let db = db.clone();
            match tokio::task::spawn_blocking(move || db.rebuild_cache()).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(error = %e, "Cache rebuild failed"),
                Err(e) => warn!(error = %e, "Cache rebuild task failed"),
            }
        }
    })
}
