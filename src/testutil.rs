//! Shared helpers for unit tests.

use crate::storage::{Database, PhotoRecord};

/// A writable database in a temporary directory.
pub fn test_db() -> (tempfile::TempDir, Database) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let db = Database::open(dir.path().join("data"), dir.path()).expect("Failed to open test database");
    assert!(db.try_acquire_write_lock().expect("Failed to take write lock"));
    (dir, db)
}

/// A record captured at `datetime` (`YYYYMMDDHHMMSS`).
pub fn record(path: &str, datetime: &str) -> PhotoRecord {
    PhotoRecord {
        path: path.to_string(),
        datetime: datetime.to_string(),
        last_modified: "20240101000000".to_string(),
        year: datetime[0..4].to_string(),
        month: datetime[4..6].to_string(),
        day: datetime[6..8].to_string(),
        f: None,
        iso: None,
        make: None,
        camera: None,
        focal_length: None,
        lens_model: None,
        lens_spec: None,
        label: None,
    }
}
