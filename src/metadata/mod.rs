//! Photo metadata extraction.
//!
//! The synchronizer only depends on [`MetadataExtractor`]; [`ExifExtractor`]
//! is the production implementation.

mod exif_reader;
pub mod filters;
pub mod xmp;

use std::path::Path;

use chrono::NaiveDateTime;
use thiserror::Error;

pub use exif_reader::ExifExtractor;

use crate::storage::PhotoRecord;

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("EXIF error: {0}")]
    Exif(#[from] exif::Error),
    #[error("Photo does not have date information")]
    MissingDateTime,
    #[error("Invalid date '{0}'")]
    InvalidDateTime(String),
    #[error("Malformed metadata: {0}")]
    Malformed(String),
}

/// Normalized metadata of one photo. String values never contain `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoMetadata {
    pub datetime: NaiveDateTime,
    pub f: Option<String>,
    pub iso: Option<String>,
    pub make: Option<String>,
    pub camera: Option<String>,
    pub focal_length: Option<String>,
    pub lens_model: Option<String>,
    pub lens_spec: Option<String>,
    pub label: Option<String>,
    pub tags: Vec<String>,
}

impl PhotoMetadata {
    pub fn new(datetime: NaiveDateTime) -> Self {
        Self {
            datetime,
            f: None,
            iso: None,
            make: None,
            camera: None,
            focal_length: None,
            lens_model: None,
            lens_spec: None,
            label: None,
            tags: Vec::new(),
        }
    }

    /// Convert into a storable record plus its tag list.
    pub fn into_record(self, path: String, last_modified: String) -> (PhotoRecord, Vec<String>) {
        let record = PhotoRecord {
            path,
            datetime: self.datetime.format("%Y%m%d%H%M%S").to_string(),
            last_modified,
            year: self.datetime.format("%Y").to_string(),
            month: self.datetime.format("%m").to_string(),
            day: self.datetime.format("%d").to_string(),
            f: self.f,
            iso: self.iso,
            make: self.make,
            camera: self.camera,
            focal_length: self.focal_length,
            lens_model: self.lens_model,
            lens_spec: self.lens_spec,
            label: self.label,
        };
        (record, self.tags)
    }
}

pub trait MetadataExtractor: Send + Sync {
    fn extract(&self, path: &Path) -> Result<PhotoMetadata, ExtractError>;
}
