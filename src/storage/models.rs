use rusqlite::Row;

/// Store-assigned photo identifier. Never reused, never changes once assigned.
pub type PhotoId = i64;

/// An indexed photo as stored in the `files` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoRecord {
    /// Canonical absolute path of the real file
    pub path: String,
    /// Capture time as `YYYYMMDDHHMMSS`
    pub datetime: String,
    /// Last-modified time of the real file as `YYYYMMDDHHMMSS`
    pub last_modified: String,
    pub year: String,
    pub month: String,
    pub day: String,

    // Camera and lens attributes (all optional)
    pub f: Option<String>,
    pub iso: Option<String>,
    pub make: Option<String>,
    pub camera: Option<String>,
    pub focal_length: Option<String>,
    pub lens_model: Option<String>,
    pub lens_spec: Option<String>,
    pub label: Option<String>,
}

impl PhotoRecord {
    pub(crate) const COLUMNS: &'static str = "path, datetime, last_modified, year, month, day, \
         f, iso, make, camera, focal_length, lens_model, lens_spec, label";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            path: row.get(0)?,
            datetime: row.get(1)?,
            last_modified: row.get(2)?,
            year: row.get(3)?,
            month: row.get(4)?,
            day: row.get(5)?,
            f: row.get(6)?,
            iso: row.get(7)?,
            make: row.get(8)?,
            camera: row.get(9)?,
            focal_length: row.get(10)?,
            lens_model: row.get(11)?,
            lens_spec: row.get(12)?,
            label: row.get(13)?,
        })
    }
}

/// A row of `files_tags`: one tag applied to one photo
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagAssociation {
    pub path: String,
    /// Always lowercase
    pub tag: String,
    pub photo_id: PhotoId,
    /// Copy of the owning photo's datetime
    pub datetime: String,
}
