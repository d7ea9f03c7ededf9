use super::naming::photo_names;
use super::{View, ViewError};
use crate::storage::Database;

const SELECTS_FOLDER: &str = "selects";

/// Browse by label: `/<label>` and `/<label>/selects`.
pub struct AlbumView {
    db: Database,
    select_tag: String,
}

impl AlbumView {
    pub fn new(db: Database, select_tag: &str) -> Self {
        Self {
            db,
            select_tag: select_tag.to_lowercase(),
        }
    }

    fn is_label(&self, label: &str) -> Result<bool, ViewError> {
        Ok(self.db.labels()?.iter().any(|l| l == label))
    }
}

impl View for AlbumView {
    fn name(&self) -> &'static str {
        "albums"
    }

    fn db(&self) -> &Database {
        &self.db
    }

    fn resolve_directory(&self, segments: &[&str]) -> Result<bool, ViewError> {
        match segments {
            [label] => self.is_label(label),
            [label, folder] if *folder == SELECTS_FOLDER => self.is_label(label),
            _ => Ok(false),
        }
    }

    fn children(&self, segments: &[&str]) -> Result<Vec<String>, ViewError> {
        match segments {
            [] => Ok(self.db.labels()?),
            [label] => {
                let mut entries = vec![SELECTS_FOLDER.to_string()];
                entries.extend(photo_names(&self.db.photos_by_label(label)?));
                Ok(entries)
            }
            [label, _] => Ok(photo_names(
                &self.db.photos_by_label_and_tag(label, &self.select_tag)?,
            )),
            _ => Err(ViewError::NotFound),
        }
    }
}
