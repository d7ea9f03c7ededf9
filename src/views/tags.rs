use std::collections::HashSet;

use super::naming::photo_names;
use super::{View, ViewError};
use crate::storage::Database;

/// Browse by tag conjunction: every path segment is one applied tag.
pub struct TagView {
    db: Database,
}

impl TagView {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

impl View for TagView {
    fn name(&self) -> &'static str {
        "tags"
    }

    fn db(&self) -> &Database {
        &self.db
    }

    fn resolve_directory(&self, segments: &[&str]) -> Result<bool, ViewError> {
        let applied: HashSet<&str> = segments.iter().copied().collect();
        if applied.len() != segments.len() {
            return Ok(false);
        }
        let known = self.db.tags()?;
        Ok(applied.iter().all(|t| known.iter().any(|k| k == t)))
    }

    fn children(&self, segments: &[&str]) -> Result<Vec<String>, ViewError> {
        let known = self.db.tags()?;
        if segments.is_empty() {
            return Ok(known);
        }

        let mut entries: Vec<String> = known
            .into_iter()
            .filter(|t| !segments.contains(&t.as_str()))
            .collect();

        let applied: Vec<String> = segments.iter().map(|t| t.to_string()).collect();
        let photos = self.db.photos_by_tags(&applied)?;
        if !photos.is_empty() {
            entries.extend(photo_names(&photos));
        }
        Ok(entries)
    }
}
