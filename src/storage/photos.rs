use std::collections::BTreeSet;

use rusqlite::{params, OptionalExtension};

use super::db::{Database, DatabaseError};
use super::models::{PhotoId, PhotoRecord, TagAssociation};

impl Database {
    /// Insert a photo and its tags. Fails if the path is already indexed;
    /// replacing a photo is `delete_photo` followed by `store_photo`.
    pub fn store_photo(
        &self,
        record: &PhotoRecord,
        tags: &[String],
    ) -> Result<PhotoId, DatabaseError> {
        let mut conn = self.connect_for_write()?;
        let tx = conn.transaction()?;

        let exists: Option<i64> = tx
            .query_row(
                "SELECT id FROM files WHERE path = ?1",
                params![record.path],
                |row| row.get(0),
            )
            .optional()?;
        if exists.is_some() {
            return Err(DatabaseError::DuplicatePath(record.path.clone()));
        }

        tx.execute(
            &format!(
                "INSERT INTO files ({}) VALUES \
                 (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
                PhotoRecord::COLUMNS
            ),
            params![
                record.path,
                record.datetime,
                record.last_modified,
                record.year,
                record.month,
                record.day,
                record.f,
                record.iso,
                record.make,
                record.camera,
                record.focal_length,
                record.lens_model,
                record.lens_spec,
                record.label,
            ],
        )?;
        let id = tx.last_insert_rowid();

        let unique: BTreeSet<String> = tags
            .iter()
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO files_tags (path, tag, files_rowid, datetime) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for tag in &unique {
                stmt.execute(params![record.path, tag, id, record.datetime])?;
            }
        }

        tx.commit()?;
        self.cache.invalidate();
        Ok(id)
    }

    /// Remove a photo and its tags. Returns false if the path was unknown.
    pub fn delete_photo(&self, path: &str) -> Result<bool, DatabaseError> {
        let mut conn = self.connect_for_write()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM files_tags WHERE path = ?1", params![path])?;
        let removed = tx.execute("DELETE FROM files WHERE path = ?1", params![path])?;
        tx.commit()?;

        self.cache.invalidate();
        Ok(removed > 0)
    }

    pub fn has_photo(&self, path: &str) -> Result<bool, DatabaseError> {
        let conn = self.connect()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT id FROM files WHERE path = ?1",
                params![path],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Tag associations of one photo, ordered by tag.
    pub fn tag_associations(&self, path: &str) -> Result<Vec<TagAssociation>, DatabaseError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare(
            "SELECT path, tag, files_rowid, datetime FROM files_tags \
             WHERE path = ?1 ORDER BY tag ASC",
        )?;
        let rows = stmt.query_map(params![path], |row| {
            Ok(TagAssociation {
                path: row.get(0)?,
                tag: row.get(1)?,
                photo_id: row.get(2)?,
                datetime: row.get(3)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }
}
