use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;

use rusqlite::{params, params_from_iter, types::Value, Connection, OptionalExtension};

use super::cache::CacheKey;
use super::db::{Database, DatabaseError};
use super::filter::{Column, Filter};
use super::models::{PhotoId, PhotoRecord};

fn collect_strings(
    conn: &Connection,
    sql: &str,
    params: &[Value],
) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), |row| row.get(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

fn collect_ids(
    conn: &Connection,
    sql: &str,
    params: &[Value],
) -> Result<Vec<PhotoId>, DatabaseError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params_from_iter(params.iter()), |row| row.get(0))?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

impl Database {
    pub(super) fn load_aggregate(&self, key: CacheKey) -> Result<Vec<String>, DatabaseError> {
        let sql = match key {
            CacheKey::Years => "SELECT DISTINCT year FROM files ORDER BY year DESC",
            CacheKey::Labels => {
                "SELECT DISTINCT label FROM files WHERE label IS NOT NULL ORDER BY label ASC"
            }
            CacheKey::Tags => "SELECT DISTINCT tag FROM files_tags ORDER BY tag ASC",
        };
        collect_strings(&self.connect()?, sql, &[])
    }

    fn cached(&self, key: CacheKey) -> Result<Vec<String>, DatabaseError> {
        self.cache.get_or_load(key, || self.load_aggregate(key))
    }

    // ========================================================================
    // Aggregates
    // ========================================================================

    /// Distinct years, newest first
    pub fn years(&self) -> Result<Vec<String>, DatabaseError> {
        self.cached(CacheKey::Years)
    }

    pub fn labels(&self) -> Result<Vec<String>, DatabaseError> {
        self.cached(CacheKey::Labels)
    }

    pub fn tags(&self) -> Result<Vec<String>, DatabaseError> {
        self.cached(CacheKey::Tags)
    }

    pub fn months(&self, year: &str) -> Result<Vec<String>, DatabaseError> {
        collect_strings(
            &self.connect()?,
            "SELECT DISTINCT month FROM files WHERE year = ?1 ORDER BY month ASC",
            &[Value::Text(year.to_string())],
        )
    }

    pub fn days(&self, year: &str, month: &str) -> Result<Vec<String>, DatabaseError> {
        collect_strings(
            &self.connect()?,
            "SELECT DISTINCT day FROM files WHERE year = ?1 AND month = ?2 ORDER BY day ASC",
            &[Value::Text(year.to_string()), Value::Text(month.to_string())],
        )
    }

    /// Distinct non-null values of an attribute, ascending
    pub fn attribute_values(&self, column: Column) -> Result<Vec<String>, DatabaseError> {
        let sql = format!(
            "SELECT DISTINCT {col} FROM files WHERE {col} IS NOT NULL ORDER BY {col} ASC",
            col = column.as_str()
        );
        collect_strings(&self.connect()?, &sql, &[])
    }

    pub fn is_attribute_value_valid(
        &self,
        column: Column,
        value: &str,
    ) -> Result<bool, DatabaseError> {
        let sql = format!(
            "SELECT 1 FROM files WHERE {} = ?1 LIMIT 1",
            column.as_str()
        );
        let found: Option<i64> = self
            .connect()?
            .query_row(&sql, params![value], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    // ========================================================================
    // Photo listings (ordered by capture time)
    // ========================================================================

    pub fn photos_matching(&self, filter: &Filter) -> Result<Vec<PhotoId>, DatabaseError> {
        let (sql, params) = filter.select_ids();
        collect_ids(&self.connect()?, &sql, &params)
    }

    /// Photos carrying every tag in `tags` and matching `filter`. Tags are
    /// compared case-insensitively; an empty tag set matches nothing.
    pub fn photos_by_tags_where(
        &self,
        tags: &[String],
        filter: &Filter,
    ) -> Result<Vec<PhotoId>, DatabaseError> {
        let tags: Vec<String> = tags
            .iter()
            .map(|t| t.to_lowercase())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if tags.is_empty() {
            return Ok(Vec::new());
        }
        let (sql, params) = filter.select_ids_with_tags(&tags);
        collect_ids(&self.connect()?, &sql, &params)
    }

    pub fn photos_by_year(&self, year: &str) -> Result<Vec<PhotoId>, DatabaseError> {
        self.photos_matching(&Filter::new().eq(Column::Year, year))
    }

    pub fn photos_by_month(&self, year: &str, month: &str) -> Result<Vec<PhotoId>, DatabaseError> {
        self.photos_matching(&Filter::new().eq(Column::Year, year).eq(Column::Month, month))
    }

    pub fn photos_by_day(
        &self,
        year: &str,
        month: &str,
        day: &str,
    ) -> Result<Vec<PhotoId>, DatabaseError> {
        self.photos_matching(
            &Filter::new()
                .eq(Column::Year, year)
                .eq(Column::Month, month)
                .eq(Column::Day, day),
        )
    }

    pub fn photos_by_label(&self, label: &str) -> Result<Vec<PhotoId>, DatabaseError> {
        self.photos_matching(&Filter::new().eq(Column::Label, label))
    }

    /// Photos with `label` that also carry `tag`
    pub fn photos_by_label_and_tag(
        &self,
        label: &str,
        tag: &str,
    ) -> Result<Vec<PhotoId>, DatabaseError> {
        self.photos_by_tags_where(&[tag.to_string()], &Filter::new().eq(Column::Label, label))
    }

    pub fn photos_by_tags(&self, tags: &[String]) -> Result<Vec<PhotoId>, DatabaseError> {
        self.photos_by_tags_where(tags, &Filter::new())
    }

    // ========================================================================
    // Single records
    // ========================================================================

    pub fn real_path(&self, id: PhotoId) -> Result<Option<PathBuf>, DatabaseError> {
        let path: Option<String> = self
            .connect()?
            .query_row("SELECT path FROM files WHERE id = ?1", params![id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(path.map(PathBuf::from))
    }

    pub fn photo(&self, id: PhotoId) -> Result<Option<PhotoRecord>, DatabaseError> {
        let sql = format!(
            "SELECT {} FROM files WHERE id = ?1",
            PhotoRecord::COLUMNS
        );
        Ok(self
            .connect()?
            .query_row(&sql, params![id], PhotoRecord::from_row)
            .optional()?)
    }

    /// Every indexed path with its recorded last-modified stamp
    pub fn all_last_modified(&self) -> Result<HashMap<String, String>, DatabaseError> {
        let conn = self.connect()?;
        let mut stmt = conn.prepare("SELECT path, last_modified FROM files")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        Ok(rows.collect::<Result<HashMap<_, _>, _>>()?)
    }

    pub fn photo_count(&self) -> Result<u64, DatabaseError> {
        let count: i64 = self
            .connect()?
            .query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
