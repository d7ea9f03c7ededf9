//! Conjunctive `column = value` filters over the closed set of queryable
//! columns, rendered as parameterized SQL.

use rusqlite::types::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    Year,
    Month,
    Day,
    Label,
    FNumber,
    Iso,
    Make,
    Camera,
    FocalLength,
    LensModel,
    LensSpec,
}

/// Attributes browsable through the camera view, in listing order.
pub const CAMERA_ATTRIBUTES: [Column; 7] = [
    Column::FNumber,
    Column::Iso,
    Column::Make,
    Column::Camera,
    Column::FocalLength,
    Column::LensModel,
    Column::LensSpec,
];

impl Column {
    pub fn as_str(&self) -> &'static str {
        match self {
            Column::Year => "year",
            Column::Month => "month",
            Column::Day => "day",
            Column::Label => "label",
            Column::FNumber => "f",
            Column::Iso => "iso",
            Column::Make => "make",
            Column::Camera => "camera",
            Column::FocalLength => "focal_length",
            Column::LensModel => "lens_model",
            Column::LensSpec => "lens_spec",
        }
    }

    /// Look up a camera-view attribute by its directory name.
    pub fn from_attribute(name: &str) -> Option<Column> {
        CAMERA_ATTRIBUTES.into_iter().find(|c| c.as_str() == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<(Column, String)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: Column, value: impl Into<String>) -> Self {
        self.clauses.push((column, value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn clauses(&self) -> &[(Column, String)] {
        &self.clauses
    }

    /// Render the predicate as `files.a = ?k AND files.b = ?k+1 ...`, numbering
    /// placeholders from `first_param`. Empty for an empty filter.
    pub(crate) fn predicate(&self, first_param: usize) -> String {
        self.clauses
            .iter()
            .enumerate()
            .map(|(i, (column, _))| format!("files.{} = ?{}", column.as_str(), first_param + i))
            .collect::<Vec<_>>()
            .join(" AND ")
    }

    pub(crate) fn params(&self) -> impl Iterator<Item = Value> + '_ {
        self.clauses.iter().map(|(_, v)| Value::Text(v.clone()))
    }

    /// Photo ids matching every clause, ordered by capture time.
    pub(crate) fn select_ids(&self) -> (String, Vec<Value>) {
        let mut sql = String::from("SELECT files.id FROM files");
        if !self.is_empty() {
            sql.push_str(" WHERE ");
            sql.push_str(&self.predicate(1));
        }
        sql.push_str(" ORDER BY files.datetime ASC, files.id ASC");
        (sql, self.params().collect())
    }

    /// Photo ids carrying every tag in `tags` and matching every clause,
    /// ordered by capture time. `tags` must be lowercase and distinct.
    pub(crate) fn select_ids_with_tags(&self, tags: &[String]) -> (String, Vec<Value>) {
        let placeholders = (1..=tags.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");

        let mut sql = format!(
            "SELECT files.id FROM files_tags \
             JOIN files ON files.id = files_tags.files_rowid \
             WHERE files_tags.tag IN ({placeholders})"
        );
        if !self.is_empty() {
            sql.push_str(" AND ");
            sql.push_str(&self.predicate(tags.len() + 1));
        }
        sql.push_str(&format!(
            " GROUP BY files.id HAVING COUNT(DISTINCT files_tags.tag) = {} \
             ORDER BY files.datetime ASC, files.id ASC",
            tags.len()
        ));

        let params = tags
            .iter()
            .map(|t| Value::Text(t.clone()))
            .chain(self.params())
            .collect();
        (sql, params)
    }
}
