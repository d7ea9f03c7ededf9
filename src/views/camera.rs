use std::collections::HashSet;

use super::naming::photo_names;
use super::{View, ViewError};
use crate::storage::filter::CAMERA_ATTRIBUTES;
use crate::storage::{Column, Database, Filter};

/// Browse by camera configuration: alternating `<attribute>/<value>` pairs.
pub struct CameraView {
    db: Database,
}

impl CameraView {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// Attributes at the even positions of the path, or None if any is unknown
/// or repeated.
fn applied_attributes(segments: &[&str]) -> Option<Vec<Column>> {
    let mut seen = HashSet::new();
    segments
        .iter()
        .step_by(2)
        .map(|name| Column::from_attribute(name).filter(|c| seen.insert(*c)))
        .collect()
}

impl View for CameraView {
    fn name(&self) -> &'static str {
        "camera"
    }

    fn db(&self) -> &Database {
        &self.db
    }

    fn resolve_directory(&self, segments: &[&str]) -> Result<bool, ViewError> {
        let Some(attributes) = applied_attributes(segments) else {
            return Ok(false);
        };
        for (column, value) in attributes.iter().zip(segments.iter().skip(1).step_by(2)) {
            if !self.db.is_attribute_value_valid(*column, value)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    fn children(&self, segments: &[&str]) -> Result<Vec<String>, ViewError> {
        let attributes = applied_attributes(segments).ok_or(ViewError::NotFound)?;

        if segments.is_empty() {
            return Ok(CAMERA_ATTRIBUTES
                .iter()
                .map(|c| c.as_str().to_string())
                .collect());
        }

        if segments.len() % 2 == 1 {
            let column = attributes.last().ok_or(ViewError::NotFound)?;
            return Ok(self.db.attribute_values(*column)?);
        }

        let mut entries: Vec<String> = CAMERA_ATTRIBUTES
            .iter()
            .filter(|c| !attributes.contains(*c))
            .map(|c| c.as_str().to_string())
            .collect();

        let filter = attributes
            .iter()
            .zip(segments.iter().skip(1).step_by(2))
            .fold(Filter::new(), |filter, (column, value)| {
                filter.eq(*column, *value)
            });
        entries.extend(photo_names(&self.db.photos_matching(&filter)?));
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applied_attributes_reject_unknown_and_repeats() {
        assert_eq!(
            applied_attributes(&["f", "2.8", "iso"]),
            Some(vec![Column::FNumber, Column::Iso])
        );
        assert_eq!(applied_attributes(&["f", "2.8", "f", "4.0"]), None);
        assert_eq!(applied_attributes(&["shutter"]), None);
        assert_eq!(applied_attributes(&[]), Some(vec![]));
    }
}
