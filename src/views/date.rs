use chrono::Month;

use super::naming::photo_names;
use super::{View, ViewError};
use crate::storage::Database;

const ALL_FOLDER: &str = "all";

/// Browse by capture date: `/<year>/<MM-Mon>/<day>`, plus `/<year>/all`.
pub struct DateView {
    db: Database,
}

impl DateView {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

/// "07" -> "07-Jul". Unparseable months are shown as stored.
fn month_folder(month: &str) -> String {
    let abbr = month
        .parse::<u8>()
        .ok()
        .and_then(|m| Month::try_from(m).ok())
        .map(|m| m.name()[..3].to_string());
    match abbr {
        Some(abbr) => format!("{month}-{abbr}"),
        None => month.to_string(),
    }
}

/// Month number from a month folder name.
fn month_of(folder: &str) -> &str {
    folder.split('-').next().unwrap_or(folder)
}

impl View for DateView {
    fn name(&self) -> &'static str {
        "date"
    }

    fn db(&self) -> &Database {
        &self.db
    }

    fn resolve_directory(&self, segments: &[&str]) -> Result<bool, ViewError> {
        match segments {
            [year] => Ok(self.db.years()?.iter().any(|y| y == year)),
            [year, folder] if *folder == ALL_FOLDER => {
                Ok(self.db.years()?.iter().any(|y| y == year))
            }
            [year, folder] => {
                let month = month_of(folder);
                Ok(self.db.months(year)?.iter().any(|m| m == month))
            }
            [year, folder, day] => {
                let month = month_of(folder);
                Ok(self.db.days(year, month)?.iter().any(|d| d == day))
            }
            _ => Ok(false),
        }
    }

    fn children(&self, segments: &[&str]) -> Result<Vec<String>, ViewError> {
        let entries = match segments {
            [] => self.db.years()?,
            [year] => {
                let mut entries: Vec<String> = self
                    .db
                    .months(year)?
                    .iter()
                    .map(|m| month_folder(m))
                    .collect();
                entries.push(ALL_FOLDER.to_string());
                entries
            }
            [year, folder] if *folder == ALL_FOLDER => {
                photo_names(&self.db.photos_by_year(year)?)
            }
            [year, folder] => {
                let month = month_of(folder);
                let mut entries = self.db.days(year, month)?;
                entries.extend(photo_names(&self.db.photos_by_month(year, month)?));
                entries
            }
            [year, folder, day] => {
                photo_names(&self.db.photos_by_day(year, month_of(folder), day)?)
            }
            _ => return Err(ViewError::NotFound),
        };
        Ok(entries)
    }
}
