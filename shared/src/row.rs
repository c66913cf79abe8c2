//! Rows and row sets shown by the column view and the file picker.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Placeholder used when the file-list payload is shorter for `size`/`modified` than for `name`.
pub const MISSING_FIELD: &str = "N/A";

/// One selectable entity: a table column (name + representative time) or a stored file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub name: String,
    pub time: Option<String>,
    pub size: Option<String>,
    pub modified: Option<String>,
}

impl Row {
    pub fn column(name: impl Into<String>, time: Option<String>) -> Self {
        Self {
            name: name.into(),
            time,
            size: None,
            modified: None,
        }
    }

    pub fn file(name: impl Into<String>, size: impl Into<String>, modified: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time: None,
            size: Some(size.into()),
            modified: Some(modified.into()),
        }
    }
}

/// Canonical ordered collection of rows for the active table or file list.
///
/// Row names are unique: the name is the join key of the selection set. When the
/// upstream data repeats a name, the first occurrence wins and the rest are counted
/// in [`RowSet::duplicates`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSet {
    rows: Vec<Row>,
    positions: HashMap<String, usize>,
    duplicates: usize,
}

impl RowSet {
    pub fn new(rows: impl IntoIterator<Item = Row>) -> Self {
        let mut set = Self::default();
        for row in rows {
            if set.positions.contains_key(&row.name) {
                set.duplicates += 1;
                continue;
            }
            set.positions.insert(row.name.clone(), set.rows.len());
            set.rows.push(row);
        }
        set
    }

    /// Column rows share the lower index bound as their representative time.
    pub fn from_columns(columns: &[String], index_range: &[String]) -> Self {
        let time = index_range.first().cloned();
        Self::new(columns.iter().map(|name| Row::column(name.clone(), time.clone())))
    }

    /// Zips the parallel arrays of a file-list payload by position.
    pub fn from_file_columns(names: &[String], sizes: &[String], modified: &[String]) -> Self {
        Self::new(names.iter().enumerate().map(|(index, name)| {
            Row::file(
                name.clone(),
                sizes.get(index).map(String::as_str).unwrap_or(MISSING_FIELD),
                modified.get(index).map(String::as_str).unwrap_or(MISSING_FIELD),
            )
        }))
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn get(&self, index: usize) -> Option<&Row> {
        self.rows.get(index)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.positions.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of rows dropped because their name was already present.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn columns_take_lower_index_bound_as_time() {
        let set = RowSet::from_columns(
            &strings(&["temp", "pressure"]),
            &strings(&["2024-01-01 00:00:00", "2024-02-01 00:00:00"]),
        );

        assert_eq!(set.len(), 2);
        assert_eq!(set.rows()[1].name, "pressure");
        assert_eq!(set.rows()[1].time.as_deref(), Some("2024-01-01 00:00:00"));
    }

    #[test]
    fn columns_without_index_range_have_no_time() {
        let set = RowSet::from_columns(&strings(&["a"]), &[]);
        assert_eq!(set.rows()[0].time, None);
    }

    #[test]
    fn short_file_columns_fall_back_to_placeholder() {
        let set = RowSet::from_file_columns(
            &strings(&["a.csv", "b.csv", "c.csv"]),
            &strings(&["10"]),
            &strings(&["2024-01-01", "2024-01-02"]),
        );

        assert_eq!(set.rows()[0].size.as_deref(), Some("10"));
        assert_eq!(set.rows()[1].size.as_deref(), Some(MISSING_FIELD));
        assert_eq!(set.rows()[2].modified.as_deref(), Some(MISSING_FIELD));
    }

    #[test]
    fn duplicate_names_keep_first_occurrence() {
        let set = RowSet::new(vec![
            Row::column("x", Some("1".into())),
            Row::column("y", None),
            Row::column("x", Some("2".into())),
        ]);

        assert_eq!(set.len(), 2);
        assert_eq!(set.duplicates(), 1);
        assert_eq!(set.position("x"), Some(0));
        assert_eq!(set.rows()[0].time.as_deref(), Some("1"));
    }
}
