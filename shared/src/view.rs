//! Filter/sort engine: derives the ordered view shown by both list styles.
//!
//! The view is a list of indices into the canonical [`RowSet`]. Sorting and
//! filtering only ever touch the derived indices, so re-filtering always starts
//! from the canonical order.

use crate::row::{Row, RowSet};
use crate::time::{TimeRange, parse_timestamp};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }

    pub fn arrow(self) -> &'static str {
        match self {
            Self::Ascending => "↑",
            Self::Descending => "↓",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ViewParams {
    pub search: String,
    pub time_range: Option<TimeRange>,
    pub sort: Option<SortDirection>,
}

impl ViewParams {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: term.into(),
            ..Self::default()
        }
    }
}

/// Ordered subsequence of a row set, as indices into it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredView {
    indices: Vec<usize>,
}

impl FilteredView {
    /// View over every row in canonical order.
    pub fn all(rows: &RowSet) -> Self {
        Self {
            indices: (0..rows.len()).collect(),
        }
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Row at position `position` of the view.
    pub fn row<'a>(&self, rows: &'a RowSet, position: usize) -> Option<&'a Row> {
        self.indices.get(position).and_then(|index| rows.get(*index))
    }

    pub fn rows<'a>(&'a self, rows: &'a RowSet) -> impl Iterator<Item = &'a Row> + 'a {
        self.indices.iter().filter_map(move |index| rows.get(*index))
    }

    pub fn names<'a>(&'a self, rows: &'a RowSet) -> impl Iterator<Item = &'a str> + 'a {
        self.rows(rows).map(|row| row.name.as_str())
    }
}

pub fn matches_search(name: &str, term_lower: &str) -> bool {
    term_lower.is_empty() || name.to_lowercase().contains(term_lower)
}

fn matches_time(row: &Row, range: &TimeRange) -> bool {
    row.time
        .as_deref()
        .and_then(parse_timestamp)
        .is_some_and(|time| range.contains(time))
}

pub fn compute_view(rows: &RowSet, params: &ViewParams) -> FilteredView {
    let term = params.search.trim().to_lowercase();

    let mut indices: Vec<usize> = rows
        .rows()
        .iter()
        .enumerate()
        .filter(|(_, row)| matches_search(&row.name, &term))
        .filter(|(_, row)| params.time_range.as_ref().is_none_or(|range| matches_time(row, range)))
        .map(|(index, _)| index)
        .collect();

    if let Some(direction) = params.sort {
        let all = rows.rows();
        indices.sort_by(|left, right| {
            let ordering = all[*left].name.cmp(&all[*right].name);
            match direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
    }

    FilteredView { indices }
}
