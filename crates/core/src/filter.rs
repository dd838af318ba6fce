//! Search and column filter predicate.
//!
//! A row is visible only when the free-text search matches AND every active
//! column filter matches.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::facets::facet_value;
use crate::types::{Column, UserRecord};

/// Selection value meaning "no constraint on this column".
pub const ALL: &str = "all";

/// Current search term and per-column selections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    search: String,
    selections: BTreeMap<Column, String>,
}

impl FilterState {
    /// Create an empty filter (no search, every column "all").
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the free-text search term.
    #[must_use]
    pub fn with_search(mut self, term: &str) -> Self {
        self.set_search(term);
        self
    }

    /// Set a column selection.
    #[must_use]
    pub fn with_selection(mut self, column: Column, value: &str) -> Self {
        self.select(column, value);
        self
    }

    /// Set the free-text search term. Surrounding whitespace is ignored.
    pub fn set_search(&mut self, term: &str) {
        self.search = term.trim().to_string();
    }

    /// Select a value for a facet column.
    ///
    /// Empty values and "all" clear the selection. Non-facet columns are
    /// ignored.
    pub fn select(&mut self, column: Column, value: &str) {
        if !column.is_facet() {
            return;
        }
        if value.trim().is_empty() || value == ALL {
            self.selections.remove(&column);
        } else {
            self.selections.insert(column, value.to_string());
        }
    }

    /// Current search term.
    #[must_use]
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Current selection for a column ("all" when unconstrained).
    #[must_use]
    pub fn selection(&self, column: Column) -> &str {
        self.selections.get(&column).map_or(ALL, String::as_str)
    }

    /// Active column constraints.
    pub fn selections(&self) -> impl Iterator<Item = (Column, &str)> {
        self.selections.iter().map(|(c, v)| (*c, v.as_str()))
    }

    /// Whether any column filter is active.
    #[must_use]
    pub fn has_selections(&self) -> bool {
        !self.selections.is_empty()
    }

    /// Whether the filter admits every row.
    #[must_use]
    pub fn is_unconstrained(&self) -> bool {
        self.search.is_empty() && self.selections.is_empty()
    }

    /// Decide whether a record passes the search and every column filter.
    #[must_use]
    pub fn is_visible(&self, record: &UserRecord) -> bool {
        self.matches_search(record) && self.matches_selections(record)
    }

    /// Every whitespace-separated word of the search term must appear,
    /// case-insensitively, in at least one field.
    fn matches_search(&self, record: &UserRecord) -> bool {
        if self.search.is_empty() {
            return true;
        }

        let fields: Vec<String> = Column::ALL
            .into_iter()
            .map(|column| column.value(record).to_lowercase())
            .collect();

        self.search
            .to_lowercase()
            .split_whitespace()
            .all(|word| fields.iter().any(|field| field.contains(word)))
    }

    fn matches_selections(&self, record: &UserRecord) -> bool {
        self.selections.iter().all(|(column, wanted)| {
            facet_value(*column, record).trim().to_lowercase() == wanted.trim().to_lowercase()
        })
    }
}
