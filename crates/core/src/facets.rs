//! Distinct value sets for the facet (select) filters.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{Column, UserRecord};

/// Placeholder used for empty values in facets and column filters.
pub const MISSING_VALUE: &str = "None";

/// Value of `column` for facet and filter purposes.
///
/// Empty values read as [`MISSING_VALUE`] so that selecting "None" matches
/// rows with no data in that column.
#[must_use]
pub fn facet_value(column: Column, record: &UserRecord) -> &str {
    let value = column.value(record);
    if value.is_empty() { MISSING_VALUE } else { value }
}

/// Distinct observed values for each facet column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FacetSet {
    values: BTreeMap<Column, BTreeSet<String>>,
}

impl FacetSet {
    /// Sorted distinct values for a column. Empty for non-facet columns.
    pub fn values(&self, column: Column) -> impl Iterator<Item = &str> {
        self.values
            .get(&column)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Whether `value` was observed in `column`.
    #[must_use]
    pub fn contains(&self, column: Column, value: &str) -> bool {
        self.values
            .get(&column)
            .is_some_and(|set| set.contains(value))
    }

    /// Number of distinct values for a column.
    #[must_use]
    pub fn len(&self, column: Column) -> usize {
        self.values.get(&column).map_or(0, BTreeSet::len)
    }

    /// Whether no facet has any value (no records were loaded).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.values().all(BTreeSet::is_empty)
    }
}

/// Compute the facet set for a record list.
#[must_use]
pub fn compute_facets(records: &[UserRecord]) -> FacetSet {
    let mut values: BTreeMap<Column, BTreeSet<String>> = Column::FACETS
        .into_iter()
        .map(|column| (column, BTreeSet::new()))
        .collect();

    for record in records {
        for column in Column::FACETS {
            if let Some(set) = values.get_mut(&column) {
                set.insert(facet_value(column, record).to_string());
            }
        }
    }

    FacetSet { values }
}
