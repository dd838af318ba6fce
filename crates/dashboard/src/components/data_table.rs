//! Data table component types.
//!
//! These types define the columns and filter panel of the users grid.

use roster_core::{Column, FacetSet, FilterState, filter::ALL};
use serde::{Deserialize, Serialize};

/// Column definition for a data table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableColumn {
    /// Unique key for the column (also the `sort` query value).
    pub key: String,
    /// Display label for the column header.
    pub label: String,
    /// Whether the column is sortable.
    pub sortable: bool,
}

impl TableColumn {
    /// Create a new sortable column.
    #[must_use]
    pub fn sortable(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            sortable: true,
        }
    }

    /// Create a new non-sortable column.
    #[must_use]
    pub fn new(key: &str, label: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            sortable: false,
        }
    }
}

/// Single-select filter definition for a data table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableFilter {
    /// Filter parameter key.
    pub key: String,
    /// Display label.
    pub label: String,
    /// Available options, starting with `All`.
    pub options: Vec<FilterOption>,
}

/// Option for a select filter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterOption {
    /// Option value.
    pub value: String,
    /// Display label.
    pub label: String,
    /// Whether this option is the current selection.
    pub selected: bool,
}

impl FilterOption {
    /// Create a new filter option.
    #[must_use]
    pub fn new(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            selected: false,
        }
    }

    /// Mark this option as selected.
    #[must_use]
    pub const fn selected(mut self, selected: bool) -> Self {
        self.selected = selected;
        self
    }
}

impl TableFilter {
    /// Create a select filter.
    #[must_use]
    pub fn select(key: &str, label: &str, options: Vec<FilterOption>) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            options,
        }
    }

    /// Whether a value other than `All` is selected.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.options
            .iter()
            .any(|option| option.selected && option.value != ALL)
    }
}

/// Configuration for a data table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataTableConfig {
    /// Unique table identifier.
    pub table_id: String,
    /// Column definitions.
    pub columns: Vec<TableColumn>,
    /// Filter definitions.
    pub filters: Vec<TableFilter>,
    /// Search placeholder text.
    pub search_placeholder: String,
    /// Title for empty state.
    pub empty_title: String,
    /// Description for empty state.
    pub empty_description: Option<String>,
    /// Whether to show filter panel.
    pub has_filters: bool,
}

impl DataTableConfig {
    /// Create a new data table configuration.
    #[must_use]
    pub fn new(table_id: &str) -> Self {
        Self {
            table_id: table_id.to_string(),
            columns: vec![],
            filters: vec![],
            search_placeholder: "Search...".to_string(),
            empty_title: "No items found".to_string(),
            empty_description: None,
            has_filters: false,
        }
    }

    /// Add a column.
    #[must_use]
    pub fn column(mut self, column: TableColumn) -> Self {
        self.columns.push(column);
        self
    }

    /// Add a filter.
    #[must_use]
    pub fn filter(mut self, filter: TableFilter) -> Self {
        self.has_filters = true;
        self.filters.push(filter);
        self
    }

    /// Set search placeholder.
    #[must_use]
    pub fn search_placeholder(mut self, placeholder: &str) -> Self {
        self.search_placeholder = placeholder.to_string();
        self
    }

    /// Set empty state configuration.
    #[must_use]
    pub fn empty_state(mut self, title: &str, description: Option<&str>) -> Self {
        self.empty_title = title.to_string();
        self.empty_description = description.map(ToString::to_string);
        self
    }
}

/// Select filter for one facet column: `All` followed by the sorted facet
/// values, with the current selection marked.
fn facet_filter(column: Column, facets: &FacetSet, filter: &FilterState) -> TableFilter {
    let current = filter.selection(column);
    let unconstrained = current == ALL;
    let mut options = vec![FilterOption::new(ALL, "All").selected(unconstrained)];
    options.extend(facets.values(column).map(|value| {
        let selected = !unconstrained && value.trim().eq_ignore_ascii_case(current.trim());
        FilterOption::new(value, value).selected(selected)
    }));
    TableFilter::select(column.key(), column.label(), options)
}

/// Build the users table configuration.
#[must_use]
pub fn users_table_config(facets: &FacetSet, filter: &FilterState) -> DataTableConfig {
    let config = Column::ALL.into_iter().fold(DataTableConfig::new("users"), |config, column| {
        config.column(match column {
            Column::Photo => TableColumn::new(column.key(), column.key()),
            _ => TableColumn::sortable(column.key(), column.key()),
        })
    });

    Column::FACETS
        .into_iter()
        .fold(config, |config, column| {
            config.filter(facet_filter(column, facets, filter))
        })
        .search_placeholder("Search id, first_name or ...")
        .empty_state(
            "No matching records found",
            Some("Try adjusting your search or filters"),
        )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use roster_core::{UserRecord, compute_facets};

    use super::*;

    fn records() -> Vec<UserRecord> {
        vec![
            UserRecord {
                gender: "Male".to_string(),
                city: "Paris".to_string(),
                ..UserRecord::default()
            },
            UserRecord {
                gender: "Female".to_string(),
                ..UserRecord::default()
            },
        ]
    }

    #[test]
    fn test_users_table_has_all_columns_and_facet_filters() {
        let facets = compute_facets(&records());
        let config = users_table_config(&facets, &FilterState::new());

        assert_eq!(config.columns.len(), 13);
        assert_eq!(config.columns[0].key, "id");
        assert!(!config.columns[12].sortable);
        assert_eq!(config.filters.len(), 6);
        assert!(config.has_filters);

        let gender = &config.filters[0];
        assert_eq!(gender.label, "Gender");
        let values: Vec<&str> = gender.options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, ["all", "Female", "Male"]);
        assert!(gender.options[0].selected);
    }

    #[test]
    fn test_missing_values_offered_as_none() {
        let facets = compute_facets(&records());
        let config = users_table_config(&facets, &FilterState::new());

        let city = &config.filters[1];
        let values: Vec<&str> = city.options.iter().map(|o| o.value.as_str()).collect();
        assert_eq!(values, ["all", "None", "Paris"]);
    }

    #[test]
    fn test_current_selection_is_marked() {
        let facets = compute_facets(&records());
        let filter = FilterState::new().with_selection(Column::Gender, "female");
        let config = users_table_config(&facets, &filter);

        let gender = &config.filters[0];
        let selected: Vec<&str> = gender
            .options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.value.as_str())
            .collect();
        assert_eq!(selected, ["Female"]);
        assert!(gender.is_active());
        assert!(!config.filters[1].is_active());
    }
}
