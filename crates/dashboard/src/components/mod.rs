//! Reusable UI component configuration.

pub mod data_table;

pub use data_table::{
    DataTableConfig, FilterOption, TableColumn, TableFilter, users_table_config,
};
