//! Roster Core - Shared types library.
//!
//! This crate provides the record, filter, table and export types used by
//! the `dashboard` binary and its integration tests.
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no sessions. Everything here can be tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - The user record and its fixed column order
//! - [`facets`] - Distinct values for the select filters
//! - [`filter`] - Search and column filter predicate
//! - [`table`] - Grid state: rows, filter, sort, pages, load tickets
//! - [`export`] - Matrix written to a new spreadsheet on export

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod export;
pub mod facets;
pub mod filter;
pub mod table;
pub mod types;

pub use export::{ExportMatrix, extract_photo_url};
pub use facets::{FacetSet, MISSING_VALUE, compute_facets};
pub use filter::FilterState;
pub use table::{LoadTicket, PAGE_SIZE, Page, SortDirection, SortOrder, TableError, TableState};
pub use types::*;
