//! Business logic services for the dashboard.
//!
//! # Services
//!
//! - `loader` - Fetch records into a user's table, discarding superseded loads
//! - `export` - Write the visible rows into a new Google Sheet

pub mod export;
pub mod loader;

pub use export::{ExportError, ExportReport, export_title, export_visible_rows};
pub use loader::{LoadError, LoadOutcome, ensure_loaded, load_into};
