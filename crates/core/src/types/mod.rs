//! Core types for the roster dashboard.
//!
//! This module provides the user record and its column definitions.

pub mod column;
pub mod record;

pub use column::Column;
pub use record::{Normalized, UserRecord, cell_to_string};
