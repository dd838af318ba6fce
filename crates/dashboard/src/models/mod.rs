//! Domain models for the dashboard.

pub mod session;

pub use session::{AccessToken, CurrentUser, keys as session_keys};
