//! Loading records into a user's table.
//!
//! The fetch runs without holding the table lock. A ticket taken before the
//! fetch decides whether the result may still be applied: if another load
//! started meanwhile, this one is discarded.

use roster_core::TableError;
use thiserror::Error;
use tracing::instrument;

use crate::grid::SharedTable;
use crate::models::AccessToken;
use crate::source::{DEFAULT_SHEET_TITLE, FetchError, RecordSource};

/// Errors that can occur while loading a table.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Table(#[from] TableError),
}

/// What happened to a load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// The table already held rows; nothing was fetched.
    AlreadyLoaded,
    /// Rows were fetched and applied.
    Loaded { rows: usize },
    /// Rows were fetched but a newer load had started, so they were dropped.
    Discarded,
}

/// Load the table unless it is already loaded.
///
/// # Errors
///
/// Returns `LoadError::Fetch` if the records cannot be fetched, or
/// `LoadError::Table` if the table was disposed.
pub async fn ensure_loaded(
    source: &RecordSource,
    table: &SharedTable,
    token: &AccessToken,
) -> Result<LoadOutcome, LoadError> {
    {
        let guard = table.read().await;
        if guard.is_disposed() {
            return Err(TableError::Disposed.into());
        }
        if guard.is_ready() {
            return Ok(LoadOutcome::AlreadyLoaded);
        }
    }
    load_into(source, table, token).await
}

/// Fetch records and title, then apply them to the table.
///
/// The title is fetched alongside the records; a title failure falls back to
/// [`DEFAULT_SHEET_TITLE`] and never fails the load.
///
/// # Errors
///
/// Same as [`ensure_loaded`].
#[instrument(skip_all)]
pub async fn load_into(
    source: &RecordSource,
    table: &SharedTable,
    token: &AccessToken,
) -> Result<LoadOutcome, LoadError> {
    let ticket = table.write().await.begin_load();

    let (records, title) = tokio::join!(source.fetch_records(token), source.fetch_title(token));
    let records = records?;
    let title = title.unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to fetch sheet title, using default");
        DEFAULT_SHEET_TITLE.to_string()
    });

    let rows = records.len();
    match table.write().await.set_rows(ticket, records, title) {
        Ok(()) => {
            tracing::info!(rows, generation = ticket.generation(), "Table loaded");
            Ok(LoadOutcome::Loaded { rows })
        }
        Err(TableError::Superseded { ticket, latest }) => {
            tracing::debug!(ticket, latest, "Discarding superseded load");
            Ok(LoadOutcome::Discarded)
        }
        Err(e) => Err(e.into()),
    }
}
