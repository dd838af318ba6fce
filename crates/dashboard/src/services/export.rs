//! Export of the visible rows into a new spreadsheet.

use chrono::{DateTime, TimeZone};
use roster_core::{ExportMatrix, FilterState, SortOrder, TableError};
use thiserror::Error;
use tracing::instrument;

use crate::google::{GoogleError, SheetsClient};
use crate::grid::SharedTable;
use crate::models::AccessToken;

/// Errors that can occur during export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Sheets API error: {0}")]
    Google(#[from] GoogleError),

    #[error("Table unavailable: {0}")]
    Table(#[from] TableError),
}

impl ExportError {
    /// Message shown on the export result page.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Google(GoogleError::Http(_)) => {
                "Could not reach Google Sheets. Check your connection and try again."
            }
            Self::Google(err) => match err.status() {
                Some(400) => "Invalid sheet name or request. Please try again.",
                Some(401) => "Your Google sign-in has expired. Please log out and log in again.",
                Some(403) => {
                    "Permission denied. Your Google account is not allowed to create spreadsheets."
                }
                Some(404) => "The spreadsheet service was not found.",
                Some(429) => "Too many requests. Please try again in a few seconds.",
                Some(500 | 502 | 503 | 504) => {
                    "Google Sheets is temporarily unavailable. Please try again in a few seconds."
                }
                _ => "Please try again in a few seconds.",
            },
            Self::Table(TableError::NotLoaded) => {
                "There is no data to export yet. Reload the dashboard and try again."
            }
            Self::Table(_) => "Your table has expired. Reload the dashboard and try again.",
        }
    }
}

/// Result of a successful export.
#[derive(Debug, Clone)]
pub struct ExportReport {
    pub spreadsheet_id: String,
    pub url: String,
    pub title: String,
    /// Data rows written, excluding the header.
    pub rows: usize,
}

/// Spreadsheet title for an export started at `now`,
/// e.g. `Users Export 03/07/2025, 2:05:09 PM`.
#[must_use]
pub fn export_title<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    format!("Users Export {}", now.format("%m/%d/%Y, %-I:%M:%S %p"))
}

/// Write the rows visible under `filter` and `sort` (every page) into a newly
/// created spreadsheet.
///
/// The filter and sort are stored on the table first, so it matches the view
/// that was exported. The table lock is released before any remote call.
///
/// # Errors
///
/// Returns `ExportError::Table` if the table is not loaded or was disposed,
/// and `ExportError::Google` if creating or filling the spreadsheet fails.
#[instrument(skip_all, fields(tab = %tab_title))]
pub async fn export_visible_rows(
    sheets: &SheetsClient,
    table: &SharedTable,
    token: &AccessToken,
    filter: FilterState,
    sort: SortOrder,
    title: &str,
    tab_title: &str,
) -> Result<ExportReport, ExportError> {
    let matrix = visible_matrix(table, filter, sort).await?;

    let created = sheets.create_spreadsheet(token, title, tab_title).await?;
    let range = matrix.range(tab_title);
    sheets
        .update_values(token, &created.spreadsheet_id, &range, matrix.rows())
        .await?;

    tracing::info!(
        spreadsheet_id = %created.spreadsheet_id,
        rows = matrix.data_row_count(),
        "Export complete"
    );

    Ok(ExportReport {
        url: created.url(),
        spreadsheet_id: created.spreadsheet_id,
        title: title.to_string(),
        rows: matrix.data_row_count(),
    })
}

/// Apply the view to the table and build the matrix of its visible rows.
async fn visible_matrix(
    table: &SharedTable,
    filter: FilterState,
    sort: SortOrder,
) -> Result<ExportMatrix, TableError> {
    let mut guard = table.write().await;
    guard.set_filter(filter)?;
    guard.set_sort(sort)?;
    Ok(ExportMatrix::from_records(guard.visible_rows()?))
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use chrono::{FixedOffset, Utc};
    use roster_core::{Column, SortDirection, TableState, UserRecord};
    use tokio::sync::RwLock;

    use super::*;

    fn status(status: u16) -> ExportError {
        ExportError::Google(GoogleError::Status {
            status,
            message: String::new(),
        })
    }

    #[test]
    fn test_export_title_format() {
        let afternoon = Utc.with_ymd_and_hms(2025, 3, 7, 14, 5, 9).single();
        assert_eq!(
            afternoon.map(|t| export_title(&t)).as_deref(),
            Some("Users Export 03/07/2025, 2:05:09 PM")
        );

        let offset = FixedOffset::east_opt(0).map(|tz| tz.with_ymd_and_hms(2025, 12, 31, 0, 0, 0));
        assert_eq!(
            offset.and_then(|t| t.single()).map(|t| export_title(&t)).as_deref(),
            Some("Users Export 12/31/2025, 12:00:00 AM")
        );
    }

    #[test]
    fn test_messages_per_status() {
        assert!(status(400).user_message().contains("Invalid sheet name"));
        assert!(status(401).user_message().contains("expired"));
        assert!(status(403).user_message().contains("Permission denied"));
        assert!(status(404).user_message().contains("not found"));
        assert!(status(429).user_message().contains("Too many requests"));
        for code in [500, 502, 503, 504] {
            assert!(status(code).user_message().contains("temporarily unavailable"));
        }
        assert_eq!(status(418).user_message(), "Please try again in a few seconds.");
        assert!(
            ExportError::Google(GoogleError::RateLimited(5))
                .user_message()
                .contains("Too many requests")
        );
    }

    fn shared_table(genders: &[&str]) -> SharedTable {
        let mut table = TableState::new();
        let ticket = table.begin_load();
        let records = genders
            .iter()
            .enumerate()
            .map(|(i, gender)| UserRecord {
                id: (i + 1).to_string(),
                gender: (*gender).to_string(),
                ..UserRecord::default()
            })
            .collect();
        table.set_rows(ticket, records, "Roster").unwrap();
        Arc::new(RwLock::new(table))
    }

    #[tokio::test]
    async fn test_matrix_uses_requested_view_not_stored_one() {
        let table = shared_table(&["Male", "Female", "Female"]);
        table
            .write()
            .await
            .set_filter(FilterState::new().with_selection(Column::Gender, "Female"))
            .unwrap();

        let matrix = visible_matrix(&table, FilterState::new(), SortOrder::default())
            .await
            .unwrap();
        assert_eq!(matrix.data_row_count(), 3);
        assert!(table.read().await.filter().is_unconstrained());
    }

    #[tokio::test]
    async fn test_matrix_applies_filter_and_sort() {
        let table = shared_table(&["Male", "Female", "Female"]);
        let sort = SortOrder {
            column: Column::Id,
            direction: SortDirection::Desc,
        };

        let matrix = visible_matrix(
            &table,
            FilterState::new().with_selection(Column::Gender, "female"),
            sort,
        )
        .await
        .unwrap();
        let ids: Vec<&str> = matrix.rows()[1..].iter().map(|row| row[0].as_str()).collect();
        assert_eq!(ids, ["3", "2"]);
        assert_eq!(table.read().await.sort(), sort);
    }

    #[tokio::test]
    async fn test_matrix_requires_loaded_table() {
        let table = Arc::new(RwLock::new(TableState::new()));
        let result = visible_matrix(&table, FilterState::new(), SortOrder::default()).await;
        assert_eq!(result.unwrap_err(), TableError::NotLoaded);
    }

    #[test]
    fn test_table_messages() {
        assert!(
            ExportError::Table(TableError::NotLoaded)
                .user_message()
                .contains("no data")
        );
        assert!(
            ExportError::Table(TableError::Disposed)
                .user_message()
                .contains("expired")
        );
    }
}
