//! Record sources.
//!
//! The roster can come from an Apps Script web app (`?action=getUsers`) or be
//! read straight from a spreadsheet through the Sheets API. Both produce
//! normalized [`UserRecord`]s and a sheet title.
//!
//! Payloads that are empty or malformed yield zero records and a warning;
//! only transport failures and non-success statuses are errors.

pub mod apps_script;
pub mod sheets;

pub use apps_script::AppsScriptSource;
pub use sheets::SheetsSource;

use roster_core::UserRecord;
use thiserror::Error;

use crate::config::DataSource;
use crate::google::{GoogleError, SheetsClient};
use crate::models::AccessToken;

/// Title shown when the source does not report one.
pub const DEFAULT_SHEET_TITLE: &str = "Default Sheet Name";

/// Errors that can occur while fetching records.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The source answered with a non-success status.
    #[error("HTTP error! status: {0}")]
    Status(u16),

    /// The source could not be reached.
    #[error("Network error: {0}")]
    Http(#[from] reqwest::Error),

    /// The configured source URL is unusable.
    #[error("Invalid source URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Unexpected(String),
}

impl From<GoogleError> for FetchError {
    fn from(err: GoogleError) -> Self {
        match err {
            GoogleError::Http(e) => Self::Http(e),
            GoogleError::Url(e) => Self::Url(e),
            GoogleError::Status { status, .. } => Self::Status(status),
            GoogleError::RateLimited(_) => Self::Status(429),
            other @ (GoogleError::Parse(_) | GoogleError::OAuth(_)) => {
                Self::Unexpected(other.to_string())
            }
        }
    }
}

/// Configured record backend.
#[derive(Clone)]
pub enum RecordSource {
    AppsScript(AppsScriptSource),
    Sheets(SheetsSource),
}

impl RecordSource {
    /// Build the backend selected in configuration.
    #[must_use]
    pub fn from_config(source: &DataSource, client: reqwest::Client, sheets: SheetsClient) -> Self {
        match source {
            DataSource::AppsScript { url } => Self::AppsScript(AppsScriptSource::new(client, url)),
            DataSource::Sheet {
                spreadsheet_id,
                range,
            } => Self::Sheets(SheetsSource::new(sheets, spreadsheet_id, range)),
        }
    }

    /// Fetch every user record.
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Status` for non-success responses and
    /// `FetchError::Http` when the source cannot be reached.
    pub async fn fetch_records(&self, token: &AccessToken) -> Result<Vec<UserRecord>, FetchError> {
        match self {
            Self::AppsScript(source) => source.fetch_records().await,
            Self::Sheets(source) => source.fetch_records(token).await,
        }
    }

    /// Fetch the sheet title, falling back to [`DEFAULT_SHEET_TITLE`] when
    /// the source reports none.
    ///
    /// # Errors
    ///
    /// Same as [`Self::fetch_records`].
    pub async fn fetch_title(&self, token: &AccessToken) -> Result<String, FetchError> {
        let title = match self {
            Self::AppsScript(source) => source.fetch_title().await?,
            Self::Sheets(source) => source.fetch_title(token).await?,
        };
        Ok(title.unwrap_or_else(|| DEFAULT_SHEET_TITLE.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message() {
        assert_eq!(FetchError::Status(500).to_string(), "HTTP error! status: 500");
    }

    #[test]
    fn test_google_status_maps_to_status() {
        let err = FetchError::from(GoogleError::Status {
            status: 403,
            message: "The caller does not have permission".to_string(),
        });
        assert!(matches!(err, FetchError::Status(403)));

        let err = FetchError::from(GoogleError::RateLimited(10));
        assert!(matches!(err, FetchError::Status(429)));

        let err = FetchError::from(GoogleError::OAuth("bad".to_string()));
        assert!(matches!(err, FetchError::Unexpected(_)));
    }

    #[test]
    fn test_from_config_selects_backend() {
        let client = reqwest::Client::new();
        let sheets = SheetsClient::new(client.clone(), "https://sheets.googleapis.com/v4");

        let source = RecordSource::from_config(
            &DataSource::AppsScript {
                url: "https://script.google.com/macros/s/abc/exec".to_string(),
            },
            client.clone(),
            sheets.clone(),
        );
        assert!(matches!(source, RecordSource::AppsScript(_)));

        let source = RecordSource::from_config(
            &DataSource::Sheet {
                spreadsheet_id: "sheet123".to_string(),
                range: "Sheet1!A:M".to_string(),
            },
            client,
            sheets,
        );
        assert!(matches!(source, RecordSource::Sheets(_)));
    }
}
