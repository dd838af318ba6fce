//! Spreadsheet values backend.

use roster_core::UserRecord;
use tracing::instrument;

use super::FetchError;
use crate::google::{GoogleError, SheetsClient};
use crate::models::AccessToken;

/// Reads the roster range of a spreadsheet with the user's token.
#[derive(Clone)]
pub struct SheetsSource {
    sheets: SheetsClient,
    spreadsheet_id: String,
    range: String,
}

impl SheetsSource {
    #[must_use]
    pub fn new(sheets: SheetsClient, spreadsheet_id: &str, range: &str) -> Self {
        Self {
            sheets,
            spreadsheet_id: spreadsheet_id.to_string(),
            range: range.to_string(),
        }
    }

    #[instrument(skip(self, token), fields(spreadsheet_id = %self.spreadsheet_id))]
    pub(super) async fn fetch_records(
        &self,
        token: &AccessToken,
    ) -> Result<Vec<UserRecord>, FetchError> {
        match self
            .sheets
            .get_values(token, &self.spreadsheet_id, &self.range)
            .await
        {
            Ok(values) => {
                let records = UserRecord::from_sheet_values(&values);
                tracing::debug!(count = records.len(), "Fetched records");
                Ok(records)
            }
            Err(GoogleError::Parse(e)) => {
                tracing::warn!(error = %e, "Values response was malformed, treating as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, token), fields(spreadsheet_id = %self.spreadsheet_id))]
    pub(super) async fn fetch_title(
        &self,
        token: &AccessToken,
    ) -> Result<Option<String>, FetchError> {
        match self.sheets.get_title(token, &self.spreadsheet_id).await {
            Ok(title) => Ok(title),
            Err(GoogleError::Parse(e)) => {
                tracing::warn!(error = %e, "Spreadsheet metadata was malformed");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
