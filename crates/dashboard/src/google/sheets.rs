//! Google Sheets v4 REST client.
//!
//! Every call is made on behalf of the signed-in user: the access token is
//! passed per request rather than stored in the client.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::{GoogleError, check_status};
use crate::models::AccessToken;

/// Sheets API client.
#[derive(Clone)]
pub struct SheetsClient {
    inner: Arc<SheetsClientInner>,
}

struct SheetsClientInner {
    client: reqwest::Client,
    /// Base URL, e.g. `https://sheets.googleapis.com/v4`
    base_url: String,
}

/// `spreadsheets.values.get` response.
#[derive(Debug, Deserialize)]
struct ValueRange {
    #[serde(default)]
    values: Vec<Vec<Value>>,
}

/// `spreadsheets.get` response restricted to `properties.title`.
#[derive(Debug, Deserialize)]
struct SpreadsheetTitle {
    #[serde(default)]
    properties: Option<SpreadsheetProperties>,
}

#[derive(Debug, Deserialize)]
struct SpreadsheetProperties {
    #[serde(default)]
    title: Option<String>,
}

/// Spreadsheet returned by `spreadsheets.create`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedSpreadsheet {
    pub spreadsheet_id: String,
    #[serde(default)]
    pub spreadsheet_url: Option<String>,
}

impl CreatedSpreadsheet {
    /// Link to open the spreadsheet in the browser.
    #[must_use]
    pub fn url(&self) -> String {
        self.spreadsheet_url.clone().unwrap_or_else(|| {
            format!(
                "https://docs.google.com/spreadsheets/d/{}/edit",
                self.spreadsheet_id
            )
        })
    }
}

#[derive(Debug, Serialize)]
struct CreateSpreadsheetRequest<'a> {
    properties: CreateProperties<'a>,
    sheets: [CreateSheet<'a>; 1],
}

#[derive(Debug, Serialize)]
struct CreateProperties<'a> {
    title: &'a str,
}

#[derive(Debug, Serialize)]
struct CreateSheet<'a> {
    properties: CreateProperties<'a>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateValuesRequest<'a> {
    range: &'a str,
    major_dimension: &'static str,
    values: &'a [Vec<String>],
}

impl SheetsClient {
    /// Create a new Sheets client.
    #[must_use]
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            inner: Arc::new(SheetsClientInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
            }),
        }
    }

    /// Build `{base}/spreadsheets/{segments...}` with each segment escaped.
    fn url(&self, segments: &[&str]) -> Result<Url, GoogleError> {
        let mut url = Url::parse(&format!("{}/spreadsheets", self.inner.base_url))?;
        url.path_segments_mut()
            .map_err(|()| GoogleError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .extend(segments);
        Ok(url)
    }

    /// Read the raw cell values of a range.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::Status` on a non-success status, or
    /// `GoogleError::Parse` if the body is not a value range.
    #[instrument(skip(self, token))]
    pub async fn get_values(
        &self,
        token: &AccessToken,
        spreadsheet_id: &str,
        range: &str,
    ) -> Result<Vec<Vec<Value>>, GoogleError> {
        let url = self.url(&[spreadsheet_id, "values", range])?;

        let response = self
            .inner
            .client
            .get(url)
            .bearer_auth(&token.token)
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        let range: ValueRange = serde_json::from_str(&body)?;
        Ok(range.values)
    }

    /// Read the spreadsheet's title. `None` if Google omits it.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::Status` on a non-success status.
    #[instrument(skip(self, token))]
    pub async fn get_title(
        &self,
        token: &AccessToken,
        spreadsheet_id: &str,
    ) -> Result<Option<String>, GoogleError> {
        let mut url = self.url(&[spreadsheet_id])?;
        url.query_pairs_mut()
            .append_pair("fields", "properties.title");

        let response = self
            .inner
            .client
            .get(url)
            .bearer_auth(&token.token)
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        let spreadsheet: SpreadsheetTitle = serde_json::from_str(&body)?;
        Ok(spreadsheet
            .properties
            .and_then(|p| p.title)
            .filter(|t| !t.is_empty()))
    }

    /// Create a spreadsheet with a single tab.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::Status` on a non-success status.
    #[instrument(skip(self, token))]
    pub async fn create_spreadsheet(
        &self,
        token: &AccessToken,
        title: &str,
        tab_title: &str,
    ) -> Result<CreatedSpreadsheet, GoogleError> {
        let url = self.url(&[])?;
        let request = CreateSpreadsheetRequest {
            properties: CreateProperties { title },
            sheets: [CreateSheet {
                properties: CreateProperties { title: tab_title },
            }],
        };

        let response = self
            .inner
            .client
            .post(url)
            .bearer_auth(&token.token)
            .json(&request)
            .send()
            .await?;
        let body = check_status(response).await?.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Overwrite a range with raw (unparsed) values, row-major.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::Status` on a non-success status.
    #[instrument(skip(self, token, values), fields(rows = values.len()))]
    pub async fn update_values(
        &self,
        token: &AccessToken,
        spreadsheet_id: &str,
        range: &str,
        values: &[Vec<String>],
    ) -> Result<(), GoogleError> {
        let mut url = self.url(&[spreadsheet_id, "values", range])?;
        url.query_pairs_mut()
            .append_pair("valueInputOption", "RAW");

        let request = UpdateValuesRequest {
            range,
            major_dimension: "ROWS",
            values,
        };

        let response = self
            .inner
            .client
            .put(url)
            .bearer_auth(&token.token)
            .json(&request)
            .send()
            .await?;
        check_status(response).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn client() -> SheetsClient {
        SheetsClient::new(reqwest::Client::new(), "https://sheets.googleapis.com/v4/")
    }

    #[test]
    fn test_url_escapes_range() {
        let url = client().url(&["abc123", "values", "My Tab!A1:M4"]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://sheets.googleapis.com/v4/spreadsheets/abc123/values/My%20Tab!A1:M4"
        );
    }

    #[test]
    fn test_url_without_segments() {
        let url = client().url(&[]).unwrap();
        assert_eq!(url.as_str(), "https://sheets.googleapis.com/v4/spreadsheets");
    }

    #[test]
    fn test_created_spreadsheet_url_fallback() {
        let created: CreatedSpreadsheet =
            serde_json::from_str(r#"{"spreadsheetId":"new123"}"#).unwrap();
        assert_eq!(
            created.url(),
            "https://docs.google.com/spreadsheets/d/new123/edit"
        );

        let created: CreatedSpreadsheet = serde_json::from_str(
            r#"{"spreadsheetId":"new123","spreadsheetUrl":"https://docs.google.com/x"}"#,
        )
        .unwrap();
        assert_eq!(created.url(), "https://docs.google.com/x");
    }

    #[test]
    fn test_create_request_shape() {
        let request = CreateSpreadsheetRequest {
            properties: CreateProperties { title: "Users Export" },
            sheets: [CreateSheet {
                properties: CreateProperties { title: "Users" },
            }],
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["properties"]["title"], "Users Export");
        assert_eq!(json["sheets"][0]["properties"]["title"], "Users");
    }

    #[test]
    fn test_update_request_shape() {
        let values = vec![vec!["id".to_string()], vec!["1".to_string()]];
        let request = UpdateValuesRequest {
            range: "Users!A1:M2",
            major_dimension: "ROWS",
            values: &values,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["majorDimension"], "ROWS");
        assert_eq!(json["range"], "Users!A1:M2");
        assert_eq!(json["values"][1][0], "1");
    }
}
