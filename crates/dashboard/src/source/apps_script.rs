//! Apps Script web app backend.

use std::sync::Arc;

use roster_core::UserRecord;
use serde::Deserialize;
use serde_json::Value;
use tracing::instrument;
use url::Url;

use super::FetchError;

/// Apps Script endpoint answering `?action=getUsers` and `?action=getSheetName`.
#[derive(Clone)]
pub struct AppsScriptSource {
    inner: Arc<AppsScriptInner>,
}

struct AppsScriptInner {
    client: reqwest::Client,
    url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SheetNameResponse {
    #[serde(default)]
    sheet_name: Option<String>,
}

impl AppsScriptSource {
    #[must_use]
    pub fn new(client: reqwest::Client, url: &str) -> Self {
        Self {
            inner: Arc::new(AppsScriptInner {
                client,
                url: url.to_string(),
            }),
        }
    }

    /// GET `{url}?action={action}` and return the body text.
    async fn call(&self, action: &str) -> Result<String, FetchError> {
        let mut url = Url::parse(&self.inner.url)?;
        url.query_pairs_mut().append_pair("action", action);

        let response = self.inner.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }
        Ok(response.text().await?)
    }

    #[instrument(skip(self))]
    pub(super) async fn fetch_records(&self) -> Result<Vec<UserRecord>, FetchError> {
        let body = self.call("getUsers").await?;

        let payload: Value = match serde_json::from_str(&body) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!(error = %e, "getUsers returned malformed JSON, treating as empty");
                return Ok(Vec::new());
            }
        };
        if !payload.is_array() {
            tracing::warn!("getUsers did not return an array, treating as empty");
        }

        let normalized = UserRecord::from_json_rows(&payload);
        if normalized.skipped > 0 {
            tracing::warn!(skipped = normalized.skipped, "Skipped non-object rows");
        }
        tracing::debug!(count = normalized.records.len(), "Fetched records");
        Ok(normalized.records)
    }

    #[instrument(skip(self))]
    pub(super) async fn fetch_title(&self) -> Result<Option<String>, FetchError> {
        let body = self.call("getSheetName").await?;

        match serde_json::from_str::<SheetNameResponse>(&body) {
            Ok(response) => Ok(response.sheet_name.filter(|name| !name.is_empty())),
            Err(e) => {
                tracing::warn!(error = %e, "getSheetName returned malformed JSON");
                Ok(None)
            }
        }
    }
}
