//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::DashboardConfig;
use crate::google::{GoogleError, GoogleOAuth, SheetsClient, http_client};
use crate::grid::GridRegistry;
use crate::source::RecordSource;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc`. Every outbound client shares
/// one `reqwest::Client` with the configured timeout.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: DashboardConfig,
    oauth: GoogleOAuth,
    sheets: SheetsClient,
    source: RecordSource,
    grids: GridRegistry,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: DashboardConfig) -> Result<Self, GoogleError> {
        let client = http_client(config.http_timeout)?;
        let oauth = GoogleOAuth::new(client.clone(), &config.google);
        let sheets = SheetsClient::new(client.clone(), &config.google.sheets_api_url);
        let source = RecordSource::from_config(&config.source, client, sheets.clone());

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                oauth,
                sheets,
                source,
                grids: GridRegistry::new(),
            }),
        })
    }

    /// Get a reference to the dashboard configuration.
    #[must_use]
    pub fn config(&self) -> &DashboardConfig {
        &self.inner.config
    }

    /// Get a reference to the Google OAuth client.
    #[must_use]
    pub fn oauth(&self) -> &GoogleOAuth {
        &self.inner.oauth
    }

    /// Get a reference to the Sheets API client.
    #[must_use]
    pub fn sheets(&self) -> &SheetsClient {
        &self.inner.sheets
    }

    /// Get a reference to the configured record source.
    #[must_use]
    pub fn source(&self) -> &RecordSource {
        &self.inner.source
    }

    /// Get a reference to the per-session table registry.
    #[must_use]
    pub fn grids(&self) -> &GridRegistry {
        &self.inner.grids
    }
}
