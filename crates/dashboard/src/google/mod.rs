//! Google OAuth 2.0 and Sheets v4 REST clients.
//!
//! # Architecture
//!
//! - One shared `reqwest::Client` with a request timeout for every call
//! - [`GoogleOAuth`] builds the consent URL and exchanges authorization codes
//! - [`SheetsClient`] reads values and titles, creates and fills spreadsheets
//!   with the signed-in user's bearer token
//! - Nothing is retried; callers turn errors into user-visible messages

pub mod oauth;
pub mod sheets;

pub use oauth::{GoogleOAuth, SCOPES, TokenGrant, display_name_from_id_token};
pub use sheets::{CreatedSpreadsheet, SheetsClient};

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when talking to Google.
#[derive(Debug, Error)]
pub enum GoogleError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Google answered with a non-success status.
    #[error("Google API returned {status}: {message}")]
    Status { status: u16, message: String },

    /// Rate limited by Google.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Token exchange was rejected.
    #[error("OAuth error: {0}")]
    OAuth(String),

    /// A configured endpoint is not a usable URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl GoogleError {
    /// HTTP status Google answered with, if any.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::RateLimited(_) => Some(429),
            _ => None,
        }
    }
}

/// Build the HTTP client shared by every outbound call.
///
/// # Errors
///
/// Returns `GoogleError::Http` if the TLS backend cannot be initialised.
pub fn http_client(timeout: Duration) -> Result<reqwest::Client, GoogleError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}

/// Standard Google API error envelope: `{"error": {"message": "..."}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

/// Turn a non-success response into a `GoogleError`, passing successes through.
async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, GoogleError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        return Err(GoogleError::RateLimited(retry_after));
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ErrorEnvelope>(&body)
        .map(|envelope| envelope.error.message)
        .unwrap_or(body);

    Err(GoogleError::Status {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let err = GoogleError::Status {
            status: 403,
            message: "The caller does not have permission".to_string(),
        };
        assert_eq!(err.status(), Some(403));
        assert_eq!(GoogleError::RateLimited(30).status(), Some(429));
        assert_eq!(GoogleError::OAuth("denied".to_string()).status(), None);
    }

    #[test]
    fn test_status_display() {
        let err = GoogleError::Status {
            status: 404,
            message: "Requested entity was not found.".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Google API returned 404: Requested entity was not found."
        );
    }
}
