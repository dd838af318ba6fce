//! Google OAuth 2.0 authorization-code flow.
//!
//! 1. [`GoogleOAuth::authorization_url`] sends the browser to the consent
//!    screen with a CSRF `state`.
//! 2. [`GoogleOAuth::exchange_code`] trades the returned code for an access
//!    token and an ID token, and reads the display name out of the ID token.

use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use super::GoogleError;
use crate::config::GoogleConfig;
use crate::models::AccessToken;

/// Scopes requested at login. The spreadsheets scope covers reading the
/// roster and creating export spreadsheets.
pub const SCOPES: &[&str] = &[
    "openid",
    "profile",
    "email",
    "https://www.googleapis.com/auth/spreadsheets",
];

/// Display name used when the ID token carries neither a name nor an email.
pub const DEFAULT_DISPLAY_NAME: &str = "User";

/// Access token lifetime assumed when the token endpoint omits `expires_in`.
const DEFAULT_TOKEN_LIFETIME_SECS: i64 = 3600;

/// Google OAuth client.
#[derive(Clone)]
pub struct GoogleOAuth {
    inner: Arc<GoogleOAuthInner>,
}

struct GoogleOAuthInner {
    client: reqwest::Client,
    client_id: String,
    client_secret: SecretString,
    auth_url: String,
    token_url: String,
}

/// Token endpoint response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    id_token: Option<String>,
}

/// Claims read from the ID token payload.
#[derive(Debug, Default, Deserialize)]
struct IdTokenClaims {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
}

/// Result of a successful code exchange.
#[derive(Debug, Clone)]
pub struct TokenGrant {
    /// Access token for Sheets calls.
    pub access_token: AccessToken,
    /// Display name for the navigation bar.
    pub display_name: String,
}

impl GoogleOAuth {
    /// Create a new OAuth client.
    #[must_use]
    pub fn new(client: reqwest::Client, config: &GoogleConfig) -> Self {
        Self {
            inner: Arc::new(GoogleOAuthInner {
                client,
                client_id: config.client_id.clone(),
                client_secret: config.client_secret.clone(),
                auth_url: config.auth_url.clone(),
                token_url: config.token_url.clone(),
            }),
        }
    }

    /// Build the consent screen URL.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::Url` if the configured authorization endpoint is invalid.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<String, GoogleError> {
        let mut url = Url::parse(&self.inner.auth_url)?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.inner.client_id)
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", "code")
            .append_pair("scope", &SCOPES.join(" "))
            .append_pair("state", state)
            .append_pair("prompt", "select_account");
        Ok(url.into())
    }

    /// Exchange an authorization code for tokens.
    ///
    /// # Errors
    ///
    /// Returns `GoogleError::OAuth` if the token endpoint rejects the code,
    /// or `GoogleError::Http` if the request fails.
    #[instrument(skip(self, code))]
    pub async fn exchange_code(
        &self,
        code: &str,
        redirect_uri: &str,
    ) -> Result<TokenGrant, GoogleError> {
        let params = [
            ("code", code),
            ("client_id", self.inner.client_id.as_str()),
            ("client_secret", self.inner.client_secret.expose_secret()),
            ("redirect_uri", redirect_uri),
            ("grant_type", "authorization_code"),
        ];

        let response = self
            .inner
            .client
            .post(&self.inner.token_url)
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(GoogleError::OAuth(format!(
                "Token exchange failed ({status}): {text}"
            )));
        }

        let token: TokenResponse = response.json().await?;
        let display_name = token
            .id_token
            .as_deref()
            .map_or_else(|| DEFAULT_DISPLAY_NAME.to_string(), display_name_from_id_token);

        Ok(TokenGrant {
            access_token: AccessToken::from_lifetime(
                token.access_token,
                token.expires_in.unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS),
            ),
            display_name,
        })
    }
}

/// Read the display name from an ID token's payload segment.
///
/// Uses `name`, then `email`, then [`DEFAULT_DISPLAY_NAME`]. The signature is
/// not verified: the token came straight from Google's token endpoint over TLS.
#[must_use]
pub fn display_name_from_id_token(id_token: &str) -> String {
    let claims = id_token
        .split('.')
        .nth(1)
        .and_then(|payload| URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok())
        .and_then(|bytes| serde_json::from_slice::<IdTokenClaims>(&bytes).ok())
        .unwrap_or_default();

    [claims.name, claims.email]
        .into_iter()
        .flatten()
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_DISPLAY_NAME.to_string())
}
