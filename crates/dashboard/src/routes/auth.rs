//! Google sign-in route handlers.
//!
//! - `GET /` shows the login page, or sends signed-in users to the dashboard
//! - `GET /auth/google` redirects to Google's consent screen
//! - `GET /auth/google/callback` validates the state, exchanges the code and
//!   signs the user in
//! - `POST /auth/logout` disposes the user's table and clears the session
//!
//! Every failure redirects to `/?error=<code>`; nothing is retried.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use thiserror::Error;
use tower_sessions::Session;
use tracing::instrument;
use uuid::Uuid;

use crate::filters;
use crate::google::GoogleError;
use crate::middleware::{OptionalAuth, load_current_user, sign_in, sign_out};
use crate::models::{CurrentUser, session_keys};
use crate::state::AppState;

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur during the OAuth flow.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The user (or Google) declined the consent request.
    #[error("Authorization denied: {0}")]
    Denied(String),

    /// The callback arrived without a code or state.
    #[error("OAuth callback is missing the code or state")]
    MissingParams,

    /// The returned state does not match the one stored in the session.
    #[error("OAuth state mismatch")]
    InvalidState,

    /// The consent screen URL could not be built from the configured endpoint.
    #[error("Invalid authorization endpoint: {0}")]
    AuthorizationUrl(GoogleError),

    /// The authorization code could not be exchanged.
    #[error("Token exchange failed: {0}")]
    Exchange(#[from] GoogleError),

    /// The session could not be read or written.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AuthError {
    /// Code passed to the login page as `?error=`.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::Denied(_) => "oauth_denied",
            Self::InvalidState => "oauth_invalid_state",
            Self::Exchange(_) => "oauth_exchange_failed",
            Self::MissingParams | Self::AuthorizationUrl(_) | Self::Session(_) => "oauth_failed",
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        tracing::warn!(error = %self, "Sign-in failed");
        Redirect::to(&format!("/?error={}", self.code())).into_response()
    }
}

// =============================================================================
// Query Types
// =============================================================================

/// Query parameters for error display on the login page.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
}

/// Query parameters from Google's OAuth callback.
#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    /// Authorization code to exchange for tokens.
    pub code: Option<String>,
    /// State parameter for CSRF protection.
    pub state: Option<String>,
    /// Error code if authorization failed.
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
}

/// Human-readable message for a login error code.
#[must_use]
pub fn login_error_message(code: &str) -> String {
    match code {
        "oauth_denied" => "Google sign-in was cancelled or denied.".to_string(),
        "oauth_invalid_state" => "Your sign-in request expired. Please try again.".to_string(),
        "oauth_exchange_failed" => {
            "Could not complete sign-in with Google. Please try again.".to_string()
        }
        "oauth_failed" => "Sign-in failed. Please try again.".to_string(),
        "session_expired" => "Your session has expired. Please log in again.".to_string(),
        _ => format!("Error: {code}"),
    }
}

// =============================================================================
// Route Handlers
// =============================================================================

/// Login page, or a redirect to the dashboard for signed-in users.
///
/// # Route
///
/// `GET /`
pub async fn index(OptionalAuth(user): OptionalAuth, Query(query): Query<MessageQuery>) -> Response {
    if user.is_some() {
        return Redirect::to("/dashboard").into_response();
    }

    LoginTemplate {
        error: query.error.as_deref().map(login_error_message),
    }
    .into_response()
}

/// Start Google sign-in.
///
/// Stores a random CSRF state in the session and redirects to the consent
/// screen.
///
/// # Route
///
/// `GET /auth/google`
#[instrument(skip(state, session))]
pub async fn login(State(state): State<AppState>, session: Session) -> Result<Redirect, AuthError> {
    let oauth_state = Uuid::new_v4().to_string();
    session
        .insert(session_keys::OAUTH_STATE, &oauth_state)
        .await?;

    let auth_url = state
        .oauth()
        .authorization_url(&state.config().redirect_uri(), &oauth_state)
        .map_err(AuthError::AuthorizationUrl)?;

    Ok(Redirect::to(&auth_url))
}

/// Handle Google's OAuth callback.
///
/// # Route
///
/// `GET /auth/google/callback`
#[instrument(skip(state, session, query))]
pub async fn callback(
    State(state): State<AppState>,
    session: Session,
    Query(query): Query<CallbackQuery>,
) -> Result<Redirect, AuthError> {
    // One-time use, whatever the outcome
    let stored_state = session
        .remove::<String>(session_keys::OAUTH_STATE)
        .await?;

    if let Some(error) = query.error {
        return Err(AuthError::Denied(error));
    }

    let (Some(code), Some(returned_state)) = (query.code, query.state) else {
        return Err(AuthError::MissingParams);
    };

    if stored_state.as_deref() != Some(returned_state.as_str()) {
        return Err(AuthError::InvalidState);
    }

    let grant = state
        .oauth()
        .exchange_code(&code, &state.config().redirect_uri())
        .await?;

    let user = CurrentUser {
        name: grant.display_name,
        access_token: grant.access_token,
        grid_id: Uuid::new_v4(),
    };
    sign_in(&session, &user).await?;

    tracing::info!(grid_id = %user.grid_id, "User signed in");
    Ok(Redirect::to("/dashboard"))
}

/// Sign out.
///
/// # Route
///
/// `POST /auth/logout`
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Redirect {
    if let Ok(Some(user)) = load_current_user(&session).await {
        state.grids().dispose(user.grid_id).await;
    }

    if let Err(e) = sign_out(&session).await {
        tracing::error!(error = %e, "Failed to clear session on logout");
    }

    Redirect::to("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(AuthError::Denied("access_denied".to_string()).code(), "oauth_denied");
        assert_eq!(AuthError::InvalidState.code(), "oauth_invalid_state");
        assert_eq!(AuthError::MissingParams.code(), "oauth_failed");
        assert_eq!(
            AuthError::AuthorizationUrl(GoogleError::Url(url::ParseError::EmptyHost)).code(),
            "oauth_failed"
        );
        assert_eq!(
            AuthError::Exchange(GoogleError::OAuth("invalid_grant".to_string())).code(),
            "oauth_exchange_failed"
        );
    }

    #[test]
    fn test_error_redirects_to_login() {
        let response = AuthError::InvalidState.into_response();
        assert_eq!(response.status(), axum::http::StatusCode::SEE_OTHER);
        assert_eq!(
            response
                .headers()
                .get("location")
                .and_then(|v| v.to_str().ok()),
            Some("/?error=oauth_invalid_state")
        );
    }

    #[test]
    fn test_bad_authorization_endpoint_is_not_reported_as_callback_error() {
        let err = AuthError::AuthorizationUrl(GoogleError::Url(url::ParseError::EmptyHost));
        let message = err.to_string();
        assert!(message.starts_with("Invalid authorization endpoint"));
        assert!(!message.contains("callback"));
    }

    #[test]
    fn test_login_error_messages() {
        assert!(login_error_message("session_expired").contains("expired"));
        assert!(login_error_message("oauth_denied").contains("denied"));
        assert_eq!(login_error_message("weird"), "Error: weird");
    }

    #[test]
    fn test_login_page_renders() {
        let html = LoginTemplate {
            error: Some(login_error_message("oauth_failed")),
        }
        .render()
        .unwrap_or_default();
        assert!(html.contains("Please Login to Access Dashboard"));
        assert!(html.contains("/auth/google"));
        assert!(html.contains("Sign-in failed"));
    }
}
