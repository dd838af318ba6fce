//! Authentication middleware and extractors.
//!
//! Provides extractors for requiring a signed-in Google user in route handlers,
//! plus the helpers that write and clear the session keys.

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::models::{AccessToken, CurrentUser, session_keys};
use crate::state::AppState;

/// Tokens this close to expiry are treated as already expired.
pub const TOKEN_EXPIRY_BUFFER_SECS: i64 = 60;

/// Extractor that requires a signed-in user with a live access token.
///
/// Unauthenticated requests are redirected to the login page. An expiring
/// token signs the user out and redirects to `/?error=session_expired`.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(
///     RequireAuth(user): RequireAuth,
/// ) -> impl IntoResponse {
///     format!("Hello, {}!", user.name)
/// }
/// ```
pub struct RequireAuth(pub CurrentUser);

/// Error returned when authentication is required but missing or expired.
#[derive(Debug, PartialEq, Eq)]
pub enum AuthRejection {
    /// Redirect to login page.
    RedirectToLogin,
    /// The access token expired; the session was cleared.
    SessionExpired,
    /// No session layer in front of the handler.
    Unauthorized,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin => Redirect::to("/").into_response(),
            Self::SessionExpired => Redirect::to("/?error=session_expired").into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireAuth
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::Unauthorized)?;

        let Some(user) = load_current_user(&session).await.ok().flatten() else {
            return Err(AuthRejection::RedirectToLogin);
        };

        if user.access_token.expires_within(TOKEN_EXPIRY_BUFFER_SECS) {
            tracing::info!(grid_id = %user.grid_id, "Access token expired, signing out");
            let state = AppState::from_ref(state);
            state.grids().dispose(user.grid_id).await;
            if let Err(e) = sign_out(&session).await {
                tracing::warn!(error = %e, "Failed to clear expired session");
            }
            return Err(AuthRejection::SessionExpired);
        }

        Ok(Self(user))
    }
}

/// Extractor that optionally gets the current user.
///
/// Unlike `RequireAuth`, this does not reject the request if nobody is signed
/// in. Users whose token is about to expire are reported as signed out.
pub struct OptionalAuth(pub Option<CurrentUser>);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = match parts.extensions.get::<Session>() {
            Some(session) => load_current_user(session).await.ok().flatten(),
            None => None,
        };

        Ok(Self(user.filter(|u| {
            !u.access_token.expires_within(TOKEN_EXPIRY_BUFFER_SECS)
        })))
    }
}

/// Read the signed-in user from the session.
///
/// Returns `None` unless `is_authenticated` is set and every user key is present.
///
/// # Errors
///
/// Returns an error if the session store cannot be read.
pub async fn load_current_user(
    session: &Session,
) -> Result<Option<CurrentUser>, tower_sessions::session::Error> {
    let authenticated = session
        .get::<bool>(session_keys::IS_AUTHENTICATED)
        .await?
        .unwrap_or(false);
    if !authenticated {
        return Ok(None);
    }

    let name = session.get::<String>(session_keys::USER_NAME).await?;
    let access_token = session.get::<AccessToken>(session_keys::ACCESS_TOKEN).await?;
    let grid_id = session.get::<Uuid>(session_keys::GRID_ID).await?;

    Ok(match (name, access_token, grid_id) {
        (Some(name), Some(access_token), Some(grid_id)) => Some(CurrentUser {
            name,
            access_token,
            grid_id,
        }),
        _ => None,
    })
}

/// Persist a freshly signed-in user.
///
/// Cycles the session ID first so a pre-login session cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn sign_in(
    session: &Session,
    user: &CurrentUser,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::IS_AUTHENTICATED, true).await?;
    session.insert(session_keys::USER_NAME, &user.name).await?;
    session
        .insert(session_keys::ACCESS_TOKEN, &user.access_token)
        .await?;
    session.insert(session_keys::GRID_ID, user.grid_id).await?;
    set_sentry_user(user.grid_id, &user.name);
    Ok(())
}

/// Remove every session key and delete the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn sign_out(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await?;
    clear_sentry_user();
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use tower_sessions::MemoryStore;

    use super::*;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn user(expires_in: i64) -> CurrentUser {
        CurrentUser {
            name: "Ada Lovelace".to_string(),
            access_token: AccessToken::from_lifetime("ya29.token", expires_in),
            grid_id: Uuid::new_v4(),
        }
    }

    #[tokio::test]
    async fn test_empty_session_has_no_user() {
        let session = session();
        assert!(load_current_user(&session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_in_round_trips_all_keys() {
        let session = session();
        let user = user(3600);

        sign_in(&session, &user).await.unwrap();

        let loaded = load_current_user(&session).await.unwrap().unwrap();
        assert_eq!(loaded, user);
        assert_eq!(
            session
                .get::<bool>(session_keys::IS_AUTHENTICATED)
                .await
                .unwrap(),
            Some(true)
        );
    }

    #[tokio::test]
    async fn test_missing_key_means_signed_out() {
        let session = session();
        sign_in(&session, &user(3600)).await.unwrap();
        session
            .remove::<Uuid>(session_keys::GRID_ID)
            .await
            .unwrap();

        assert!(load_current_user(&session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_sign_out_clears_everything() {
        let session = session();
        sign_in(&session, &user(3600)).await.unwrap();

        sign_out(&session).await.unwrap();

        assert!(load_current_user(&session).await.unwrap().is_none());
        assert!(
            session
                .get::<String>(session_keys::USER_NAME)
                .await
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_rejections_redirect() {
        let response = AuthRejection::SessionExpired.into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()["location"],
            "/?error=session_expired"
        );

        let response = AuthRejection::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
