//! Session-related types for user authentication.
//!
//! Types stored in the session for authentication state.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Google access token with its absolute expiry.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken {
    /// Bearer token sent to Google APIs.
    pub token: String,
    /// Unix timestamp (seconds) after which the token is no longer valid.
    pub expires_at: i64,
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl AccessToken {
    /// Build a token from the `expires_in` lifetime returned by the token endpoint.
    #[must_use]
    pub fn from_lifetime(token: impl Into<String>, expires_in_secs: i64) -> Self {
        Self {
            token: token.into(),
            expires_at: Utc::now().timestamp().saturating_add(expires_in_secs),
        }
    }

    /// Whether the token expires within `seconds` from now (or already has).
    #[must_use]
    pub fn expires_within(&self, seconds: i64) -> bool {
        Utc::now().timestamp().saturating_add(seconds) >= self.expires_at
    }
}

/// Session-stored user identity.
///
/// Assembled from the individual session keys in [`keys`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// Display name decoded from the ID token.
    pub name: String,
    /// Google access token used for Sheets calls.
    pub access_token: AccessToken,
    /// Key of this user's table in the grid registry.
    pub grid_id: Uuid,
}

/// Session keys for authentication data.
pub mod keys {
    /// Whether the session belongs to a signed-in user.
    pub const IS_AUTHENTICATED: &str = "is_authenticated";

    /// Display name of the signed-in user.
    pub const USER_NAME: &str = "user_name";

    /// Google access token with expiry.
    pub const ACCESS_TOKEN: &str = "access_token";

    /// Grid registry key for the user's table.
    pub const GRID_ID: &str = "grid_id";

    /// CSRF state for an OAuth login in progress.
    pub const OAUTH_STATE: &str = "oauth_state";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_is_not_expiring() {
        let token = AccessToken::from_lifetime("ya29.token", 3600);
        assert!(!token.expires_within(60));
    }

    #[test]
    fn test_token_inside_buffer_counts_as_expiring() {
        let token = AccessToken::from_lifetime("ya29.token", 30);
        assert!(token.expires_within(60));

        let expired = AccessToken::from_lifetime("ya29.token", -10);
        assert!(expired.expires_within(0));
    }

    #[test]
    fn test_huge_lifetime_saturates() {
        let token = AccessToken::from_lifetime("ya29.token", i64::MAX);
        assert_eq!(token.expires_at, i64::MAX);
        assert!(!token.expires_within(60));

        let token = AccessToken::from_lifetime("ya29.token", i64::MIN);
        assert!(token.expires_within(0));
    }

    #[test]
    fn test_debug_redacts_token() {
        let token = AccessToken::from_lifetime("ya29.very-secret", 3600);
        let output = format!("{token:?}");
        assert!(output.contains("[REDACTED]"));
        assert!(!output.contains("very-secret"));
    }
}
