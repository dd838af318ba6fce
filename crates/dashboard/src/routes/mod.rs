//! HTTP route handlers for the dashboard.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                 - Health check
//!
//! # Auth (Google OAuth)
//! GET  /                       - Login page (redirects to /dashboard when signed in)
//! GET  /auth/google            - Redirect to Google's consent screen
//! GET  /auth/google/callback   - Handle OAuth callback
//! POST /auth/logout            - Logout
//!
//! # Dashboard (requires auth)
//! GET  /dashboard              - User grid (query: q, facet columns, page, sort, dir)
//! POST /dashboard/refresh      - Drop loaded rows and fetch again
//! POST /dashboard/export       - Export visible rows to a new Google Sheet
//! ```

pub mod auth;
pub mod dashboard;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/google", get(auth::login))
        .route("/google/callback", get(auth::callback))
        .route("/logout", post(auth::logout))
}

/// Create the dashboard routes router.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::index))
        .route("/refresh", post(dashboard::refresh))
        .route("/export", post(dashboard::export))
}

/// Create all routes for the dashboard.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(auth::index))
        .nest("/auth", auth_routes())
        .nest("/dashboard", dashboard_routes())
}
