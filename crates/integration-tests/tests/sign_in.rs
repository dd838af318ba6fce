//! Google sign-in flow against the fake token endpoint.

use roster_integration_tests::{AUTH_CODE, MockGoogle, MockState, TestApp, location, user};
use serde_json::json;

async fn app() -> (MockGoogle, TestApp) {
    let google = MockGoogle::start(MockState::with_users(&json!([
        user(1, "Grace", "Female", "Paris"),
    ])))
    .await;
    let app = TestApp::spawn(&google, google.apps_script_source()).await;
    (google, app)
}

#[tokio::test]
async fn test_login_page_for_anonymous_visitor() {
    let (_google, app) = app().await;

    let html = app.page("/").await;
    assert!(html.contains("Please Login to Access Dashboard"));
    assert!(html.contains("/auth/google"));
}

#[tokio::test]
async fn test_dashboard_requires_sign_in() {
    let (_google, app) = app().await;

    let response = app.get("/dashboard").await;
    assert!(response.status().is_redirection());
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_consent_redirect_carries_client_and_scopes() {
    let (google, app) = app().await;

    let response = app.get("/auth/google").await;
    let consent = location(&response);
    assert!(consent.starts_with(&google.url("/auth")));
    assert!(consent.contains("client_id=1234-test.apps.googleusercontent.com"));
    assert!(consent.contains("spreadsheets"));
    assert!(consent.contains("prompt=select_account"));
}

#[tokio::test]
async fn test_sign_in_shows_name_and_sheet_title() {
    let (_google, app) = app().await;

    app.sign_in().await;

    let html = app.page("/dashboard").await;
    assert!(html.contains("Ada Lovelace"));
    assert!(html.contains("Team Roster"));
    assert!(html.contains("Grace"));

    // Signed-in visitors skip the login page
    let response = app.get("/").await;
    assert_eq!(location(&response), "/dashboard");
}

#[tokio::test]
async fn test_state_mismatch_is_rejected() {
    let (_google, app) = app().await;

    app.begin_sign_in().await;
    let response = app
        .get(&format!("/auth/google/callback?code={AUTH_CODE}&state=forged"))
        .await;
    assert_eq!(location(&response), "/?error=oauth_invalid_state");

    let html = app.page("/?error=oauth_invalid_state").await;
    assert!(html.contains("Your sign-in request expired"));
}

#[tokio::test]
async fn test_state_is_single_use() {
    let (_google, app) = app().await;

    let state = app.begin_sign_in().await;
    app.get("/auth/google/callback?code=x&state=forged").await;

    let response = app
        .get(&format!("/auth/google/callback?code={AUTH_CODE}&state={state}"))
        .await;
    assert_eq!(location(&response), "/?error=oauth_invalid_state");
}

#[tokio::test]
async fn test_consent_denied() {
    let (_google, app) = app().await;

    let state = app.begin_sign_in().await;
    let response = app
        .get(&format!("/auth/google/callback?error=access_denied&state={state}"))
        .await;
    assert_eq!(location(&response), "/?error=oauth_denied");
}

#[tokio::test]
async fn test_rejected_code() {
    let (_google, app) = app().await;

    let state = app.begin_sign_in().await;
    let response = app
        .get(&format!("/auth/google/callback?code=stale&state={state}"))
        .await;
    assert_eq!(location(&response), "/?error=oauth_exchange_failed");

    let response = app.get("/dashboard").await;
    assert_eq!(location(&response), "/");
}

#[tokio::test]
async fn test_logout_clears_session() {
    let (_google, app) = app().await;
    app.sign_in().await;
    app.page("/dashboard").await;

    let response = app.post_form("/auth/logout", &[]).await;
    assert_eq!(location(&response), "/");

    let response = app.get("/dashboard").await;
    assert_eq!(location(&response), "/");
}
