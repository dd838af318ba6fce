//! Loading, filtering, searching and paging the grid.

use roster_integration_tests::{MockGoogle, MockState, TestApp, user};
use serde_json::{Value, json};

fn roster(count: u32) -> Value {
    Value::Array(
        (1..=count)
            .map(|id| {
                let gender = if id % 2 == 0 { "Female" } else { "Male" };
                let city = if id <= 5 { "Paris" } else { "Lyon" };
                user(id, &format!("User{id}"), gender, city)
            })
            .collect(),
    )
}

async fn signed_in(state: MockState) -> (MockGoogle, TestApp) {
    let google = MockGoogle::start(state).await;
    let app = TestApp::spawn(&google, google.apps_script_source()).await;
    app.sign_in().await;
    (google, app)
}

#[tokio::test]
async fn test_first_page() {
    let (_google, app) = signed_in(MockState::with_users(&roster(25))).await;

    let html = app.page("/dashboard").await;
    assert!(html.contains("Showing 1 to 10 of 25 entries"));
    assert!(!html.contains("filtered from"));
    assert!(html.contains("User10"));
    assert!(!html.contains("user11@"));
    assert!(html.contains("https://img.example.com/1.png"));
    assert!(html.contains("/dashboard?page=2"));
}

#[tokio::test]
async fn test_last_page() {
    let (_google, app) = signed_in(MockState::with_users(&roster(25))).await;

    let html = app.page("/dashboard?page=3").await;
    assert!(html.contains("Showing 21 to 25 of 25 entries"));

    // Out-of-range pages clamp to the last one
    let html = app.page("/dashboard?page=99").await;
    assert!(html.contains("Showing 21 to 25 of 25 entries"));
}

#[tokio::test]
async fn test_filter_by_facet() {
    let (_google, app) = signed_in(MockState::with_users(&roster(25))).await;

    let html = app.page("/dashboard?gender=Female").await;
    assert!(html.contains("Showing 1 to 10 of 12 entries (filtered from 25 total entries)"));
    assert!(html.contains(r#"<option value="Female" selected>"#));

    let html = app.page("/dashboard?gender=Female&city=Paris").await;
    assert!(html.contains("Showing 1 to 2 of 2 entries (filtered from 25 total entries)"));
}

#[tokio::test]
async fn test_search() {
    let (_google, app) = signed_in(MockState::with_users(&roster(25))).await;

    let html = app.page("/dashboard?q=user7").await;
    assert!(html.contains("Showing 1 to 1 of 1 entries (filtered from 25 total entries)"));

    let html = app.page("/dashboard?q=nobody").await;
    assert!(html.contains("No matching records found"));
    assert!(html.contains("Showing 0 to 0 of 0 entries"));
}

#[tokio::test]
async fn test_sort_descending() {
    let (_google, app) = signed_in(MockState::with_users(&roster(25))).await;

    let html = app.page("/dashboard?sort=id&dir=desc").await;
    let first = html.find("User25").unwrap_or(usize::MAX);
    let second = html.find("User24").unwrap_or(usize::MAX);
    assert!(first < second);
    assert!(!html.contains("user15@"));
}

#[tokio::test]
async fn test_records_are_fetched_once_until_refresh() {
    let (google, app) = signed_in(MockState::with_users(&roster(3))).await;

    app.page("/dashboard").await;
    app.page("/dashboard?page=1").await;
    assert_eq!(google.state().users_calls, 1);

    let response = app.post_form("/dashboard/refresh", &[]).await;
    assert!(response.status().is_redirection());
    app.page("/dashboard").await;
    assert_eq!(google.state().users_calls, 2);
}

#[tokio::test]
async fn test_source_failure_is_shown() {
    let state = MockState {
        users_status: 500,
        ..MockState::default()
    };
    let (_google, app) = signed_in(state).await;

    let html = app.page("/dashboard").await;
    assert!(html.contains("Error loading data: HTTP error! status: 500"));
}

#[tokio::test]
async fn test_malformed_payload_loads_empty() {
    let state = MockState {
        users_body: "<html>not json</html>".to_string(),
        ..MockState::default()
    };
    let (_google, app) = signed_in(state).await;

    let html = app.page("/dashboard").await;
    assert!(html.contains("Showing 0 to 0 of 0 entries"));
    assert!(html.contains("No matching records found"));
}

#[tokio::test]
async fn test_missing_sheet_name_uses_default_title() {
    let state = MockState {
        sheet_name: None,
        ..MockState::with_users(&roster(1))
    };
    let (_google, app) = signed_in(state).await;

    let html = app.page("/dashboard").await;
    assert!(html.contains("Default Sheet Name"));
}

#[tokio::test]
async fn test_sheets_source_skips_header_row() {
    let google = MockGoogle::start(MockState {
        sheet_values: json!([
            ["id", "first_name", "last_name", "email", "gender"],
            [1, "Grace", "Hopper", "grace@example.com", "Female"],
            ["2", "Alan", "Turing", "alan@example.com", "Male"],
        ]),
        sheet_title: Some("Sheet Roster".to_string()),
        ..MockState::default()
    })
    .await;
    let app = TestApp::spawn(&google, google.sheet_source()).await;
    app.sign_in().await;

    let html = app.page("/dashboard").await;
    assert!(html.contains("Sheet Roster"));
    assert!(html.contains("Showing 1 to 2 of 2 entries"));
    assert!(html.contains("Grace"));
    assert!(html.contains("Alan"));
}
