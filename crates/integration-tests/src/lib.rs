//! Integration test harness for the roster dashboard.
//!
//! Each test serves the real dashboard router on an ephemeral port and points
//! it at [`MockGoogle`], an in-process stand-in for the Google endpoints the
//! dashboard calls: the OAuth token endpoint, the Sheets API and an Apps
//! Script web app.
//!
//! ```rust,ignore
//! let google = MockGoogle::start(MockState::with_users(users)).await;
//! let app = TestApp::spawn(&google, google.apps_script_source()).await;
//! app.sign_in().await;
//! let html = app.get("/dashboard").await.text().await?;
//! ```

#![allow(clippy::missing_panics_doc, clippy::expect_used)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use axum::{
    Form, Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use roster_dashboard::config::{
    DEFAULT_EXPORT_TAB_TITLE, DashboardConfig, DataSource, GoogleConfig,
};
use roster_dashboard::state::AppState;
use secrecy::SecretString;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use url::Url;

/// Access token handed out by the fake token endpoint.
pub const ACCESS_TOKEN: &str = "ya29.test-access-token";

/// Authorization code the fake token endpoint accepts.
pub const AUTH_CODE: &str = "4/test-auth-code";

/// Spreadsheet ID returned for every created spreadsheet.
pub const CREATED_SPREADSHEET_ID: &str = "new123";

/// Spreadsheet read by [`MockGoogle::sheet_source`].
pub const SOURCE_SPREADSHEET_ID: &str = "source-sheet";

// =============================================================================
// Fake Google
// =============================================================================

/// Behavior and recorded traffic of the fake Google endpoints.
#[derive(Debug, Clone)]
pub struct MockState {
    /// Name claim placed in the ID token.
    pub display_name: String,
    /// Status of the Apps Script `getUsers` response.
    pub users_status: u16,
    /// Raw body of the Apps Script `getUsers` response.
    pub users_body: String,
    /// `sheetName` of the Apps Script `getSheetName` response.
    pub sheet_name: Option<String>,
    /// Cells returned for the source spreadsheet's values.
    pub sheet_values: Value,
    /// Title of the source spreadsheet.
    pub sheet_title: Option<String>,
    /// Status and message returned when creating a spreadsheet.
    pub create_error: Option<(u16, String)>,
    /// Number of `getUsers` calls received.
    pub users_calls: usize,
    /// Bodies of spreadsheet create requests.
    pub created: Vec<Value>,
    /// Range and body of every values update.
    pub updates: Vec<(String, Value)>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            display_name: "Ada Lovelace".to_string(),
            users_status: 200,
            users_body: "[]".to_string(),
            sheet_name: Some("Team Roster".to_string()),
            sheet_values: json!([]),
            sheet_title: Some("Team Roster".to_string()),
            create_error: None,
            users_calls: 0,
            created: Vec::new(),
            updates: Vec::new(),
        }
    }
}

impl MockState {
    /// State whose Apps Script returns the given rows.
    #[must_use]
    pub fn with_users(users: &Value) -> Self {
        Self {
            users_body: users.to_string(),
            ..Self::default()
        }
    }
}

type SharedMock = Arc<Mutex<MockState>>;

/// Fake Google endpoints served on an ephemeral port.
pub struct MockGoogle {
    addr: SocketAddr,
    state: SharedMock,
}

impl MockGoogle {
    /// Start serving the fake endpoints.
    pub async fn start(state: MockState) -> Self {
        let state = Arc::new(Mutex::new(state));
        let router = Router::new()
            .route("/token", post(token))
            .route("/exec", get(apps_script))
            .route("/v4/spreadsheets", post(create_spreadsheet))
            .route("/v4/spreadsheets/{id}", get(spreadsheet_title))
            .route(
                "/v4/spreadsheets/{id}/values/{range}",
                get(get_values).put(update_values),
            )
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock Google listener");
        let addr = listener
            .local_addr()
            .expect("Mock Google listener has no address");
        tokio::spawn(async move {
            axum::serve(listener, router)
                .await
                .expect("Mock Google server failed");
        });

        Self { addr, state }
    }

    /// Absolute URL of a path on the fake server.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Lock the shared state to inspect traffic or change behavior.
    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().expect("Mock state poisoned")
    }

    /// Data source backed by the fake Apps Script web app.
    #[must_use]
    pub fn apps_script_source(&self) -> DataSource {
        DataSource::AppsScript {
            url: self.url("/exec"),
        }
    }

    /// Data source backed by the fake spreadsheet.
    #[must_use]
    pub fn sheet_source(&self) -> DataSource {
        DataSource::Sheet {
            spreadsheet_id: SOURCE_SPREADSHEET_ID.to_string(),
            range: "Sheet1!A:M".to_string(),
        }
    }
}

fn lock(state: &SharedMock) -> MutexGuard<'_, MockState> {
    state.lock().expect("Mock state poisoned")
}

fn authorized(headers: &HeaderMap) -> bool {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        == Some(format!("Bearer {ACCESS_TOKEN}").as_str())
}

fn google_error(status: u16, message: &str) -> Response {
    let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (
        status,
        Json(json!({ "error": { "code": status.as_u16(), "message": message } })),
    )
        .into_response()
}

fn unauthorized() -> Response {
    google_error(401, "Request is missing required authentication credential.")
}

async fn token(
    State(state): State<SharedMock>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    if params.get("code").map(String::as_str) != Some(AUTH_CODE)
        || params.get("grant_type").map(String::as_str) != Some("authorization_code")
    {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid_grant" })),
        )
            .into_response();
    }

    let name = lock(&state).display_name.clone();
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256"}"#);
    let claims = URL_SAFE_NO_PAD.encode(json!({ "name": name, "email": "ada@example.com" }).to_string());

    Json(json!({
        "access_token": ACCESS_TOKEN,
        "expires_in": 3599,
        "token_type": "Bearer",
        "id_token": format!("{header}.{claims}.signature"),
    }))
    .into_response()
}

async fn apps_script(
    State(state): State<SharedMock>,
    Query(query): Query<HashMap<String, String>>,
) -> Response {
    let mut state = lock(&state);
    match query.get("action").map(String::as_str) {
        Some("getUsers") => {
            state.users_calls += 1;
            let status =
                StatusCode::from_u16(state.users_status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (status, state.users_body.clone()).into_response()
        }
        Some("getSheetName") => Json(json!({ "sheetName": state.sheet_name })).into_response(),
        _ => (StatusCode::BAD_REQUEST, "Unknown action").into_response(),
    }
}

async fn spreadsheet_title(
    State(state): State<SharedMock>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if id != SOURCE_SPREADSHEET_ID {
        return google_error(404, "Requested entity was not found.");
    }
    Json(json!({ "properties": { "title": lock(&state).sheet_title } })).into_response()
}

async fn get_values(
    State(state): State<SharedMock>,
    headers: HeaderMap,
    Path((id, range)): Path<(String, String)>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if id != SOURCE_SPREADSHEET_ID {
        return google_error(404, "Requested entity was not found.");
    }
    Json(json!({
        "range": range,
        "majorDimension": "ROWS",
        "values": lock(&state).sheet_values,
    }))
    .into_response()
}

async fn create_spreadsheet(
    State(state): State<SharedMock>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    let mut state = lock(&state);
    if let Some((status, message)) = state.create_error.clone() {
        return google_error(status, &message);
    }
    state.created.push(body);
    Json(json!({ "spreadsheetId": CREATED_SPREADSHEET_ID })).into_response()
}

async fn update_values(
    State(state): State<SharedMock>,
    headers: HeaderMap,
    Path((id, range)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Response {
    if !authorized(&headers) {
        return unauthorized();
    }
    if id != CREATED_SPREADSHEET_ID {
        return google_error(404, "Requested entity was not found.");
    }
    lock(&state).updates.push((range.clone(), body));
    Json(json!({ "spreadsheetId": id, "updatedRange": range })).into_response()
}

// =============================================================================
// Dashboard under test
// =============================================================================

/// The dashboard served on an ephemeral port, plus a browser-like client.
pub struct TestApp {
    base_url: String,
    client: reqwest::Client,
}

impl TestApp {
    /// Serve the dashboard against the fake Google endpoints.
    pub async fn spawn(google: &MockGoogle, source: DataSource) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind dashboard listener");
        let addr = listener
            .local_addr()
            .expect("Dashboard listener has no address");
        let base_url = format!("http://{addr}");

        let config = DashboardConfig {
            host: addr.ip(),
            port: addr.port(),
            base_url: base_url.clone(),
            google: GoogleConfig {
                client_id: "1234-test.apps.googleusercontent.com".to_string(),
                client_secret: SecretString::from("GOCSPX-k3Yq8vZp2LmN7rT0wXb5"),
                auth_url: google.url("/auth"),
                token_url: google.url("/token"),
                sheets_api_url: google.url("/v4"),
            },
            source,
            export_tab_title: DEFAULT_EXPORT_TAB_TITLE.to_string(),
            http_timeout: Duration::from_secs(5),
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
            tls: None,
        };
        let state = AppState::new(config).expect("Failed to build app state");
        let app = roster_dashboard::app(state);

        tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("Dashboard server failed");
        });

        let client = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .expect("Failed to create HTTP client");

        Self { base_url, client }
    }

    /// GET a dashboard path without following redirects.
    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .expect("GET request failed")
    }

    /// POST a form to a dashboard path without following redirects.
    pub async fn post_form(&self, path: &str, form: &[(&str, &str)]) -> reqwest::Response {
        self.client
            .post(format!("{}{path}", self.base_url))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// GET a path and return the body, asserting a 200.
    pub async fn page(&self, path: &str) -> String {
        let response = self.get(path).await;
        assert_eq!(response.status(), reqwest::StatusCode::OK, "GET {path}");
        response.text().await.expect("Failed to read body")
    }

    /// Start sign-in and return the `state` sent to the consent screen.
    pub async fn begin_sign_in(&self) -> String {
        let response = self.get("/auth/google").await;
        assert!(response.status().is_redirection());

        let consent = Url::parse(location(&response)).expect("Consent URL is not absolute");
        consent
            .query_pairs()
            .find(|(key, _)| key == "state")
            .map(|(_, value)| value.into_owned())
            .expect("Consent URL has no state")
    }

    /// Complete the OAuth flow as if the user approved the consent screen.
    pub async fn sign_in(&self) {
        let state = self.begin_sign_in().await;
        let response = self
            .get(&format!("/auth/google/callback?code={AUTH_CODE}&state={state}"))
            .await;
        assert_eq!(location(&response), "/dashboard");
    }
}

/// `Location` header of a redirect response.
#[must_use]
pub fn location(response: &reqwest::Response) -> &str {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
}

/// One Apps Script row with every column filled in.
#[must_use]
pub fn user(id: u32, first_name: &str, gender: &str, city: &str) -> Value {
    json!({
        "id": id,
        "first_name": first_name,
        "last_name": "Tester",
        "email": format!("{}@example.com", first_name.to_lowercase()),
        "gender": gender,
        "city": city,
        "country": "France",
        "country_code": "FR",
        "state": "Ile-de-France",
        "street_address": format!("{id} Rue de Rivoli"),
        "job_title": "Data Analyst",
        "company_name": "Analytical Engines",
        "photo": format!(r#"<img src="https://img.example.com/{id}.png">"#),
    })
}
