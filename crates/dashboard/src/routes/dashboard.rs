//! Dashboard route handlers.
//!
//! `GET /dashboard` loads the user's table on first visit, applies the filter
//! and sort from the query string, and renders one page of the grid. Export
//! posts the URL of the rendered view and re-applies its filter and sort, so
//! the spreadsheet holds exactly the rows on that page's view.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::Uri,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Local;
use roster_core::{
    Column, FilterState, SortDirection, SortOrder, TableError, TableState, extract_photo_url,
};
use serde::Deserialize;
use tracing::instrument;
use url::form_urlencoded;

use crate::components::{DataTableConfig, users_table_config};
use crate::error::AppError;
use crate::filters;
use crate::middleware::RequireAuth;
use crate::services::{ExportError, LoadError, ensure_loaded, export_title, export_visible_rows};
use crate::state::AppState;

/// Page links shown on either side of the current page.
const PAGE_WINDOW: usize = 2;

// =============================================================================
// Query / Form Types
// =============================================================================

/// Query parameters of `GET /dashboard`.
///
/// Everything is optional and parsed leniently: unknown sort columns fall
/// back to `id`, bad page numbers to page 1.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub q: Option<String>,
    pub gender: Option<String>,
    pub city: Option<String>,
    pub country: Option<String>,
    pub state: Option<String>,
    pub job_title: Option<String>,
    pub company_name: Option<String>,
    pub page: Option<String>,
    pub sort: Option<String>,
    pub dir: Option<String>,
}

impl DashboardQuery {
    fn selection(&self, column: Column) -> Option<&str> {
        match column {
            Column::Gender => self.gender.as_deref(),
            Column::City => self.city.as_deref(),
            Column::Country => self.country.as_deref(),
            Column::State => self.state.as_deref(),
            Column::JobTitle => self.job_title.as_deref(),
            Column::CompanyName => self.company_name.as_deref(),
            _ => None,
        }
    }

    /// Filter described by the query.
    #[must_use]
    pub fn filter(&self) -> FilterState {
        let filter = FilterState::new().with_search(self.q.as_deref().unwrap_or_default());
        Column::FACETS.into_iter().fold(filter, |filter, column| {
            match self.selection(column) {
                Some(value) => filter.with_selection(column, value),
                None => filter,
            }
        })
    }

    /// Sort order described by the query.
    #[must_use]
    pub fn sort(&self) -> SortOrder {
        let Some(column) = self.sort.as_deref().and_then(Column::parse) else {
            return SortOrder::default();
        };
        SortOrder {
            column,
            direction: self
                .dir
                .as_deref()
                .and_then(SortDirection::parse)
                .unwrap_or_default(),
        }
    }

    /// Requested 1-based page number.
    #[must_use]
    pub fn page(&self) -> usize {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse().ok())
            .unwrap_or(1)
    }
}

/// Form posted by the export button.
#[derive(Debug, Deserialize)]
pub struct ExportForm {
    /// Dashboard URL to link back to.
    pub return_to: Option<String>,
}

// =============================================================================
// View Types
// =============================================================================

/// Column header with its sort link.
#[derive(Debug, Clone)]
pub struct HeaderView {
    pub label: String,
    /// `None` for columns that cannot be sorted.
    pub sort_url: Option<String>,
    /// `"asc"` / `"desc"` on the active sort column.
    pub sorted: Option<&'static str>,
}

/// One grid row.
#[derive(Debug, Clone)]
pub struct RowView {
    /// Text cells in column order, photo excluded.
    pub cells: Vec<String>,
    /// Photo URL, empty when the row has none.
    pub photo_url: String,
}

/// Numbered pager link.
#[derive(Debug, Clone)]
pub struct PageLink {
    pub number: usize,
    pub url: String,
    pub current: bool,
}

/// Everything the grid template needs.
#[derive(Debug, Clone)]
pub struct DashboardView {
    pub title: String,
    pub table: DataTableConfig,
    pub search: String,
    pub filters_open: bool,
    pub headers: Vec<HeaderView>,
    pub rows: Vec<RowView>,
    pub first_position: usize,
    pub last_position: usize,
    pub visible_count: usize,
    pub total_count: usize,
    pub is_filtered: bool,
    pub page_links: Vec<PageLink>,
    pub prev_url: Option<String>,
    pub next_url: Option<String>,
    /// URL of the view being rendered, posted with the export form.
    pub current_url: String,
    /// Current sort, carried through the filter form.
    pub sort_key: String,
    pub sort_dir: String,
}

/// Dashboard URL for a filter, sort and page. Defaults are left out.
#[must_use]
pub fn dashboard_url(filter: &FilterState, sort: SortOrder, page: usize) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    if !filter.search().is_empty() {
        query.append_pair("q", filter.search());
    }
    for (column, value) in filter.selections() {
        query.append_pair(column.key(), value);
    }
    if sort != SortOrder::default() {
        query.append_pair("sort", sort.column.key());
        query.append_pair("dir", sort.direction.as_str());
    }
    if page > 1 {
        query.append_pair("page", &page.to_string());
    }

    let query = query.finish();
    if query.is_empty() {
        "/dashboard".to_string()
    } else {
        format!("/dashboard?{query}")
    }
}

/// Build the grid view of a loaded table.
///
/// # Errors
///
/// Returns `TableError` if the table is not loaded or was disposed.
pub fn build_view(table: &TableState, page_number: usize) -> Result<DashboardView, TableError> {
    let filter = table.filter();
    let sort = table.sort();
    let page = table.page(page_number)?;

    let config = users_table_config(table.facets()?, filter);
    let headers = config
        .columns
        .iter()
        .map(|table_column| {
            let column = Column::parse(&table_column.key).filter(|_| table_column.sortable);
            let active = column == Some(sort.column);
            HeaderView {
                label: table_column.label.clone(),
                sort_url: column.map(|column| {
                    let direction = if active {
                        sort.direction.toggled()
                    } else {
                        SortDirection::Asc
                    };
                    dashboard_url(filter, SortOrder { column, direction }, 1)
                }),
                sorted: active.then(|| sort.direction.as_str()),
            }
        })
        .collect();

    let rows = page
        .rows
        .iter()
        .map(|record| RowView {
            cells: Column::ALL
                .into_iter()
                .filter(|column| *column != Column::Photo)
                .map(|column| column.value(record).to_string())
                .collect(),
            photo_url: extract_photo_url(&record.photo),
        })
        .collect();

    let first_link = page.number.saturating_sub(PAGE_WINDOW).max(1);
    let last_link = (page.number + PAGE_WINDOW).min(page.page_count);
    let page_links = (first_link..=last_link)
        .map(|number| PageLink {
            number,
            url: dashboard_url(filter, sort, number),
            current: number == page.number,
        })
        .collect();

    Ok(DashboardView {
        title: table.title()?.to_string(),
        table: config,
        search: filter.search().to_string(),
        filters_open: filter.has_selections(),
        headers,
        rows,
        first_position: page.first_position,
        last_position: page.last_position,
        visible_count: page.visible_count,
        total_count: page.total_count,
        is_filtered: page.is_filtered(),
        page_links,
        prev_url: page
            .has_previous()
            .then(|| dashboard_url(filter, sort, page.number - 1)),
        next_url: page
            .has_next()
            .then(|| dashboard_url(filter, sort, page.number + 1)),
        current_url: dashboard_url(filter, sort, page.number),
        sort_key: sort.column.key().to_string(),
        sort_dir: sort.direction.as_str().to_string(),
    })
}

// =============================================================================
// Templates
// =============================================================================

/// Dashboard page template.
///
/// Exactly one of `view`, `error` and `loading` is shown.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub user_name: String,
    pub view: Option<DashboardView>,
    pub error: Option<String>,
    pub loading: bool,
}

impl DashboardTemplate {
    fn ready(user_name: String, view: DashboardView) -> Self {
        Self {
            user_name,
            view: Some(view),
            error: None,
            loading: false,
        }
    }

    fn failed(user_name: String, error: String) -> Self {
        Self {
            user_name,
            view: None,
            error: Some(error),
            loading: false,
        }
    }

    fn loading(user_name: String) -> Self {
        Self {
            user_name,
            view: None,
            error: None,
            loading: true,
        }
    }
}

/// Export result page template.
#[derive(Template, WebTemplate)]
#[template(path = "export.html")]
pub struct ExportTemplate {
    pub user_name: String,
    pub success: bool,
    pub heading: String,
    pub message: String,
    /// Link to the new spreadsheet (success only).
    pub sheet_url: Option<String>,
    pub rows: usize,
    pub back_url: String,
}

/// Only dashboard URLs are accepted as the back link.
fn safe_return_to(return_to: Option<&str>) -> String {
    return_to
        .filter(|url| *url == "/dashboard" || url.starts_with("/dashboard?"))
        .unwrap_or("/dashboard")
        .to_string()
}

/// Query of a dashboard URL, read leniently like the page itself.
fn view_query(url: &str) -> DashboardQuery {
    url.parse::<Uri>()
        .ok()
        .and_then(|uri| Query::<DashboardQuery>::try_from_uri(&uri).ok())
        .map(|Query(query)| query)
        .unwrap_or_default()
}

// =============================================================================
// Route Handlers
// =============================================================================

/// Render the grid.
///
/// # Route
///
/// `GET /dashboard`
#[instrument(skip(state, user, query), fields(grid_id = %user.grid_id))]
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Query(query): Query<DashboardQuery>,
) -> Result<Response, AppError> {
    let table = state.grids().handle(user.grid_id).await;

    match ensure_loaded(state.source(), &table, &user.access_token).await {
        Ok(outcome) => tracing::debug!(?outcome, "Table load checked"),
        Err(LoadError::Fetch(e)) => {
            tracing::warn!(error = %e, "Failed to load records");
            return Ok(
                DashboardTemplate::failed(user.name, format!("Error loading data: {e}"))
                    .into_response(),
            );
        }
        Err(LoadError::Table(TableError::Disposed)) => {
            // Refreshed or signed out concurrently; start over with a new table
            return Ok(Redirect::to("/dashboard").into_response());
        }
        Err(LoadError::Table(e)) => return Err(e.into()),
    }

    let mut guard = table.write().await;
    if !guard.is_ready() {
        // A newer load is still running
        return Ok(DashboardTemplate::loading(user.name).into_response());
    }
    guard.set_filter(query.filter())?;
    guard.set_sort(query.sort())?;
    let guard = guard.downgrade();

    let view = build_view(&guard, query.page())?;
    Ok(DashboardTemplate::ready(user.name, view).into_response())
}

/// Drop the loaded rows so the next render fetches them again.
///
/// # Route
///
/// `POST /dashboard/refresh`
#[instrument(skip(state, user), fields(grid_id = %user.grid_id))]
pub async fn refresh(State(state): State<AppState>, RequireAuth(user): RequireAuth) -> Redirect {
    state.grids().replace(user.grid_id).await;
    Redirect::to("/dashboard")
}

/// Export the rows of the view the form was posted from.
///
/// The view comes from `return_to`, not from the table's last render, so
/// another tab rendering a different filter does not change what is exported.
///
/// # Route
///
/// `POST /dashboard/export`
#[instrument(skip(state, user, form), fields(grid_id = %user.grid_id))]
pub async fn export(
    State(state): State<AppState>,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ExportForm>,
) -> ExportTemplate {
    let back_url = safe_return_to(form.return_to.as_deref());
    let view = view_query(&back_url);

    let result = match state.grids().existing(user.grid_id).await {
        Some(table) => {
            export_visible_rows(
                state.sheets(),
                &table,
                &user.access_token,
                view.filter(),
                view.sort(),
                &export_title(&Local::now()),
                &state.config().export_tab_title,
            )
            .await
        }
        None => Err(ExportError::Table(TableError::NotLoaded)),
    };

    match result {
        Ok(report) => ExportTemplate {
            user_name: user.name,
            success: true,
            heading: "Export Successful".to_string(),
            message: format!("Created \"{}\".", report.title),
            sheet_url: Some(report.url),
            rows: report.rows,
            back_url,
        },
        Err(e) => {
            tracing::warn!(error = %e, "Export failed");
            ExportTemplate {
                user_name: user.name,
                success: false,
                heading: "Export Failed".to_string(),
                message: e.user_message().to_string(),
                sheet_url: None,
                rows: 0,
                back_url,
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use roster_core::UserRecord;

    use super::*;

    fn record(id: usize, gender: &str) -> UserRecord {
        UserRecord {
            id: id.to_string(),
            first_name: format!("User{id}"),
            gender: gender.to_string(),
            photo: format!(r#"<img src="https://x/{id}.png">"#),
            ..UserRecord::default()
        }
    }

    fn loaded(count: usize) -> TableState {
        let mut table = TableState::new();
        let ticket = table.begin_load();
        let records = (1..=count)
            .map(|id| record(id, if id % 2 == 0 { "Female" } else { "Male" }))
            .collect();
        table.set_rows(ticket, records, "Team Roster").unwrap();
        table
    }

    fn query(pairs: &str) -> DashboardQuery {
        let uri: axum::http::Uri = format!("/dashboard?{pairs}").parse().unwrap();
        Query::<DashboardQuery>::try_from_uri(&uri).unwrap().0
    }

    #[test]
    fn test_query_parses_filter_sort_and_page() {
        let query = query("q=ada&gender=Female&city=all&sort=first_name&dir=desc&page=3");

        let filter = query.filter();
        assert_eq!(filter.search(), "ada");
        assert_eq!(filter.selection(Column::Gender), "Female");
        assert_eq!(filter.selection(Column::City), "all");
        assert_eq!(
            query.sort(),
            SortOrder {
                column: Column::FirstName,
                direction: SortDirection::Desc,
            }
        );
        assert_eq!(query.page(), 3);
    }

    #[test]
    fn test_query_is_lenient() {
        let query = query("sort=nope&page=abc&dir=sideways");
        assert_eq!(query.sort(), SortOrder::default());
        assert_eq!(query.page(), 1);
        assert!(query.filter().is_unconstrained());
    }

    #[test]
    fn test_dashboard_url_omits_defaults() {
        assert_eq!(
            dashboard_url(&FilterState::new(), SortOrder::default(), 1),
            "/dashboard"
        );

        let filter = FilterState::new()
            .with_search("ada lovelace")
            .with_selection(Column::JobTitle, "Data Analyst");
        let sort = SortOrder {
            column: Column::City,
            direction: SortDirection::Desc,
        };
        assert_eq!(
            dashboard_url(&filter, sort, 2),
            "/dashboard?q=ada+lovelace&job_title=Data+Analyst&sort=city&dir=desc&page=2"
        );
    }

    #[test]
    fn test_build_view_first_page() {
        let table = loaded(25);
        let view = build_view(&table, 1).unwrap();

        assert_eq!(view.title, "Team Roster");
        assert_eq!(view.rows.len(), 10);
        assert_eq!(view.rows[0].cells[0], "1");
        assert_eq!(view.rows[0].photo_url, "https://x/1.png");
        assert_eq!(view.rows[0].cells.len(), 12);
        assert_eq!((view.first_position, view.last_position), (1, 10));
        assert_eq!(view.total_count, 25);
        assert!(!view.is_filtered);
        assert!(view.prev_url.is_none());
        assert_eq!(view.next_url.as_deref(), Some("/dashboard?page=2"));
        let numbers: Vec<usize> = view.page_links.iter().map(|l| l.number).collect();
        assert_eq!(numbers, [1, 2, 3]);
        assert!(view.page_links[0].current);
    }

    #[test]
    fn test_build_view_applies_filter_and_marks_sort() {
        let mut table = loaded(25);
        table
            .set_filter(FilterState::new().with_selection(Column::Gender, "Female"))
            .unwrap();

        let view = build_view(&table, 9).unwrap();
        assert_eq!(view.visible_count, 12);
        assert!(view.is_filtered);
        assert!(view.filters_open);
        assert_eq!(view.rows.len(), 2);
        assert_eq!((view.first_position, view.last_position), (11, 12));
        assert_eq!(view.current_url, "/dashboard?gender=Female&page=2");

        let id_header = &view.headers[0];
        assert_eq!(id_header.sorted, Some("asc"));
        assert_eq!(
            id_header.sort_url.as_deref(),
            Some("/dashboard?gender=Female&sort=id&dir=desc")
        );
        assert!(view.headers[12].sort_url.is_none());
    }

    #[test]
    fn test_build_view_requires_loaded_table() {
        assert_eq!(
            build_view(&TableState::new(), 1).unwrap_err(),
            TableError::NotLoaded
        );
    }

    #[test]
    fn test_safe_return_to() {
        assert_eq!(safe_return_to(Some("/dashboard?page=2")), "/dashboard?page=2");
        assert_eq!(safe_return_to(Some("https://evil.example")), "/dashboard");
        assert_eq!(safe_return_to(Some("/dashboardx")), "/dashboard");
        assert_eq!(safe_return_to(None), "/dashboard");
    }

    #[test]
    fn test_view_query_reads_back_link() {
        let view = view_query("/dashboard?gender=Female&q=ada&sort=city&dir=desc&page=2");
        assert_eq!(view.filter().selection(Column::Gender), "Female");
        assert_eq!(view.filter().search(), "ada");
        assert_eq!(
            view.sort(),
            SortOrder {
                column: Column::City,
                direction: SortDirection::Desc,
            }
        );

        let plain = view_query("/dashboard");
        assert!(plain.filter().is_unconstrained());
        assert_eq!(plain.sort(), SortOrder::default());
    }

    #[test]
    fn test_export_template_shows_link_only_on_success() {
        let failed = ExportTemplate {
            user_name: "Ada".to_string(),
            success: false,
            heading: "Export Failed".to_string(),
            message: "Permission denied. Nope.".to_string(),
            sheet_url: None,
            rows: 0,
            back_url: "/dashboard".to_string(),
        }
        .render()
        .unwrap();
        assert!(failed.contains("Export Failed"));
        assert!(failed.contains("Permission denied"));
        assert!(!failed.contains("docs.google.com"));

        let ok = ExportTemplate {
            user_name: "Ada".to_string(),
            success: true,
            heading: "Export Successful".to_string(),
            message: "Created.".to_string(),
            sheet_url: Some("https://docs.google.com/spreadsheets/d/new123/edit".to_string()),
            rows: 4,
            back_url: "/dashboard".to_string(),
        }
        .render()
        .unwrap();
        assert!(ok.contains("https://docs.google.com/spreadsheets/d/new123/edit"));
        assert!(ok.contains("target=\"_blank\""));
    }
}
