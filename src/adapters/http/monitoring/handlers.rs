//! HTTP handlers for the dashboard.
//!
//! HTML routes serve the browser; `/api` routes return the same pages as
//! JSON. Both go through the application layer handlers.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Json, Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};

use crate::application::handlers::{
    DrillDownHandler, DrillDownQuery, ListViewsHandler, ListViewsQuery, RenderViewHandler,
    RenderViewQuery, DEFAULT_RENDER_BUDGET,
};
use crate::domain::monitoring::{registry, DashboardPage, MonitoringError, ViewId, ViewSummary};
use crate::ports::{PageRenderer, WarehouseConnection};

use super::dto::{DrillDownParams, ErrorResponse, ViewListResponse};

// ════════════════════════════════════════════════════════════════════════════════
// Error Type
// ════════════════════════════════════════════════════════════════════════════════

/// Monitoring API error that implements IntoResponse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MonitoringApiError {
    BadRequest(String),
    NotFound(String),
}

impl MonitoringApiError {
    fn status(&self) -> StatusCode {
        match self {
            MonitoringApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            MonitoringApiError::NotFound(_) => StatusCode::NOT_FOUND,
        }
    }

    fn title(&self) -> &'static str {
        match self {
            MonitoringApiError::BadRequest(_) => "Bad request",
            MonitoringApiError::NotFound(_) => "Not found",
        }
    }

    fn message(&self) -> String {
        match self {
            MonitoringApiError::BadRequest(msg) => msg.clone(),
            MonitoringApiError::NotFound(id) => format!("View not found: {}", id),
        }
    }
}

impl IntoResponse for MonitoringApiError {
    fn into_response(self) -> Response {
        let error = match &self {
            MonitoringApiError::BadRequest(msg) => ErrorResponse::bad_request(msg.clone()),
            MonitoringApiError::NotFound(id) => ErrorResponse::not_found("View", id),
        };
        (self.status(), Json(error)).into_response()
    }
}

impl From<MonitoringError> for MonitoringApiError {
    fn from(error: MonitoringError) -> Self {
        match error {
            MonitoringError::UnknownView(id) => MonitoringApiError::NotFound(id),
            other @ (MonitoringError::RefreshUnsupported(_)
            | MonitoringError::DrillDownUnsupported(_)
            | MonitoringError::InvalidInput(_)) => MonitoringApiError::BadRequest(other.to_string()),
        }
    }
}

/// The same error, rendered as a full HTML page with the menu.
pub struct HtmlError {
    status: StatusCode,
    body: String,
}

impl IntoResponse for HtmlError {
    fn into_response(self) -> Response {
        (self.status, Html(self.body)).into_response()
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Shared state: the one warehouse session, the page renderer and the
/// time a single render may spend in the warehouse.
#[derive(Clone)]
pub struct MonitoringAppState {
    pub connection: Arc<dyn WarehouseConnection>,
    pub renderer: Arc<dyn PageRenderer>,
    pub render_budget: Duration,
}

impl MonitoringAppState {
    pub fn new(connection: Arc<dyn WarehouseConnection>, renderer: Arc<dyn PageRenderer>) -> Self {
        Self {
            connection,
            renderer,
            render_budget: DEFAULT_RENDER_BUDGET,
        }
    }

    pub fn with_render_budget(mut self, budget: Duration) -> Self {
        self.render_budget = budget;
        self
    }

    pub fn list_views_handler(&self) -> ListViewsHandler {
        ListViewsHandler::new()
    }

    pub fn render_view_handler(&self) -> RenderViewHandler {
        RenderViewHandler::new(self.connection.clone()).with_budget(self.render_budget)
    }

    pub fn drill_down_handler(&self) -> DrillDownHandler {
        DrillDownHandler::new(self.connection.clone()).with_budget(self.render_budget)
    }

    fn menu(&self) -> Vec<ViewSummary> {
        self.list_views_handler().handle(ListViewsQuery)
    }

    fn html_page(&self, page: &DashboardPage) -> Html<String> {
        Html(self.renderer.render_page(&self.menu(), page))
    }

    fn html_error(&self, error: MonitoringApiError) -> HtmlError {
        HtmlError {
            status: error.status(),
            body: self
                .renderer
                .render_error(&self.menu(), error.title(), &error.message()),
        }
    }
}

fn parse_view_id(raw: &str) -> Result<ViewId, MonitoringApiError> {
    raw.parse::<ViewId>()
        .map_err(|e| MonitoringApiError::from(MonitoringError::from(e)))
}

async fn render(
    state: &MonitoringAppState,
    raw_id: &str,
    query: fn(ViewId) -> RenderViewQuery,
) -> Result<DashboardPage, MonitoringApiError> {
    let view_id = parse_view_id(raw_id)?;
    let page = state.render_view_handler().handle(query(view_id)).await?;
    Ok(page)
}

async fn drill_down(
    state: &MonitoringAppState,
    raw_id: &str,
    params: DrillDownParams,
) -> Result<DashboardPage, MonitoringApiError> {
    let view_id = parse_view_id(raw_id)?;
    let page = state
        .drill_down_handler()
        .handle(DrillDownQuery {
            view_id,
            query_id: params.query_id,
        })
        .await?;
    Ok(page)
}

// ════════════════════════════════════════════════════════════════════════════════
// HTML Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /
///
/// Redirects to the first view of the menu.
pub async fn index() -> Redirect {
    let first = registry().first().map(|v| v.id).unwrap_or(ViewId::LiveDashboard);
    Redirect::to(&format!("/views/{}", first))
}

/// GET /views/:view_id
pub async fn select_view_page(
    State(state): State<MonitoringAppState>,
    Path(view_id): Path<String>,
) -> Result<Html<String>, HtmlError> {
    render(&state, &view_id, RenderViewQuery::select)
        .await
        .map(|page| state.html_page(&page))
        .map_err(|e| state.html_error(e))
}

/// POST /views/:view_id/refresh
pub async fn refresh_view_page(
    State(state): State<MonitoringAppState>,
    Path(view_id): Path<String>,
) -> Result<Html<String>, HtmlError> {
    render(&state, &view_id, RenderViewQuery::refresh)
        .await
        .map(|page| state.html_page(&page))
        .map_err(|e| state.html_error(e))
}

/// GET /views/:view_id/drilldown?query_id=
pub async fn drill_down_page(
    State(state): State<MonitoringAppState>,
    Path(view_id): Path<String>,
    Query(params): Query<DrillDownParams>,
) -> Result<Html<String>, HtmlError> {
    drill_down(&state, &view_id, params)
        .await
        .map(|page| state.html_page(&page))
        .map_err(|e| state.html_error(e))
}

// ════════════════════════════════════════════════════════════════════════════════
// JSON Handlers
// ════════════════════════════════════════════════════════════════════════════════

/// GET /api/views
pub async fn list_views(State(state): State<MonitoringAppState>) -> Json<ViewListResponse> {
    Json(ViewListResponse {
        views: state.menu(),
    })
}

/// GET /api/views/:view_id
pub async fn get_view(
    State(state): State<MonitoringAppState>,
    Path(view_id): Path<String>,
) -> Result<Json<DashboardPage>, MonitoringApiError> {
    render(&state, &view_id, RenderViewQuery::select).await.map(Json)
}

/// POST /api/views/:view_id/refresh
pub async fn refresh_view(
    State(state): State<MonitoringAppState>,
    Path(view_id): Path<String>,
) -> Result<Json<DashboardPage>, MonitoringApiError> {
    render(&state, &view_id, RenderViewQuery::refresh).await.map(Json)
}

/// GET /api/views/:view_id/drilldown?query_id=
pub async fn get_drill_down(
    State(state): State<MonitoringAppState>,
    Path(view_id): Path<String>,
    Query(params): Query<DrillDownParams>,
) -> Result<Json<DashboardPage>, MonitoringApiError> {
    drill_down(&state, &view_id, params).await.map(Json)
}

/// GET /health
pub async fn health() -> &'static str {
    "ok"
}
