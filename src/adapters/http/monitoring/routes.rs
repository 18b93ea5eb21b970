//! HTTP routes for the dashboard.

use axum::routing::{get, post};
use axum::Router;

use super::handlers::{
    drill_down_page, get_drill_down, get_view, health, index, list_views, refresh_view,
    refresh_view_page, select_view_page, MonitoringAppState,
};

/// Creates the dashboard router with all routes.
pub fn monitoring_routes(state: MonitoringAppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        // Browser pages
        .route("/views/:view_id", get(select_view_page))
        .route("/views/:view_id/refresh", post(refresh_view_page))
        .route("/views/:view_id/drilldown", get(drill_down_page))
        // JSON mirror
        .route("/api/views", get(list_views))
        .route("/api/views/:view_id", get(get_view))
        .route("/api/views/:view_id/refresh", post(refresh_view))
        .route("/api/views/:view_id/drilldown", get(get_drill_down))
        .with_state(state)
}
