//! HTTP adapters - browser pages and JSON endpoints.

pub mod monitoring;

pub use monitoring::{monitoring_routes, HtmlPageRenderer, MonitoringAppState};

use std::time::Duration;

use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::application::handlers::render_budget;

/// Full application router: dashboard routes plus request tracing,
/// a per-request timeout and response compression.
///
/// The render budget is capped below `request_timeout` so slow panels
/// become inline timeout errors before the request itself is cut off.
pub fn app_router(state: MonitoringAppState, request_timeout: Duration) -> Router {
    let budget = state.render_budget.min(render_budget(request_timeout));
    monitoring_routes(state.with_render_budget(budget))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CompressionLayer::new())
}
