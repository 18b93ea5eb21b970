//! Monitoring HTTP adapter module.
//!
//! Serves the dashboard as HTML pages plus a JSON mirror of the same
//! commands.

pub mod dto;
pub mod handlers;
pub mod render;
pub mod routes;

pub use dto::ErrorResponse;
pub use handlers::{MonitoringApiError, MonitoringAppState};
pub use render::HtmlPageRenderer;
pub use routes::monitoring_routes;
