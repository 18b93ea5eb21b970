//! Page renderer port - turns a rendered view into a browser document.

use crate::domain::monitoring::{DashboardPage, ViewSummary};

/// Renders one dashboard page next to the view menu.
pub trait PageRenderer: Send + Sync {
    /// Full document for `page`, with `menu` as the sidebar.
    fn render_page(&self, menu: &[ViewSummary], page: &DashboardPage) -> String;

    /// Document for a request that could not be served at all.
    fn render_error(&self, menu: &[ViewSummary], title: &str, message: &str) -> String;
}
