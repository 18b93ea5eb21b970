//! ListViewsHandler - the sidebar menu.

use crate::domain::monitoring::{registry, ViewSummary};

/// Query for the view menu.
#[derive(Debug, Clone, Default)]
pub struct ListViewsQuery;

/// Menu entries, in registry order.
pub type ListViewsResult = Vec<ViewSummary>;

/// Handler for listing selectable views.
///
/// The menu is built from the registry itself, so every option resolves to
/// exactly one view definition.
#[derive(Debug, Clone, Default)]
pub struct ListViewsHandler;

impl ListViewsHandler {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, _query: ListViewsQuery) -> ListViewsResult {
        registry().iter().map(ViewSummary::from).collect()
    }
}
