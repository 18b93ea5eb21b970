//! Monitoring query handlers.
//!
//! Read-only handlers behind the dashboard's command contract:
//! `listViews`, `selectView` / `refresh` and `submitDrilldown`.

mod drill_down;
mod list_views;
mod render_view;

pub use drill_down::{DrillDownHandler, DrillDownQuery, DrillDownResult};
pub use list_views::{ListViewsHandler, ListViewsQuery, ListViewsResult};
pub use render_view::{RenderTrigger, RenderViewHandler, RenderViewQuery, RenderViewResult};

use std::time::Duration;

use crate::domain::monitoring::QueryResult;
use crate::ports::{WarehouseConnection, WarehouseError};

/// Render budget used when none is configured.
pub const DEFAULT_RENDER_BUDGET: Duration = Duration::from_secs(110);

/// Upper bound on the time kept back from the request timeout for
/// rendering and writing the page.
const MAX_RESPONSE_HEADROOM: Duration = Duration::from_secs(5);

/// Render budget that fits inside an HTTP request timeout: a fifth of
/// the timeout, at most five seconds, is kept back.
pub fn render_budget(request_timeout: Duration) -> Duration {
    let headroom = (request_timeout / 5).min(MAX_RESPONSE_HEADROOM);
    request_timeout.saturating_sub(headroom)
}

/// Error shown for a panel cut off by the render budget.
pub(crate) fn budget_exceeded(budget: Duration) -> WarehouseError {
    WarehouseError::Timeout {
        timeout_secs: budget.as_millis().div_ceil(1000) as u64,
    }
}

/// Runs an administrative command through a cursor and converts its rows
/// and column descriptors into a [`QueryResult`].
///
/// The cursor is closed on every path, including failures.
pub async fn run_command(
    connection: &dyn WarehouseConnection,
    command: &str,
) -> Result<QueryResult, WarehouseError> {
    let mut cursor = connection.cursor().await?;
    let outcome = async {
        cursor.execute(command).await?;
        let rows = cursor.fetch_all().await?;
        let names = cursor.description().iter().map(|c| c.name.clone()).collect();
        Ok::<_, WarehouseError>(QueryResult::from_named_rows(names, rows))
    }
    .await;
    cursor.close().await;
    outcome
}
