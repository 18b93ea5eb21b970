//! DrillDownHandler - looks up one prior query and counts a keyword in its
//! text as a rough complexity signal.
//!
//! Only the lookup runs; the view's own panels are not re-executed.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use crate::domain::monitoring::{
    count_token, DashboardPage, DrillDownDefinition, DrillDownOutcome, MonitoringError, PageBlock,
    ViewId,
};
use crate::ports::{Statement, WarehouseConnection};

use super::{budget_exceeded, DEFAULT_RENDER_BUDGET};

/// Upper bound on accepted query identifiers.
const MAX_QUERY_ID_LEN: usize = 128;

/// Query to drill into one warehouse query.
#[derive(Debug, Clone)]
pub struct DrillDownQuery {
    pub view_id: ViewId,
    /// Raw user input.
    pub query_id: String,
}

/// Result of a drill-down.
pub type DrillDownResult = DashboardPage;

/// Handler for `submitDrilldown`.
pub struct DrillDownHandler {
    connection: Arc<dyn WarehouseConnection>,
    budget: Duration,
}

impl DrillDownHandler {
    pub fn new(connection: Arc<dyn WarehouseConnection>) -> Self {
        Self {
            connection,
            budget: DEFAULT_RENDER_BUDGET,
        }
    }

    /// Time the lookup may take before it is reported as timed out.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub async fn handle(&self, query: DrillDownQuery) -> Result<DrillDownResult, MonitoringError> {
        let view = query.view_id.definition();
        let definition = view
            .drill_down
            .as_ref()
            .ok_or(MonitoringError::DrillDownUnsupported(view.id))?;
        let query_id = validate_query_id(&query.query_id)?;

        let mut page = DashboardPage::for_view(view);
        match self.lookup(definition, query_id).await {
            Ok(outcome) => page.push(PageBlock::DrillDown(outcome)),
            Err(message) => page.push(PageBlock::Error {
                heading: Some(format!("Query {}", query_id)),
                message,
            }),
        }
        Ok(page)
    }

    async fn lookup(
        &self,
        definition: &DrillDownDefinition,
        query_id: &str,
    ) -> Result<DrillDownOutcome, String> {
        let statement = Statement::new(definition.template).bind(query_id);
        let result = timeout(self.budget, self.connection.execute_query(&statement))
            .await
            .unwrap_or_else(|_| Err(budget_exceeded(self.budget)))
            .map_err(|err| {
                warn!(query_id, error = %err, "Drill-down lookup failed");
                err.to_string()
            })?;

        if result.is_empty() {
            debug!(query_id, "Drill-down found no matching query");
            return Ok(DrillDownOutcome::NotFound {
                query_id: query_id.to_string(),
            });
        }

        let query_text = result
            .cell(0, "QUERY_TEXT")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();
        let keyword_count = count_token(&query_text, definition.keyword);
        Ok(DrillDownOutcome::Found {
            query_id: query_id.to_string(),
            query_text,
            keyword: definition.keyword.to_string(),
            keyword_count,
        })
    }
}

/// Trims the input and checks it looks like a warehouse query identifier.
fn validate_query_id(raw: &str) -> Result<&str, MonitoringError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(MonitoringError::InvalidInput(
            "Query ID must not be empty".to_string(),
        ));
    }
    if trimmed.len() > MAX_QUERY_ID_LEN {
        return Err(MonitoringError::InvalidInput(format!(
            "Query ID must be at most {} characters",
            MAX_QUERY_ID_LEN
        )));
    }
    if !trimmed.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(MonitoringError::InvalidInput(
            "Query ID may only contain letters, digits and dashes".to_string(),
        ));
    }
    Ok(trimmed)
}
