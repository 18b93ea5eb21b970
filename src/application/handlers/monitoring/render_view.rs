//! RenderViewHandler - executes every panel of a view and post-processes
//! the results into a page.
//!
//! Serves both `selectView` and `refresh`: a refresh re-executes the whole
//! view from scratch, exactly like a fresh selection.
//!
//! Panels run one after another under a single render budget. A panel that
//! is still running when the budget runs out becomes an inline timeout
//! error, and panels after it are not started.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::{timeout, Instant};
use tracing::{debug, warn};

use crate::domain::monitoring::{
    apply_all, DashboardPage, MonitoringError, PageBlock, PanelDefinition, PanelSource,
    QueryResult, ViewDefinition, ViewId,
};
use crate::ports::{Statement, WarehouseConnection, WarehouseError};

use super::{budget_exceeded, run_command, DEFAULT_RENDER_BUDGET};

/// What caused the render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderTrigger {
    /// The view was picked from the menu.
    Select,
    /// The refresh button of a live view was pressed.
    Refresh,
}

/// Query to render one view.
#[derive(Debug, Clone)]
pub struct RenderViewQuery {
    pub view_id: ViewId,
    pub trigger: RenderTrigger,
}

impl RenderViewQuery {
    pub fn select(view_id: ViewId) -> Self {
        Self {
            view_id,
            trigger: RenderTrigger::Select,
        }
    }

    pub fn refresh(view_id: ViewId) -> Self {
        Self {
            view_id,
            trigger: RenderTrigger::Refresh,
        }
    }
}

/// Result of a render.
pub type RenderViewResult = DashboardPage;

/// Handler for selecting or refreshing a view.
pub struct RenderViewHandler {
    connection: Arc<dyn WarehouseConnection>,
    budget: Duration,
}

impl RenderViewHandler {
    pub fn new(connection: Arc<dyn WarehouseConnection>) -> Self {
        Self {
            connection,
            budget: DEFAULT_RENDER_BUDGET,
        }
    }

    /// Total time all panels of one render may take together.
    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub async fn handle(&self, query: RenderViewQuery) -> Result<RenderViewResult, MonitoringError> {
        let view = query.view_id.definition();
        if query.trigger == RenderTrigger::Refresh && !view.supports_refresh() {
            return Err(MonitoringError::RefreshUnsupported(view.id));
        }

        debug!(view = %view.id, trigger = ?query.trigger, "Rendering view");
        Ok(self.render(view).await)
    }

    async fn render(&self, view: &ViewDefinition) -> DashboardPage {
        let mut page = DashboardPage::for_view(view);
        let deadline = Instant::now() + self.budget;
        for panel in view.panels {
            let heading = panel.heading.map(str::to_string);
            let remaining = deadline.saturating_duration_since(Instant::now());
            let outcome = if remaining.is_zero() {
                Err(budget_exceeded(self.budget))
            } else {
                timeout(remaining, self.run_panel(view, panel))
                    .await
                    .unwrap_or_else(|_| Err(budget_exceeded(self.budget)))
            };
            let block = match outcome {
                Ok(table) => PageBlock::Table { heading, table },
                Err(err) => {
                    warn!(view = %view.id, source = panel.source.kind(), error = %err, "Panel failed");
                    PageBlock::Error {
                        heading,
                        message: err.to_string(),
                    }
                }
            };
            page.push(block);
        }
        if let Some(caption) = view.caption {
            page.push(PageBlock::Caption {
                text: caption.to_string(),
            });
        }
        page
    }

    async fn run_panel(
        &self,
        view: &ViewDefinition,
        panel: &PanelDefinition,
    ) -> Result<QueryResult, WarehouseError> {
        let text = panel.source.render(view.window);
        let raw = match panel.source {
            PanelSource::Query(_) => {
                self.connection
                    .execute_query(&Statement::new(text))
                    .await?
            }
            PanelSource::Command(_) => run_command(self.connection.as_ref(), &text).await?,
        };
        debug!(
            view = %view.id,
            source = panel.source.kind(),
            rows = raw.row_count(),
            "Panel statement finished"
        );
        Ok(apply_all(raw, panel.transforms))
    }
}
