//! Rendered page model.
//!
//! One render pass of a view produces a [`DashboardPage`]. Renderers (HTML,
//! JSON) consume it; nothing in it outlives the request that built it.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::registry::{TimeWindow, ViewDefinition, ViewId};
use super::table::QueryResult;

/// Menu entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewSummary {
    pub id: ViewId,
    pub title: String,
    pub live: bool,
}

impl From<&ViewDefinition> for ViewSummary {
    fn from(view: &ViewDefinition) -> Self {
        Self {
            id: view.id,
            title: view.title.to_string(),
            live: view.live,
        }
    }
}

/// Outcome of a drill-down lookup.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum DrillDownOutcome {
    #[serde(rename_all = "camelCase")]
    Found {
        query_id: String,
        query_text: String,
        keyword: String,
        keyword_count: usize,
    },
    #[serde(rename_all = "camelCase")]
    NotFound { query_id: String },
}

/// A block of page content, in display order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum PageBlock {
    /// A result table. Empty tables are still tables.
    Table {
        heading: Option<String>,
        table: QueryResult,
    },
    /// A panel whose statement failed; the rest of the page still renders.
    Error {
        heading: Option<String>,
        message: String,
    },
    Caption { text: String },
    DrillDown(DrillDownOutcome),
}

/// Everything a renderer needs for one view.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardPage {
    pub view: ViewSummary,
    pub heading: String,
    pub window: TimeWindow,
    pub refreshable: bool,
    /// Label of the drill-down input, when the view has one.
    pub drill_down_prompt: Option<String>,
    pub blocks: Vec<PageBlock>,
    pub rendered_at: DateTime<Utc>,
}

impl DashboardPage {
    /// Empty page for `view`; blocks are appended by the dispatcher.
    pub fn for_view(view: &ViewDefinition) -> Self {
        Self {
            view: view.into(),
            heading: view.heading.to_string(),
            window: view.window,
            refreshable: view.supports_refresh(),
            drill_down_prompt: view.drill_down.as_ref().map(|d| d.prompt.to_string()),
            blocks: Vec::new(),
            rendered_at: Utc::now(),
        }
    }

    pub fn push(&mut self, block: PageBlock) {
        self.blocks.push(block);
    }

    pub fn tables(&self) -> impl Iterator<Item = &QueryResult> {
        self.blocks.iter().filter_map(|b| match b {
            PageBlock::Table { table, .. } => Some(table),
            _ => None,
        })
    }

    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.blocks.iter().filter_map(|b| match b {
            PageBlock::Error { message, .. } => Some(message.as_str()),
            _ => None,
        })
    }

    pub fn drill_down(&self) -> Option<&DrillDownOutcome> {
        self.blocks.iter().find_map(|b| match b {
            PageBlock::DrillDown(outcome) => Some(outcome),
            _ => None,
        })
    }
}
