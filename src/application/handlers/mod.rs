//! Application handlers.
//!
//! Query handlers that orchestrate domain operations over the ports.

pub mod monitoring;

pub use monitoring::{
    render_budget, run_command, DrillDownHandler, DrillDownQuery, DrillDownResult, ListViewsHandler,
    ListViewsQuery, ListViewsResult, RenderTrigger, RenderViewHandler, RenderViewQuery,
    RenderViewResult, DEFAULT_RENDER_BUDGET,
};
