//! Monitoring domain: the view registry, tabular results, post-processing
//! and the page model a render pass produces.

pub mod errors;
pub mod page;
pub mod registry;
pub mod table;
pub mod transforms;

pub use errors::MonitoringError;
pub use page::{DashboardPage, DrillDownOutcome, PageBlock, ViewSummary};
pub use registry::{
    registry, DrillDownDefinition, PanelDefinition, PanelSource, TimeWindow, UnknownView,
    ViewDefinition, ViewId,
};
pub use table::{CellValue, Column, ColumnType, QueryResult};
pub use transforms::{apply_all, bytes_to_megabytes, count_token, ratio_percent, sort_descending, Transform};
