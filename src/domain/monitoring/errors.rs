//! Errors raised while dispatching dashboard commands.
//!
//! Statement failures are not here: they are rendered inline on the page
//! (see [`super::PageBlock::Error`]).

use thiserror::Error;

use super::registry::ViewId;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MonitoringError {
    #[error("Unknown view: {0}")]
    UnknownView(String),

    #[error("View {0} has no refresh action")]
    RefreshUnsupported(ViewId),

    #[error("View {0} has no drill-down")]
    DrillDownUnsupported(ViewId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<super::registry::UnknownView> for MonitoringError {
    fn from(err: super::registry::UnknownView) -> Self {
        MonitoringError::UnknownView(err.0)
    }
}
