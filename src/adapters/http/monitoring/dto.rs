//! Data Transfer Objects for the monitoring JSON endpoints.
//!
//! Pages serialize directly from the domain [`DashboardPage`]; only the
//! envelopes live here.
//!
//! [`DashboardPage`]: crate::domain::monitoring::DashboardPage

use serde::{Deserialize, Serialize};

use crate::domain::monitoring::ViewSummary;

/// Response for `GET /api/views`.
#[derive(Debug, Clone, Serialize)]
pub struct ViewListResponse {
    pub views: Vec<ViewSummary>,
}

/// Query string of the drill-down endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct DrillDownParams {
    #[serde(default)]
    pub query_id: String,
}

/// Standard error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self {
            code: "BAD_REQUEST".to_string(),
            message: message.into(),
        }
    }

    pub fn not_found(resource_type: &str, id: &str) -> Self {
        Self {
            code: "NOT_FOUND".to_string(),
            message: format!("{} not found: {}", resource_type, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_response_serializes() {
        let json = serde_json::to_value(ErrorResponse::not_found("View", "nope")).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["message"], "View not found: nope");
    }

    #[test]
    fn drill_down_params_default_to_empty() {
        let params: DrillDownParams = serde_json::from_str("{}").unwrap();
        assert!(params.query_id.is_empty());
    }
}
