//! Integration tests for the dashboard HTTP surface.
//!
//! These tests drive the full router (with its tower layers) against the
//! in-process mock warehouse:
//! 1. The menu is exactly the view registry
//! 2. Views execute, post-process and render their results
//! 3. Refresh, drill-down and error routes behave per view kind

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;

use warehouse_monitor::adapters::http::{app_router, HtmlPageRenderer, MonitoringAppState};
use warehouse_monitor::adapters::warehouse::MockWarehouse;
use warehouse_monitor::domain::monitoring::{registry, Column, ColumnType, QueryResult};
use warehouse_monitor::ports::WarehouseError;

// =============================================================================
// Test Infrastructure
// =============================================================================

fn app(warehouse: &MockWarehouse) -> Router {
    let state = MonitoringAppState::new(
        Arc::new(warehouse.clone()),
        Arc::new(HtmlPageRenderer::new()),
    );
    app_router(state, Duration::from_secs(30))
}

async fn send(app: Router, method: &str, uri: &str) -> (StatusCode, String) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
}

async fn send_json(app: Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let (status, body) = send(app, method, uri).await;
    (status, serde_json::from_str(&body).unwrap())
}

fn credit_rows() -> QueryResult {
    QueryResult::new(
        vec![
            Column::new("WAREHOUSE_NAME", ColumnType::Text),
            Column::new("CREDITS_USED", ColumnType::Integer),
        ],
        vec![
            vec!["WH2".into(), 5i64.into()],
            vec!["WH1".into(), 10i64.into()],
        ],
    )
}

// =============================================================================
// Menu
// =============================================================================

#[tokio::test]
async fn menu_lists_exactly_the_registry() {
    let warehouse = MockWarehouse::new();
    let (status, json) = send_json(app(&warehouse), "GET", "/api/views").await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = json["views"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v["id"].as_str().unwrap())
        .collect();
    let expected: Vec<&str> = registry().iter().map(|v| v.id.as_str()).collect();
    assert_eq!(ids, expected);
    assert!(warehouse.executed_statements().is_empty());
}

#[tokio::test]
async fn root_redirects_to_first_view() {
    let warehouse = MockWarehouse::new();
    let response = app(&warehouse)
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        response.headers().get("location").unwrap(),
        "/views/live-dashboard"
    );
}

#[tokio::test]
async fn health_is_ok() {
    let (status, body) = send(app(&MockWarehouse::new()), "GET", "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");
}

// =============================================================================
// Views
// =============================================================================

#[tokio::test]
async fn credit_usage_is_sorted_descending() {
    let warehouse = MockWarehouse::new().with_query("WAREHOUSE_METERING_HISTORY", credit_rows());
    let (status, json) = send_json(app(&warehouse), "GET", "/api/views/credit-usage").await;

    assert_eq!(status, StatusCode::OK);
    let block = &json["blocks"][0];
    assert_eq!(block["kind"], "table");
    assert_eq!(block["table"]["rows"][0][0], "WH1");
    assert_eq!(block["table"]["rows"][0][1], 10);
    assert_eq!(block["table"]["rows"][1][0], "WH2");
    assert_eq!(block["table"]["rows"][1][1], 5);
}

#[tokio::test]
async fn empty_result_renders_table_with_no_rows() {
    let warehouse = MockWarehouse::new();
    let (status, html) = send(app(&warehouse), "GET", "/views/local-spill").await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("No rows returned"));
}

#[tokio::test]
async fn query_error_is_inline_and_menu_still_renders() {
    let warehouse = MockWarehouse::new().with_query_error(
        "QUERY_HISTORY",
        WarehouseError::PermissionDenied("ACCOUNT_USAGE".to_string()),
    );
    let (status, html) = send(app(&warehouse), "GET", "/views/long-running-queries").await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("Permission denied: ACCOUNT_USAGE"));
    assert!(html.contains("href=\"/views/queued-time\""));
}

#[tokio::test]
async fn refresh_button_only_on_live_views() {
    let warehouse = MockWarehouse::new();
    for view in registry() {
        let uri = format!("/views/{}", view.id);
        let (status, html) = send(app(&warehouse), "GET", &uri).await;
        assert_eq!(status, StatusCode::OK);
        let has_refresh = html.contains(&format!("/views/{}/refresh", view.id));
        assert_eq!(has_refresh, view.live, "view {}", view.id);
    }
}

#[tokio::test]
async fn unknown_view_is_not_found() {
    let warehouse = MockWarehouse::new();
    let (status, json) = send_json(app(&warehouse), "GET", "/api/views/no-such-view").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["code"], "NOT_FOUND");

    let (status, html) = send(app(&warehouse), "GET", "/views/no-such-view").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(html.contains("View not found: no-such-view"));
}

#[tokio::test]
async fn slow_warehouse_renders_timeouts_inline_before_request_timeout() {
    let warehouse = MockWarehouse::new().with_latency(Duration::from_millis(600));
    let state = MonitoringAppState::new(
        Arc::new(warehouse.clone()),
        Arc::new(HtmlPageRenderer::new()),
    );
    let app = app_router(state, Duration::from_secs(1));

    let (status, html) = send(app, "GET", "/views/live-dashboard").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(html.matches("<li").count(), registry().len());
    assert_eq!(html.matches("<table>").count(), 1);
    assert_eq!(
        html.matches("<div class=\"error\">Statement did not finish within 1s</div>")
            .count(),
        2
    );
}

// =============================================================================
// Refresh
// =============================================================================

#[tokio::test]
async fn refresh_reruns_live_view() {
    let warehouse = MockWarehouse::new();
    let (status, _) = send(app(&warehouse), "POST", "/views/live-dashboard/refresh").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(warehouse.executed_statements().len(), 2);
    assert_eq!(warehouse.executed_commands(), vec!["SHOW WAREHOUSES".to_string()]);
    assert_eq!(warehouse.cursors_closed(), 1);
}

#[tokio::test]
async fn refresh_of_historical_view_is_bad_request() {
    let warehouse = MockWarehouse::new();
    let (status, json) = send_json(app(&warehouse), "POST", "/api/views/credit-usage/refresh").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["code"], "BAD_REQUEST");
    assert!(warehouse.executed_statements().is_empty());
}

// =============================================================================
// Drill-down
// =============================================================================

#[tokio::test]
async fn drill_down_counts_joins() {
    let row = QueryResult::new(
        vec![
            Column::new("QUERY_ID", ColumnType::Text),
            Column::new("QUERY_TEXT", ColumnType::Text),
        ],
        vec![vec![
            "01b2-aaaa".into(),
            "select * from a join b on a.id = b.id join c on c.id = a.id".into(),
        ]],
    );
    let warehouse = MockWarehouse::new().with_query("QUERY_TEXT", row);
    let (status, json) = send_json(
        app(&warehouse),
        "GET",
        "/api/views/long-running-queries/drilldown?query_id=01b2-aaaa",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let block = &json["blocks"][0];
    assert_eq!(block["kind"], "drillDown");
    assert_eq!(block["status"], "found");
    assert_eq!(block["keywordCount"], 2);
}

#[tokio::test]
async fn drill_down_not_found_is_informative() {
    let warehouse = MockWarehouse::new();
    let (status, html) = send(
        app(&warehouse),
        "GET",
        "/views/long-running-queries/drilldown?query_id=missing-1",
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(html.contains("No query found with ID missing-1."));
    assert_eq!(warehouse.executed_statements()[0].bindings(), &["missing-1".to_string()]);
}

#[tokio::test]
async fn drill_down_rejects_malformed_ids() {
    let warehouse = MockWarehouse::new();
    let (status, _) = send_json(
        app(&warehouse),
        "GET",
        "/api/views/long-running-queries/drilldown?query_id=a%27%3B%20drop",
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(warehouse.executed_statements().is_empty());
}
