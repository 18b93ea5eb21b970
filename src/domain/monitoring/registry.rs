//! The view registry: every dashboard view, its panels and their queries.
//!
//! The registry is the single source for the sidebar menu, so a view that
//! is not listed here can never be selected.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::transforms::Transform;

/// Placeholder substituted with the window start expression.
const WINDOW_START: &str = "{window_start}";

/// Identifier of a dashboard view, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewId {
    LiveDashboard,
    CreditUsage,
    LongRunningQueries,
    BytesScanned,
    LocalSpill,
    RemoteSpill,
    WarehouseLoad,
    ClusterConfig,
    QueuedTime,
}

impl ViewId {
    pub const ALL: [ViewId; 9] = [
        ViewId::LiveDashboard,
        ViewId::CreditUsage,
        ViewId::LongRunningQueries,
        ViewId::BytesScanned,
        ViewId::LocalSpill,
        ViewId::RemoteSpill,
        ViewId::WarehouseLoad,
        ViewId::ClusterConfig,
        ViewId::QueuedTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ViewId::LiveDashboard => "live-dashboard",
            ViewId::CreditUsage => "credit-usage",
            ViewId::LongRunningQueries => "long-running-queries",
            ViewId::BytesScanned => "bytes-scanned",
            ViewId::LocalSpill => "local-spill",
            ViewId::RemoteSpill => "remote-spill",
            ViewId::WarehouseLoad => "warehouse-load",
            ViewId::ClusterConfig => "cluster-config",
            ViewId::QueuedTime => "queued-time",
        }
    }

    /// The registry entry for this view.
    pub fn definition(&self) -> &'static ViewDefinition {
        // ALL and REGISTRY share the same order.
        let idx = Self::ALL.iter().position(|v| v == self).unwrap_or(0);
        &REGISTRY[idx]
    }
}

impl fmt::Display for ViewId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown view: {0}")]
pub struct UnknownView(pub String);

impl FromStr for ViewId {
    type Err = UnknownView;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownView(s.to_string()))
    }
}

/// Look-back window a view's queries cover, measured from the warehouse's
/// own `CURRENT_TIMESTAMP()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeWindow {
    /// Last 10 minutes.
    Live,
    /// Last 24 hours.
    Historical,
}

impl TimeWindow {
    pub fn minutes(&self) -> u32 {
        match self {
            TimeWindow::Live => 10,
            TimeWindow::Historical => 24 * 60,
        }
    }

    /// SQL expression for the start of the window.
    pub fn start_expression(&self) -> String {
        match self {
            TimeWindow::Live => "DATEADD('minute', -10, CURRENT_TIMESTAMP())".to_string(),
            TimeWindow::Historical => "DATEADD('hour', -24, CURRENT_TIMESTAMP())".to_string(),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TimeWindow::Live => "Last 10 min",
            TimeWindow::Historical => "Last 24H",
        }
    }
}

/// Where a panel's rows come from.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelSource {
    /// Declarative query over an account-usage view.
    Query(&'static str),
    /// Administrative command executed through a cursor.
    Command(&'static str),
}

impl PanelSource {
    /// Statement text with the window placeholder expanded.
    pub fn render(&self, window: TimeWindow) -> String {
        match self {
            PanelSource::Query(template) => template.replace(WINDOW_START, &window.start_expression()),
            PanelSource::Command(command) => command.to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PanelSource::Query(_) => "query",
            PanelSource::Command(_) => "command",
        }
    }
}

/// One table on a view page.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelDefinition {
    /// Sub-heading shown above the table; `None` for single-panel views.
    pub heading: Option<&'static str>,
    pub source: PanelSource,
    pub transforms: &'static [Transform],
}

/// Drill-down offered by a view: look up one query's text and count a
/// keyword in it.
#[derive(Debug, Clone, PartialEq)]
pub struct DrillDownDefinition {
    pub prompt: &'static str,
    pub template: &'static str,
    pub keyword: &'static str,
}

/// A dashboard view.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewDefinition {
    pub id: ViewId,
    /// Menu label.
    pub title: &'static str,
    /// Page heading.
    pub heading: &'static str,
    pub caption: Option<&'static str>,
    pub window: TimeWindow,
    /// Live views offer a manual refresh.
    pub live: bool,
    pub panels: &'static [PanelDefinition],
    pub drill_down: Option<DrillDownDefinition>,
}

impl ViewDefinition {
    pub fn supports_refresh(&self) -> bool {
        self.live
    }

    pub fn supports_drill_down(&self) -> bool {
        self.drill_down.is_some()
    }
}

/// All views, in menu order.
pub fn registry() -> &'static [ViewDefinition] {
    &REGISTRY
}

const SHOW_WAREHOUSES: &str = "SHOW WAREHOUSES";

static REGISTRY: [ViewDefinition; 9] = [
    ViewDefinition {
        id: ViewId::LiveDashboard,
        title: "Live Dashboard",
        heading: "Live Warehouse & Query Monitoring (Last 10 min)",
        caption: None,
        window: TimeWindow::Live,
        live: true,
        panels: &[
            PanelDefinition {
                heading: Some("Active Queries (Last 10 min)"),
                source: PanelSource::Query(
                    "SELECT QUERY_ID, USER_NAME, WAREHOUSE_NAME, EXECUTION_STATUS, \
                     TOTAL_ELAPSED_TIME / 1000 AS SECONDS_ELAPSED \
                     FROM SNOWFLAKE.ACCOUNT_USAGE.QUERY_HISTORY \
                     WHERE START_TIME >= {window_start} \
                     AND EXECUTION_STATUS IN ('RUNNING', 'QUEUED') \
                     ORDER BY START_TIME DESC",
                ),
                transforms: &[],
            },
            PanelDefinition {
                heading: Some("Warehouse State Snapshot"),
                source: PanelSource::Command(SHOW_WAREHOUSES),
                transforms: &[Transform::Project(&[
                    ("name", "WAREHOUSE_NAME"),
                    ("state", "STATE"),
                    ("size", "SIZE"),
                    ("running", "RUNNING"),
                    ("queued", "QUEUED"),
                    ("scaling_policy", "SCALING_POLICY"),
                ])],
            },
            PanelDefinition {
                heading: Some("Warehouse Load Metrics (Last 10 min)"),
                source: PanelSource::Query(
                    "SELECT WAREHOUSE_NAME, \
                     AVG(AVG_RUNNING) AS AVG_RUNNING, \
                     AVG(AVG_QUEUED_LOAD) AS AVG_QUEUED_LOAD, \
                     AVG(AVG_QUEUED_PROVISIONING) AS AVG_PROVISIONING_TIME \
                     FROM SNOWFLAKE.ACCOUNT_USAGE.WAREHOUSE_LOAD_HISTORY \
                     WHERE START_TIME >= {window_start} \
                     GROUP BY WAREHOUSE_NAME \
                     ORDER BY AVG_QUEUED_LOAD DESC",
                ),
                transforms: &[Transform::SortDescending {
                    column: "AVG_QUEUED_LOAD",
                }],
            },
        ],
        drill_down: None,
    },
    ViewDefinition {
        id: ViewId::CreditUsage,
        title: "Credit Usage Overview",
        heading: "Credit Usage (Last 24H)",
        caption: None,
        window: TimeWindow::Historical,
        live: false,
        panels: &[PanelDefinition {
            heading: None,
            source: PanelSource::Query(
                "SELECT WAREHOUSE_NAME, SUM(CREDITS_USED) AS CREDITS_USED \
                 FROM SNOWFLAKE.ACCOUNT_USAGE.WAREHOUSE_METERING_HISTORY \
                 WHERE START_TIME >= {window_start} \
                 GROUP BY WAREHOUSE_NAME \
                 ORDER BY CREDITS_USED DESC",
            ),
            transforms: &[Transform::SortDescending {
                column: "CREDITS_USED",
            }],
        }],
        drill_down: None,
    },
    ViewDefinition {
        id: ViewId::LongRunningQueries,
        title: "Long-Running Queries",
        heading: "Long-Running Queries (>5 min, Last 24H)",
        caption: None,
        window: TimeWindow::Historical,
        live: false,
        panels: &[PanelDefinition {
            heading: None,
            source: PanelSource::Query(
                "SELECT QUERY_ID, USER_NAME, WAREHOUSE_NAME, \
                 TOTAL_ELAPSED_TIME / 60000 AS MINUTES \
                 FROM SNOWFLAKE.ACCOUNT_USAGE.QUERY_HISTORY \
                 WHERE START_TIME >= {window_start} \
                 AND TOTAL_ELAPSED_TIME >= 300000 \
                 ORDER BY MINUTES DESC",
            ),
            transforms: &[Transform::SortDescending { column: "MINUTES" }],
        }],
        drill_down: Some(DrillDownDefinition {
            prompt: "Query ID to inspect",
            template: "SELECT QUERY_ID, QUERY_TEXT \
                       FROM SNOWFLAKE.ACCOUNT_USAGE.QUERY_HISTORY \
                       WHERE QUERY_ID = ? \
                       LIMIT 1",
            keyword: "JOIN",
        }),
    },
    ViewDefinition {
        id: ViewId::BytesScanned,
        title: "Bytes Scanned & Cache Hit %",
        heading: "Bytes Scanned & Cache Usage (Last 24H)",
        caption: Some(
            "Cache hit % is the share of scanned bytes served from the warehouse cache; \
             queries that scanned nothing show no percentage.",
        ),
        window: TimeWindow::Historical,
        live: false,
        panels: &[PanelDefinition {
            heading: None,
            source: PanelSource::Query(
                "SELECT QUERY_ID, BYTES_SCANNED, \
                 BYTES_SCANNED * PERCENTAGE_SCANNED_FROM_CACHE AS BYTES_FROM_CACHE \
                 FROM SNOWFLAKE.ACCOUNT_USAGE.QUERY_HISTORY \
                 WHERE START_TIME >= {window_start} \
                 ORDER BY BYTES_SCANNED DESC \
                 LIMIT 10",
            ),
            transforms: &[
                Transform::RatioPercent {
                    numerator: "BYTES_FROM_CACHE",
                    denominator: "BYTES_SCANNED",
                    target: "CACHE_HIT_PERCENT",
                },
                Transform::BytesToMegabytes {
                    source: "BYTES_SCANNED",
                    target: "MB_SCANNED",
                },
                Transform::BytesToMegabytes {
                    source: "BYTES_FROM_CACHE",
                    target: "MB_FROM_CACHE",
                },
                Transform::SortDescending {
                    column: "MB_SCANNED",
                },
                Transform::Project(&[
                    ("QUERY_ID", "QUERY_ID"),
                    ("MB_SCANNED", "MB_SCANNED"),
                    ("MB_FROM_CACHE", "MB_FROM_CACHE"),
                    ("CACHE_HIT_PERCENT", "CACHE_HIT_PERCENT"),
                ]),
            ],
        }],
        drill_down: None,
    },
    ViewDefinition {
        id: ViewId::LocalSpill,
        title: "Local Spill Analysis",
        heading: "Top 10 Queries with Local Spill (Last 24H)",
        caption: None,
        window: TimeWindow::Historical,
        live: false,
        panels: &[PanelDefinition {
            heading: None,
            source: PanelSource::Query(
                "SELECT QUERY_ID, USER_NAME, WAREHOUSE_NAME, BYTES_SPILLED_TO_LOCAL_STORAGE \
                 FROM SNOWFLAKE.ACCOUNT_USAGE.QUERY_HISTORY \
                 WHERE START_TIME >= {window_start} \
                 AND BYTES_SPILLED_TO_LOCAL_STORAGE > 0 \
                 ORDER BY BYTES_SPILLED_TO_LOCAL_STORAGE DESC \
                 LIMIT 10",
            ),
            transforms: &[
                Transform::BytesToMegabytes {
                    source: "BYTES_SPILLED_TO_LOCAL_STORAGE",
                    target: "MB_LOCAL_SPILL",
                },
                Transform::SortDescending {
                    column: "MB_LOCAL_SPILL",
                },
                Transform::Project(&[
                    ("QUERY_ID", "QUERY_ID"),
                    ("USER_NAME", "USER_NAME"),
                    ("WAREHOUSE_NAME", "WAREHOUSE_NAME"),
                    ("MB_LOCAL_SPILL", "MB_LOCAL_SPILL"),
                ]),
            ],
        }],
        drill_down: None,
    },
    ViewDefinition {
        id: ViewId::RemoteSpill,
        title: "Remote Spill Analysis",
        heading: "Top 10 Queries with Remote Spill (Last 24H)",
        caption: Some(
            "Remote storage spills are more costly and impact performance: \
             investigate queries and warehouse sizing.",
        ),
        window: TimeWindow::Historical,
        live: false,
        panels: &[PanelDefinition {
            heading: None,
            source: PanelSource::Query(
                "SELECT QUERY_ID, USER_NAME, WAREHOUSE_NAME, BYTES_SPILLED_TO_REMOTE_STORAGE \
                 FROM SNOWFLAKE.ACCOUNT_USAGE.QUERY_HISTORY \
                 WHERE START_TIME >= {window_start} \
                 AND BYTES_SPILLED_TO_REMOTE_STORAGE > 0 \
                 ORDER BY BYTES_SPILLED_TO_REMOTE_STORAGE DESC \
                 LIMIT 10",
            ),
            transforms: &[
                Transform::BytesToMegabytes {
                    source: "BYTES_SPILLED_TO_REMOTE_STORAGE",
                    target: "MB_REMOTE_SPILL",
                },
                Transform::SortDescending {
                    column: "MB_REMOTE_SPILL",
                },
                Transform::Project(&[
                    ("QUERY_ID", "QUERY_ID"),
                    ("USER_NAME", "USER_NAME"),
                    ("WAREHOUSE_NAME", "WAREHOUSE_NAME"),
                    ("MB_REMOTE_SPILL", "MB_REMOTE_SPILL"),
                ]),
            ],
        }],
        drill_down: None,
    },
    ViewDefinition {
        id: ViewId::WarehouseLoad,
        title: "Warehouse Load Summary",
        heading: "Warehouse Load Summary (Last 24H)",
        caption: None,
        window: TimeWindow::Historical,
        live: false,
        panels: &[PanelDefinition {
            heading: None,
            source: PanelSource::Query(
                "SELECT WAREHOUSE_NAME, \
                 AVG(AVG_RUNNING) AS AVG_RUNNING_QUERIES, \
                 AVG(AVG_QUEUED_LOAD) AS AVG_QUEUE_LOAD, \
                 AVG(AVG_QUEUED_PROVISIONING) AS AVG_PROVISIONING_TIME_SECONDS, \
                 AVG(AVG_BLOCKED) AS AVG_BLOCKED_QUERIES \
                 FROM SNOWFLAKE.ACCOUNT_USAGE.WAREHOUSE_LOAD_HISTORY \
                 WHERE START_TIME >= {window_start} \
                 GROUP BY WAREHOUSE_NAME \
                 ORDER BY AVG_QUEUE_LOAD DESC",
            ),
            transforms: &[Transform::SortDescending {
                column: "AVG_QUEUE_LOAD",
            }],
        }],
        drill_down: None,
    },
    ViewDefinition {
        id: ViewId::ClusterConfig,
        title: "Cluster Config (Min/Max)",
        heading: "Warehouse Cluster Min/Max Settings",
        caption: None,
        window: TimeWindow::Live,
        live: true,
        panels: &[PanelDefinition {
            heading: None,
            source: PanelSource::Command(SHOW_WAREHOUSES),
            transforms: &[
                Transform::Project(&[
                    ("name", "WAREHOUSE_NAME"),
                    ("min_cluster_count", "MIN_CLUSTER_COUNT"),
                    ("max_cluster_count", "MAX_CLUSTER_COUNT"),
                    ("scaling_policy", "SCALING_POLICY"),
                    ("state", "STATE"),
                ]),
                Transform::SortDescending {
                    column: "MAX_CLUSTER_COUNT",
                },
            ],
        }],
        drill_down: None,
    },
    ViewDefinition {
        id: ViewId::QueuedTime,
        title: "Queued Time Analysis",
        heading: "Warehouse Queued Time Metrics (Last 24H)",
        caption: None,
        window: TimeWindow::Historical,
        live: false,
        panels: &[PanelDefinition {
            heading: None,
            source: PanelSource::Query(
                "SELECT WAREHOUSE_NAME, \
                 AVG(AVG_RUNNING) AS AVG_RUNNING, \
                 AVG(AVG_QUEUED_LOAD) AS AVG_QUEUE_LOAD, \
                 AVG(AVG_QUEUED_PROVISIONING) AS AVG_PROVISIONING_TIME_SECONDS \
                 FROM SNOWFLAKE.ACCOUNT_USAGE.WAREHOUSE_LOAD_HISTORY \
                 WHERE START_TIME >= {window_start} \
                 GROUP BY WAREHOUSE_NAME \
                 ORDER BY AVG_QUEUE_LOAD DESC",
            ),
            transforms: &[Transform::SortDescending {
                column: "AVG_QUEUE_LOAD",
            }],
        }],
        drill_down: None,
    },
];
