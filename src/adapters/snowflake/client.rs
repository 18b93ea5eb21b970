//! SQL API client - implements `WarehouseConnection` over HTTPS.
//!
//! Every statement is submitted with the configured session context
//! (warehouse, database, schema, role). Long-running statements answer
//! `202 Accepted` and are polled by handle until they finish or the
//! statement timeout elapses, in which case they are cancelled.
//!
//! # Example
//!
//! ```ignore
//! let credential = KeyPairCredential::from_file("rsa_key.p8", None)?;
//! let connection = SnowflakeConnection::connect(settings, &credential).await?;
//! let result = connection.execute_query(&Statement::new("SELECT 1")).await?;
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use tokio::time::sleep;
use uuid::Uuid;

use super::jwt::{KeyPairAuthenticator, TOKEN_TYPE};
use super::result_set::{into_query_result, StatementResponse};
use super::KeyPairCredential;
use crate::config::AppConfig;
use crate::domain::monitoring::{CellValue, QueryResult};
use crate::ports::{
    AuthError, ColumnDescriptor, CommandCursor, ConnectionError, Statement, WarehouseConnection,
    WarehouseError,
};

/// Statement used to verify a fresh connection.
const PING_STATEMENT: &str = "SELECT CURRENT_TIMESTAMP()";

/// Error code the warehouse reports for missing privileges.
const INSUFFICIENT_PRIVILEGES: &str = "003001";

/// Everything needed to open a session.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    pub base_url: String,
    pub account: String,
    pub user: String,
    pub warehouse: String,
    pub database: String,
    pub schema: String,
    pub role: String,
    pub statement_timeout: Duration,
    pub poll_interval: Duration,
}

impl ConnectionSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        let credentials = &config.credentials;
        Self {
            base_url: config.connector.base_url_for(&credentials.account),
            account: credentials.account.clone(),
            user: credentials.user.clone(),
            warehouse: credentials.warehouse.clone(),
            database: credentials.database.clone(),
            schema: credentials.schema.clone(),
            role: credentials.role.clone(),
            statement_timeout: config.connector.statement_timeout(),
            poll_interval: config.connector.poll_interval(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StatementRequest<'a> {
    statement: &'a str,
    timeout: u64,
    warehouse: &'a str,
    database: &'a str,
    schema: &'a str,
    role: &'a str,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    bindings: BTreeMap<String, Binding<'a>>,
}

#[derive(Debug, Serialize)]
struct Binding<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    value: &'a str,
}

/// Outcome of a submission or poll.
enum Progress {
    Complete(StatementResponse),
    Running(String),
}

struct ClientInner {
    http: Client,
    settings: ConnectionSettings,
    auth: KeyPairAuthenticator,
}

/// Authenticated warehouse session.
#[derive(Clone)]
pub struct SnowflakeConnection {
    inner: Arc<ClientInner>,
}

impl SnowflakeConnection {
    /// Opens a session and verifies it with a trivial statement.
    ///
    /// # Errors
    ///
    /// - `AuthError::Credential` if no token can be signed with the key
    /// - `AuthError::Connection` if the warehouse rejects the token or
    ///   cannot be reached
    pub async fn connect(
        settings: ConnectionSettings,
        credential: &KeyPairCredential,
    ) -> Result<Self, AuthError> {
        let auth = KeyPairAuthenticator::new(&settings.account, &settings.user, credential)?;
        let http = Client::builder()
            .timeout(settings.statement_timeout + settings.poll_interval * 4)
            .build()
            .map_err(|e| ConnectionError::InvalidSettings(e.to_string()))?;

        let connection = Self {
            inner: Arc::new(ClientInner {
                http,
                settings,
                auth,
            }),
        };

        connection
            .execute_query(&Statement::new(PING_STATEMENT))
            .await
            .map_err(connection_error)?;

        tracing::info!(
            subject = connection.inner.auth.subject(),
            warehouse = %connection.inner.settings.warehouse,
            role = %connection.inner.settings.role,
            "Connected to warehouse"
        );
        Ok(connection)
    }
}

fn connection_error(err: WarehouseError) -> AuthError {
    let err = match err {
        WarehouseError::Network(message) => ConnectionError::Network(message),
        WarehouseError::Timeout { timeout_secs } => {
            ConnectionError::Network(format!("No response within {}s", timeout_secs))
        }
        other => ConnectionError::Rejected(other.to_string()),
    };
    AuthError::Connection(err)
}

impl ClientInner {
    fn statements_url(&self) -> String {
        format!("{}/api/v2/statements", self.settings.base_url)
    }

    fn handle_url(&self, handle: &str) -> String {
        format!("{}/{}", self.statements_url(), handle)
    }

    async fn authorized(&self, request: RequestBuilder) -> Result<RequestBuilder, WarehouseError> {
        let token = self.auth.bearer_token().await?;
        Ok(request
            .bearer_auth(token)
            .header("X-Snowflake-Authorization-Token-Type", TOKEN_TYPE)
            .header("Accept", "application/json"))
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, WarehouseError> {
        let timeout_secs = self.settings.statement_timeout.as_secs();
        self.authorized(request)
            .await?
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WarehouseError::Timeout { timeout_secs }
                } else if e.is_connect() {
                    WarehouseError::network(format!("Connection failed: {}", e))
                } else {
                    WarehouseError::network(e.to_string())
                }
            })
    }

    /// Maps status codes onto progress or errors.
    async fn read_progress(&self, response: Response) -> Result<Progress, WarehouseError> {
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| WarehouseError::network(e.to_string()))?;
        let parsed = serde_json::from_str::<StatementResponse>(&body);

        match status {
            200 => parsed
                .map(Progress::Complete)
                .map_err(|e| WarehouseError::MalformedResponse(e.to_string())),
            202 => parsed
                .ok()
                .and_then(|r| r.statement_handle)
                .map(Progress::Running)
                .ok_or_else(|| {
                    WarehouseError::MalformedResponse("Accepted without a statement handle".into())
                }),
            401 => Err(WarehouseError::Unauthorized),
            403 => Err(WarehouseError::PermissionDenied(
                parsed.ok().and_then(|r| r.message).unwrap_or(body),
            )),
            408 => Err(WarehouseError::Timeout {
                timeout_secs: self.settings.statement_timeout.as_secs(),
            }),
            500..=599 => Err(WarehouseError::network(format!(
                "Server error {}: {}",
                status, body
            ))),
            _ => {
                let (code, message) = match parsed {
                    Ok(r) => (
                        r.code.unwrap_or_else(|| status.to_string()),
                        r.message.unwrap_or(body),
                    ),
                    Err(_) => (status.to_string(), body),
                };
                if code == INSUFFICIENT_PRIVILEGES {
                    Err(WarehouseError::PermissionDenied(message))
                } else {
                    Err(WarehouseError::statement(code, message))
                }
            }
        }
    }

    async fn submit(&self, statement: &Statement) -> Result<Progress, WarehouseError> {
        let bindings = statement
            .bindings()
            .iter()
            .enumerate()
            .map(|(i, value)| {
                (
                    (i + 1).to_string(),
                    Binding {
                        kind: "TEXT",
                        value,
                    },
                )
            })
            .collect();
        let body = StatementRequest {
            statement: statement.text(),
            timeout: self.settings.statement_timeout.as_secs(),
            warehouse: &self.settings.warehouse,
            database: &self.settings.database,
            schema: &self.settings.schema,
            role: &self.settings.role,
            bindings,
        };

        let request_id = Uuid::new_v4();
        tracing::debug!(%request_id, bindings = statement.bindings().len(), "Submitting statement");
        let request = self
            .http
            .post(self.statements_url())
            .query(&[("requestId", request_id.to_string())])
            .json(&body);
        let response = self.send(request).await?;
        self.read_progress(response).await
    }

    /// Deadline for a statement submitted now. The submit round trip
    /// counts against it.
    fn deadline(&self) -> Instant {
        Instant::now() + self.settings.statement_timeout
    }

    /// Polls a running statement until it completes. Cancels it once
    /// `deadline` has passed.
    async fn wait(&self, handle: &str, deadline: Instant) -> Result<StatementResponse, WarehouseError> {
        loop {
            let now = Instant::now();
            if now >= deadline {
                self.cancel(handle).await;
                return Err(WarehouseError::Timeout {
                    timeout_secs: self.settings.statement_timeout.as_secs(),
                });
            }
            sleep(self.settings.poll_interval.min(deadline - now)).await;

            let response = self.send(self.http.get(self.handle_url(handle))).await?;
            match self.read_progress(response).await? {
                Progress::Complete(body) => return Ok(body),
                Progress::Running(_) => {
                    tracing::trace!(handle, "Statement still running");
                }
            }
        }
    }

    /// Fetches partitions after the first and assembles the table.
    async fn collect(&self, first: StatementResponse) -> Result<QueryResult, WarehouseError> {
        let count = first.partition_count();
        let mut partitions = Vec::with_capacity(count.saturating_sub(1));
        if count > 1 {
            let handle = first.statement_handle.clone().ok_or_else(|| {
                WarehouseError::MalformedResponse("Partitioned result without a handle".into())
            })?;
            for partition in 1..count {
                let request = self
                    .http
                    .get(self.handle_url(&handle))
                    .query(&[("partition", partition.to_string())]);
                let response = self.send(request).await?;
                match self.read_progress(response).await? {
                    Progress::Complete(body) => partitions.push(body),
                    Progress::Running(_) => {
                        return Err(WarehouseError::MalformedResponse(format!(
                            "Partition {} not ready",
                            partition
                        )))
                    }
                }
            }
        }
        Ok(into_query_result(&first, &partitions))
    }

    async fn run(&self, statement: &Statement) -> Result<QueryResult, WarehouseError> {
        let deadline = self.deadline();
        let first = match self.submit(statement).await? {
            Progress::Complete(body) => body,
            Progress::Running(handle) => self.wait(&handle, deadline).await?,
        };
        self.collect(first).await
    }

    /// Best-effort cancellation; failures are only logged.
    async fn cancel(&self, handle: &str) {
        let url = format!("{}/cancel", self.handle_url(handle));
        match self.send(self.http.post(url)).await {
            Ok(response) if response.status().is_success() => {
                tracing::debug!(handle, "Statement cancelled");
            }
            Ok(response) => {
                tracing::warn!(handle, status = %response.status(), "Statement cancel refused");
            }
            Err(err) => {
                tracing::warn!(handle, error = %err, "Statement cancel failed");
            }
        }
    }
}

#[async_trait]
impl WarehouseConnection for SnowflakeConnection {
    async fn execute_query(&self, statement: &Statement) -> Result<QueryResult, WarehouseError> {
        let started = Instant::now();
        let result = self.inner.run(statement).await;
        match &result {
            Ok(table) => tracing::debug!(
                rows = table.row_count(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "Query finished"
            ),
            Err(err) => tracing::warn!(error = %err, "Query failed"),
        }
        result
    }

    async fn cursor(&self) -> Result<Box<dyn CommandCursor>, WarehouseError> {
        Ok(Box::new(SnowflakeCursor {
            inner: self.inner.clone(),
            pending: None,
            result: None,
            description: Vec::new(),
            closed: false,
        }))
    }
}

/// Cursor over administrative commands. A statement still running when
/// the cursor is closed or dropped is cancelled.
pub struct SnowflakeCursor {
    inner: Arc<ClientInner>,
    pending: Option<String>,
    result: Option<QueryResult>,
    description: Vec<ColumnDescriptor>,
    closed: bool,
}

#[async_trait]
impl CommandCursor for SnowflakeCursor {
    async fn execute(&mut self, command: &str) -> Result<(), WarehouseError> {
        if self.closed {
            return Err(WarehouseError::CursorClosed);
        }
        self.result = None;
        self.description.clear();

        let statement = Statement::new(command);
        let deadline = self.inner.deadline();
        let first = match self.inner.submit(&statement).await? {
            Progress::Complete(body) => body,
            Progress::Running(handle) => {
                self.pending = Some(handle.clone());
                let body = self.inner.wait(&handle, deadline).await;
                self.pending = None;
                body?
            }
        };
        let result = self.inner.collect(first).await?;
        self.description = result
            .columns()
            .iter()
            .map(|c| ColumnDescriptor {
                name: c.name.clone(),
                column_type: c.column_type,
            })
            .collect();
        self.result = Some(result);
        Ok(())
    }

    async fn fetch_all(&mut self) -> Result<Vec<Vec<CellValue>>, WarehouseError> {
        if self.closed {
            return Err(WarehouseError::CursorClosed);
        }
        self.result
            .as_ref()
            .map(|r| r.rows().to_vec())
            .ok_or(WarehouseError::NothingExecuted)
    }

    fn description(&self) -> &[ColumnDescriptor] {
        &self.description
    }

    async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.result = None;
        if let Some(handle) = self.pending.take() {
            self.inner.cancel(&handle).await;
        }
    }
}

impl Drop for SnowflakeCursor {
    fn drop(&mut self) {
        let Some(handle) = self.pending.take() else {
            return;
        };
        if let Ok(runtime) = tokio::runtime::Handle::try_current() {
            let inner = self.inner.clone();
            runtime.spawn(async move { inner.cancel(&handle).await });
        }
    }
}
