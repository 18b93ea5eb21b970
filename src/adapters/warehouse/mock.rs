//! Mock warehouse for testing.
//!
//! Implements the `WarehouseConnection` port without a network, so the
//! dispatcher and HTTP layer can run against canned results.
//!
//! # Features
//!
//! - Canned results keyed by a substring of the statement text
//! - Error injection per statement or command
//! - Statement, command and cursor tracking for verification
//! - Optional per-statement latency to simulate a slow warehouse
//!
//! # Example
//!
//! ```ignore
//! let warehouse = MockWarehouse::new()
//!     .with_query("WAREHOUSE_METERING_HISTORY", credits)
//!     .with_command_error("SHOW WAREHOUSES", WarehouseError::PermissionDenied("..".into()));
//! ```

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::domain::monitoring::{CellValue, QueryResult};
use crate::ports::{ColumnDescriptor, CommandCursor, Statement, WarehouseConnection, WarehouseError};

/// A configured mock response.
#[derive(Debug, Clone)]
pub enum MockResponse {
    Rows(QueryResult),
    Error(WarehouseError),
}

#[derive(Debug, Default)]
struct MockState {
    queries: Vec<(String, MockResponse)>,
    commands: Vec<(String, MockResponse)>,
    executed_statements: Vec<Statement>,
    executed_commands: Vec<String>,
    cursors_opened: usize,
    cursors_closed: usize,
    latency: Duration,
}

impl MockState {
    fn lookup(entries: &[(String, MockResponse)], text: &str) -> MockResponse {
        entries
            .iter()
            .find(|(needle, _)| text.contains(needle.as_str()))
            .map(|(_, response)| response.clone())
            .unwrap_or_else(|| MockResponse::Rows(QueryResult::default()))
    }
}

/// In-process warehouse with canned results.
///
/// Statements that match no configured needle return an empty result.
#[derive(Debug, Clone, Default)]
pub struct MockWarehouse {
    state: Arc<Mutex<MockState>>,
}

impl MockWarehouse {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `result` for any query whose text contains `needle`.
    pub fn with_query(self, needle: impl Into<String>, result: QueryResult) -> Self {
        self.state
            .lock()
            .unwrap()
            .queries
            .push((needle.into(), MockResponse::Rows(result)));
        self
    }

    /// Fails any query whose text contains `needle`.
    pub fn with_query_error(self, needle: impl Into<String>, error: WarehouseError) -> Self {
        self.state
            .lock()
            .unwrap()
            .queries
            .push((needle.into(), MockResponse::Error(error)));
        self
    }

    /// Returns `result` for any command containing `needle`.
    pub fn with_command(self, needle: impl Into<String>, result: QueryResult) -> Self {
        self.state
            .lock()
            .unwrap()
            .commands
            .push((needle.into(), MockResponse::Rows(result)));
        self
    }

    /// Fails any command containing `needle`.
    pub fn with_command_error(self, needle: impl Into<String>, error: WarehouseError) -> Self {
        self.state
            .lock()
            .unwrap()
            .commands
            .push((needle.into(), MockResponse::Error(error)));
        self
    }

    /// Delays every query and command by `latency` after recording it.
    pub fn with_latency(self, latency: Duration) -> Self {
        self.state.lock().unwrap().latency = latency;
        self
    }

    /// Queries executed so far, in order.
    pub fn executed_statements(&self) -> Vec<Statement> {
        self.state.lock().unwrap().executed_statements.clone()
    }

    /// Commands executed so far, in order.
    pub fn executed_commands(&self) -> Vec<String> {
        self.state.lock().unwrap().executed_commands.clone()
    }

    pub fn cursors_opened(&self) -> usize {
        self.state.lock().unwrap().cursors_opened
    }

    pub fn cursors_closed(&self) -> usize {
        self.state.lock().unwrap().cursors_closed
    }
}

#[async_trait]
impl WarehouseConnection for MockWarehouse {
    async fn execute_query(&self, statement: &Statement) -> Result<QueryResult, WarehouseError> {
        let (response, latency) = {
            let mut state = self.state.lock().unwrap();
            state.executed_statements.push(statement.clone());
            (MockState::lookup(&state.queries, statement.text()), state.latency)
        };
        if !latency.is_zero() {
            sleep(latency).await;
        }
        match response {
            MockResponse::Rows(result) => Ok(result),
            MockResponse::Error(err) => Err(err),
        }
    }

    async fn cursor(&self) -> Result<Box<dyn CommandCursor>, WarehouseError> {
        self.state.lock().unwrap().cursors_opened += 1;
        Ok(Box::new(MockCursor {
            state: self.state.clone(),
            result: None,
            description: Vec::new(),
            closed: false,
        }))
    }
}

struct MockCursor {
    state: Arc<Mutex<MockState>>,
    result: Option<QueryResult>,
    description: Vec<ColumnDescriptor>,
    closed: bool,
}

#[async_trait]
impl CommandCursor for MockCursor {
    async fn execute(&mut self, command: &str) -> Result<(), WarehouseError> {
        if self.closed {
            return Err(WarehouseError::CursorClosed);
        }
        let (response, latency) = {
            let mut state = self.state.lock().unwrap();
            state.executed_commands.push(command.to_string());
            (MockState::lookup(&state.commands, command), state.latency)
        };
        if !latency.is_zero() {
            sleep(latency).await;
        }
        match response {
            MockResponse::Rows(result) => {
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
            MockResponse::Error(err) => Err(err),
        }
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
        if !self.closed {
            self.closed = true;
            self.state.lock().unwrap().cursors_closed += 1;
        }
    }
}
