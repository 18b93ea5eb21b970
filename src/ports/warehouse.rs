//! Warehouse port - read-only access to account-usage metadata.
//!
//! A [`WarehouseConnection`] is created once at startup and handed to every
//! request explicitly. It runs declarative queries directly and
//! administrative commands through a [`CommandCursor`], which callers must
//! close on every exit path (see `application::handlers::monitoring::run_command`).

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::monitoring::{CellValue, ColumnType, QueryResult};

/// SQL text plus positional text bindings for `?` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    text: String,
    bindings: Vec<String>,
}

impl Statement {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bindings: Vec::new(),
        }
    }

    /// Binds the next `?` placeholder to a text value.
    pub fn bind(mut self, value: impl Into<String>) -> Self {
        self.bindings.push(value.into());
        self
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn bindings(&self) -> &[String] {
        &self.bindings
    }
}

/// Column metadata reported by a cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    pub name: String,
    pub column_type: ColumnType,
}

/// Authenticated session against the warehouse.
#[async_trait]
pub trait WarehouseConnection: Send + Sync {
    /// Runs a declarative query and materializes every row.
    async fn execute_query(&self, statement: &Statement) -> Result<QueryResult, WarehouseError>;

    /// Opens a cursor for administrative commands.
    async fn cursor(&self) -> Result<Box<dyn CommandCursor>, WarehouseError>;
}

/// Cursor used for commands such as `SHOW WAREHOUSES`.
#[async_trait]
pub trait CommandCursor: Send {
    async fn execute(&mut self, command: &str) -> Result<(), WarehouseError>;

    /// All rows of the last executed command.
    async fn fetch_all(&mut self) -> Result<Vec<Vec<CellValue>>, WarehouseError>;

    /// Columns of the last executed command.
    fn description(&self) -> &[ColumnDescriptor];

    /// Releases the cursor. Safe to call more than once.
    async fn close(&mut self);
}

/// Per-statement failures. Rendered inline; never fatal to the process.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WarehouseError {
    #[error("Statement failed ({code}): {message}")]
    Statement { code: String, message: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Warehouse rejected the session credentials")]
    Unauthorized,

    #[error("Network error: {0}")]
    Network(String),

    #[error("Statement did not finish within {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Cannot sign session token: {0}")]
    Signing(String),

    #[error("Unexpected warehouse response: {0}")]
    MalformedResponse(String),

    #[error("Cursor has no executed command")]
    NothingExecuted,

    #[error("Cursor is closed")]
    CursorClosed,
}

impl WarehouseError {
    pub fn statement(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Statement {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }
}

/// The private key could not be loaded.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Cannot read private key file {path}: {source}")]
    KeyFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Private key could not be decrypted (missing or wrong passphrase)")]
    Decrypt,

    #[error("Private key is not a valid RSA key: {0}")]
    InvalidKey(String),
}

/// The warehouse refused the session or could not be reached.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Warehouse rejected the key-pair credential: {0}")]
    Rejected(String),

    #[error("Cannot reach warehouse: {0}")]
    Network(String),

    #[error("Invalid connection settings: {0}")]
    InvalidSettings(String),
}

/// Startup failure: no connection, no dashboard.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error(transparent)]
    Credential(#[from] CredentialError),

    #[error(transparent)]
    Connection(#[from] ConnectionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn statement_collects_bindings_in_order() {
        let stmt = Statement::new("SELECT ? , ?").bind("a").bind(String::from("b"));
        assert_eq!(stmt.text(), "SELECT ? , ?");
        assert_eq!(stmt.bindings(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn error_messages() {
        let err = WarehouseError::statement("002003", "Object does not exist");
        assert_eq!(err.to_string(), "Statement failed (002003): Object does not exist");

        let err = WarehouseError::Timeout { timeout_secs: 60 };
        assert_eq!(err.to_string(), "Statement did not finish within 60s");

        let err: AuthError = CredentialError::Decrypt.into();
        assert!(err.to_string().contains("passphrase"));
    }
}
