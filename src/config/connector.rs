//! Warehouse connector configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;
use super::server::Environment;

/// Tuning for the SQL API client.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectorConfig {
    /// Override of `https://<account>.snowflakecomputing.com`
    pub base_url: Option<String>,

    /// Server-side statement timeout in seconds
    #[serde(default = "default_statement_timeout")]
    pub statement_timeout_secs: u64,

    /// Delay between status polls of a running statement, in milliseconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl ConnectorConfig {
    pub fn statement_timeout(&self) -> Duration {
        Duration::from_secs(self.statement_timeout_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// API root for `account`, honouring the override.
    pub fn base_url_for(&self, account: &str) -> String {
        match &self.base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => format!("https://{}.snowflakecomputing.com", account.to_lowercase()),
        }
    }

    pub fn validate(&self, environment: &Environment) -> Result<(), ValidationError> {
        if self.statement_timeout_secs == 0 || self.statement_timeout_secs > 3600 {
            return Err(ValidationError::InvalidStatementTimeout);
        }
        if !(50..=10_000).contains(&self.poll_interval_ms) {
            return Err(ValidationError::InvalidPollInterval);
        }
        if let Some(url) = &self.base_url {
            if *environment == Environment::Production && !url.starts_with("https://") {
                return Err(ValidationError::BaseUrlMustBeHttps);
            }
        }
        Ok(())
    }
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            statement_timeout_secs: default_statement_timeout(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_statement_timeout() -> u64 {
    60
}

fn default_poll_interval() -> u64 {
    500
}
