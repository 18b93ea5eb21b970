//! Application configuration module
//!
//! Configuration is layered with the `config` crate: an optional TOML
//! secrets file first, then environment variables with the
//! `WAREHOUSE_MONITOR` prefix (nested values separated by `__`). A `.env`
//! file is honoured in development through `dotenvy`.
//!
//! # Example
//!
//! ```no_run
//! use warehouse_monitor::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Dashboard on {}", config.server.socket_addr().unwrap());
//! ```
//!
//! # Secrets file
//!
//! ```toml
//! [credentials]
//! private_key_path = "/keys/rsa_key.p8"
//! account = "myorg-myaccount"
//! user = "MONITOR"
//! warehouse = "MONITOR_WH"
//! database = "SNOWFLAKE"
//! schema = "ACCOUNT_USAGE"
//! role = "MONITOR_ROLE"
//! ```

mod connector;
mod credentials;
mod error;
mod server;

pub use connector::ConnectorConfig;
pub use credentials::{passphrase_from_env, CredentialsConfig, PASSPHRASE_ENV};
pub use error::{ConfigError, ValidationError};
pub use server::{Environment, ServerConfig};

use serde::Deserialize;

/// Environment variable pointing at the secrets file.
pub const SECRETS_PATH_ENV: &str = "WAREHOUSE_MONITOR_SECRETS";

/// Secrets file used when [`SECRETS_PATH_ENV`] is unset.
pub const DEFAULT_SECRETS_FILE: &str = "secrets.toml";

/// Root application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server configuration (host, port, environment)
    #[serde(default)]
    pub server: ServerConfig,

    /// Warehouse key-pair credentials
    pub credentials: CredentialsConfig,

    /// SQL API client tuning
    #[serde(default)]
    pub connector: ConnectorConfig,
}

impl AppConfig {
    /// Load configuration from the secrets file and environment
    ///
    /// # Environment Variable Format
    ///
    /// - `WAREHOUSE_MONITOR__SERVER__PORT=8080` -> `server.port = 8080`
    /// - `WAREHOUSE_MONITOR__CREDENTIALS__ACCOUNT=...` -> `credentials.account = ...`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required values are missing or cannot be
    /// parsed into their expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let path = std::env::var(SECRETS_PATH_ENV)
            .unwrap_or_else(|_| DEFAULT_SECRETS_FILE.to_string());
        Self::load_from(&path)
    }

    /// Load configuration from an explicit secrets file path, still
    /// applying environment overrides. A missing file is not an error.
    pub fn load_from(secrets_path: &str) -> Result<Self, ConfigError> {
        let config = config::Config::builder()
            .add_source(
                config::File::new(secrets_path, config::FileFormat::Toml).required(false),
            )
            .add_source(
                config::Environment::default()
                    .prefix("WAREHOUSE_MONITOR")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any configuration value is invalid.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.credentials.validate()?;
        self.connector.validate(&self.server.environment)?;
        if self.server.request_timeout_secs <= self.connector.statement_timeout_secs {
            return Err(ValidationError::RequestTimeoutTooShort);
        }
        Ok(())
    }

    /// Check if running in production environment
    pub fn is_production(&self) -> bool {
        self.server.is_production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::io::Write;
    use std::sync::Mutex;

    // Mutex to ensure tests don't run in parallel (env vars are global)
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    const SECRETS: &str = r#"
[credentials]
private_key_path = "/keys/rsa_key.p8"
account = "myorg-myaccount"
user = "MONITOR"
warehouse = "MONITOR_WH"
database = "SNOWFLAKE"
schema = "ACCOUNT_USAGE"
role = "MONITOR_ROLE"
"#;

    fn secrets_file(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn clear_env() {
        env::remove_var("WAREHOUSE_MONITOR__SERVER__PORT");
        env::remove_var("WAREHOUSE_MONITOR__SERVER__ENVIRONMENT");
        env::remove_var("WAREHOUSE_MONITOR__CREDENTIALS__ROLE");
    }

    #[test]
    fn test_load_from_secrets_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let file = secrets_file(SECRETS);
        let config = AppConfig::load_from(file.path().to_str().unwrap()).unwrap();

        assert_eq!(config.credentials.account, "myorg-myaccount");
        assert_eq!(config.credentials.private_key_path, "/keys/rsa_key.p8");
        assert_eq!(config.server.port, 8501);
        assert_eq!(config.connector.statement_timeout_secs, 60);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_environment_overrides_file() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let file = secrets_file(SECRETS);
        env::set_var("WAREHOUSE_MONITOR__SERVER__PORT", "3000");
        env::set_var("WAREHOUSE_MONITOR__CREDENTIALS__ROLE", "AUDITOR");
        let result = AppConfig::load_from(file.path().to_str().unwrap());
        clear_env();

        let config = result.unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.credentials.role, "AUDITOR");
    }

    #[test]
    fn test_missing_credentials_section_fails() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let result = AppConfig::load_from("/nonexistent/secrets.toml");
        assert!(matches!(result, Err(ConfigError::LoadError(_))));
    }

    #[test]
    fn test_is_production() {
        let _guard = ENV_MUTEX.lock().unwrap();
        let file = secrets_file(SECRETS);
        env::set_var("WAREHOUSE_MONITOR__SERVER__ENVIRONMENT", "production");
        let result = AppConfig::load_from(file.path().to_str().unwrap());
        clear_env();

        assert!(result.unwrap().is_production());
    }

    #[test]
    fn test_passphrase_from_env_decrypts_key() {
        use crate::adapters::snowflake::KeyPairCredential;
        use crate::ports::CredentialError;

        const ENCRYPTED: &str = include_str!("../../tests/fixtures/rsa_key_encrypted.p8");
        let _guard = ENV_MUTEX.lock().unwrap();

        env::set_var(PASSPHRASE_ENV, "correct-horse");
        let passphrase = passphrase_from_env();
        env::set_var(PASSPHRASE_ENV, "");
        let empty = passphrase_from_env();
        env::remove_var(PASSPHRASE_ENV);
        let unset = passphrase_from_env();

        assert!(KeyPairCredential::from_pem(ENCRYPTED, passphrase.as_ref()).is_ok());
        assert!(empty.is_none());
        assert!(unset.is_none());
        assert!(matches!(
            KeyPairCredential::from_pem(ENCRYPTED, empty.as_ref()),
            Err(CredentialError::Decrypt)
        ));
    }

    #[test]
    fn test_request_timeout_must_exceed_statement_timeout() {
        let _guard = ENV_MUTEX.lock().unwrap();
        clear_env();
        let file = secrets_file(&format!(
            "{}\n[server]\nrequest_timeout_secs = 30\n\n[connector]\nstatement_timeout_secs = 60\n",
            SECRETS
        ));
        let config = AppConfig::load_from(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.validate(), Err(ValidationError::RequestTimeoutTooShort));
    }
}
