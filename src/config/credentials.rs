//! Warehouse credentials (the `[credentials]` secrets section)

use secrecy::SecretString;
use serde::Deserialize;

use super::error::ValidationError;

/// Environment variable holding the private-key passphrase.
pub const PASSPHRASE_ENV: &str = "PRIVATE_KEY_PASSPHRASE";

/// Key-pair credentials and session context for the warehouse.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CredentialsConfig {
    /// Filesystem path of the PEM-encoded RSA private key
    pub private_key_path: String,

    /// Account identifier (e.g. `myorg-myaccount`)
    pub account: String,

    /// Login name the public key is registered to
    pub user: String,

    /// Warehouse that runs the monitoring queries
    pub warehouse: String,

    pub database: String,

    pub schema: String,

    /// Role with access to `SNOWFLAKE.ACCOUNT_USAGE`
    pub role: String,
}

impl CredentialsConfig {
    /// Validate that every required key is present
    pub fn validate(&self) -> Result<(), ValidationError> {
        let required = [
            (&self.private_key_path, "CREDENTIALS.PRIVATE_KEY_PATH"),
            (&self.account, "CREDENTIALS.ACCOUNT"),
            (&self.user, "CREDENTIALS.USER"),
            (&self.warehouse, "CREDENTIALS.WAREHOUSE"),
            (&self.database, "CREDENTIALS.DATABASE"),
            (&self.schema, "CREDENTIALS.SCHEMA"),
            (&self.role, "CREDENTIALS.ROLE"),
        ];
        for (value, name) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::MissingRequired(name));
            }
        }
        Ok(())
    }
}

/// Reads the key passphrase from [`PASSPHRASE_ENV`]. Unset or empty means
/// the key is stored unencrypted.
pub fn passphrase_from_env() -> Option<SecretString> {
    std::env::var(PASSPHRASE_ENV)
        .ok()
        .filter(|value| !value.is_empty())
        .map(SecretString::new)
}
