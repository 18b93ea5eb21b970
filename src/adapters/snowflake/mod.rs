//! Snowflake adapter - key-pair credential loading and the SQL API client.

mod client;
mod jwt;
mod key_pair;
mod result_set;

pub use client::{ConnectionSettings, SnowflakeConnection, SnowflakeCursor};
pub use jwt::KeyPairAuthenticator;
pub use key_pair::KeyPairCredential;

use crate::config::{passphrase_from_env, AppConfig};
use crate::ports::AuthError;

/// Loads the private key named by the configuration, decrypting it with
/// the passphrase from the environment when one is set, and opens a
/// verified session.
///
/// Both failure kinds are fatal; there is no retry.
pub async fn obtain_connection(config: &AppConfig) -> Result<SnowflakeConnection, AuthError> {
    let passphrase = passphrase_from_env();
    let credential =
        KeyPairCredential::from_file(&config.credentials.private_key_path, passphrase.as_ref())?;
    tracing::debug!(
        fingerprint = credential.public_key_fingerprint(),
        encrypted = passphrase.is_some(),
        "Loaded private key"
    );

    SnowflakeConnection::connect(ConnectionSettings::from_config(config), &credential).await
}
