//! Key-pair JWT authenticator for the SQL API.
//!
//! Tokens are RS256-signed with:
//! - `iss` = `ACCOUNT.USER.SHA256:<public key fingerprint>`
//! - `sub` = `ACCOUNT.USER`
//! - `exp` = issue time + 59 minutes
//!
//! A token is cached and reused until one minute before it expires.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::KeyPairCredential;
use crate::ports::{CredentialError, WarehouseError};

/// Header value announcing key-pair authentication.
pub const TOKEN_TYPE: &str = "KEYPAIR_JWT";

const TOKEN_LIFETIME_MINUTES: i64 = 59;
const RENEW_BEFORE_EXPIRY_MINUTES: i64 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct KeyPairClaims {
    iss: String,
    sub: String,
    iat: i64,
    exp: i64,
}

struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Duration::minutes(RENEW_BEFORE_EXPIRY_MINUTES)
    }
}

/// Issues bearer tokens for one account/user pair.
pub struct KeyPairAuthenticator {
    subject: String,
    issuer: String,
    encoding_key: EncodingKey,
    cache: Arc<RwLock<Option<CachedToken>>>,
}

impl KeyPairAuthenticator {
    /// Builds the authenticator and signs a first token, so an unusable
    /// key fails here rather than on the first request.
    pub fn new(
        account: &str,
        user: &str,
        credential: &KeyPairCredential,
    ) -> Result<Self, CredentialError> {
        let subject = qualified_user(account, user);
        let issuer = format!("{}.{}", subject, credential.public_key_fingerprint());
        let pkcs1 = credential.pkcs1_der()?;
        let encoding_key = EncodingKey::from_rsa_der(pkcs1.as_bytes());

        let first = sign_token(&issuer, &subject, &encoding_key, Utc::now())
            .map_err(|e| CredentialError::InvalidKey(e.to_string()))?;

        Ok(Self {
            subject,
            issuer,
            encoding_key,
            cache: Arc::new(RwLock::new(Some(first))),
        })
    }

    /// `ACCOUNT.USER`, as used in the `sub` claim.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    /// Returns a valid bearer token, signing a new one when the cached
    /// token is within a minute of expiring.
    pub async fn bearer_token(&self) -> Result<String, WarehouseError> {
        let now = Utc::now();
        {
            let cache = self.cache.read().await;
            if let Some(ref cached) = *cache {
                if cached.is_fresh(now) {
                    return Ok(cached.token.clone());
                }
            }
        }

        let mut cache = self.cache.write().await;
        if let Some(ref cached) = *cache {
            if cached.is_fresh(now) {
                return Ok(cached.token.clone());
            }
        }
        tracing::debug!(subject = %self.subject, "Signing new key-pair token");
        let fresh = self
            .sign(now)
            .map_err(|e| WarehouseError::Signing(e.to_string()))?;
        let token = fresh.token.clone();
        *cache = Some(fresh);
        Ok(token)
    }

    fn sign(&self, now: DateTime<Utc>) -> Result<CachedToken, jsonwebtoken::errors::Error> {
        sign_token(&self.issuer, &self.subject, &self.encoding_key, now)
    }
}

fn sign_token(
    issuer: &str,
    subject: &str,
    key: &EncodingKey,
    now: DateTime<Utc>,
) -> Result<CachedToken, jsonwebtoken::errors::Error> {
    let expires_at = now + Duration::minutes(TOKEN_LIFETIME_MINUTES);
    let claims = KeyPairClaims {
        iss: issuer.to_string(),
        sub: subject.to_string(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
    };
    let token = encode(&Header::new(Algorithm::RS256), &claims, key)?;
    Ok(CachedToken { token, expires_at })
}

/// Account locator without region or cloud suffix, uppercased, joined with
/// the uppercased user name.
fn qualified_user(account: &str, user: &str) -> String {
    let locator = account.split('.').next().unwrap_or(account);
    format!("{}.{}", locator.to_uppercase(), user.to_uppercase())
}
