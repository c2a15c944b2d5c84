//! Bearer token caching and re-issuance.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use tracing::{debug, warn};

use super::credentials::{Credential, Credentials};
use super::jwt::{decode_expiry, is_stale};
use super::service_account::ServiceAccountIssuer;
use super::TokenIssuer;
use crate::error::{Error, Result};

/// Safety margin before expiry at which a cached token is re-issued.
pub const DEFAULT_TOKEN_SKEW: Duration = Duration::from_secs(300);

/// An issued token and its decoded expiry.
#[derive(Clone)]
pub struct CachedToken {
    value: SecretString,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    /// Creates a cached token.
    #[must_use]
    pub fn new(value: SecretString, expires_at: DateTime<Utc>) -> Self {
        Self { value, expires_at }
    }

    /// Decodes the expiry of a JWT and caches it.
    pub fn from_jwt(value: SecretString) -> Result<Self> {
        let expires_at = decode_expiry(value.expose_secret())?;
        Ok(Self { value, expires_at })
    }

    /// The token.
    #[must_use]
    pub fn value(&self) -> &SecretString {
        &self.value
    }

    /// Decoded expiry.
    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Returns true while `now + skew` is before the expiry.
    #[must_use]
    pub fn is_usable(&self, skew: Duration) -> bool {
        !is_stale(self.expires_at, Utc::now(), to_chrono(skew))
    }
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

enum TokenSource {
    /// API keys never expire client side.
    ApiKey(SecretString),
    /// Caller-issued JWT; it cannot be renewed by the SDK.
    Bearer(SecretString),
    Issuer(Arc<dyn TokenIssuer>),
}

/// Hands out a currently valid bearer token.
///
/// Issued tokens are cached and re-issued once `now + skew` reaches their
/// expiry. The cache is not held locked across issuance: concurrent callers
/// that both find it stale will both issue, and the last write wins.
pub struct TokenManager {
    source: TokenSource,
    cache: Arc<RwLock<Option<CachedToken>>>,
    skew: Duration,
}

impl TokenManager {
    /// Creates a token manager for a credential.
    ///
    /// Service-account credentials issue tokens through `http`, scoped by the
    /// roles and context of `credentials`.
    pub fn new(
        credential: &Credential,
        credentials: &Credentials,
        http: reqwest::Client,
        skew: Duration,
    ) -> Result<Self> {
        let source = match credential {
            Credential::ApiKey(key) => TokenSource::ApiKey(key.clone()),
            Credential::BearerToken(token) => TokenSource::Bearer(token.clone()),
            Credential::ServiceAccountKey(_) | Credential::CredentialBlob(_) => {
                let key = credential
                    .service_account_key()?
                    .ok_or_else(|| Error::validation("Credential has no service account key"))?;
                let issuer = ServiceAccountIssuer::new(http, key)
                    .with_roles(credentials.roles.clone())
                    .with_context(credentials.context.clone());
                TokenSource::Issuer(Arc::new(issuer))
            }
        };

        Ok(Self {
            source,
            cache: Arc::new(RwLock::new(None)),
            skew,
        })
    }

    /// Creates a token manager around a custom issuer.
    #[must_use]
    pub fn with_issuer(issuer: Arc<dyn TokenIssuer>, skew: Duration) -> Self {
        Self {
            source: TokenSource::Issuer(issuer),
            cache: Arc::new(RwLock::new(None)),
            skew,
        }
    }

    /// Returns the configured skew.
    #[must_use]
    pub fn skew(&self) -> Duration {
        self.skew
    }

    /// Returns the cached token, if any.
    #[must_use]
    pub fn cached(&self) -> Option<CachedToken> {
        self.cache.read().clone()
    }

    /// Replaces the cached token.
    pub fn store(&self, token: CachedToken) {
        *self.cache.write() = Some(token);
    }

    /// Returns a bearer token valid for at least the skew.
    pub async fn bearer_token(&self) -> Result<SecretString> {
        match &self.source {
            TokenSource::ApiKey(key) => Ok(key.clone()),
            TokenSource::Bearer(token) => {
                let expires_at = decode_expiry(token.expose_secret())?;
                if expires_at <= Utc::now() {
                    return Err(Error::auth(
                        "Bearer token has expired; supply a new token",
                        None,
                    ));
                }
                Ok(token.clone())
            }
            TokenSource::Issuer(issuer) => {
                let cached = self.cache.read().clone();
                if let Some(token) = cached.filter(|t| t.is_usable(self.skew)) {
                    return Ok(token.value);
                }

                debug!("Bearer token missing or stale, issuing a new one");
                let issued = issuer
                    .issue()
                    .await
                    .map_err(|e| {
                        warn!(error = %e, "Token issuance failed");
                        e
                    })?;
                let token = CachedToken::from_jwt(issued.access_token)?;
                let value = token.value.clone();
                self.store(token);
                Ok(value)
            }
        }
    }
}

impl std::fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let source = match self.source {
            TokenSource::ApiKey(_) => "api_key",
            TokenSource::Bearer(_) => "bearer",
            TokenSource::Issuer(_) => "issuer",
        };
        f.debug_struct("TokenManager")
            .field("source", &source)
            .field("skew", &self.skew)
            .field("cached", &self.cache.read().as_ref().map(CachedToken::expires_at))
            .finish()
    }
}

fn to_chrono(skew: Duration) -> chrono::Duration {
    chrono::Duration::from_std(skew).unwrap_or_else(|_| chrono::Duration::zero())
}
