//! Authentication handling for the SDK.
//!
//! Credentials are validated into a [`Credential`], and a [`TokenManager`]
//! turns that credential into a bearer token for each request, caching
//! tokens issued from service-account keys until they approach expiry.

mod credentials;
mod jwt;
mod service_account;
mod token;

pub use credentials::{Credential, Credentials, ServiceAccountKey};
pub use jwt::{decode_expiry, is_expired};
pub use service_account::ServiceAccountIssuer;
pub use token::{CachedToken, TokenManager, DEFAULT_TOKEN_SKEW};

use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;

use crate::error::Result;

/// A freshly issued bearer token.
#[derive(Clone)]
pub struct IssuedToken {
    /// The token, expected to be a JWT carrying `exp`.
    pub access_token: SecretString,
    /// Token type reported by the issuer.
    pub token_type: String,
}

impl IssuedToken {
    /// Creates a `Bearer` token.
    #[must_use]
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: SecretString::new(access_token.into()),
            token_type: "Bearer".to_string(),
        }
    }
}

impl std::fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuedToken")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .finish()
    }
}

/// Trait for bearer token issuers.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    /// Issues a new token.
    async fn issue(&self) -> Result<IssuedToken>;
}

/// Produces a bearer token from credentials without building a client.
///
/// Service-account credentials always issue a new token. Static credentials
/// are returned as they are, after checking that a bearer token has not
/// expired.
pub async fn generate_bearer_token(credentials: &Credentials) -> Result<SecretString> {
    let credential = Credential::try_from(credentials)?;
    TokenManager::new(&credential, credentials, reqwest::Client::new(), Duration::ZERO)?
        .bearer_token()
        .await
}
