//! Service-account token issuance.
//!
//! A short-lived RS256 assertion signed with the account's private key is
//! exchanged at the key's token endpoint for a vault bearer token.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, instrument};

use super::credentials::ServiceAccountKey;
use super::{IssuedToken, TokenIssuer};
use crate::error::{ApiErrorEnvelope, Error, Result};
use crate::models::{TokenRequest, TokenResponse};

/// Lifetime of the signed assertion.
const ASSERTION_LIFETIME_MINUTES: i64 = 60;

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    key: &'a str,
    aud: &'a str,
    sub: &'a str,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    ctx: Option<&'a str>,
}

/// Issues bearer tokens from a service-account key.
pub struct ServiceAccountIssuer {
    http: reqwest::Client,
    key: ServiceAccountKey,
    roles: Vec<String>,
    context: Option<String>,
}

impl ServiceAccountIssuer {
    /// Creates an issuer for a key.
    #[must_use]
    pub fn new(http: reqwest::Client, key: ServiceAccountKey) -> Self {
        Self {
            http,
            key,
            roles: Vec::new(),
            context: None,
        }
    }

    /// Scopes issued tokens to roles.
    #[must_use]
    pub fn with_roles(mut self, roles: Vec<String>) -> Self {
        self.roles = roles;
        self
    }

    /// Embeds a context claim in the assertion.
    #[must_use]
    pub fn with_context(mut self, context: Option<String>) -> Self {
        self.context = context;
        self
    }

    /// Signs the assertion presented to the token endpoint.
    pub fn signed_assertion(&self) -> Result<String> {
        let claims = AssertionClaims {
            iss: &self.key.client_id,
            key: &self.key.key_id,
            aud: &self.key.token_uri,
            sub: &self.key.client_id,
            exp: (Utc::now() + Duration::minutes(ASSERTION_LIFETIME_MINUTES)).timestamp(),
            ctx: self.context.as_deref(),
        };

        let signing_key =
            EncodingKey::from_rsa_pem(self.key.private_key().expose_secret().as_bytes())
                .map_err(|e| Error::auth(format!("Invalid service account private key: {e}"), None))?;

        encode(&Header::new(Algorithm::RS256), &claims, &signing_key)
            .map_err(|e| Error::auth(format!("Unable to sign assertion: {e}"), None))
    }
}

#[async_trait]
impl TokenIssuer for ServiceAccountIssuer {
    #[instrument(skip(self), fields(token_uri = %self.key.token_uri))]
    async fn issue(&self) -> Result<IssuedToken> {
        let request = TokenRequest::new(self.signed_assertion()?).with_roles(&self.roles);

        let response = self
            .http
            .post(&self.key.token_uri)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::auth(format!("Token request failed: {e}"), None))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::auth(format!("Token response unreadable: {e}"), Some(status.as_u16())))?;

        if !status.is_success() {
            let (code, message) = ApiErrorEnvelope::describe(status.as_u16(), &body, None);
            return Err(Error::auth(message, Some(code)));
        }

        let token: TokenResponse = serde_json::from_slice(&body).map_err(|e| {
            Error::auth(format!("Malformed token response: {e}"), Some(status.as_u16()))
        })?;
        debug!("Issued service account token");

        Ok(IssuedToken {
            access_token: SecretString::new(token.access_token),
            token_type: token.token_type,
        })
    }
}

impl std::fmt::Debug for ServiceAccountIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountIssuer")
            .field("key", &self.key)
            .field("roles", &self.roles)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
