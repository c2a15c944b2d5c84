//! Vault API client implementation.
//!
//! This module provides the main client for interacting with a vault and its
//! detect service.

mod builder;
mod config;
mod http;
mod services;

pub use builder::VaultClientBuilder;
pub use config::{Env, VaultConfig};
pub use http::{RawResponse, REQUEST_ID_HEADER};
pub use services::{DetectService, VaultService};

use std::future::Future;
use std::sync::Arc;

use secrecy::SecretString;
use tracing::instrument::WithSubscriber;

use crate::auth::{Credential, TokenIssuer, TokenManager};
use crate::batch::FanOut;
use crate::error::Result;

use self::http::HttpClient;

/// State shared by every service of a client.
pub(crate) struct ClientContext {
    pub(crate) http: HttpClient,
    pub(crate) tokens: TokenManager,
    pub(crate) config: VaultConfig,
}

impl ClientContext {
    /// Runs an operation under the configured log dispatch, if any.
    pub(crate) async fn scoped<F: Future>(&self, operation: F) -> F::Output {
        match &self.config.log_dispatch {
            Some(dispatch) => operation.with_subscriber(dispatch.clone()).await,
            None => operation.await,
        }
    }

    /// Bearer token for the next batch.
    pub(crate) async fn bearer_token(&self) -> Result<SecretString> {
        self.tokens.bearer_token().await
    }

    pub(crate) fn fan_out(&self) -> FanOut {
        FanOut::new(self.config.max_concurrency)
    }

    pub(crate) fn vault_path(&self, suffix: &str) -> String {
        format!("/v1/vaults/{}/{suffix}", self.config.vault_id)
    }
}

/// The main client for interacting with a vault.
///
/// Use [`VaultClient::builder()`] to create a new client instance. Clones
/// share the HTTP connection pool and the token cache.
///
/// # Example
///
/// ```rust,no_run
/// use privault_sdk::{Credentials, InsertRecord, InsertRequest, VaultClient};
///
/// #[tokio::main]
/// async fn main() -> Result<(), privault_sdk::Error> {
///     let client = VaultClient::builder()
///         .vault_id("a1b2c3")
///         .cluster_id("ebfc9bee4242")
///         .credentials(Credentials::path("credentials.json"))
///         .build()?;
///
///     let request = InsertRequest::new(
///         "cards",
///         vec![InsertRecord::default().with_field("card_number", "4111111111111111")],
///     )
///     .with_return_tokens(true);
///
///     for record in client.vault().insert(request).await? {
///         println!("Inserted {}", record.id);
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct VaultClient {
    ctx: Arc<ClientContext>,
}

impl VaultClient {
    /// Creates a new client builder.
    #[must_use]
    pub fn builder() -> VaultClientBuilder {
        VaultClientBuilder::new()
    }

    /// Creates a new client from configuration.
    ///
    /// Fails with [`Error::Validation`](crate::Error::Validation) when the
    /// credentials do not name exactly one source.
    pub fn new(config: VaultConfig) -> Result<Self> {
        config.validate()?;
        let credential = Credential::try_from(&config.credentials)?;
        let http = HttpClient::new(&config)?;
        let tokens = TokenManager::new(
            &credential,
            &config.credentials,
            http.inner().clone(),
            config.token_skew,
        )?;

        Ok(Self::from_parts(http, tokens, config))
    }

    /// Creates a client whose bearer tokens come from a custom issuer.
    ///
    /// The credentials of `config` are not used.
    pub fn with_issuer(config: VaultConfig, issuer: Arc<dyn TokenIssuer>) -> Result<Self> {
        config.validate()?;
        let http = HttpClient::new(&config)?;
        let tokens = TokenManager::with_issuer(issuer, config.token_skew);
        Ok(Self::from_parts(http, tokens, config))
    }

    fn from_parts(http: HttpClient, tokens: TokenManager, config: VaultConfig) -> Self {
        Self {
            ctx: Arc::new(ClientContext {
                http,
                tokens,
                config,
            }),
        }
    }

    /// Returns the current configuration.
    #[must_use]
    pub fn config(&self) -> &VaultConfig {
        &self.ctx.config
    }

    /// Returns the resolved base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        self.ctx.http.base_url()
    }

    /// Returns the token manager shared by this client's services.
    #[must_use]
    pub fn tokens(&self) -> &TokenManager {
        &self.ctx.tokens
    }

    // ========================================================================
    // Service accessors
    // ========================================================================

    /// Returns the record and token operations of the vault.
    #[must_use]
    pub fn vault(&self) -> VaultService {
        VaultService::new(Arc::clone(&self.ctx))
    }

    /// Returns the PII detection and de-identification service.
    #[must_use]
    pub fn detect(&self) -> DetectService {
        DetectService::new(Arc::clone(&self.ctx))
    }
}

impl std::fmt::Debug for VaultClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultClient")
            .field("vault_id", &self.ctx.config.vault_id)
            .field("base_url", &self.ctx.http.base_url())
            .field("tokens", &self.ctx.tokens)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Credentials;
    use crate::Error;

    fn config() -> VaultConfig {
        VaultConfig::new("vault-1", Credentials::api_key("test-key"))
            .with_vault_url("http://localhost:8080")
    }

    #[test]
    fn test_new_creates_client() {
        let client = VaultClient::new(config()).unwrap();
        assert_eq!(client.base_url(), "http://localhost:8080");
        assert_eq!(client.config().vault_id, "vault-1");
    }

    #[test]
    fn test_new_rejects_ambiguous_credentials() {
        let mut config = config();
        config.credentials.token = Some(SecretString::new("t".into()));

        let err = VaultClient::new(config).unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    #[test]
    fn test_client_debug_hides_secrets() {
        let client = VaultClient::new(config()).unwrap();

        let debug = format!("{client:?}");
        assert!(debug.contains("localhost:8080"));
        assert!(!debug.contains("test-key"));
    }

    #[test]
    fn test_vault_path() {
        let client = VaultClient::new(config()).unwrap();
        assert_eq!(
            client.ctx.vault_path("cards"),
            "/v1/vaults/vault-1/cards"
        );
        assert_eq!(client.ctx.fan_out().limit(), 10);
    }
}
