//! Client builder for fluent configuration.

use std::time::Duration;

use tracing::Dispatch;

use crate::auth::Credentials;
use crate::error::{Error, Result};
use crate::logging::LogLevel;

use super::config::{Env, VaultConfig};
use super::VaultClient;

/// Builder for creating a [`VaultClient`].
///
/// # Example
///
/// ```rust,no_run
/// use privault_sdk::{Credentials, Env, LogLevel, VaultClient};
/// use std::time::Duration;
///
/// let client = VaultClient::builder()
///     .vault_id("a1b2c3")
///     .cluster_id("ebfc9bee4242")
///     .env(Env::Sandbox)
///     .credentials(Credentials::api_key("sky-xxxxx"))
///     .timeout(Duration::from_secs(60))
///     .max_concurrency(4)
///     .log_level(LogLevel::Warn)
///     .build()?;
/// # Ok::<(), privault_sdk::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct VaultClientBuilder {
    vault_id: Option<String>,
    cluster_id: Option<String>,
    vault_url: Option<String>,
    env: Option<Env>,
    credentials: Option<Credentials>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
    user_agent: Option<String>,
    max_concurrency: Option<usize>,
    token_skew: Option<Duration>,
    poll_interval: Option<Duration>,
    log_dispatch: Option<Dispatch>,
}

impl VaultClientBuilder {
    /// Creates a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the vault ID.
    ///
    /// This is required and must be called before [`build()`](Self::build).
    #[must_use]
    pub fn vault_id(mut self, vault_id: impl Into<String>) -> Self {
        self.vault_id = Some(vault_id.into());
        self
    }

    /// Sets the cluster ID the base URL is derived from.
    #[must_use]
    pub fn cluster_id(mut self, cluster_id: impl Into<String>) -> Self {
        self.cluster_id = Some(cluster_id.into());
        self
    }

    /// Sets an explicit base URL, overriding the cluster ID.
    #[must_use]
    pub fn vault_url(mut self, url: impl Into<String>) -> Self {
        self.vault_url = Some(url.into());
        self
    }

    /// Sets the environment.
    ///
    /// Default: [`Env::Prod`].
    #[must_use]
    pub fn env(mut self, env: Env) -> Self {
        self.env = Some(env);
        self
    }

    /// Sets the credentials.
    ///
    /// This is required and must be called before [`build()`](Self::build).
    #[must_use]
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Authenticates with a static API key.
    #[must_use]
    pub fn api_key(self, key: impl Into<String>) -> Self {
        self.credentials(Credentials::api_key(key))
    }

    /// Authenticates with a static bearer token.
    #[must_use]
    pub fn bearer_token(self, token: impl Into<String>) -> Self {
        self.credentials(Credentials::token(token))
    }

    /// Sets the request timeout.
    ///
    /// Default: 30 seconds.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets the connection timeout.
    ///
    /// Default: 10 seconds.
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the user agent string.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Sets how many per-record requests may be in flight at once.
    ///
    /// Default: 10.
    #[must_use]
    pub fn max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = Some(limit);
        self
    }

    /// Sets how long before expiry issued tokens are replaced.
    ///
    /// Default: 300 seconds.
    #[must_use]
    pub fn token_skew(mut self, skew: Duration) -> Self {
        self.token_skew = Some(skew);
        self
    }

    /// Sets the first wait between polls of a file run.
    ///
    /// Default: 1 second.
    #[must_use]
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Sends SDK log events to `dispatch`.
    #[must_use]
    pub fn log_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.log_dispatch = Some(dispatch);
        self
    }

    /// Sends SDK log events at `level` and above to stderr.
    #[must_use]
    pub fn log_level(self, level: LogLevel) -> Self {
        self.log_dispatch(crate::logging::dispatch(level))
    }

    /// Builds the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the vault ID or credentials are not set, if
    /// neither a cluster ID nor a vault URL is set, or if the credentials are
    /// invalid.
    pub fn build(self) -> Result<VaultClient> {
        let vault_id = self
            .vault_id
            .ok_or_else(|| Error::config("vault_id is required"))?;
        let credentials = self
            .credentials
            .ok_or_else(|| Error::config("credentials are required"))?;

        let mut config = VaultConfig::new(vault_id, credentials);

        if let Some(cluster_id) = self.cluster_id {
            config = config.with_cluster_id(cluster_id);
        }

        if let Some(url) = self.vault_url {
            config = config.with_vault_url(url);
        }

        if let Some(env) = self.env {
            config = config.with_env(env);
        }

        if let Some(timeout) = self.timeout {
            config = config.with_timeout(timeout);
        }

        if let Some(timeout) = self.connect_timeout {
            config = config.with_connect_timeout(timeout);
        }

        if let Some(user_agent) = self.user_agent {
            config = config.with_user_agent(user_agent);
        }

        if let Some(limit) = self.max_concurrency {
            config = config.with_max_concurrency(limit);
        }

        if let Some(skew) = self.token_skew {
            config = config.with_token_skew(skew);
        }

        if let Some(interval) = self.poll_interval {
            config = config.with_poll_interval(interval);
        }

        if let Some(dispatch) = self.log_dispatch {
            config = config.with_log_dispatch(dispatch);
        }

        VaultClient::new(config)
    }
}
