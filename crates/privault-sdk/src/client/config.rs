//! Client configuration.

use std::time::Duration;

use serde::Deserialize;
use tracing::Dispatch;
use url::Url;

use crate::auth::{Credentials, DEFAULT_TOKEN_SKEW};
use crate::batch::DEFAULT_MAX_CONCURRENCY;
use crate::error::{Error, Result};
use crate::logging::{self, LogLevel};

/// Deployment environment of a vault cluster.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Env {
    /// Development.
    Dev,
    /// Staging.
    Stage,
    /// Sandbox.
    Sandbox,
    /// Production.
    #[default]
    Prod,
}

impl Env {
    /// Domain vault clusters of this environment are served under.
    #[must_use]
    pub fn vault_domain(self) -> &'static str {
        match self {
            Self::Dev => "vault.skyflowapis.dev",
            Self::Stage => "vault.skyflowapis.tech",
            Self::Sandbox => "vault.skyflowapis-preview.com",
            Self::Prod => "vault.skyflowapis.com",
        }
    }
}

/// Configuration for the vault client.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Vault identifier.
    pub vault_id: String,

    /// Cluster identifier, combined with [`Env`] into the base URL.
    pub cluster_id: Option<String>,

    /// Explicit base URL; takes precedence over `cluster_id`.
    pub vault_url: Option<String>,

    /// Environment of the cluster.
    pub env: Env,

    /// Credentials used to obtain bearer tokens.
    pub credentials: Credentials,

    /// Request timeout.
    pub timeout: Duration,

    /// Connection timeout.
    pub connect_timeout: Duration,

    /// User agent string.
    pub user_agent: String,

    /// Maximum in-flight requests per batched call.
    pub max_concurrency: usize,

    /// How long before expiry an issued token is replaced.
    pub token_skew: Duration,

    /// First wait between polls of an asynchronous run; doubles after each poll.
    pub poll_interval: Duration,

    /// Subscriber that receives the SDK's log events instead of the global one.
    pub log_dispatch: Option<Dispatch>,
}

impl VaultConfig {
    /// Creates a configuration for a vault.
    #[must_use]
    pub fn new(vault_id: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            vault_id: vault_id.into(),
            cluster_id: None,
            vault_url: None,
            env: Env::default(),
            credentials,
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
            user_agent: crate::USER_AGENT.to_string(),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            token_skew: DEFAULT_TOKEN_SKEW,
            poll_interval: Duration::from_secs(1),
            log_dispatch: None,
        }
    }

    /// Sets the cluster identifier.
    #[must_use]
    pub fn with_cluster_id(mut self, cluster_id: impl Into<String>) -> Self {
        self.cluster_id = Some(cluster_id.into());
        self
    }

    /// Sets an explicit base URL.
    #[must_use]
    pub fn with_vault_url(mut self, url: impl Into<String>) -> Self {
        self.vault_url = Some(url.into());
        self
    }

    /// Sets the environment.
    #[must_use]
    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    /// Sets the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the connection timeout.
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the fan-out concurrency limit.
    #[must_use]
    pub fn with_max_concurrency(mut self, limit: usize) -> Self {
        self.max_concurrency = limit;
        self
    }

    /// Sets the token expiry skew.
    #[must_use]
    pub fn with_token_skew(mut self, skew: Duration) -> Self {
        self.token_skew = skew;
        self
    }

    /// Sets the first polling interval of asynchronous runs.
    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Routes log events to a dedicated subscriber.
    #[must_use]
    pub fn with_log_dispatch(mut self, dispatch: Dispatch) -> Self {
        self.log_dispatch = Some(dispatch);
        self
    }

    /// Routes log events at `level` and above to a formatted stderr subscriber.
    #[must_use]
    pub fn with_log_level(self, level: LogLevel) -> Self {
        self.with_log_dispatch(logging::dispatch(level))
    }

    /// Resolves the base URL, without a trailing slash.
    pub fn base_url(&self) -> Result<String> {
        let raw = match (&self.vault_url, &self.cluster_id) {
            (Some(url), _) => url.trim_end_matches('/').to_string(),
            (None, Some(cluster)) if !cluster.trim().is_empty() => {
                format!("https://{}.{}", cluster.trim(), self.env.vault_domain())
            }
            _ => {
                return Err(Error::config(
                    "Either vault_url or cluster_id must be provided",
                ))
            }
        };

        Url::parse(&raw)?;
        Ok(raw)
    }

    /// Checks the configuration without contacting the vault.
    pub fn validate(&self) -> Result<()> {
        if self.vault_id.trim().is_empty() {
            return Err(Error::config("vault_id must not be empty"));
        }
        if self.max_concurrency == 0 {
            return Err(Error::config("max_concurrency must be at least 1"));
        }
        if self.poll_interval.is_zero() {
            return Err(Error::config("poll_interval must be positive"));
        }
        self.base_url().map(|_| ())
    }
}
