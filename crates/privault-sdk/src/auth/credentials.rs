//! Credential sources.

use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::error::{Error, Result};

/// Credential material as supplied by the host application.
///
/// Exactly one of `api_key`, `token`, `path` and `credentials_string` must
/// be set. `roles` and `context` scope tokens issued from a service-account
/// key and are ignored for static credentials.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credentials {
    /// Static API key.
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Static bearer token.
    #[serde(default)]
    pub token: Option<SecretString>,
    /// Path to a service-account key file.
    #[serde(default)]
    pub path: Option<PathBuf>,
    /// Inline service-account key JSON.
    #[serde(default)]
    pub credentials_string: Option<SecretString>,
    /// Roles the issued token is scoped to.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Context claim embedded in the signed assertion.
    #[serde(default)]
    pub context: Option<String>,
}

impl Credentials {
    /// Credentials from a static API key.
    #[must_use]
    pub fn api_key(key: impl Into<String>) -> Self {
        Self {
            api_key: Some(SecretString::new(key.into())),
            ..Self::default()
        }
    }

    /// Credentials from a static bearer token.
    #[must_use]
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            token: Some(SecretString::new(token.into())),
            ..Self::default()
        }
    }

    /// Credentials from a service-account key file.
    #[must_use]
    pub fn path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    /// Credentials from inline service-account key JSON.
    #[must_use]
    pub fn credentials_string(json: impl Into<String>) -> Self {
        Self {
            credentials_string: Some(SecretString::new(json.into())),
            ..Self::default()
        }
    }

    /// Scopes issued tokens to roles.
    #[must_use]
    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a context claim to issued tokens.
    #[must_use]
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = |set: bool| if set { Some("[REDACTED]") } else { None };
        f.debug_struct("Credentials")
            .field("api_key", &redacted(self.api_key.is_some()))
            .field("token", &redacted(self.token.is_some()))
            .field("path", &self.path)
            .field("credentials_string", &redacted(self.credentials_string.is_some()))
            .field("roles", &self.roles)
            .field("context", &self.context)
            .finish()
    }
}

/// A service-account key.
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    /// Client id, used as issuer and subject of the assertion.
    #[serde(rename = "clientID")]
    pub client_id: String,
    /// Key id.
    #[serde(rename = "keyID")]
    pub key_id: String,
    /// Token endpoint, also the assertion audience.
    #[serde(rename = "tokenURI")]
    pub token_uri: String,
    #[serde(rename = "privateKey")]
    private_key: SecretString,
}

impl ServiceAccountKey {
    /// Creates a key from its parts.
    #[must_use]
    pub fn new(
        client_id: impl Into<String>,
        key_id: impl Into<String>,
        token_uri: impl Into<String>,
        private_key: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            key_id: key_id.into(),
            token_uri: token_uri.into(),
            private_key: SecretString::new(private_key.into()),
        }
    }

    /// Parses a key from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        let key: Self = serde_json::from_str(json)
            .map_err(|e| Error::validation(format!("Invalid service account key: {e}")))?;
        key.validate()?;
        Ok(key)
    }

    /// Reads and parses a key file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::validation(format!(
                "Unable to read service account key {}: {e}",
                path.display()
            ))
        })?;
        Self::from_json(&json)
    }

    /// PEM encoded RSA private key.
    #[must_use]
    pub fn private_key(&self) -> &SecretString {
        &self.private_key
    }

    fn validate(&self) -> Result<()> {
        let missing = [
            ("clientID", self.client_id.is_empty()),
            ("keyID", self.key_id.is_empty()),
            ("tokenURI", self.token_uri.is_empty()),
            ("privateKey", self.private_key.expose_secret().is_empty()),
        ]
        .into_iter()
        .find(|(_, empty)| *empty);

        match missing {
            Some((field, _)) => Err(Error::validation(format!(
                "Service account key is missing {field}"
            ))),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_id", &self.client_id)
            .field("key_id", &self.key_id)
            .field("token_uri", &self.token_uri)
            .field("private_key", &"[REDACTED]")
            .finish()
    }
}

/// A validated credential: exactly one source.
#[derive(Clone)]
pub enum Credential {
    /// Static API key, sent as a bearer token.
    ApiKey(SecretString),
    /// Static bearer token.
    BearerToken(SecretString),
    /// Service-account key loaded from a file.
    ServiceAccountKey(Box<ServiceAccountKey>),
    /// Inline service-account key JSON, parsed when the token manager is built.
    CredentialBlob(SecretString),
}

impl Credential {
    /// Returns the service-account key behind this credential, parsing the
    /// blob variant.
    pub fn service_account_key(&self) -> Result<Option<ServiceAccountKey>> {
        match self {
            Self::ServiceAccountKey(key) => Ok(Some(key.as_ref().clone())),
            Self::CredentialBlob(json) => ServiceAccountKey::from_json(json.expose_secret()).map(Some),
            Self::ApiKey(_) | Self::BearerToken(_) => Ok(None),
        }
    }

    /// Returns true for variants that mint tokens.
    #[must_use]
    pub fn issues_tokens(&self) -> bool {
        matches!(self, Self::ServiceAccountKey(_) | Self::CredentialBlob(_))
    }
}

impl TryFrom<&Credentials> for Credential {
    type Error = Error;

    fn try_from(credentials: &Credentials) -> Result<Self> {
        let present = [
            credentials.api_key.is_some(),
            credentials.token.is_some(),
            credentials.path.is_some(),
            credentials.credentials_string.is_some(),
        ]
        .into_iter()
        .filter(|set| *set)
        .count();

        match present {
            0 => {
                return Err(Error::validation(
                    "Credentials must provide one of api_key, token, path or credentials_string",
                ))
            }
            1 => {}
            _ => {
                return Err(Error::validation(
                    "Multiple credential sources provided; supply exactly one of api_key, token, path or credentials_string",
                ))
            }
        }

        let non_empty = |secret: &SecretString, name: &str| {
            if secret.expose_secret().trim().is_empty() {
                Err(Error::validation(format!("Credential {name} is empty")))
            } else {
                Ok(secret.clone())
            }
        };

        if let Some(key) = &credentials.api_key {
            return non_empty(key, "api_key").map(Self::ApiKey);
        }
        if let Some(token) = &credentials.token {
            return non_empty(token, "token").map(Self::BearerToken);
        }
        if let Some(path) = &credentials.path {
            return ServiceAccountKey::from_file(path).map(|key| Self::ServiceAccountKey(Box::new(key)));
        }
        match &credentials.credentials_string {
            Some(json) => non_empty(json, "credentials_string").map(Self::CredentialBlob),
            None => Err(Error::validation("No credential source provided")),
        }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => write!(f, "Credential::ApiKey([REDACTED])"),
            Self::BearerToken(_) => write!(f, "Credential::BearerToken([REDACTED])"),
            Self::ServiceAccountKey(key) => write!(f, "Credential::ServiceAccountKey({key:?})"),
            Self::CredentialBlob(_) => write!(f, "Credential::CredentialBlob([REDACTED])"),
        }
    }
}
