//! Token issuance models.

use serde::{Deserialize, Serialize};

/// Grant type used to exchange a signed assertion for an access token.
pub const JWT_BEARER_GRANT_TYPE: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Body posted to the token endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct TokenRequest {
    /// Always [`JWT_BEARER_GRANT_TYPE`].
    pub grant_type: String,
    /// Signed RS256 assertion.
    pub assertion: String,
    /// Space separated `role:<id>` scopes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl TokenRequest {
    /// Creates a token request for a signed assertion.
    #[must_use]
    pub fn new(assertion: impl Into<String>) -> Self {
        Self {
            grant_type: JWT_BEARER_GRANT_TYPE.to_string(),
            assertion: assertion.into(),
            scope: None,
        }
    }

    /// Scopes the issued token to the given roles.
    #[must_use]
    pub fn with_roles(mut self, roles: &[String]) -> Self {
        if !roles.is_empty() {
            let scope = roles
                .iter()
                .map(|role| format!("role:{role}"))
                .collect::<Vec<_>>()
                .join(" ");
            self.scope = Some(scope);
        }
        self
    }
}

/// Token endpoint response.
///
/// Both the legacy camelCase and the current snake_case field names are
/// accepted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    /// Access token.
    #[serde(rename = "accessToken", alias = "access_token")]
    pub access_token: String,
    /// Token type, usually `Bearer`.
    #[serde(rename = "tokenType", alias = "token_type", default)]
    pub token_type: String,
}
