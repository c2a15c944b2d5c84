//! Error types for the SDK.
//!
//! Every operation returns [`Result<T>`]. Failures raised before any network
//! call are [`Error::Validation`]; failures of batched per-record calls are
//! folded into [`Error::Aggregate`], which carries every record that did
//! succeed so callers can recover them.

use serde::{Deserialize, Serialize};

use crate::batch::AggregateResult;
use crate::models::VaultRecord;

/// The main error type for all SDK operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A precondition failed before any request was sent.
    #[error("Validation failed: {message}")]
    Validation {
        /// What was invalid.
        message: String,
    },

    /// A bearer token could not be obtained.
    #[error("Authentication failed: {message}")]
    Auth {
        /// Error message.
        message: String,
        /// HTTP status returned by the token endpoint, if any.
        status: Option<u16>,
    },

    /// A token could not be decoded as a JWT.
    #[error("Invalid token: {message}")]
    TokenDecode {
        /// Decoder message.
        message: String,
    },

    /// A single (non batched) API call failed.
    #[error("API error ({code}): {message}")]
    Api {
        /// HTTP status code, or the `http_code` of the error envelope.
        code: u16,
        /// Error description, with the request id appended when known.
        message: String,
        /// Value of the `x-request-id` response header.
        request_id: Option<String>,
    },

    /// One or more records of a batched call failed.
    #[error("{} of {} records failed", .0.errors.len(), .0.len())]
    Aggregate(Box<AggregateResult<VaultRecord>>),

    /// Network or connection error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Error building the client configuration.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message.
        message: String,
    },

    /// Error serializing a request or deserializing a response.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// IO error while reading credentials or files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates an authentication error.
    pub fn auth(message: impl Into<String>, status: Option<u16>) -> Self {
        Self::Auth {
            message: message.into(),
            status,
        }
    }

    /// Creates a token decode error.
    pub fn token_decode(message: impl Into<String>) -> Self {
        Self::TokenDecode {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Returns true if the error was raised before any request was sent.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation { .. })
    }

    /// Returns the HTTP status code if applicable.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Api { code, .. } => Some(*code),
            Self::Auth { status, .. } => *status,
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns the request ID if available.
    #[must_use]
    pub fn request_id(&self) -> Option<&str> {
        match self {
            Self::Api { request_id, .. } => request_id.as_deref(),
            _ => None,
        }
    }

    /// Returns the batch result carried by an [`Error::Aggregate`].
    #[must_use]
    pub fn aggregate(&self) -> Option<&AggregateResult<VaultRecord>> {
        match self {
            Self::Aggregate(result) => Some(result),
            _ => None,
        }
    }

    /// Consumes the error, returning the batch result it carries.
    #[must_use]
    pub fn into_aggregate(self) -> Option<AggregateResult<VaultRecord>> {
        match self {
            Self::Aggregate(result) => Some(*result),
            _ => None,
        }
    }
}

/// Uniform error body returned by the vault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorEnvelope {
    /// Error details.
    pub error: ApiErrorBody,
}

/// Inner part of [`ApiErrorEnvelope`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    /// HTTP code reported by the server.
    #[serde(default)]
    pub http_code: Option<u16>,
    /// Human-readable message.
    pub message: String,
    /// HTTP status text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<String>,
    /// gRPC status code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grpc_code: Option<i32>,
    /// Additional details.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<serde_json::Value>>,
}

impl ApiErrorEnvelope {
    /// Builds a failure description for a non-2xx response.
    ///
    /// Returns the code and message taken from the envelope when the body
    /// parses as one, otherwise the HTTP status and the raw body. The request
    /// id, when known, is appended as `" - request id: <id>"`.
    #[must_use]
    pub fn describe(status: u16, body: &[u8], request_id: Option<&str>) -> (u16, String) {
        let (code, mut message) = match serde_json::from_slice::<Self>(body) {
            Ok(envelope) => (
                envelope.error.http_code.unwrap_or(status),
                envelope.error.message,
            ),
            Err(_) if body.is_empty() => (
                status,
                reqwest::StatusCode::from_u16(status)
                    .ok()
                    .and_then(|s| s.canonical_reason())
                    .unwrap_or("Unknown error")
                    .to_string(),
            ),
            Err(_) => (status, String::from_utf8_lossy(body).into_owned()),
        };

        if let Some(id) = request_id {
            message.push_str(" - request id: ");
            message.push_str(id);
        }

        (code, message)
    }

    /// Converts a failed response into an [`Error::Api`].
    #[must_use]
    pub fn into_error(status: u16, body: &[u8], request_id: Option<String>) -> Error {
        let (code, message) = Self::describe(status, body, request_id.as_deref());
        Error::Api {
            code,
            message,
            request_id,
        }
    }
}

/// Result type alias for SDK operations.
pub type Result<T> = std::result::Result<T, Error>;
