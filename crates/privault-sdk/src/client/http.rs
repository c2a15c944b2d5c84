//! HTTP client wrapper.
//!
//! Requests are sent once: the SDK never retries. Non-2xx responses are not
//! errors at this layer; callers decide whether a failure aborts the call or
//! becomes one entry of a batch result.

use bytes::Bytes;
use reqwest::{Client, Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, instrument};

use crate::batch::RecordError;
use crate::error::{ApiErrorEnvelope, Error, Result};

use super::config::VaultConfig;

/// Header carrying the vault's request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// A response whose body has been read.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// HTTP status.
    pub status: StatusCode,
    /// Value of the `x-request-id` header.
    pub request_id: Option<String>,
    /// Response body.
    pub body: Bytes,
}

impl RawResponse {
    /// Returns true for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Parses the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|e| {
            debug!("Failed to parse response: {}", String::from_utf8_lossy(&self.body));
            Error::Serialization(e)
        })
    }

    /// Describes a failed response as a per-record error.
    #[must_use]
    pub fn failure(&self) -> RecordError {
        let (code, description) =
            ApiErrorEnvelope::describe(self.status.as_u16(), &self.body, self.request_id.as_deref());
        RecordError {
            index: 0,
            code: Some(code),
            description,
            request_id: self.request_id.clone(),
        }
    }

    /// Converts a failed response into an [`Error::Api`].
    #[must_use]
    pub fn into_api_error(self) -> Error {
        ApiErrorEnvelope::into_error(self.status.as_u16(), &self.body, self.request_id)
    }

    /// Parses a successful body, or fails with [`Error::Api`].
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T> {
        if self.is_success() {
            self.json()
        } else {
            Err(self.into_api_error())
        }
    }
}

/// Internal HTTP client.
#[derive(Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
}

impl HttpClient {
    /// Creates a new HTTP client.
    pub fn new(config: &VaultConfig) -> Result<Self> {
        let base_url = config.base_url()?;
        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(&config.user_agent)
            .gzip(true)
            .brotli(true)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self { client, base_url })
    }

    /// The underlying client, shared with the token issuer.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    /// Resolved base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the full URL for an API path.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Makes a GET request.
    #[instrument(skip(self, query, token), fields(url = %path))]
    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
        token: &SecretString,
    ) -> Result<RawResponse> {
        self.send(Method::GET, path, query, Option::<&()>::None, token)
            .await
    }

    /// Makes a POST request.
    #[instrument(skip(self, body, token), fields(url = %path))]
    pub async fn post<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        token: &SecretString,
    ) -> Result<RawResponse> {
        self.send(Method::POST, path, &[], Some(body), token).await
    }

    /// Makes a PUT request.
    #[instrument(skip(self, body, token), fields(url = %path))]
    pub async fn put<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        token: &SecretString,
    ) -> Result<RawResponse> {
        self.send(Method::PUT, path, &[], Some(body), token).await
    }

    /// Makes a DELETE request.
    #[instrument(skip(self, token), fields(url = %path))]
    pub async fn delete(&self, path: &str, token: &SecretString) -> Result<RawResponse> {
        self.send(Method::DELETE, path, &[], Option::<&()>::None, token)
            .await
    }

    /// Sends one request and reads the whole body.
    ///
    /// Only transport failures are errors; any HTTP status is returned.
    pub async fn send<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&B>,
        token: &SecretString,
    ) -> Result<RawResponse> {
        let mut request = self
            .client
            .request(method, self.url(path))
            .bearer_auth(token.expose_secret())
            .header("Accept", "application/json");

        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(b) = body {
            request = request.json(b);
        }

        let response = request.send().await?;
        let status = response.status();
        let request_id = response
            .headers()
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        let body = response.bytes().await?;

        debug!(status = %status, request_id = ?request_id, "Received response");
        Ok(RawResponse {
            status,
            request_id,
            body,
        })
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}
