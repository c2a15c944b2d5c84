//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use privault_sdk::{Credentials, VaultClient};
use serde_json::json;
use wiremock::MockServer;

pub const VAULT_ID: &str = "vault-1";

pub const SERVICE_ACCOUNT_PEM: &str = include_str!("fixtures/service_account_key.pem");

/// Mints an HS256 JWT that expires `ttl_secs` from now.
pub fn jwt_expiring_in(ttl_secs: i64) -> String {
    let exp = Utc::now().timestamp() + ttl_secs;
    encode(
        &Header::default(),
        &json!({"sub": "svc", "exp": exp}),
        &EncodingKey::from_secret(b"test-secret"),
    )
    .expect("mint jwt")
}

/// Service-account key JSON whose token endpoint is the mock server.
pub fn service_account_json(server: &MockServer) -> String {
    json!({
        "clientID": "client-1",
        "keyID": "key-1",
        "tokenURI": format!("{}/token", server.uri()),
        "privateKey": SERVICE_ACCOUNT_PEM,
    })
    .to_string()
}

/// Client pointed at the mock server with the given credentials.
pub fn client_with(server: &MockServer, credentials: Credentials) -> VaultClient {
    VaultClient::builder()
        .vault_id(VAULT_ID)
        .vault_url(server.uri())
        .credentials(credentials)
        .poll_interval(Duration::from_millis(10))
        .build()
        .expect("build client")
}

/// Client authenticating with a static API key.
pub fn api_key_client(server: &MockServer) -> VaultClient {
    client_with(server, Credentials::api_key("test-api-key"))
}

/// Path of a vault resource.
pub fn vault_path(suffix: &str) -> String {
    format!("/v1/vaults/{VAULT_ID}/{suffix}")
}
