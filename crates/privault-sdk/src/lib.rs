//! # Privault SDK
//!
//! Rust SDK for privacy vaults: store, fetch, tokenize and detokenize
//! sensitive records, and detect and de-identify PII in text and files.
//!
//! ## Features
//!
//! - **Type-safe API client** - Fully typed request/response models
//! - **Async-first design** - Built on tokio, with bounded per-record fan-out
//! - **Partial results** - Batched calls report every failed record and keep
//!   every record that succeeded
//! - **Token lifecycle** - Service-account tokens are issued, cached and
//!   re-issued before they expire
//! - **Bring your own token** - Caller supplied tokens are checked before any
//!   request is sent
//! - **File jobs** - De-identification runs are polled with doubling backoff
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use privault_sdk::{Credentials, DetokenizeRequest, VaultClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), privault_sdk::Error> {
//!     let client = VaultClient::builder()
//!         .vault_id("a1b2c3")
//!         .cluster_id("ebfc9bee4242")
//!         .credentials(Credentials::path("credentials.json"))
//!         .build()?;
//!
//!     let values = client
//!         .vault()
//!         .detokenize(DetokenizeRequest::new(["4017-f72b-4f5c-9b8e"]))
//!         .await?;
//!
//!     for record in values {
//!         println!("{} => {}", record.token, record.value);
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Authentication
//!
//! Exactly one credential source must be given.
//!
//! ### Service account
//! ```rust,no_run
//! # use privault_sdk::{Credentials, VaultClient};
//! let credentials = Credentials::path("credentials.json").with_roles(["role-id"]);
//! let client = VaultClient::builder()
//!     .vault_id("a1b2c3")
//!     .cluster_id("ebfc9bee4242")
//!     .credentials(credentials)
//!     .build()?;
//! # Ok::<(), privault_sdk::Error>(())
//! ```
//!
//! ### API Key
//! ```rust,no_run
//! # use privault_sdk::VaultClient;
//! let client = VaultClient::builder()
//!     .vault_id("a1b2c3")
//!     .vault_url("https://vault.example.com")
//!     .api_key("sky-xxxxx")
//!     .build()?;
//! # Ok::<(), privault_sdk::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! All operations return `Result<T, privault_sdk::Error>`. A batched call in
//! which some records failed returns [`Error::Aggregate`], which still
//! carries the records that succeeded:
//!
//! ```rust,no_run
//! # use privault_sdk::{VaultClient, DeleteRequest};
//! # async fn example(client: VaultClient) {
//! let request = DeleteRequest::new("cards", vec!["id-1".into(), "id-2".into()]);
//! match client.vault().delete(request).await {
//!     Ok(deleted) => println!("Deleted {}", deleted.len()),
//!     Err(privault_sdk::Error::Aggregate(result)) => {
//!         for error in &result.errors {
//!             eprintln!("record {}: {}", error.index, error.description);
//!         }
//!     }
//!     Err(privault_sdk::Error::Validation { message }) => eprintln!("Rejected: {message}"),
//!     Err(e) => eprintln!("Error: {e}"),
//! }
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod auth;
pub mod batch;
pub mod client;
pub mod error;
pub mod logging;
pub mod models;
pub mod poller;
pub mod validation;

// Re-export main types
pub use auth::{generate_bearer_token, Credentials};
pub use batch::{AggregateResult, RecordError};
pub use client::{DetectService, Env, VaultClient, VaultClientBuilder, VaultConfig, VaultService};
pub use error::{Error, Result};
pub use logging::LogLevel;

// Re-export model types for convenience
pub use models::{
    DeidentifyFileRequest, DeidentifyFileResponse, DeidentifyTextRequest, DeidentifyTextResponse,
    DeleteRequest, DeletedRecord, DetectEntity, DetokenizeRequest, DetokenizedRecord,
    FetchedRecord, FileInput, GetRequest, InsertRecord, InsertRequest, InsertedRecord,
    QueryRequest, RedactionType, ReidentifyTextRequest, ReidentifyTextResponse, RunStatus,
    TokenFormat, TokenMode, TokenizeRequest, TokenizedValue, UpdateRecord, UpdateRequest,
    UpdatedRecord, VaultRecord,
};

/// SDK version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User agent string for API requests
pub const USER_AGENT: &str = concat!("privault-sdk-rust/", env!("CARGO_PKG_VERSION"));
