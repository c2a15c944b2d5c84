//! Data models for the SDK.
//!
//! This module contains the request and response types used by the vault and
//! detect services.

mod auth;
mod common;
mod detect;
mod records;

pub use auth::*;
pub use common::*;
pub use detect::*;
pub use records::*;
