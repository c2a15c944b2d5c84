//! API service implementations.

mod detect;
mod vault;

pub use detect::DetectService;
pub use vault::VaultService;
