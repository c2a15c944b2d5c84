//! Types shared by several operations.

use serde::{Deserialize, Serialize};

/// A record's column values, keyed by column name.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// Display policy applied by the vault when returning sensitive values.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RedactionType {
    /// The column's configured default.
    #[default]
    Default,
    /// Fully redacted.
    Redacted,
    /// Partially masked.
    Masked,
    /// Plain text.
    PlainText,
}

impl std::fmt::Display for RedactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Default => write!(f, "DEFAULT"),
            Self::Redacted => write!(f, "REDACTED"),
            Self::Masked => write!(f, "MASKED"),
            Self::PlainText => write!(f, "PLAIN_TEXT"),
        }
    }
}

/// Bring-your-own-token mode of an insert or update call.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenMode {
    /// The vault generates every token; callers may not supply any.
    #[default]
    Disable,
    /// Every record supplies tokens for some of its fields.
    Enable,
    /// Every record supplies a token for each of its fields.
    EnableStrict,
}

impl std::fmt::Display for TokenMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disable => write!(f, "DISABLE"),
            Self::Enable => write!(f, "ENABLE"),
            Self::EnableStrict => write!(f, "ENABLE_STRICT"),
        }
    }
}
