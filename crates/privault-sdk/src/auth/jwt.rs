//! JWT expiry inspection.
//!
//! Tokens are decoded without verifying their signature or audience: the
//! client never holds the vault's verification key and only needs `exp`.

use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct ExpiryClaim {
    exp: i64,
}

/// Reads the `exp` claim of a JWT.
pub fn decode_expiry(token: &str) -> Result<DateTime<Utc>> {
    if token.trim().is_empty() {
        return Err(Error::token_decode("token is empty"));
    }

    let mut validation = Validation::new(Algorithm::RS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    let data = decode::<ExpiryClaim>(token, &DecodingKey::from_secret(&[]), &validation)
        .map_err(|e| Error::token_decode(e.to_string()))?;

    DateTime::from_timestamp(data.claims.exp, 0)
        .ok_or_else(|| Error::token_decode(format!("exp claim {} is out of range", data.claims.exp)))
}

/// Returns true when the token is expired or cannot be decoded.
#[must_use]
pub fn is_expired(token: &str) -> bool {
    decode_expiry(token).map_or(true, |exp| exp <= Utc::now())
}

/// A token is stale unless `now + skew` is strictly before its expiry.
pub(crate) fn is_stale(expires_at: DateTime<Utc>, now: DateTime<Utc>, skew: chrono::Duration) -> bool {
    now + skew >= expires_at
}
