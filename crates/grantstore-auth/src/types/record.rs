//! Durable token records.
//!
//! A record pairs a token value object with its derived lookup keys and the
//! authentication it was issued for. Point lookups always go through
//! `token_key`, never through the raw token value.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::token::key::TokenKey;
use crate::types::{AccessToken, Authentication, RefreshToken};

/// Generates an opaque record identifier (two concatenated v4 UUIDs).
#[must_use]
pub fn generate_record_id() -> String {
    format!("{}{}", Uuid::new_v4(), Uuid::new_v4())
}

/// Stored access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessTokenRecord {
    /// Opaque identifier, immutable after creation.
    pub record_id: String,

    /// Derived key of `token.value`. Unique among live records.
    pub token_key: TokenKey,

    /// The full token value object.
    pub token: AccessToken,

    /// Fingerprint of `authentication`. Unique among live records.
    pub authentication_key: TokenKey,

    /// User name, `None` for client-only grants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    /// Client that requested the token.
    pub client_id: String,

    /// The authentication the token was issued for.
    pub authentication: Authentication,

    /// Derived key of the refresh token issued alongside, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_key: Option<TokenKey>,
}

/// Stored refresh token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenRecord {
    /// Opaque identifier, immutable after creation.
    pub record_id: String,

    /// Derived key of `token.value`.
    pub token_key: TokenKey,

    /// The full token value object.
    pub token: RefreshToken,

    /// The authentication the token was issued for.
    pub authentication: Authentication,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_id_shape() {
        let id = generate_record_id();
        assert_eq!(id.len(), 72);
        assert_ne!(id, generate_record_id());
    }
}
