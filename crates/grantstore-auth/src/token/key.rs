//! Token key derivation.
//!
//! Raw token values are never used as storage keys. Each value is reduced to
//! a fixed-length surrogate: the MD5 digest of its UTF-8 bytes rendered as 32
//! lowercase hex characters. The key only serves as an index; the raw value
//! remains the secret. The algorithm is fixed so keys written by one process
//! match lookups from any other, and no salt or key is mixed in.

use std::fmt;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};

/// Length of a rendered token key.
pub const TOKEN_KEY_LEN: usize = 32;

/// Derived lookup key for a raw token value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TokenKey(String);

impl TokenKey {
    /// Derives the key for `value`.
    #[must_use]
    pub fn derive(value: &str) -> Self {
        Self(digest_hex(value.as_bytes()))
    }

    /// Wraps an already-derived key read back from storage.
    #[must_use]
    pub fn from_stored(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Returns the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the key and returns the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for TokenKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derives the key for an optional raw value. Absent in, absent out.
#[must_use]
pub fn derive_key(value: Option<&str>) -> Option<TokenKey> {
    value.map(TokenKey::derive)
}

pub(crate) fn digest_hex(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_known_digest() {
        // RFC 1321 test vectors.
        assert_eq!(
            TokenKey::derive("").as_str(),
            "d41d8cd98f00b204e9800998ecf8427e"
        );
        assert_eq!(
            TokenKey::derive("abc").as_str(),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn test_fixed_length_lowercase_hex() {
        for value in ["a", "abc123", "ünïcødé", &"x".repeat(4096)] {
            let key = TokenKey::derive(value);
            assert_eq!(key.as_str().len(), TOKEN_KEY_LEN);
            assert!(
                key.as_str()
                    .chars()
                    .all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c))
            );
        }
    }

    #[test]
    fn test_leading_zero_preserved() {
        // Digest of "jk8ssl" starts with two zero nibbles.
        let key = TokenKey::derive("jk8ssl");
        assert_eq!(key.as_str(), "0000000018e6137ac2caab16074784a6");
    }

    #[test]
    fn test_absent_in_absent_out() {
        assert_eq!(derive_key(None), None);
        assert_eq!(derive_key(Some("abc")), Some(TokenKey::derive("abc")));
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(TokenKey::derive("abc123"), TokenKey::derive("abc123"));
    }

    #[test]
    fn test_distinct_values_distinct_keys() {
        let keys: HashSet<TokenKey> = (0..10_000)
            .map(|i| TokenKey::derive(&format!("token-{i}-{}", uuid::Uuid::new_v4())))
            .collect();
        assert_eq!(keys.len(), 10_000);
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let key = TokenKey::derive("abc");
        let json = serde_json::to_string(&key).unwrap();
        assert_eq!(json, "\"900150983cd24fb0d6963f7d28e17f72\"");
    }
}
