//! Login user types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Prefix of generated login user ids (`LoginUser:1`, `LoginUser:2`, ...).
pub const USER_ID_PREFIX: &str = "LoginUser:";

/// A user who can log in with a password.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Document id, `LoginUser:<n>`.
    pub id: String,

    /// Login name.
    pub username: String,

    /// Argon2id PHC hash of the password.
    ///
    /// Never expose this field through an API.
    pub password_hash: String,

    /// Granted authorities (roles).
    #[serde(default)]
    pub authorities: BTreeSet<String>,

    /// Whether the account is enabled.
    pub enabled: bool,

    /// Whether the account is still within its validity period.
    pub account_non_expired: bool,

    /// Whether the account is unlocked.
    pub account_non_locked: bool,

    /// Whether the credentials are still valid.
    pub credentials_non_expired: bool,
}

impl User {
    /// Returns `true` if every account status flag allows login.
    #[must_use]
    pub fn can_login(&self) -> bool {
        self.enabled
            && self.account_non_expired
            && self.account_non_locked
            && self.credentials_non_expired
    }

    /// Returns `true` if the user holds `authority`.
    #[must_use]
    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }

    /// Parses the numeric sequence out of a `LoginUser:<n>` id.
    #[must_use]
    pub fn id_sequence(id: &str) -> Option<u64> {
        id.strip_prefix(USER_ID_PREFIX)?.parse().ok()
    }
}

/// Registration request for a new login user.
#[derive(Debug, Clone, Deserialize)]
pub struct NewLoginUser {
    /// Login name.
    pub username: String,

    /// Plaintext password. Hashed before storage.
    pub password: String,

    /// Authorities to grant.
    #[serde(default)]
    pub authorities: Vec<String>,
}
