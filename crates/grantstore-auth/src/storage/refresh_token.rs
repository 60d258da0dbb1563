//! Refresh token record storage trait.
//!
//! Refresh token records are linked one way: an access token record knows
//! its refresh key, the refresh token record knows nothing about the access
//! token. Deleting either never cascades inside the storage layer.

use async_trait::async_trait;

use crate::AuthResult;
use crate::token::key::TokenKey;
use crate::types::RefreshTokenRecord;

/// Storage trait for refresh token records.
#[async_trait]
pub trait RefreshTokenStorage: Send + Sync {
    /// Stores a refresh token record.
    ///
    /// A record already stored under the same `token_key` is replaced, so a
    /// token key never resolves to more than one record.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn save(&self, record: &RefreshTokenRecord) -> AuthResult<()>;

    /// Finds the record with the given token key.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_token_key(&self, token_key: &TokenKey)
    -> AuthResult<Option<RefreshTokenRecord>>;

    /// Deletes a record by id.
    ///
    /// # Returns
    ///
    /// `true` if a record was removed, `false` if none existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn delete(&self, record_id: &str) -> AuthResult<bool>;
}
