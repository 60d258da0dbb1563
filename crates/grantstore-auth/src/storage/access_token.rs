//! Access token record storage trait.
//!
//! # Consistency
//!
//! Two invariants hold over live records:
//!
//! - no two records share a `token_key`
//! - no two records share an `authentication_key`
//!
//! Both are enforced by [`AccessTokenStorage::save`], which must evict
//! conflicting records and insert the new one as a single atomic step.
//! A read-then-insert sequence would let two concurrent re-issuances for the
//! same grant both observe "no record" and both insert.

use async_trait::async_trait;

use crate::AuthResult;
use crate::token::key::TokenKey;
use crate::types::AccessTokenRecord;

/// Storage trait for access token records.
///
/// # Implementations
///
/// - [`crate::storage::memory::InMemoryTokenRecordStorage`]
/// - `grantstore-auth-postgres` - PostgreSQL storage backend
#[async_trait]
pub trait AccessTokenStorage: Send + Sync {
    /// Stores `record`, atomically evicting every live record that shares
    /// its `token_key` or its `authentication_key`.
    ///
    /// # Returns
    ///
    /// The evicted records (usually none or one).
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails. Nothing is evicted
    /// in that case.
    async fn save(&self, record: &AccessTokenRecord) -> AuthResult<Vec<AccessTokenRecord>>;

    /// Finds the live record with the given token key.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_token_key(&self, token_key: &TokenKey)
    -> AuthResult<Option<AccessTokenRecord>>;

    /// Finds the live record issued for the given authentication fingerprint.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_authentication_key(
        &self,
        authentication_key: &TokenKey,
    ) -> AuthResult<Option<AccessTokenRecord>>;

    /// Finds the live record linked to the given refresh token key.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_refresh_key(
        &self,
        refresh_key: &TokenKey,
    ) -> AuthResult<Option<AccessTokenRecord>>;

    /// Lists live records for a client.
    ///
    /// Runs concurrently with writes and may miss writes that commit while
    /// it runs.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Vec<AccessTokenRecord>>;

    /// Lists live records for a client and user.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_client_id_and_username(
        &self,
        client_id: &str,
        username: &str,
    ) -> AuthResult<Vec<AccessTokenRecord>>;

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
