//! Login user storage trait.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::User;

/// Storage operations for login users.
#[async_trait]
pub trait UserStorage: Send + Sync {
    /// Find users by login name.
    ///
    /// Usernames are not unique at the storage level; callers take the first
    /// match. An empty list means the user is unknown.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_username(&self, username: &str) -> AuthResult<Vec<User>>;

    /// Returns the id with the highest numeric sequence among ids that start
    /// with `prefix`, or `None` if there are none.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn latest_id_with_prefix(&self, prefix: &str) -> AuthResult<Option<String>>;

    /// Insert a user whose id is not taken yet.
    ///
    /// Returns `false` and leaves storage untouched if a user with the same
    /// id already exists. The check and the insert are one atomic step.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn create(&self, user: &User) -> AuthResult<bool>;

    /// Create or replace a user.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn save(&self, user: &User) -> AuthResult<()>;
}
