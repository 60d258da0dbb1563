//! Login user service.
//!
//! Looks users up by name, checks their passwords and registers new ones.
//! New users get sequential document ids: `LoginUser:1`, `LoginUser:2`, ...

use std::sync::Arc;

use tracing::{debug, error};

use crate::AuthResult;
use crate::error::AuthError;
use crate::password::{hash_password, verify_password};
use crate::storage::UserStorage;
use crate::types::user::USER_ID_PREFIX;
use crate::types::{NewLoginUser, User};

/// How many consecutive ids registration tries before giving up.
const MAX_ID_ATTEMPTS: u64 = 64;

/// Login user lookup and registration.
pub struct UserService {
    storage: Arc<dyn UserStorage>,
}

impl UserService {
    /// Creates a service over the given user storage.
    #[must_use]
    pub fn new(storage: Arc<dyn UserStorage>) -> Self {
        Self { storage }
    }

    /// Loads a user by login name. The first match wins.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage lookup fails.
    pub async fn load_user_by_username(&self, username: &str) -> AuthResult<Option<User>> {
        Ok(self
            .storage
            .find_by_username(username)
            .await?
            .into_iter()
            .next())
    }

    /// Checks a username/password pair.
    ///
    /// Returns the user only if the password matches and the account may log
    /// in. Unknown users, wrong passwords and disabled, locked or expired
    /// accounts all yield `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage lookup fails or the stored hash is
    /// malformed.
    pub async fn authenticate(&self, username: &str, password: &str) -> AuthResult<Option<User>> {
        let Some(user) = self.load_user_by_username(username).await? else {
            debug!(username, "Unknown user");
            return Ok(None);
        };

        if !verify_password(password, &user.password_hash)? {
            debug!(username, "Password mismatch");
            return Ok(None);
        }

        if !user.can_login() {
            debug!(username, "Account cannot log in");
            return Ok(None);
        }

        Ok(Some(user))
    }

    /// Registers a new login user.
    ///
    /// The password is hashed before storage and the account starts enabled,
    /// unexpired and unlocked. An existing user is never overwritten: if the
    /// next id is taken by a concurrent registration the following one is
    /// tried.
    ///
    /// # Errors
    ///
    /// Returns an error if hashing or storage fails, or `AuthError::Conflict`
    /// if no free id was found. Failures are logged.
    pub async fn save_new_login_user(&self, new_user: NewLoginUser) -> AuthResult<User> {
        let result = self.build_and_save(new_user).await;
        if let Err(e) = &result {
            error!(error = %e, "Failed to register new login user");
        }
        result
    }

    async fn build_and_save(&self, new_user: NewLoginUser) -> AuthResult<User> {
        let mut sequence = self
            .storage
            .latest_id_with_prefix(USER_ID_PREFIX)
            .await?
            .as_deref()
            .and_then(User::id_sequence)
            .map_or(1, |n| n + 1);

        let mut user = User {
            id: format!("{USER_ID_PREFIX}{sequence}"),
            username: new_user.username,
            password_hash: hash_password(&new_user.password)?,
            authorities: new_user.authorities.into_iter().collect(),
            enabled: true,
            account_non_expired: true,
            account_non_locked: true,
            credentials_non_expired: true,
        };

        // Concurrent registrations may claim the same id; move to the next one.
        for _ in 0..MAX_ID_ATTEMPTS {
            if self.storage.create(&user).await? {
                debug!(user_id = %user.id, username = %user.username, "Registered login user");
                return Ok(user);
            }
            debug!(user_id = %user.id, "User id taken, trying next sequence");
            sequence += 1;
            user.id = format!("{USER_ID_PREFIX}{sequence}");
        }

        Err(AuthError::conflict(format!(
            "no free user id after {MAX_ID_ATTEMPTS} attempts, last tried {}",
            user.id
        )))
    }
}
