//! Client registry storage trait.
//!
//! The token store only reads registrations. `save` exists so registries can
//! be seeded by administration tooling and tests.

use async_trait::async_trait;

use crate::AuthResult;
use crate::types::ClientRegistration;

/// Storage operations for client registrations.
#[async_trait]
pub trait ClientStorage: Send + Sync {
    /// Find a registration by its OAuth client_id.
    ///
    /// Returns `None` if the client doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<ClientRegistration>>;

    /// Create or replace a registration.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage operation fails.
    async fn save(&self, registration: &ClientRegistration) -> AuthResult<()>;
}
