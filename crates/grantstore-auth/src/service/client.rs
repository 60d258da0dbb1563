//! Client details service.
//!
//! Resolves a client id against the client registry and renders the
//! registration into [`ClientDetails`]. Unknown clients are an error, not an
//! absent value: the caller is in the middle of authenticating a client and
//! must fail the request.

use std::sync::Arc;

use tracing::debug;

use crate::AuthResult;
use crate::error::AuthError;
use crate::storage::ClientStorage;
use crate::types::ClientDetails;

/// Read-only client lookup.
pub struct ClientDetailsService {
    storage: Arc<dyn ClientStorage>,
}

impl ClientDetailsService {
    /// Creates a service over the given registry.
    #[must_use]
    pub fn new(storage: Arc<dyn ClientStorage>) -> Self {
        Self { storage }
    }

    /// Loads the details of a registered client.
    ///
    /// # Errors
    ///
    /// - `AuthError::ClientNotFound` if no client has this id
    /// - `AuthError::Storage` if the registry lookup fails
    pub async fn load_client_by_client_id(&self, client_id: &str) -> AuthResult<ClientDetails> {
        let registration = self
            .storage
            .find_by_client_id(client_id)
            .await?
            .ok_or_else(|| AuthError::client_not_found(client_id))?;

        debug!(client_id, "Loaded client details");
        Ok(ClientDetails::from_registration(&registration))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryClientStorage;
    use crate::types::ClientRegistration;

    #[tokio::test]
    async fn test_load_known_client() {
        let mut registration = ClientRegistration::new("web-app");
        registration.scope = vec!["read".to_string()];
        let service =
            ClientDetailsService::new(Arc::new(InMemoryClientStorage::new(vec![registration])));

        let details = service.load_client_by_client_id("web-app").await.unwrap();
        assert_eq!(details.client_id, "web-app");
        assert!(details.scope.contains("read"));
    }

    #[test]
    fn test_unknown_client() {
        let service = ClientDetailsService::new(Arc::new(InMemoryClientStorage::default()));

        let err = tokio_test::block_on(service.load_client_by_client_id("ghost")).unwrap_err();
        assert!(matches!(err, AuthError::ClientNotFound { ref client_id } if client_id == "ghost"));
        assert_eq!(err.to_string(), "Client with id ghost not found");
    }
}
