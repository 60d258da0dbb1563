//! Client registration storage.

use std::sync::Arc;

use async_trait::async_trait;
use grantstore_auth::AuthResult;
use grantstore_auth::storage::ClientStorage;
use grantstore_auth::types::ClientRegistration;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;

use crate::{PgPool, StorageResult};

/// PostgreSQL client registry.
///
/// Registrations are stored whole as JSONB, keyed by client id.
#[derive(Clone)]
pub struct PostgresClientStorage {
    pool: Arc<PgPool>,
}

impl PostgresClientStorage {
    /// Create a new client storage over a shared pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn find(&self, client_id: &str) -> StorageResult<Option<ClientRegistration>> {
        let row: Option<(serde_json::Value,)> =
            query_as("SELECT registration FROM oauth_client WHERE client_id = $1")
                .bind(client_id)
                .fetch_optional(&*self.pool)
                .await?;

        Ok(row.map(|(json,)| serde_json::from_value(json)).transpose()?)
    }

    async fn upsert(&self, registration: &ClientRegistration) -> StorageResult<()> {
        let json = serde_json::to_value(registration)?;
        query(
            r#"
            INSERT INTO oauth_client (client_id, registration)
            VALUES ($1, $2)
            ON CONFLICT (client_id) DO UPDATE SET
                registration = EXCLUDED.registration,
                updated_at = NOW()
            "#,
        )
        .bind(&registration.client_id)
        .bind(&json)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl ClientStorage for PostgresClientStorage {
    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Option<ClientRegistration>> {
        Ok(self.find(client_id).await?)
    }

    async fn save(&self, registration: &ClientRegistration) -> AuthResult<()> {
        Ok(self.upsert(registration).await?)
    }
}
