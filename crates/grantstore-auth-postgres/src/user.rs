//! Login user storage.
//!
//! Users are stored as JSONB with the username lifted into its own column
//! for lookup. Ids follow a `<prefix><n>` sequence allocated by the user
//! service; `create` never overwrites an existing id, so two registrations
//! racing for the same sequence number cannot clobber each other.

use std::sync::Arc;

use async_trait::async_trait;
use grantstore_auth::AuthResult;
use grantstore_auth::storage::UserStorage;
use grantstore_auth::types::User;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;

use crate::{PgPool, StorageResult};

/// PostgreSQL login user storage.
#[derive(Clone)]
pub struct PostgresUserStorage {
    pool: Arc<PgPool>,
}

impl PostgresUserStorage {
    /// Create a new user storage over a shared pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn find(&self, username: &str) -> StorageResult<Vec<User>> {
        let rows: Vec<(serde_json::Value,)> =
            query_as("SELECT resource FROM login_user WHERE username = $1 ORDER BY id")
                .bind(username)
                .fetch_all(&*self.pool)
                .await?;

        rows.into_iter()
            .map(|(json,)| serde_json::from_value(json).map_err(Into::into))
            .collect()
    }

    async fn latest_id(&self, prefix: &str) -> StorageResult<Option<String>> {
        let row: Option<(String,)> = query_as(
            r#"
            SELECT id
            FROM login_user
            WHERE starts_with(id, $1)
              AND substr(id, length($1) + 1) ~ '^[0-9]+$'
            ORDER BY substr(id, length($1) + 1)::bigint DESC
            LIMIT 1
            "#,
        )
        .bind(prefix)
        .fetch_optional(&*self.pool)
        .await?;

        Ok(row.map(|(id,)| id))
    }

    async fn insert(&self, user: &User) -> StorageResult<bool> {
        let json = serde_json::to_value(user)?;
        let result = query(
            r#"
            INSERT INTO login_user (id, username, resource)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&json)
        .execute(&*self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn upsert(&self, user: &User) -> StorageResult<()> {
        let json = serde_json::to_value(user)?;
        query(
            r#"
            INSERT INTO login_user (id, username, resource)
            VALUES ($1, $2, $3)
            ON CONFLICT (id) DO UPDATE SET
                username = EXCLUDED.username,
                resource = EXCLUDED.resource,
                updated_at = NOW()
            "#,
        )
        .bind(&user.id)
        .bind(&user.username)
        .bind(&json)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl UserStorage for PostgresUserStorage {
    async fn find_by_username(&self, username: &str) -> AuthResult<Vec<User>> {
        Ok(self.find(username).await?)
    }

    async fn latest_id_with_prefix(&self, prefix: &str) -> AuthResult<Option<String>> {
        Ok(self.latest_id(prefix).await?)
    }

    async fn create(&self, user: &User) -> AuthResult<bool> {
        Ok(self.insert(user).await?)
    }

    async fn save(&self, user: &User) -> AuthResult<()> {
        Ok(self.upsert(user).await?)
    }
}
