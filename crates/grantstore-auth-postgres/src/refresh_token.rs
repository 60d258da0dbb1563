//! Refresh token record storage.
//!
//! One row per refresh token value. Saving a token whose key is already
//! stored overwrites that row in place.

use std::sync::Arc;

use async_trait::async_trait;
use grantstore_auth::AuthResult;
use grantstore_auth::storage::RefreshTokenStorage;
use grantstore_auth::token::TokenKey;
use grantstore_auth::types::RefreshTokenRecord;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use tracing::debug;

use crate::{PgPool, StorageResult};

type RefreshTokenTuple = (String, String, serde_json::Value, serde_json::Value);

fn into_record(row: RefreshTokenTuple) -> StorageResult<RefreshTokenRecord> {
    let (record_id, token_key, token, authentication) = row;
    Ok(RefreshTokenRecord {
        record_id,
        token_key: TokenKey::from_stored(token_key),
        token: serde_json::from_value(token)?,
        authentication: serde_json::from_value(authentication)?,
    })
}

/// PostgreSQL refresh token record storage.
#[derive(Clone)]
pub struct PostgresRefreshTokenStorage {
    pool: Arc<PgPool>,
}

impl PostgresRefreshTokenStorage {
    /// Create a new refresh token storage over a shared pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn upsert(&self, record: &RefreshTokenRecord) -> StorageResult<()> {
        let token_json = serde_json::to_value(&record.token)?;
        let authentication_json = serde_json::to_value(&record.authentication)?;

        query(
            r#"
            INSERT INTO oauth_refresh_token (record_id, token_key, token, authentication)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (token_key) DO UPDATE SET
                record_id = EXCLUDED.record_id,
                token = EXCLUDED.token,
                authentication = EXCLUDED.authentication,
                created_at = NOW()
            "#,
        )
        .bind(&record.record_id)
        .bind(record.token_key.as_str())
        .bind(&token_json)
        .bind(&authentication_json)
        .execute(&*self.pool)
        .await?;

        debug!(token_key = %record.token_key, "Saved refresh token record");
        Ok(())
    }

    async fn find(&self, token_key: &str) -> StorageResult<Option<RefreshTokenRecord>> {
        let row: Option<RefreshTokenTuple> = query_as(
            r#"
            SELECT record_id, token_key, token, authentication
            FROM oauth_refresh_token
            WHERE token_key = $1
            "#,
        )
        .bind(token_key)
        .fetch_optional(&*self.pool)
        .await?;

        row.map(into_record).transpose()
    }

    async fn delete_record(&self, record_id: &str) -> StorageResult<bool> {
        let result = query("DELETE FROM oauth_refresh_token WHERE record_id = $1")
            .bind(record_id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RefreshTokenStorage for PostgresRefreshTokenStorage {
    async fn save(&self, record: &RefreshTokenRecord) -> AuthResult<()> {
        Ok(self.upsert(record).await?)
    }

    async fn find_by_token_key(
        &self,
        token_key: &TokenKey,
    ) -> AuthResult<Option<RefreshTokenRecord>> {
        Ok(self.find(token_key.as_str()).await?)
    }

    async fn delete(&self, record_id: &str) -> AuthResult<bool> {
        Ok(self.delete_record(record_id).await?)
    }
}
