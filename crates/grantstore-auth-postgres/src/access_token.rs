//! Access token record storage.
//!
//! Each row holds the token and its authentication as JSONB, indexed by the
//! derived token key and authentication key. `save` serializes concurrent
//! writers for the same keys with transaction-scoped advisory locks, then
//! deletes conflicting rows and inserts inside the same transaction.

use std::sync::Arc;

use async_trait::async_trait;
use grantstore_auth::storage::AccessTokenStorage;
use grantstore_auth::token::TokenKey;
use grantstore_auth::types::AccessTokenRecord;
use grantstore_auth::AuthResult;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use tracing::debug;

use crate::{PgPool, StorageError, StorageResult};

// =============================================================================
// Types
// =============================================================================

type AccessTokenTuple = (
    String,
    String,
    String,
    Option<String>,
    String,
    Option<String>,
    serde_json::Value,
    serde_json::Value,
);

/// Access token row from the database.
#[derive(Debug, Clone)]
pub struct AccessTokenRow {
    /// Record id
    pub record_id: String,
    /// Derived key of the token value
    pub token_key: String,
    /// Authentication fingerprint
    pub authentication_key: String,
    /// Username, absent for client-only grants
    pub username: Option<String>,
    /// Client id
    pub client_id: String,
    /// Derived key of the paired refresh token
    pub refresh_key: Option<String>,
    /// Serialized access token
    pub token: serde_json::Value,
    /// Serialized authentication
    pub authentication: serde_json::Value,
}

impl AccessTokenRow {
    fn from_tuple(row: AccessTokenTuple) -> Self {
        Self {
            record_id: row.0,
            token_key: row.1,
            authentication_key: row.2,
            username: row.3,
            client_id: row.4,
            refresh_key: row.5,
            token: row.6,
            authentication: row.7,
        }
    }

    /// Decodes the JSONB columns into a record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Serialization` if a column does not decode.
    pub fn into_record(self) -> StorageResult<AccessTokenRecord> {
        Ok(AccessTokenRecord {
            record_id: self.record_id,
            token_key: TokenKey::from_stored(self.token_key),
            token: serde_json::from_value(self.token)?,
            authentication_key: TokenKey::from_stored(self.authentication_key),
            username: self.username,
            client_id: self.client_id,
            authentication: serde_json::from_value(self.authentication)?,
            refresh_key: self.refresh_key.map(TokenKey::from_stored),
        })
    }
}

fn into_records(rows: Vec<AccessTokenTuple>) -> StorageResult<Vec<AccessTokenRecord>> {
    rows.into_iter()
        .map(|row| AccessTokenRow::from_tuple(row).into_record())
        .collect()
}

// =============================================================================
// Access Token Storage
// =============================================================================

/// PostgreSQL access token record storage.
#[derive(Clone)]
pub struct PostgresAccessTokenStorage {
    pool: Arc<PgPool>,
}

impl PostgresAccessTokenStorage {
    /// Create a new access token storage over a shared pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    async fn save_replacing(
        &self,
        record: &AccessTokenRecord,
    ) -> StorageResult<Vec<AccessTokenRecord>> {
        let token_json = serde_json::to_value(&record.token)?;
        let authentication_json = serde_json::to_value(&record.authentication)?;

        let mut tx = self.pool.begin().await?;

        // Lock in a fixed order so two writers cannot deadlock.
        let mut lock_keys = [
            record.token_key.as_str(),
            record.authentication_key.as_str(),
        ];
        lock_keys.sort_unstable();
        for key in lock_keys {
            query("SELECT pg_advisory_xact_lock(hashtext($1))")
                .bind(key)
                .execute(&mut *tx)
                .await?;
        }

        let evicted: Vec<AccessTokenTuple> = query_as(
            r#"
            DELETE FROM oauth_access_token
            WHERE token_key = $1 OR authentication_key = $2
            RETURNING record_id, token_key, authentication_key, username, client_id,
                      refresh_key, token, authentication
            "#,
        )
        .bind(record.token_key.as_str())
        .bind(record.authentication_key.as_str())
        .fetch_all(&mut *tx)
        .await?;

        query(
            r#"
            INSERT INTO oauth_access_token
                (record_id, token_key, authentication_key, username, client_id,
                 refresh_key, token, authentication)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(&record.record_id)
        .bind(record.token_key.as_str())
        .bind(record.authentication_key.as_str())
        .bind(record.username.as_deref())
        .bind(&record.client_id)
        .bind(record.refresh_key.as_ref().map(TokenKey::as_str))
        .bind(&token_json)
        .bind(&authentication_json)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            StorageError::from_write(e, || {
                format!("access token record '{}' already exists", record.record_id)
            })
        })?;

        tx.commit().await?;

        debug!(
            token_key = %record.token_key,
            evicted = evicted.len(),
            "Saved access token record"
        );
        into_records(evicted)
    }

    async fn find_one(&self, column: Column, key: &str) -> StorageResult<Option<AccessTokenRecord>> {
        let row: Option<AccessTokenTuple> = query_as(column.select_sql())
            .bind(key)
            .fetch_optional(&*self.pool)
            .await?;

        row.map(|r| AccessTokenRow::from_tuple(r).into_record())
            .transpose()
    }

    async fn find_many(
        &self,
        client_id: &str,
        username: Option<&str>,
    ) -> StorageResult<Vec<AccessTokenRecord>> {
        let rows: Vec<AccessTokenTuple> = query_as(
            r#"
            SELECT record_id, token_key, authentication_key, username, client_id,
                   refresh_key, token, authentication
            FROM oauth_access_token
            WHERE client_id = $1
              AND ($2::text IS NULL OR username = $2)
            ORDER BY created_at
            "#,
        )
        .bind(client_id)
        .bind(username)
        .fetch_all(&*self.pool)
        .await?;

        into_records(rows)
    }

    async fn delete_record(&self, record_id: &str) -> StorageResult<bool> {
        let result = query("DELETE FROM oauth_access_token WHERE record_id = $1")
            .bind(record_id)
            .execute(&*self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Key columns an access token record can be looked up by.
#[derive(Debug, Clone, Copy)]
enum Column {
    TokenKey,
    AuthenticationKey,
    RefreshKey,
}

impl Column {
    fn select_sql(self) -> &'static str {
        match self {
            Self::TokenKey => {
                r#"
                SELECT record_id, token_key, authentication_key, username, client_id,
                       refresh_key, token, authentication
                FROM oauth_access_token
                WHERE token_key = $1
                "#
            }
            Self::AuthenticationKey => {
                r#"
                SELECT record_id, token_key, authentication_key, username, client_id,
                       refresh_key, token, authentication
                FROM oauth_access_token
                WHERE authentication_key = $1
                "#
            }
            // refresh_key is not unique; the oldest record wins
            Self::RefreshKey => {
                r#"
                SELECT record_id, token_key, authentication_key, username, client_id,
                       refresh_key, token, authentication
                FROM oauth_access_token
                WHERE refresh_key = $1
                ORDER BY created_at
                LIMIT 1
                "#
            }
        }
    }
}

#[async_trait]
impl AccessTokenStorage for PostgresAccessTokenStorage {
    async fn save(&self, record: &AccessTokenRecord) -> AuthResult<Vec<AccessTokenRecord>> {
        Ok(self.save_replacing(record).await?)
    }

    async fn find_by_token_key(
        &self,
        token_key: &TokenKey,
    ) -> AuthResult<Option<AccessTokenRecord>> {
        Ok(self.find_one(Column::TokenKey, token_key.as_str()).await?)
    }

    async fn find_by_authentication_key(
        &self,
        authentication_key: &TokenKey,
    ) -> AuthResult<Option<AccessTokenRecord>> {
        Ok(self
            .find_one(Column::AuthenticationKey, authentication_key.as_str())
            .await?)
    }

    async fn find_by_refresh_key(
        &self,
        refresh_key: &TokenKey,
    ) -> AuthResult<Option<AccessTokenRecord>> {
        Ok(self.find_one(Column::RefreshKey, refresh_key.as_str()).await?)
    }

    async fn find_by_client_id(&self, client_id: &str) -> AuthResult<Vec<AccessTokenRecord>> {
        Ok(self.find_many(client_id, None).await?)
    }

    async fn find_by_client_id_and_username(
        &self,
        client_id: &str,
        username: &str,
    ) -> AuthResult<Vec<AccessTokenRecord>> {
        Ok(self.find_many(client_id, Some(username)).await?)
    }

    async fn delete(&self, record_id: &str) -> AuthResult<bool> {
        Ok(self.delete_record(record_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use grantstore_auth::types::generate_record_id;
    use grantstore_auth::{AccessToken, Authentication, OAuth2Request, RefreshToken, UserAuthentication};

    fn record() -> AccessTokenRecord {
        let token = AccessToken::new("abc123").with_refresh_token(RefreshToken::new("ref456"));
        AccessTokenRecord {
            record_id: generate_record_id(),
            token_key: TokenKey::derive("abc123"),
            token,
            authentication_key: TokenKey::derive("fingerprint"),
            username: Some("alice".to_string()),
            client_id: "web-app".to_string(),
            authentication: Authentication::new(
                OAuth2Request::new("web-app").with_scope(["read"]),
                UserAuthentication::new("alice"),
            ),
            refresh_key: Some(TokenKey::derive("ref456")),
        }
    }

    fn as_tuple(record: &AccessTokenRecord) -> AccessTokenTuple {
        (
            record.record_id.clone(),
            record.token_key.to_string(),
            record.authentication_key.to_string(),
            record.username.clone(),
            record.client_id.clone(),
            record.refresh_key.as_ref().map(ToString::to_string),
            serde_json::to_value(&record.token).unwrap(),
            serde_json::to_value(&record.authentication).unwrap(),
        )
    }

    #[test]
    fn test_row_decodes_into_record() {
        let expected = record();
        let decoded = AccessTokenRow::from_tuple(as_tuple(&expected))
            .into_record()
            .unwrap();
        assert_eq!(decoded, expected);
    }

    #[test]
    fn test_corrupt_token_column() {
        let mut tuple = as_tuple(&record());
        tuple.6 = serde_json::json!({"unexpected": true});
        let err = AccessTokenRow::from_tuple(tuple).into_record().unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn test_refresh_key_lookup_is_deterministic() {
        assert!(Column::RefreshKey.select_sql().contains("LIMIT 1"));
        assert!(Column::TokenKey.select_sql().contains("WHERE token_key = $1"));
    }
}
