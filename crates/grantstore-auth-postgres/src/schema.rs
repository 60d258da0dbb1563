//! Table definitions.
//!
//! Statements are idempotent and run in order by
//! [`PostgresAuthStorage::ensure_schema`](crate::PostgresAuthStorage::ensure_schema).
//! Token and authentication keys carry unique indexes so that the database
//! itself rejects a second live record for the same token value or grant.

use sqlx_core::query::query;
use tracing::info;

use crate::{PgPool, StorageResult};

/// DDL statements, in execution order.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS oauth_access_token (
        record_id TEXT PRIMARY KEY,
        token_key TEXT NOT NULL,
        authentication_key TEXT NOT NULL,
        username TEXT,
        client_id TEXT NOT NULL,
        refresh_key TEXT,
        token JSONB NOT NULL,
        authentication JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS oauth_access_token_token_key_idx ON oauth_access_token (token_key)",
    "CREATE UNIQUE INDEX IF NOT EXISTS oauth_access_token_authentication_key_idx ON oauth_access_token (authentication_key)",
    "CREATE INDEX IF NOT EXISTS oauth_access_token_refresh_key_idx ON oauth_access_token (refresh_key)",
    "CREATE INDEX IF NOT EXISTS oauth_access_token_client_idx ON oauth_access_token (client_id, username)",
    r#"
    CREATE TABLE IF NOT EXISTS oauth_refresh_token (
        record_id TEXT PRIMARY KEY,
        token_key TEXT NOT NULL,
        token JSONB NOT NULL,
        authentication JSONB NOT NULL,
        created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS oauth_refresh_token_token_key_idx ON oauth_refresh_token (token_key)",
    r#"
    CREATE TABLE IF NOT EXISTS oauth_client (
        client_id TEXT PRIMARY KEY,
        registration JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS login_user (
        id TEXT PRIMARY KEY,
        username TEXT NOT NULL,
        resource JSONB NOT NULL,
        updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
    )
    "#,
    "CREATE INDEX IF NOT EXISTS login_user_username_idx ON login_user (username)",
];

/// Creates missing tables and indexes.
///
/// # Errors
///
/// Returns an error if any statement fails.
pub async fn ensure_schema(pool: &PgPool) -> StorageResult<()> {
    for statement in SCHEMA_STATEMENTS {
        query(statement).execute(pool).await?;
    }
    info!(statements = SCHEMA_STATEMENTS.len(), "Token store schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_keys_are_unique_indexed() {
        let unique: Vec<&&str> = SCHEMA_STATEMENTS
            .iter()
            .filter(|s| s.contains("CREATE UNIQUE INDEX"))
            .collect();
        assert_eq!(unique.len(), 3);
        assert!(unique.iter().any(|s| s.contains("(authentication_key)")));
    }

    #[test]
    fn test_statements_are_idempotent() {
        for statement in SCHEMA_STATEMENTS {
            assert!(statement.contains("IF NOT EXISTS"), "{statement}");
        }
    }
}
