//! PostgreSQL storage backend for grantstore-auth
//!
//! Provides persistent storage for:
//!
//! - Access token records (`oauth_access_token`)
//! - Refresh token records (`oauth_refresh_token`)
//! - Client registrations (`oauth_client`)
//! - Login users (`login_user`)
//!
//! Tokens and authentications are stored as JSONB next to their derived keys.
//! Raw token values never appear in an indexed column.
//!
//! # Example
//!
//! ```ignore
//! use grantstore_auth::TokenStore;
//! use grantstore_auth::config::TokenStoreConfig;
//!
//! let config = TokenStoreConfig::from_file("grantstore.toml")?;
//! let store = grantstore_auth_postgres::connect_token_store(&config).await?;
//! let token = store.read_access_token("abc123").await?;
//! ```

pub mod access_token;
pub mod client;
pub mod refresh_token;
pub mod schema;
pub mod user;

use std::sync::Arc;

use grantstore_auth::config::{StorageBackend, StorageConfig, TokenStoreConfig};
use grantstore_auth::storage::InMemoryTokenRecordStorage;
use grantstore_auth::token::PersistentTokenStore;
use grantstore_auth::{AuthError, AuthResult};
use sqlx_core::pool::{Pool, PoolOptions};
use sqlx_postgres::Postgres;
use tracing::info;

/// PostgreSQL connection pool type alias.
pub type PgPool = Pool<Postgres>;

pub use access_token::PostgresAccessTokenStorage;
pub use client::PostgresClientStorage;
pub use refresh_token::PostgresRefreshTokenStorage;
pub use user::PostgresUserStorage;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during token storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Database operation failed.
    #[error("Database error: {0}")]
    Database(#[from] sqlx_core::Error),

    /// Record already exists (conflict).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// A stored JSONB column could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl StorageError {
    /// Create a `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// Create an `InvalidInput` error.
    #[must_use]
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Returns `true` if this is a `Conflict` error.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(_))
    }

    /// Returns `true` if this is a client error (4xx equivalent).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Conflict(_) | Self::InvalidInput(_))
    }

    /// Returns `true` if this is a server error (5xx equivalent).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Serialization(_))
    }

    /// Maps unique index violations to `Conflict`, everything else to
    /// `Database`.
    pub(crate) fn from_write(error: sqlx_core::Error, what: impl FnOnce() -> String) -> Self {
        if let sqlx_core::Error::Database(ref db_err) = error
            && db_err.is_unique_violation()
        {
            return Self::conflict(what());
        }
        Self::from(error)
    }
}

impl From<StorageError> for AuthError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::Serialization(e) => AuthError::serialization(e.to_string()),
            StorageError::Conflict(message) => AuthError::conflict(message),
            other => AuthError::storage(other.to_string()),
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// PostgreSQL Auth Storage
// =============================================================================

/// PostgreSQL storage backend for token records, clients and users.
///
/// Holds a shared connection pool and hands out storage implementations that
/// plug into [`PersistentTokenStore`] and the identity services.
#[derive(Debug, Clone)]
pub struct PostgresAuthStorage {
    pool: Arc<PgPool>,
}

impl PostgresAuthStorage {
    /// Create new storage with an existing connection pool.
    #[must_use]
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    /// Create new storage by connecting to the database.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection fails.
    pub async fn connect(database_url: &str) -> StorageResult<Self> {
        let pool = PoolOptions::<Postgres>::new().connect(database_url).await?;
        Ok(Self::new(Arc::new(pool)))
    }

    /// Create new storage from the `[storage]` configuration section.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidInput` if no `database_url` is set, or a
    /// database error if the connection fails.
    pub async fn connect_with(config: &StorageConfig) -> StorageResult<Self> {
        let database_url = config.database_url.as_deref().ok_or_else(|| {
            StorageError::invalid_input("database_url is required for the postgres backend")
        })?;

        let pool = PoolOptions::<Postgres>::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.acquire_timeout)
            .connect(database_url)
            .await?;

        info!(
            max_connections = config.max_connections,
            "Connected token store database pool"
        );
        Ok(Self::new(Arc::new(pool)))
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates missing tables and indexes.
    ///
    /// # Errors
    ///
    /// Returns an error if any DDL statement fails.
    pub async fn ensure_schema(&self) -> StorageResult<()> {
        schema::ensure_schema(&self.pool).await
    }

    // -------------------------------------------------------------------------
    // Storage Accessors
    // -------------------------------------------------------------------------

    /// Get access token record storage.
    #[must_use]
    pub fn access_tokens(&self) -> PostgresAccessTokenStorage {
        PostgresAccessTokenStorage::new(Arc::clone(&self.pool))
    }

    /// Get refresh token record storage.
    #[must_use]
    pub fn refresh_tokens(&self) -> PostgresRefreshTokenStorage {
        PostgresRefreshTokenStorage::new(Arc::clone(&self.pool))
    }

    /// Get client registration storage.
    #[must_use]
    pub fn clients(&self) -> PostgresClientStorage {
        PostgresClientStorage::new(Arc::clone(&self.pool))
    }

    /// Get login user storage.
    #[must_use]
    pub fn users(&self) -> PostgresUserStorage {
        PostgresUserStorage::new(Arc::clone(&self.pool))
    }

    /// Builds a token store over this database with default fingerprinting.
    ///
    /// Use [`token_store_with`](Self::token_store_with) to honour a
    /// configured fingerprint exclusion list.
    #[must_use]
    pub fn token_store(&self) -> PersistentTokenStore {
        PersistentTokenStore::new(
            Arc::new(self.access_tokens()),
            Arc::new(self.refresh_tokens()),
        )
    }

    /// Builds a token store over this database from configuration.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Configuration` if the configured key digest is not
    /// supported.
    pub fn token_store_with(&self, config: &TokenStoreConfig) -> AuthResult<PersistentTokenStore> {
        PersistentTokenStore::from_config(
            config,
            Arc::new(self.access_tokens()),
            Arc::new(self.refresh_tokens()),
        )
    }
}

// =============================================================================
// Backend Selection
// =============================================================================

/// Builds the token store selected by `storage.backend`.
///
/// The `memory` backend needs no connection. The `postgres` backend connects
/// with the `[storage]` settings and creates any missing tables first.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the connection or
/// schema setup fails, or the key digest is not supported.
pub async fn connect_token_store(config: &TokenStoreConfig) -> AuthResult<PersistentTokenStore> {
    config
        .validate()
        .map_err(|e| AuthError::configuration(e.to_string()))?;

    match config.storage.backend {
        StorageBackend::Memory => {
            let records = Arc::new(InMemoryTokenRecordStorage::new());
            info!("Using in-memory token store");
            PersistentTokenStore::from_config(config, records.clone(), records)
        }
        StorageBackend::Postgres => {
            let storage = PostgresAuthStorage::connect_with(&config.storage).await?;
            storage.ensure_schema().await?;
            storage.token_store_with(config)
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_error_conflict() {
        let err = StorageError::conflict("access token already stored");
        assert!(err.is_conflict());
        assert!(err.is_client_error());
        assert!(!err.is_server_error());
        assert_eq!(err.to_string(), "Conflict: access token already stored");
    }

    #[test]
    fn test_storage_error_into_auth_error() {
        let err: AuthError = StorageError::invalid_input("empty token key").into();
        assert!(matches!(err, AuthError::Storage { .. }));
        assert!(err.is_storage_error());

        let err: AuthError = StorageError::conflict("login user LoginUser:1").into();
        assert!(matches!(err, AuthError::Conflict { .. }));

        let json_err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err: AuthError = StorageError::from(json_err).into();
        assert!(matches!(err, AuthError::Serialization { .. }));
    }

    #[test]
    fn test_connect_with_requires_url() {
        let config = StorageConfig::default();
        let err = tokio_test::block_on(PostgresAuthStorage::connect_with(&config)).unwrap_err();
        assert!(matches!(err, StorageError::InvalidInput(_)));
    }

    #[test]
    fn test_postgres_backend_requires_url() {
        let mut config = TokenStoreConfig::default();
        config.storage.backend = StorageBackend::Postgres;
        let err = tokio_test::block_on(connect_token_store(&config)).err().unwrap();
        assert!(matches!(err, AuthError::Configuration { .. }));
    }

    #[tokio::test]
    async fn test_memory_backend_uses_configured_exclusions() {
        use grantstore_auth::{AccessToken, Authentication, OAuth2Request, TokenStore};

        let mut config = TokenStoreConfig::default();
        config.fingerprint.excluded_parameters = vec!["tenant".to_string()];
        let store = connect_token_store(&config).await.unwrap();

        let auth = |tenant: &str| {
            Authentication::client_only(
                OAuth2Request::new("batch").with_parameter("tenant", tenant),
            )
        };
        let token = AccessToken::new("cc-1");
        store.store_access_token(&token, &auth("t1")).await.unwrap();

        assert_eq!(store.get_access_token(&auth("t2")).await.unwrap(), Some(token));
    }
}
