//! Token store configuration.
//!
//! # Example (TOML)
//!
//! ```toml
//! key_digest = "md5"
//!
//! [fingerprint]
//! excluded_parameters = ["state", "nonce"]
//!
//! [storage]
//! backend = "postgres"
//! database_url = "postgres://localhost/grantstore"
//! max_connections = 10
//! acquire_timeout = "5s"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Request parameters that vary per token issuance and therefore never take
/// part in the authentication fingerprint.
pub const DEFAULT_EXCLUDED_PARAMETERS: &[&str] = &[
    "state",
    "nonce",
    "code",
    "code_verifier",
    "grant_type",
    "refresh_token",
    "password",
    "client_secret",
    "client_assertion",
    "client_assertion_type",
    "scope",
    "username",
];

/// Root token store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TokenStoreConfig {
    /// Digest used to derive token keys.
    ///
    /// Stored keys must stay comparable across restarts, so this is pinned
    /// and only `md5` is accepted.
    pub key_digest: KeyDigest,

    /// Authentication fingerprint settings.
    pub fingerprint: FingerprintConfig,

    /// Record storage backend settings.
    pub storage: StorageConfig,
}

impl Default for TokenStoreConfig {
    fn default() -> Self {
        Self {
            key_digest: KeyDigest::Md5,
            fingerprint: FingerprintConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

/// Digest algorithms for token key derivation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyDigest {
    /// 128-bit MD5, rendered as 32 lowercase hex characters.
    Md5,
    /// Any other configured name. Rejected at startup.
    #[serde(untagged)]
    Unsupported(String),
}

impl KeyDigest {
    /// Returns the configured algorithm name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Md5 => "md5",
            Self::Unsupported(name) => name,
        }
    }
}

/// Authentication fingerprint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FingerprintConfig {
    /// Request parameter names left out of the fingerprint.
    pub excluded_parameters: Vec<String>,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            excluded_parameters: DEFAULT_EXCLUDED_PARAMETERS
                .iter()
                .map(|p| (*p).to_string())
                .collect(),
        }
    }
}

/// Storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local maps. Intended for tests and single-node development.
    Memory,
    /// PostgreSQL via `grantstore-auth-postgres`.
    Postgres,
}

/// Record storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Which backend holds the token records.
    pub backend: StorageBackend,

    /// Connection string for the `postgres` backend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database_url: Option<String>,

    /// Maximum pooled connections.
    pub max_connections: u32,

    /// How long to wait for a pooled connection.
    #[serde(with = "humantime_serde")]
    pub acquire_timeout: Duration,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Memory,
            database_url: None,
            max_connections: 10,
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

/// Configuration validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An invalid configuration value was provided.
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),

    /// A required configuration value is missing.
    #[error("Missing required configuration: {0}")]
    Missing(String),

    /// The configuration file could not be read.
    #[error("Failed to read configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),
}

impl TokenStoreConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is malformed or fails validation.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if:
    /// - The key digest is not `md5`
    /// - `max_connections` is zero
    ///
    /// Returns `ConfigError::Missing` if the postgres backend has no
    /// `database_url`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let KeyDigest::Unsupported(name) = &self.key_digest {
            return Err(ConfigError::InvalidValue(format!(
                "Unsupported key digest: '{}'. Must be md5",
                name
            )));
        }

        if self.storage.max_connections == 0 {
            return Err(ConfigError::InvalidValue(
                "storage.max_connections must be > 0".to_string(),
            ));
        }

        if self.storage.backend == StorageBackend::Postgres
            && self
                .storage
                .database_url
                .as_deref()
                .is_none_or(str::is_empty)
        {
            return Err(ConfigError::Missing("storage.database_url".to_string()));
        }

        Ok(())
    }
}
