//! Token store error types.
//!
//! Absent tokens, refresh tokens and users are not errors: lookups return
//! `Option` and callers branch on it. Only infrastructure failures, unknown
//! clients and identity clashes surface as [`AuthError`].

use std::fmt;

/// Errors that can occur in the token store and identity services.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// No client is registered under the requested id.
    ///
    /// Callers must treat this as an authentication/registration failure.
    /// It is never retried.
    #[error("Client with id {client_id} not found")]
    ClientNotFound {
        /// The client id that was looked up.
        client_id: String,
    },

    /// The durable storage collaborator failed.
    #[error("Storage error: {message}")]
    Storage {
        /// Description of the storage error.
        message: String,
    },

    /// A stored token or authentication blob could not be encoded or decoded.
    #[error("Serialization error: {message}")]
    Serialization {
        /// Description of the serialization error.
        message: String,
    },

    /// The token store configuration is invalid.
    #[error("Configuration error: {message}")]
    Configuration {
        /// Description of the configuration error.
        message: String,
    },

    /// Hashing or verifying a password failed.
    #[error("Password hash error: {message}")]
    PasswordHash {
        /// Description of the hashing error.
        message: String,
    },

    /// A record could not be written because its identity is already taken.
    #[error("Conflict: {message}")]
    Conflict {
        /// Description of the conflict.
        message: String,
    },
}

impl AuthError {
    /// Creates a new `ClientNotFound` error.
    #[must_use]
    pub fn client_not_found(client_id: impl Into<String>) -> Self {
        Self::ClientNotFound {
            client_id: client_id.into(),
        }
    }

    /// Creates a new `Storage` error.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }

    /// Creates a new `Serialization` error.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a new `Configuration` error.
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a new `PasswordHash` error.
    #[must_use]
    pub fn password_hash(message: impl Into<String>) -> Self {
        Self::PasswordHash {
            message: message.into(),
        }
    }

    /// Creates a new `Conflict` error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    /// Returns `true` if this is a client error (4xx category).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ClientNotFound { .. } | Self::Conflict { .. })
    }

    /// Returns `true` if this is a server error (5xx category).
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(
            self,
            Self::Storage { .. }
                | Self::Serialization { .. }
                | Self::Configuration { .. }
                | Self::PasswordHash { .. }
        )
    }

    /// Returns `true` if this error came from the storage layer.
    #[must_use]
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Serialization { .. })
    }

    /// Returns the error category for logging/monitoring purposes.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ClientNotFound { .. } => ErrorCategory::Registration,
            Self::Storage { .. } => ErrorCategory::Infrastructure,
            Self::Serialization { .. } => ErrorCategory::Infrastructure,
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::PasswordHash { .. } => ErrorCategory::Credentials,
            Self::Conflict { .. } => ErrorCategory::Registration,
        }
    }

    /// Returns the OAuth 2.0 error code for this error.
    #[must_use]
    pub fn oauth_error_code(&self) -> &'static str {
        match self {
            Self::ClientNotFound { .. } => "invalid_client",
            Self::Conflict { .. } => "invalid_request",
            _ => "server_error",
        }
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization(err.to_string())
    }
}

/// Categories of errors for logging and monitoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Client lookups and user registration.
    Registration,
    /// Password hashing and verification.
    Credentials,
    /// Infrastructure/storage errors.
    Infrastructure,
    /// Configuration errors.
    Configuration,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registration => write!(f, "registration"),
            Self::Credentials => write!(f, "credentials"),
            Self::Infrastructure => write!(f, "infrastructure"),
            Self::Configuration => write!(f, "configuration"),
        }
    }
}
