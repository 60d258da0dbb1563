//! # grantstore-auth
//!
//! OAuth 2.0 token persistence for an authorization server.
//!
//! This crate provides:
//! - Durable storage of issued access and refresh tokens
//! - Lookup of the live token for a grant, so repeat requests can reuse it
//! - Removal and refresh-token rotation support
//! - Client registry lookup and login user management
//!
//! ## Overview
//!
//! Raw token values are never used as lookup keys. Every token is indexed by
//! a fixed-length digest of its value (see [`token::key`]), and every grant
//! by a digest of its identity-relevant parts (see [`token::fingerprint`]).
//! The [`TokenStore`] facade keeps at most one live access token per grant.
//!
//! ## Modules
//!
//! - [`config`] - Token store configuration
//! - [`token`] - Key derivation, fingerprints and the token store facade
//! - [`storage`] - Storage traits and in-memory backends
//! - [`service`] - Client and login user services
//! - [`password`] - Password hashing
//! - [`types`] - Tokens, authentications, records, clients and users

pub mod config;
pub mod error;
pub mod password;
pub mod service;
pub mod storage;
pub mod token;
pub mod types;

pub use config::{ConfigError, TokenStoreConfig};
pub use error::{AuthError, ErrorCategory};
pub use service::{ClientDetailsService, UserService};
pub use storage::{
    AccessTokenStorage, ClientStorage, InMemoryClientStorage, InMemoryTokenRecordStorage,
    InMemoryUserStorage, RefreshTokenStorage, UserStorage,
};
pub use token::{
    AuthenticationKeyGenerator, DefaultAuthenticationKeyGenerator, PersistentTokenStore,
    TokenKey, TokenStore,
};
pub use types::{
    AccessToken, AccessTokenRecord, Authentication, ClientDetails, ClientRegistration,
    NewLoginUser, OAuth2Request, RefreshToken, RefreshTokenRecord, User, UserAuthentication,
};

/// Type alias for token store results.
pub type AuthResult<T> = Result<T, AuthError>;

/// Prelude module for convenient imports.
///
/// ```ignore
/// use grantstore_auth::prelude::*;
/// ```
pub mod prelude {
    pub use crate::AuthResult;
    pub use crate::config::{ConfigError, TokenStoreConfig};
    pub use crate::error::{AuthError, ErrorCategory};
    pub use crate::service::{ClientDetailsService, UserService};
    pub use crate::storage::{
        AccessTokenStorage, ClientStorage, RefreshTokenStorage, UserStorage,
    };
    pub use crate::token::{
        AuthenticationKeyGenerator, DefaultAuthenticationKeyGenerator, PersistentTokenStore,
        TokenKey, TokenStore,
    };
    pub use crate::types::{
        AccessToken, Authentication, OAuth2Request, RefreshToken, UserAuthentication,
    };
}
