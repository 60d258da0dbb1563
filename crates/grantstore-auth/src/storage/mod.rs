//! Storage traits for token records, client registrations and users.
//!
//! The token store and services depend only on these capability traits and
//! receive implementations through their constructors.
//!
//! # Implementations
//!
//! - [`memory`] - process-local backends for tests and development
//! - `grantstore-auth-postgres` - PostgreSQL storage backend

pub mod access_token;
pub mod client;
pub mod memory;
pub mod refresh_token;
pub mod user;

pub use access_token::AccessTokenStorage;
pub use client::ClientStorage;
pub use memory::{InMemoryClientStorage, InMemoryTokenRecordStorage, InMemoryUserStorage};
pub use refresh_token::RefreshTokenStorage;
pub use user::UserStorage;
