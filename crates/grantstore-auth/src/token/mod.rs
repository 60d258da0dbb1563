//! Token key derivation, authentication fingerprints and the token store.
//!
//! - [`key`] - fixed-length lookup keys for raw token values
//! - [`fingerprint`] - grant identity across re-issuance
//! - [`store`] - the store/read/remove/rotate facade

pub mod fingerprint;
pub mod key;
pub mod store;

pub use fingerprint::{AuthenticationKeyGenerator, DefaultAuthenticationKeyGenerator};
pub use key::{TokenKey, derive_key};
pub use store::{PersistentTokenStore, TokenStore};
