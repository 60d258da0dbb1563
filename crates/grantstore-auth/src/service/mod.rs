//! Identity services built on the storage traits.
//!
//! - [`ClientDetailsService`] - client registry lookup
//! - [`UserService`] - login user lookup, authentication and registration

pub mod client;
pub mod user;

pub use client::ClientDetailsService;
pub use user::UserService;
