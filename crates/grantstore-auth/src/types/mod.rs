//! Domain types shared by the token store, storage backends and services.
//!
//! - [`AccessToken`] / [`RefreshToken`] - token value objects
//! - [`Authentication`] - the grant a token was issued for
//! - [`AccessTokenRecord`] / [`RefreshTokenRecord`] - durable records
//! - [`ClientRegistration`] / [`ClientDetails`] - client registry entries
//! - [`User`] - login users

pub mod authentication;
pub mod client;
pub mod record;
pub mod token;
pub mod user;

pub use authentication::{Authentication, OAuth2Request, UserAuthentication};
pub use client::{ClientDetails, ClientRegistration};
pub use record::{AccessTokenRecord, RefreshTokenRecord, generate_record_id};
pub use token::{AccessToken, RefreshToken};
pub use user::{NewLoginUser, User};
