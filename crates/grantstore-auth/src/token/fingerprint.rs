//! Authentication fingerprints.
//!
//! A fingerprint identifies "the same logical grant" across re-issuance. It
//! is a [`TokenKey`]-shaped digest over the client id, the user name (or a
//! client-only marker), the sorted scope, and every request parameter that is
//! not transient. Two requests that differ only in `state` or `nonce`
//! fingerprint identically; a different scope yields a different fingerprint.

use std::collections::{BTreeMap, BTreeSet};

use serde_json::Value;

use crate::config::FingerprintConfig;
use crate::token::key::{TokenKey, digest_hex};
use crate::types::Authentication;

const CLIENT_ID: &str = "client_id";
const USERNAME: &str = "username";
const SCOPE: &str = "scope";
const PARAMETER_PREFIX: &str = "param:";

/// Stands in for the user name of client-only grants.
pub const CLIENT_ONLY_MARKER: &str = "<client-only>";

/// Derives the fingerprint of an authentication context.
pub trait AuthenticationKeyGenerator: Send + Sync {
    /// Returns the fingerprint of `authentication`.
    fn extract_key(&self, authentication: &Authentication) -> TokenKey;
}

/// Fingerprint over client, user, scope and non-transient request parameters.
#[derive(Debug, Clone)]
pub struct DefaultAuthenticationKeyGenerator {
    excluded_parameters: BTreeSet<String>,
}

impl DefaultAuthenticationKeyGenerator {
    /// Creates a generator with the default exclusion list.
    #[must_use]
    pub fn new() -> Self {
        Self::from_config(&FingerprintConfig::default())
    }

    /// Creates a generator excluding the configured parameters.
    #[must_use]
    pub fn from_config(config: &FingerprintConfig) -> Self {
        Self {
            excluded_parameters: config.excluded_parameters.iter().cloned().collect(),
        }
    }

    fn values<'a>(&self, authentication: &'a Authentication) -> BTreeMap<String, &'a str> {
        let request = &authentication.request;
        let mut values = BTreeMap::new();

        values.insert(CLIENT_ID.to_string(), request.client_id.as_str());
        values.insert(
            USERNAME.to_string(),
            authentication.username().unwrap_or(CLIENT_ONLY_MARKER),
        );

        for (name, value) in &request.request_parameters {
            if !self.excluded_parameters.contains(name) {
                values.insert(format!("{PARAMETER_PREFIX}{name}"), value.as_str());
            }
        }

        values
    }

    /// The JSON object the fingerprint digests, keys in sorted order.
    fn canonical_form(&self, authentication: &Authentication) -> String {
        // BTreeSet iteration is sorted, so scope order never matters.
        let scope = authentication
            .request
            .scope
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");

        let mut values = self.values(authentication);
        values.insert(SCOPE.to_string(), scope.as_str());

        let object: serde_json::Map<String, Value> = values
            .into_iter()
            .map(|(name, value)| (name, Value::String(value.to_string())))
            .collect();
        Value::Object(object).to_string()
    }
}

impl Default for DefaultAuthenticationKeyGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthenticationKeyGenerator for DefaultAuthenticationKeyGenerator {
    fn extract_key(&self, authentication: &Authentication) -> TokenKey {
        let canonical = self.canonical_form(authentication);
        TokenKey::from_stored(digest_hex(canonical.as_bytes()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OAuth2Request, UserAuthentication};

    fn user_auth(request: OAuth2Request) -> Authentication {
        Authentication::new(request, UserAuthentication::new("alice"))
    }

    #[test]
    fn test_deterministic() {
        let generator = DefaultAuthenticationKeyGenerator::new();
        let auth = user_auth(OAuth2Request::new("web-app").with_scope(["read"]));
        assert_eq!(generator.extract_key(&auth), generator.extract_key(&auth));
        assert_eq!(generator.extract_key(&auth).as_str().len(), 32);
    }

    #[test]
    fn test_canonical_form() {
        let generator = DefaultAuthenticationKeyGenerator::new();
        let auth = user_auth(
            OAuth2Request::new("web-app")
                .with_scope(["write", "read"])
                .with_parameter("state", "s1")
                .with_parameter("audience", "api \"a\""),
        );
        assert_eq!(
            generator.canonical_form(&auth),
            r#"{"client_id":"web-app","param:audience":"api \"a\"","scope":"read write","username":"alice"}"#
        );
    }

    #[test]
    fn test_transient_parameters_ignored() {
        let generator = DefaultAuthenticationKeyGenerator::new();
        let first = user_auth(
            OAuth2Request::new("web-app")
                .with_scope(["read"])
                .with_parameter("state", "s1")
                .with_parameter("nonce", "n1"),
        );
        let second = user_auth(
            OAuth2Request::new("web-app")
                .with_scope(["read"])
                .with_parameter("state", "s2")
                .with_parameter("nonce", "n2"),
        );
        assert_eq!(generator.extract_key(&first), generator.extract_key(&second));
    }

    #[test]
    fn test_scope_order_independent() {
        let generator = DefaultAuthenticationKeyGenerator::new();
        let first = user_auth(OAuth2Request::new("web-app").with_scope(["read", "write"]));
        let second = user_auth(OAuth2Request::new("web-app").with_scope(["write", "read"]));
        assert_eq!(generator.extract_key(&first), generator.extract_key(&second));
    }

    #[test]
    fn test_scope_distinguishes() {
        let generator = DefaultAuthenticationKeyGenerator::new();
        let read = user_auth(OAuth2Request::new("web-app").with_scope(["read"]));
        let write = user_auth(OAuth2Request::new("web-app").with_scope(["write"]));
        assert_ne!(generator.extract_key(&read), generator.extract_key(&write));
    }

    #[test]
    fn test_material_parameter_distinguishes() {
        let generator = DefaultAuthenticationKeyGenerator::new();
        let first = user_auth(OAuth2Request::new("web-app").with_parameter("audience", "api-a"));
        let second = user_auth(OAuth2Request::new("web-app").with_parameter("audience", "api-b"));
        assert_ne!(generator.extract_key(&first), generator.extract_key(&second));
    }

    #[test]
    fn test_user_and_client_distinguish() {
        let generator = DefaultAuthenticationKeyGenerator::new();
        let alice = user_auth(OAuth2Request::new("web-app"));
        let bob = Authentication::new(OAuth2Request::new("web-app"), UserAuthentication::new("bob"));
        let client_only = Authentication::client_only(OAuth2Request::new("web-app"));
        let other_client = user_auth(OAuth2Request::new("mobile-app"));

        let keys: BTreeSet<TokenKey> = [&alice, &bob, &client_only, &other_client]
            .into_iter()
            .map(|a| generator.extract_key(a))
            .collect();
        assert_eq!(keys.len(), 4);
    }

    #[test]
    fn test_parameter_cannot_impersonate_field() {
        // A request parameter named like a fixed field must not collide with it.
        let generator = DefaultAuthenticationKeyGenerator::from_config(&FingerprintConfig {
            excluded_parameters: Vec::new(),
        });
        let plain = Authentication::client_only(OAuth2Request::new("web-app"));
        let spoofed = Authentication::client_only(
            OAuth2Request::new("web-app").with_parameter("client_id", "web-app"),
        );
        assert_ne!(generator.extract_key(&plain), generator.extract_key(&spoofed));
    }

    #[test]
    fn test_custom_exclusions() {
        let generator = DefaultAuthenticationKeyGenerator::from_config(&FingerprintConfig {
            excluded_parameters: vec!["audience".to_string()],
        });
        let first = user_auth(OAuth2Request::new("web-app").with_parameter("audience", "a"));
        let second = user_auth(OAuth2Request::new("web-app").with_parameter("audience", "b"));
        assert_eq!(generator.extract_key(&first), generator.extract_key(&second));

        // state is no longer excluded once the list is replaced
        let s1 = user_auth(OAuth2Request::new("web-app").with_parameter("state", "1"));
        let s2 = user_auth(OAuth2Request::new("web-app").with_parameter("state", "2"));
        assert_ne!(generator.extract_key(&s1), generator.extract_key(&s2));
    }
}
