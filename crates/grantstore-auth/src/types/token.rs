//! Access and refresh token value objects.
//!
//! These are the tokens as issued to clients. The store persists them as
//! opaque JSON blobs and never looks inside beyond `value` and the embedded
//! refresh token. Expiry is checked by callers through [`AccessToken::is_expired`].

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Default token type for issued access tokens.
pub const BEARER_TYPE: &str = "bearer";

/// OAuth 2.0 refresh token.
///
/// A refresh token without an expiration never expires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// The raw token string handed to the client.
    pub value: String,

    /// When this token expires (None = no expiration).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub expiration: Option<OffsetDateTime>,
}

impl RefreshToken {
    /// Creates a non-expiring refresh token.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expiration: None,
        }
    }

    /// Creates a refresh token that expires at `expiration`.
    #[must_use]
    pub fn expiring(value: impl Into<String>, expiration: OffsetDateTime) -> Self {
        Self {
            value: value.into(),
            expiration: Some(expiration),
        }
    }

    /// Returns `true` if this token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expiration
            .map(|exp| OffsetDateTime::now_utc() > exp)
            .unwrap_or(false)
    }
}

/// OAuth 2.0 access token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    /// The raw token string handed to the client.
    pub value: String,

    /// Token type, `bearer` unless configured otherwise.
    pub token_type: String,

    /// When this token expires (None = no expiration).
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "time::serde::rfc3339::option"
    )]
    pub expiration: Option<OffsetDateTime>,

    /// Granted scopes.
    #[serde(default)]
    pub scope: BTreeSet<String>,

    /// Refresh token issued alongside this access token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<RefreshToken>,

    /// Extra response fields carried with the token.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub additional_information: BTreeMap<String, serde_json::Value>,
}

impl AccessToken {
    /// Creates a bearer token with no expiry, scope or refresh token.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            token_type: BEARER_TYPE.to_string(),
            expiration: None,
            scope: BTreeSet::new(),
            refresh_token: None,
            additional_information: BTreeMap::new(),
        }
    }

    /// Sets the expiration.
    #[must_use]
    pub fn with_expiration(mut self, expiration: OffsetDateTime) -> Self {
        self.expiration = Some(expiration);
        self
    }

    /// Sets the granted scopes.
    #[must_use]
    pub fn with_scope<I, S>(mut self, scope: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scope = scope.into_iter().map(Into::into).collect();
        self
    }

    /// Attaches a refresh token.
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: RefreshToken) -> Self {
        self.refresh_token = Some(refresh_token);
        self
    }

    /// Adds an extra response field.
    #[must_use]
    pub fn with_additional_information(
        mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> Self {
        self.additional_information.insert(key.into(), value);
        self
    }

    /// Returns `true` if this token has expired.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.expiration
            .map(|exp| OffsetDateTime::now_utc() > exp)
            .unwrap_or(false)
    }

    /// Seconds until expiry, clamped at zero. `None` if the token never expires.
    #[must_use]
    pub fn expires_in(&self) -> Option<i64> {
        self.expiration
            .map(|exp| (exp - OffsetDateTime::now_utc()).whole_seconds().max(0))
    }

    /// Raw value of the embedded refresh token, if any.
    #[must_use]
    pub fn refresh_token_value(&self) -> Option<&str> {
        self.refresh_token.as_ref().map(|rt| rt.value.as_str())
    }
}
