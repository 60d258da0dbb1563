//! OAuth 2.0 client registration types.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// Grant types assigned to a client that registered none.
pub const DEFAULT_GRANT_TYPES: &[&str] = &["authorization_code", "refresh_token"];

// =============================================================================
// Client Registration
// =============================================================================

/// A client registration as held by the client registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientRegistration {
    /// Unique client identifier used in OAuth flows.
    pub client_id: String,

    /// Client secret (hashed by the registry, opaque here).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Resource servers this client may access.
    #[serde(default)]
    pub resource_ids: Vec<String>,

    /// Scopes this client may request.
    #[serde(default)]
    pub scope: Vec<String>,

    /// Grant types this client may use.
    #[serde(default)]
    pub authorized_grant_types: Vec<String>,

    /// Authorities granted to the client itself.
    #[serde(default)]
    pub authorities: Vec<String>,

    /// Allowed redirect URIs.
    #[serde(default)]
    pub registered_redirect_uri: Vec<String>,

    /// Access token lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_validity_seconds: Option<i32>,

    /// Refresh token lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_validity_seconds: Option<i32>,

    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_information: Option<BTreeMap<String, serde_json::Value>>,
}

impl ClientRegistration {
    /// Creates a registration with only a client id.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            resource_ids: Vec::new(),
            scope: Vec::new(),
            authorized_grant_types: Vec::new(),
            authorities: Vec::new(),
            registered_redirect_uri: Vec::new(),
            access_token_validity_seconds: None,
            refresh_token_validity_seconds: None,
            additional_information: None,
        }
    }
}

// =============================================================================
// Client Details
// =============================================================================

/// Client details as served to the authorization server pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientDetails {
    /// Client identifier.
    pub client_id: String,

    /// Client secret, if the client has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,

    /// Resource servers this client may access.
    pub resource_ids: BTreeSet<String>,

    /// Scopes this client may request.
    pub scope: BTreeSet<String>,

    /// Grant types this client may use.
    pub authorized_grant_types: BTreeSet<String>,

    /// Authorities granted to the client itself.
    pub authorities: BTreeSet<String>,

    /// Allowed redirect URIs.
    pub registered_redirect_uri: BTreeSet<String>,

    /// Access token lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token_validity_seconds: Option<i32>,

    /// Refresh token lifetime in seconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token_validity_seconds: Option<i32>,

    /// Free-form metadata.
    #[serde(default)]
    pub additional_information: BTreeMap<String, serde_json::Value>,
}

impl ClientDetails {
    /// Renders a registry entry.
    ///
    /// List fields are flattened through a comma-delimited form, so entries
    /// are trimmed, de-duplicated and split on embedded commas. A client with
    /// no grant types gets [`DEFAULT_GRANT_TYPES`]. Scope is copied verbatim.
    #[must_use]
    pub fn from_registration(registration: &ClientRegistration) -> Self {
        let mut authorized_grant_types = comma_delimited_set(&registration.authorized_grant_types);
        if authorized_grant_types.is_empty() {
            authorized_grant_types = DEFAULT_GRANT_TYPES.iter().map(|g| (*g).to_string()).collect();
        }

        Self {
            client_id: registration.client_id.clone(),
            client_secret: registration.client_secret.clone(),
            resource_ids: comma_delimited_set(&registration.resource_ids),
            scope: registration.scope.iter().cloned().collect(),
            authorized_grant_types,
            authorities: comma_delimited_set(&registration.authorities),
            registered_redirect_uri: comma_delimited_set(&registration.registered_redirect_uri),
            access_token_validity_seconds: registration.access_token_validity_seconds,
            refresh_token_validity_seconds: registration.refresh_token_validity_seconds,
            additional_information: registration
                .additional_information
                .clone()
                .unwrap_or_default(),
        }
    }

    /// Returns `true` if the client must present a secret.
    #[must_use]
    pub fn is_secret_required(&self) -> bool {
        self.client_secret.is_some()
    }

    /// Returns `true` if the client is restricted to a set of scopes.
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        !self.scope.is_empty()
    }

    /// Returns `true` if the client may use `grant_type`.
    #[must_use]
    pub fn allows_grant_type(&self, grant_type: &str) -> bool {
        self.authorized_grant_types.contains(grant_type)
    }
}

fn comma_delimited_set(items: &[String]) -> BTreeSet<String> {
    items
        .iter()
        .flat_map(|item| item.split(','))
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}
