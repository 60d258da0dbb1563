//! Authentication context: who asked for a token, on behalf of whom, and
//! with which scopes and request parameters.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// The client's authorization request as it was approved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OAuth2Request {
    /// Client that requested the token.
    pub client_id: String,

    /// Granted scopes.
    #[serde(default)]
    pub scope: BTreeSet<String>,

    /// Raw request parameters as received.
    #[serde(default)]
    pub request_parameters: BTreeMap<String, String>,

    /// Resource servers the token is intended for.
    #[serde(default)]
    pub resource_ids: BTreeSet<String>,

    /// Authorities granted to the client.
    #[serde(default)]
    pub authorities: BTreeSet<String>,

    /// Whether the request was approved.
    pub approved: bool,

    /// Redirect URI used in the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_uri: Option<String>,

    /// Requested response types.
    #[serde(default)]
    pub response_types: BTreeSet<String>,

    /// Grant type that produced the token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant_type: Option<String>,
}

impl OAuth2Request {
    /// Creates an approved request for `client_id` with no scope or parameters.
    #[must_use]
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            scope: BTreeSet::new(),
            request_parameters: BTreeMap::new(),
            resource_ids: BTreeSet::new(),
            authorities: BTreeSet::new(),
            approved: true,
            redirect_uri: None,
            response_types: BTreeSet::new(),
            grant_type: None,
        }
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

    /// Adds a request parameter.
    #[must_use]
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.request_parameters.insert(name.into(), value.into());
        self
    }

    /// Sets the grant type.
    #[must_use]
    pub fn with_grant_type(mut self, grant_type: impl Into<String>) -> Self {
        self.grant_type = Some(grant_type.into());
        self
    }

    /// Sets the redirect URI.
    #[must_use]
    pub fn with_redirect_uri(mut self, redirect_uri: impl Into<String>) -> Self {
        self.redirect_uri = Some(redirect_uri.into());
        self
    }
}

/// The authenticated end user behind a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAuthentication {
    /// Principal name.
    pub name: String,

    /// Authorities held by the user.
    #[serde(default)]
    pub authorities: BTreeSet<String>,

    /// Whether the user was authenticated.
    pub authenticated: bool,
}

impl UserAuthentication {
    /// Creates an authenticated user with no authorities.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            authorities: BTreeSet::new(),
            authenticated: true,
        }
    }

    /// Sets the user's authorities.
    #[must_use]
    pub fn with_authorities<I, S>(mut self, authorities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.authorities = authorities.into_iter().map(Into::into).collect();
        self
    }
}

/// One authorization grant: the client request plus, unless the grant is
/// client-only, the user it was made for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authentication {
    /// The approved client request.
    pub request: OAuth2Request,

    /// The end user. `None` for client-credentials grants.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<UserAuthentication>,
}

impl Authentication {
    /// Creates an authentication for a user-backed grant.
    #[must_use]
    pub fn new(request: OAuth2Request, user: UserAuthentication) -> Self {
        Self {
            request,
            user: Some(user),
        }
    }

    /// Creates an authentication for a client-only grant.
    #[must_use]
    pub fn client_only(request: OAuth2Request) -> Self {
        Self {
            request,
            user: None,
        }
    }

    /// Returns `true` if no end user is involved.
    #[must_use]
    pub fn is_client_only(&self) -> bool {
        self.user.is_none()
    }

    /// Principal name: the user's name, or the client id for client-only grants.
    #[must_use]
    pub fn name(&self) -> &str {
        self.user
            .as_ref()
            .map(|u| u.name.as_str())
            .unwrap_or(&self.request.client_id)
    }

    /// Name of the end user, `None` for client-only grants.
    #[must_use]
    pub fn username(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.name.as_str())
    }

    /// Client that requested the token.
    #[must_use]
    pub fn client_id(&self) -> &str {
        &self.request.client_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_only_name_falls_back_to_client_id() {
        let auth = Authentication::client_only(OAuth2Request::new("batch-job"));
        assert!(auth.is_client_only());
        assert_eq!(auth.name(), "batch-job");
        assert_eq!(auth.username(), None);
    }

    #[test]
    fn test_user_grant_name() {
        let auth = Authentication::new(
            OAuth2Request::new("web-app").with_scope(["read"]),
            UserAuthentication::new("alice").with_authorities(["ROLE_USER"]),
        );
        assert!(!auth.is_client_only());
        assert_eq!(auth.name(), "alice");
        assert_eq!(auth.username(), Some("alice"));
        assert_eq!(auth.client_id(), "web-app");
    }

    #[test]
    fn test_serialization() {
        let auth = Authentication::new(
            OAuth2Request::new("web-app")
                .with_scope(["read", "write"])
                .with_parameter("state", "xyz")
                .with_grant_type("authorization_code"),
            UserAuthentication::new("alice"),
        );

        let json = serde_json::to_value(&auth).unwrap();
        assert_eq!(json["request"]["clientId"], "web-app");
        assert_eq!(json["user"]["name"], "alice");

        let back: Authentication = serde_json::from_value(json).unwrap();
        assert_eq!(back, auth);
    }
}
