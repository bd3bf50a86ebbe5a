// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the HTTP surface. All types derive
//! `ToSchema` for the OpenAPI document.
//!
//! ## Model Categories
//!
//! - **Token endpoint**: client-credentials grant request and token response
//! - **Authorizer**: router-facing authorization request
//! - **Client management**: create/update requests and secret-free views
//!
//! Types carrying a secret (`TokenRequest`, `TokenResponse`, `CreatedClient`)
//! redact it in `Debug`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::auth::AuthorizationContext;
use crate::registry::IssuedCredentials;
use crate::storage::ClientRecord;

// =============================================================================
// Token Endpoint
// =============================================================================

/// Client-credentials grant.
///
/// Every field is optional at the wire level so missing values are reported
/// as `invalid_request` rather than a deserialization failure.
#[derive(Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct TokenRequest {
    /// Must be `client_credentials`.
    #[serde(default)]
    pub grant_type: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
}

impl std::fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Issued access token.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always `Bearer`.
    pub token_type: String,
    /// Token lifetime in seconds.
    pub expires_in: u64,
}

impl std::fmt::Debug for TokenResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResponse")
            .field("access_token", &"<redacted>")
            .field("token_type", &self.token_type)
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

// =============================================================================
// Authorizer
// =============================================================================

/// Authorization request from the request router.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeRequest {
    /// Raw `Authorization` header value (`Bearer <token>`).
    #[serde(default)]
    pub authorization_token: Option<String>,
    /// Resource being invoked. Also accepted as `resourceIdentifier`.
    #[serde(alias = "resourceIdentifier")]
    pub method_arn: String,
}

/// Caller identity as seen by a protected handler.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct WhoAmIResponse {
    pub client_id: String,
    pub is_admin: bool,
    pub context: AuthorizationContext,
}

// =============================================================================
// Client Management
// =============================================================================

/// Request to provision a client.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateClientRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// Partial client update. Omitted fields are left unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UpdateClientRequest {
    #[serde(default)]
    pub name: Option<String>,
    /// An empty string clears the description.
    #[serde(default)]
    pub description: Option<String>,
}

/// A client record without its secret hash.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct ClientView {
    pub client_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_active: bool,
}

impl From<ClientRecord> for ClientView {
    fn from(record: ClientRecord) -> Self {
        Self {
            client_id: record.client_id,
            name: record.name,
            description: record.description,
            created_at: record.created_at,
            updated_at: record.updated_at,
            is_active: record.is_active,
        }
    }
}

/// Response to create and rotate-secret. The secret is not retrievable later.
#[derive(Clone, Serialize, Deserialize, ToSchema)]
pub struct CreatedClient {
    pub client_id: String,
    pub client_secret: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub is_active: bool,
}

impl From<IssuedCredentials> for CreatedClient {
    fn from(issued: IssuedCredentials) -> Self {
        let IssuedCredentials {
            record,
            client_secret,
        } = issued;
        Self {
            client_id: record.client_id,
            client_secret,
            name: record.name,
            description: record.description,
            created_at: record.created_at,
            is_active: record.is_active,
        }
    }
}

impl std::fmt::Debug for CreatedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreatedClient")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// Client listing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ClientListResponse {
    pub clients: Vec<ClientView>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn authorize_request_accepts_both_resource_names() {
        let a: AuthorizeRequest = serde_json::from_str(
            r#"{"authorizationToken":"Bearer x","methodArn":"arn:a/GET/items"}"#,
        )
        .unwrap();
        let b: AuthorizeRequest = serde_json::from_str(
            r#"{"authorizationToken":"Bearer x","resourceIdentifier":"arn:a/GET/items"}"#,
        )
        .unwrap();
        assert_eq!(a.method_arn, b.method_arn);
        assert_eq!(a.authorization_token.as_deref(), Some("Bearer x"));
    }

    #[test]
    fn client_view_has_no_secret_hash() {
        let now = Utc::now();
        let view = ClientView::from(ClientRecord {
            client_id: "c1".to_string(),
            client_secret_hash: "pbkdf2-sha256$1$salt$hash".to_string(),
            name: "svc-a".to_string(),
            description: None,
            created_at: now,
            updated_at: now,
            is_active: true,
        });
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("secret"));
        assert!(!json.contains("pbkdf2"));
    }

    #[test]
    fn token_request_tolerates_missing_fields() {
        let request: TokenRequest =
            serde_json::from_str(r#"{"grant_type":"client_credentials"}"#).unwrap();
        assert!(request.client_id.is_none());

        let with_secret = TokenRequest {
            client_secret: Some("hunter2".to_string()),
            ..Default::default()
        };
        assert!(!format!("{with_secret:?}").contains("hunter2"));
    }
}
