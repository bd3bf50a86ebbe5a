// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Access token claims and the authorized principal derived from them.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Claims carried by every access token this service issues.
///
/// All fields are required; a payload missing any of them fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessTokenClaims {
    /// Subject - the client id the token was issued to
    pub sub: String,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Issued at (seconds since epoch)
    pub iat: i64,
    /// Expiration (seconds since epoch)
    pub exp: i64,
}

/// Authorization context forwarded with an `Allow` decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthorizationContext {
    pub sub: String,
    pub iss: String,
    pub aud: String,
}

impl From<&AccessTokenClaims> for AuthorizationContext {
    fn from(claims: &AccessTokenClaims) -> Self {
        Self {
            sub: claims.sub.clone(),
            iss: claims.iss.clone(),
            aud: claims.aud.clone(),
        }
    }
}

/// The caller behind an allowed bearer token.
///
/// Inserted into request extensions by the authorization middleware.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct AuthorizedPrincipal {
    /// Client id (`sub` claim)
    pub client_id: String,
    /// Authorization context from the decision
    pub context: AuthorizationContext,
}

impl AuthorizedPrincipal {
    pub fn from_context(context: AuthorizationContext) -> Self {
        Self {
            client_id: context.sub.clone(),
            context,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_claim_fails_to_decode() {
        let partial = r#"{"sub":"c1","iss":"i","aud":"a","iat":1}"#;
        assert!(serde_json::from_str::<AccessTokenClaims>(partial).is_err());
    }

    #[test]
    fn context_copies_identity_claims() {
        let claims = AccessTokenClaims {
            sub: "client-1".to_string(),
            iss: "token-gate".to_string(),
            aud: "api".to_string(),
            iat: 1_700_000_000,
            exp: 1_700_003_600,
        };
        let principal = AuthorizedPrincipal::from_context((&claims).into());
        assert_eq!(principal.client_id, "client-1");
        assert_eq!(principal.context.iss, "token-gate");
        assert_eq!(principal.context.aud, "api");
    }
}
