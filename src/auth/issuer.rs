// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client-credentials token issuer.
//!
//! ## Grant Flow
//!
//! 1. `grant_type` must be `client_credentials` (`unsupported_grant_type`)
//! 2. `client_id` and `client_secret` must be present (`invalid_request`)
//! 3. Credentials are checked against the registry on the blocking pool;
//!    unknown, inactive and wrong-secret all become `invalid_client`
//! 4. Claims are signed with the memoized secret
//!
//! Registry, secret store and signing failures are logged here and reported
//! to the caller only as `server_error`.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use super::claims::AccessTokenClaims;
use super::codec::TokenCodec;
use super::secrets::SecretAccessor;
use crate::clock::Clock;
use crate::models::{TokenRequest, TokenResponse};
use crate::registry::ClientRegistry;

/// The only supported grant.
pub const CLIENT_CREDENTIALS: &str = "client_credentials";

/// Token endpoint errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IssuerError {
    #[error("grant type is not supported")]
    UnsupportedGrantType,
    #[error("client_id and client_secret are required")]
    InvalidRequest,
    #[error("client authentication failed")]
    InvalidClient,
    /// Internal detail is for logs only.
    #[error("token issuance failed: {0}")]
    ServerError(String),
}

#[derive(Serialize)]
struct IssuerErrorBody {
    error: &'static str,
}

impl IssuerError {
    pub fn error_code(&self) -> &'static str {
        match self {
            IssuerError::UnsupportedGrantType => "unsupported_grant_type",
            IssuerError::InvalidRequest => "invalid_request",
            IssuerError::InvalidClient => "invalid_client",
            IssuerError::ServerError(_) => "server_error",
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            IssuerError::UnsupportedGrantType | IssuerError::InvalidRequest => {
                StatusCode::BAD_REQUEST
            }
            IssuerError::InvalidClient => StatusCode::UNAUTHORIZED,
            IssuerError::ServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for IssuerError {
    fn into_response(self) -> Response {
        let body = Json(IssuerErrorBody {
            error: self.error_code(),
        });
        (self.status_code(), body).into_response()
    }
}

/// Exchanges client credentials for signed access tokens.
pub struct TokenIssuer {
    registry: Arc<ClientRegistry>,
    secrets: Arc<SecretAccessor>,
    codec: TokenCodec,
    lifetime: Duration,
    clock: Arc<dyn Clock>,
}

impl TokenIssuer {
    pub fn new(
        registry: Arc<ClientRegistry>,
        secrets: Arc<SecretAccessor>,
        codec: TokenCodec,
        lifetime: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            secrets,
            codec,
            lifetime,
            clock,
        }
    }

    /// Run the client-credentials grant.
    pub async fn issue_token(&self, request: TokenRequest) -> Result<TokenResponse, IssuerError> {
        if request.grant_type.as_deref() != Some(CLIENT_CREDENTIALS) {
            return Err(IssuerError::UnsupportedGrantType);
        }

        let (client_id, client_secret) = match (request.client_id, request.client_secret) {
            (Some(id), Some(secret)) if !id.is_empty() && !secret.is_empty() => (id, secret),
            _ => return Err(IssuerError::InvalidRequest),
        };

        let registry = Arc::clone(&self.registry);
        let lookup_id = client_id.clone();
        let verified = tokio::task::spawn_blocking(move || {
            registry.verify_credentials(&lookup_id, &client_secret)
        })
        .await
        .map_err(|e| server_error("credential check task failed", e))?
        .map_err(|e| server_error("credential check failed", e))?;

        if !verified {
            tracing::info!(client_id = %client_id, "Rejected client credentials");
            return Err(IssuerError::InvalidClient);
        }

        let secret = self
            .secrets
            .signing_secret()
            .await
            .map_err(|e| server_error("signing secret unavailable", e))?;

        let lifetime = i64::try_from(self.lifetime.as_secs()).unwrap_or(i64::MAX);
        let iat = self.clock.now().timestamp();
        let claims = AccessTokenClaims {
            sub: client_id,
            iss: self.codec.issuer().to_string(),
            aud: self.codec.audience().to_string(),
            iat,
            exp: iat.saturating_add(lifetime),
        };

        let access_token = self
            .codec
            .sign(&claims, &secret)
            .map_err(|e| server_error("token signing failed", e))?;

        tracing::info!(client_id = %claims.sub, exp = claims.exp, "Access token issued");
        Ok(TokenResponse {
            access_token,
            token_type: "Bearer".to_string(),
            expires_in: self.lifetime.as_secs(),
        })
    }
}

fn server_error(context: &str, err: impl std::fmt::Display) -> IssuerError {
    tracing::error!(error = %err, "{context}");
    IssuerError::ServerError(format!("{context}: {err}"))
}
