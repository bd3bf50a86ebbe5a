// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractors for authorized callers.
//!
//! ```rust,ignore
//! async fn my_handler(Auth(principal): Auth) -> impl IntoResponse {
//!     // principal.client_id is the token's `sub`
//! }
//! ```

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};

use super::{AuthError, AuthorizedPrincipal};
use crate::state::AppState;

/// Extractor for an authorized principal.
///
/// Uses the principal inserted by [`require_bearer`](super::middleware::require_bearer)
/// when present; otherwise authorizes the request itself.
pub struct Auth(pub AuthorizedPrincipal);

impl FromRequestParts<AppState> for Auth {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // First check if middleware already set the principal
        if let Some(principal) = parts.extensions.get::<AuthorizedPrincipal>().cloned() {
            return Ok(Auth(principal));
        }

        let resource = format!("{} {}", parts.method, parts.uri.path());
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok());

        let decision = state.authorizer.authorize(header, &resource).await;
        if !decision.is_allow() {
            return Err(AuthError::Unauthorized);
        }
        let context = decision.context.ok_or(AuthError::Unauthorized)?;

        let principal = AuthorizedPrincipal::from_context(context);
        parts.extensions.insert(principal.clone());
        Ok(Auth(principal))
    }
}

/// Extractor that requires an admin client.
pub struct AdminOnly(pub AuthorizedPrincipal);

impl FromRequestParts<AppState> for AdminOnly {
    type Rejection = AuthError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Auth(principal) = Auth::from_request_parts(parts, state).await?;

        if !state.is_admin(&principal.client_id) {
            tracing::info!(client_id = %principal.client_id, "Non-admin client on admin route");
            return Err(AuthError::Forbidden);
        }

        Ok(AdminOnly(principal))
    }
}
