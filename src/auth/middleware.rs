// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Request-router middleware for protected routes.
//!
//! Every request under a protected router is authorized before its handler
//! runs:
//!
//! 1. The `Authorization` header (if any) is handed to the [`Authorizer`]
//!    with resource identifier `"<METHOD> <path>"`
//! 2. `Deny` short-circuits with 401
//! 3. `Allow` inserts an [`AuthorizedPrincipal`] into request extensions
//!
//! ```rust,ignore
//! let protected = Router::new()
//!     .route("/whoami", get(whoami))
//!     .layer(axum::middleware::from_fn_with_state(state.clone(), require_bearer));
//! ```
//!
//! [`Authorizer`]: super::Authorizer

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::{AuthError, AuthorizedPrincipal};
use crate::state::AppState;

/// Resource identifier for a request, e.g. `GET /v1/whoami`.
pub fn resource_identifier(request: &Request) -> String {
    format!("{} {}", request.method(), request.uri().path())
}

/// Authorize the bearer token and attach the principal.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let resource = resource_identifier(&request);
    // A header that is not valid ASCII is treated as absent.
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let decision = state.authorizer.authorize(header, &resource).await;
    if !decision.is_allow() {
        return AuthError::Unauthorized.into_response();
    }
    let Some(context) = decision.context else {
        return AuthError::Unauthorized.into_response();
    };

    request
        .extensions_mut()
        .insert(AuthorizedPrincipal::from_context(context));
    next.run(request).await
}
