// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    http::header::CACHE_CONTROL,
    response::IntoResponse,
    Json,
};

use crate::{
    auth::IssuerError,
    models::{TokenRequest, TokenResponse},
    state::AppState,
};

/// Exchange client credentials for an access token.
///
/// An unparsable body is reported as `invalid_request` like a missing field.
#[utoipa::path(
    post,
    path = "/oauth/token",
    request_body = TokenRequest,
    tag = "Token",
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 400, description = "`invalid_request` or `unsupported_grant_type`"),
        (status = 401, description = "`invalid_client`"),
        (status = 500, description = "`server_error`")
    )
)]
pub async fn issue_token(
    State(state): State<AppState>,
    payload: Result<Json<TokenRequest>, JsonRejection>,
) -> Result<impl IntoResponse, IssuerError> {
    let Json(request) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Unparsable token request");
        IssuerError::InvalidRequest
    })?;

    let response = state.issuer.issue_token(request).await?;
    Ok(([(CACHE_CONTROL, "no-store")], Json(response)))
}
