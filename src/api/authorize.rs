// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};

use crate::{auth::PolicyDecision, error::ApiError, models::AuthorizeRequest, state::AppState};

/// Authorizer invocation for an external request router.
///
/// Always answers 200; the decision itself carries `Allow` or `Deny`.
#[utoipa::path(
    post,
    path = "/v1/authorize",
    request_body = AuthorizeRequest,
    tag = "Authorizer",
    responses(
        (status = 200, description = "Policy decision", body = PolicyDecision),
        (status = 400, description = "`invalid_request`")
    )
)]
pub async fn authorize(
    State(state): State<AppState>,
    payload: Result<Json<AuthorizeRequest>, JsonRejection>,
) -> Result<Json<PolicyDecision>, ApiError> {
    let Json(request) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Unparsable authorizer request");
        ApiError::bad_request("invalid_request")
    })?;
    let decision = state
        .authorizer
        .authorize(request.authorization_token.as_deref(), &request.method_arn)
        .await;
    Ok(Json(decision))
}
