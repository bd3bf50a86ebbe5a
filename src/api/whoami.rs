// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, Json};

use crate::{auth::Auth, models::WhoAmIResponse, state::AppState};

/// Echo the authorization context the router layer attached.
#[utoipa::path(
    get,
    path = "/v1/whoami",
    tag = "Identity",
    security(("bearer" = [])),
    responses(
        (status = 200, body = WhoAmIResponse),
        (status = 401, description = "Missing or denied bearer token")
    )
)]
pub async fn whoami(Auth(principal): Auth, State(state): State<AppState>) -> Json<WhoAmIResponse> {
    Json(WhoAmIResponse {
        is_admin: state.is_admin(&principal.client_id),
        client_id: principal.client_id,
        context: principal.context,
    })
}
