// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Client management handlers.
//!
//! All routes require a bearer token from an admin client. Registry calls
//! (store I/O and secret hashing) run on the blocking pool.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{header::CACHE_CONTROL, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::{
    auth::AdminOnly,
    error::ApiError,
    models::{
        ClientListResponse, ClientView, CreateClientRequest, CreatedClient, UpdateClientRequest,
    },
    registry::{ClientRegistry, ClientUpdate, RegistryError},
    state::AppState,
};

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(value)| value)
        .map_err(|e| ApiError::bad_request(e.body_text()))
}

/// Run a registry call on the blocking pool.
async fn blocking<T, F>(registry: &Arc<ClientRegistry>, call: F) -> Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&ClientRegistry) -> Result<T, RegistryError> + Send + 'static,
{
    let registry = Arc::clone(registry);
    tokio::task::spawn_blocking(move || call(&registry))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Registry task failed");
            ApiError::internal()
        })?
        .map_err(ApiError::from)
}

#[utoipa::path(
    post,
    path = "/v1/clients",
    request_body = CreateClientRequest,
    tag = "Clients",
    security(("bearer" = [])),
    responses(
        (
            status = 201,
            description = "Client created; the secret is shown only here",
            body = CreatedClient
        ),
        (status = 400, description = "Invalid name or description"),
        (status = 401, description = "Missing or denied bearer token"),
        (status = 403, description = "Caller is not an admin client")
    )
)]
pub async fn create_client(
    AdminOnly(admin): AdminOnly,
    State(state): State<AppState>,
    payload: Result<Json<CreateClientRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let request = body(payload)?;
    let issued = blocking(&state.registry, move |registry| {
        registry.create(&request.name, request.description.as_deref())
    })
    .await?;

    tracing::info!(
        admin = %admin.client_id,
        client_id = %issued.record.client_id,
        "Client provisioned"
    );
    Ok((
        StatusCode::CREATED,
        [(CACHE_CONTROL, "no-store")],
        Json(CreatedClient::from(issued)),
    ))
}

#[utoipa::path(
    get,
    path = "/v1/clients",
    tag = "Clients",
    security(("bearer" = [])),
    responses((status = 200, body = ClientListResponse))
)]
pub async fn list_clients(
    AdminOnly(_admin): AdminOnly,
    State(state): State<AppState>,
) -> Result<Json<ClientListResponse>, ApiError> {
    let clients = blocking(&state.registry, |registry| registry.list()).await?;
    Ok(Json(ClientListResponse {
        clients: clients.into_iter().map(ClientView::from).collect(),
    }))
}

#[utoipa::path(
    get,
    path = "/v1/clients/{client_id}",
    params(("client_id" = String, Path, description = "Client identifier")),
    tag = "Clients",
    security(("bearer" = [])),
    responses(
        (status = 200, body = ClientView),
        (status = 404, description = "Unknown client")
    )
)]
pub async fn get_client(
    AdminOnly(_admin): AdminOnly,
    Path(client_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<ClientView>, ApiError> {
    let record = blocking(&state.registry, move |registry| registry.get(&client_id)).await?;
    Ok(Json(record.into()))
}

#[utoipa::path(
    put,
    path = "/v1/clients/{client_id}",
    params(("client_id" = String, Path, description = "Client identifier")),
    request_body = UpdateClientRequest,
    tag = "Clients",
    security(("bearer" = [])),
    responses(
        (status = 200, body = ClientView),
        (status = 400, description = "Invalid name or description"),
        (status = 404, description = "Unknown client")
    )
)]
pub async fn update_client(
    AdminOnly(admin): AdminOnly,
    Path(client_id): Path<String>,
    State(state): State<AppState>,
    payload: Result<Json<UpdateClientRequest>, JsonRejection>,
) -> Result<Json<ClientView>, ApiError> {
    let request = body(payload)?;
    let update = ClientUpdate {
        name: request.name,
        description: request.description,
    };
    let id = client_id.clone();
    let record = blocking(&state.registry, move |registry| registry.update(&id, update)).await?;
    tracing::debug!(admin = %admin.client_id, client_id = %client_id, "Client update applied");
    Ok(Json(record.into()))
}

/// Deactivate a client. The record stays readable.
#[utoipa::path(
    delete,
    path = "/v1/clients/{client_id}",
    params(("client_id" = String, Path, description = "Client identifier")),
    tag = "Clients",
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Client marked inactive"),
        (status = 404, description = "Unknown client")
    )
)]
pub async fn delete_client(
    AdminOnly(admin): AdminOnly,
    Path(client_id): Path<String>,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    let id = client_id.clone();
    blocking(&state.registry, move |registry| registry.deactivate(&id)).await?;
    tracing::info!(
        admin = %admin.client_id,
        client_id = %client_id,
        "Client deactivation requested"
    );
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/v1/clients/{client_id}/rotate-secret",
    params(("client_id" = String, Path, description = "Client identifier")),
    tag = "Clients",
    security(("bearer" = [])),
    responses(
        (status = 200, description = "New secret; shown only here", body = CreatedClient),
        (status = 404, description = "Unknown client")
    )
)]
pub async fn rotate_secret(
    AdminOnly(admin): AdminOnly,
    Path(client_id): Path<String>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let issued =
        blocking(&state.registry, move |registry| registry.rotate_secret(&client_id)).await?;

    tracing::info!(
        admin = %admin.client_id,
        client_id = %issued.record.client_id,
        "Client secret rotated via API"
    );
    Ok(([(CACHE_CONTROL, "no-store")], Json(CreatedClient::from(issued))))
}
