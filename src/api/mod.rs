// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    auth::{
        middleware::require_bearer, AuthorizationContext, Effect, PolicyDecision, PolicyDocument,
    },
    models::{
        AuthorizeRequest, ClientListResponse, ClientView, CreateClientRequest, CreatedClient,
        TokenRequest, TokenResponse, UpdateClientRequest, WhoAmIResponse,
    },
    state::AppState,
};

pub mod authorize;
pub mod clients;
pub mod health;
pub mod token;
pub mod whoami;

/// Client management routes rooted at `base`.
fn client_routes(base: &str) -> Router<AppState> {
    Router::new()
        .route(base, get(clients::list_clients).post(clients::create_client))
        .route(
            &format!("{base}/{{client_id}}"),
            get(clients::get_client)
                .put(clients::update_client)
                .delete(clients::delete_client),
        )
        .route(
            &format!("{base}/{{client_id}}/rotate-secret"),
            post(clients::rotate_secret),
        )
}

pub fn router(state: AppState) -> Router {
    // Every route here passes through the authorizer before its handler.
    // Client management is served both unversioned and under `/v1`.
    let protected = client_routes("/clients")
        .merge(client_routes("/v1/clients"))
        .route("/v1/whoami", get(whoami::whoami))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    Router::new()
        .route("/oauth/token", post(token::issue_token))
        .route("/v1/authorize", post(authorize::authorize))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .merge(protected)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .layer(CorsLayer::permissive())
}

struct BearerSecurity;

impl Modify for BearerSecurity {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        token::issue_token,
        authorize::authorize,
        whoami::whoami,
        clients::create_client,
        clients::list_clients,
        clients::get_client,
        clients::update_client,
        clients::delete_client,
        clients::rotate_secret,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            TokenRequest,
            TokenResponse,
            AuthorizeRequest,
            PolicyDecision,
            PolicyDocument,
            Effect,
            AuthorizationContext,
            WhoAmIResponse,
            CreateClientRequest,
            UpdateClientRequest,
            ClientView,
            CreatedClient,
            ClientListResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    modifiers(&BearerSecurity),
    tags(
        (name = "Token", description = "Client-credentials token issuance"),
        (name = "Authorizer", description = "Bearer token policy decisions"),
        (name = "Identity", description = "Caller introspection"),
        (name = "Clients", description = "Client registry administration"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
struct ApiDoc;
