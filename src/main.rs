// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::{net::SocketAddr, sync::Arc, time::Duration};

use axum_server::{tls_rustls::RustlsConfig, Handle};
use tokio::signal;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use token_gate::{
    api::router,
    auth::{EnvSecretStore, HttpSecretStore, SecretStore},
    clock::SystemClock,
    config::{LogFormat, SecretSource, Settings, DEFAULT_LOG_FILTER},
    state::AppState,
    storage::{ClientDatabase, ClientStore, InMemoryClientStore},
};

const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => subscriber.with(fmt::layer().json()).init(),
        LogFormat::Pretty => subscriber.with(fmt::layer()).init(),
    }
}

fn client_store(settings: &Settings) -> Arc<dyn ClientStore> {
    match &settings.client_db_path {
        Some(path) => {
            let db = ClientDatabase::open(path).expect("Failed to open client database");
            tracing::info!(path = %path.display(), "Using redb client store");
            Arc::new(db)
        }
        None => {
            tracing::warn!("CLIENT_DB_PATH not set; client records will not survive a restart");
            Arc::new(InMemoryClientStore::new())
        }
    }
}

fn secret_store(settings: &Settings) -> Arc<dyn SecretStore> {
    match &settings.secret_source {
        SecretSource::Remote(url) => {
            tracing::info!(url = %url, "Fetching signing secret from remote store");
            let store =
                HttpSecretStore::new(url.clone()).expect("Failed to build secret store client");
            Arc::new(store)
        }
        SecretSource::Environment { value, algorithm } => {
            Arc::new(EnvSecretStore::new(value.clone(), algorithm.clone()))
        }
    }
}

async fn shutdown_signal(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received");
    handle.graceful_shutdown(Some(SHUTDOWN_GRACE));
}

#[tokio::main]
async fn main() {
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };
    init_tracing(settings.log_format);

    let state = AppState::new(
        &settings,
        client_store(&settings),
        secret_store(&settings),
        Arc::new(SystemClock),
    )
    .expect("Failed to initialize application state");
    let app = router(state);

    let addr: SocketAddr = settings
        .bind_address()
        .parse()
        .expect("Failed to parse bind address");

    let handle: Handle<SocketAddr> = Handle::new();
    tokio::spawn(shutdown_signal(handle.clone()));

    match &settings.tls {
        Some((cert, key)) => {
            // Must happen before any TLS operation.
            rustls::crypto::ring::default_provider()
                .install_default()
                .expect("Failed to install rustls crypto provider");
            let tls_config = RustlsConfig::from_pem_file(cert, key)
                .await
                .expect("Failed to load TLS certificate and key");

            tracing::info!(%addr, "Token Gate listening on https (docs at /docs)");
            axum_server::bind_rustls(addr, tls_config)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .expect("HTTPS server failed");
        }
        None => {
            tracing::info!(%addr, "Token Gate listening on http (docs at /docs)");
            axum_server::bind(addr)
                .handle(handle)
                .serve(app.into_make_service())
                .await
                .expect("HTTP server failed");
        }
    }

    tracing::info!("Token Gate stopped");
}
