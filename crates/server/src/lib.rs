//! Wicket server library.
//!
//! Provides a reusable server function to serve Wicket either for the binary, or for the integration tests.

#![deny(missing_docs)]

use std::net::SocketAddr;

use anyhow::anyhow;
use axum::{Json, Router, routing::get};
use axum_server::tls_rustls::RustlsConfig;
use config::Config;
use http::StatusCode;
use tokio::net::TcpListener;

/// Configuration for serving Wicket.
pub struct ServeConfig {
    /// The socket address (IP and port) the server will bind to
    pub listen_address: SocketAddr,
    /// The deserialized Wicket TOML configuration.
    pub config: Config,
}

/// Starts and runs the Wicket server with the provided configuration.
pub async fn serve(ServeConfig { listen_address, config }: ServeConfig) -> anyhow::Result<()> {
    let mut app = Router::new();

    let auth_router = auth::router(&config.lms)?;
    app = app.merge(auth_router);

    if config.server.health.enabled {
        app = app.route(&config.server.health.path, get(health));
    }

    let listener = TcpListener::bind(listen_address)
        .await
        .map_err(|e| anyhow!("Failed to bind to {listen_address}: {e}"))?;

    match &config.server.tls {
        Some(tls_config) => {
            let rustls_config = RustlsConfig::from_pem_file(&tls_config.certificate, &tls_config.key)
                .await
                .map_err(|e| anyhow!("Failed to load TLS certificate and key: {e}"))?;

            log::info!(
                "Authentication endpoints available at: https://{listen_address}{}",
                config.lms.path
            );

            axum_server::from_tcp_rustls(listener.into_std()?, rustls_config)
                .serve(app.into_make_service())
                .await
                .map_err(|e| anyhow!("Failed to start HTTPS server: {e}"))?;
        }
        None => {
            log::info!(
                "Authentication endpoints available at: http://{listen_address}{}",
                config.lms.path
            );

            axum::serve(listener, app)
                .await
                .map_err(|e| anyhow!("Failed to start HTTP server: {e}"))?;
        }
    }

    Ok(())
}

#[derive(Debug, serde::Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
enum HealthState {
    /// The server is up and able to answer.
    Healthy,
}

async fn health() -> (StatusCode, Json<HealthState>) {
    (StatusCode::OK, Json(HealthState::Healthy))
}
