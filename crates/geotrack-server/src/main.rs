//! # geotrack-server
//!
//! HTTP host for the geotrack location pipeline.
//!
//! This binary provides:
//! - REST API for location samples, geofence events, waypoints and device state
//! - OpenAPI documentation via Swagger UI
//! - Structured logging to file and stdout
//!
//! ## Running
//!
//! ```bash
//! # Development
//! cargo run --package geotrack-server
//!
//! # Production
//! GEOTRACK_ENV=production ./geotrack-server
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use std::net::SocketAddr;

use geotrack_core::{default_config_path, Config};
use geotrack_server::{api, logging, state::AppState};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let is_production = logging::is_production();
    logging::init(is_production)?;

    let config_path = default_config_path();
    let config = Config::load_or_default(&config_path)?;
    config.validate()?;

    info!(
        config = %config_path.display(),
        production = is_production,
        "Starting geotrack-server"
    );

    let addr: SocketAddr = config.server.bind_address.parse()?;
    let state = AppState::from_config(config, Some(config_path)).await?;

    let app = api::create_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .layer(CorsLayer::permissive()),
    );

    let listener = TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
