//! HTTP API routes and handlers.
//!
//! This module contains all HTTP endpoint implementations organized by domain:
//! - `locations` - Location sample ingestion and re-publishing
//! - `geofence` - Native geofence enter/exit events
//! - `waypoints` - Waypoint state and waypoint messages
//! - `device` - Device metrics and status messages
//! - `config` - Engine preferences
//! - `messages` - Outbound message history
//! - `health` - Service health checks
//! - `error` - API error types
//! - `openapi` - OpenAPI specification generation

use axum::routing::get;
use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::state::SharedState;

pub mod config;
pub mod device;
pub mod error;
pub mod geofence;
pub mod health;
pub mod locations;
pub mod messages;
pub mod openapi;
pub mod waypoints;

// Re-export commonly used types
pub use error::{ApiError, ApiResult, ErrorResponse};

// Re-export OpenAPI utilities for the gen-openapi binary
pub use openapi::get_openapi_json;

/// Creates the combined API router with all endpoints.
///
/// # Route Structure
///
/// ```text
/// /health                - Health check
/// /api
/// ├── /locations         - Report and re-publish locations
/// ├── /geofence          - Native geofence events
/// ├── /waypoints         - Waypoint state and publishing
/// ├── /device            - Device metrics
/// ├── /status            - Status messages
/// ├── /config            - Preferences
/// ├── /messages          - Outbound message history
/// └── /openapi.json      - OpenAPI specification
/// /swagger-ui            - Interactive documentation
/// ```
pub fn create_router(state: SharedState) -> Router {
    Router::new()
        .nest("/health", health::router())
        .nest(
            "/api",
            Router::new()
                // OpenAPI spec at /api/openapi.json
                .route("/openapi.json", get(openapi::get_openapi_spec))
                .nest("/locations", locations::router())
                .nest("/geofence", geofence::router())
                .nest("/waypoints", waypoints::router())
                .nest("/device", device::router())
                .nest("/status", device::status_router())
                .nest("/config", config::router())
                .nest("/messages", messages::router()),
        )
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", openapi::ApiDoc::openapi()),
        )
        .with_state(state)
}
