//! OpenAPI specification generation for the geotrack API.
//!
//! The document is served at `/api/openapi.json`, rendered by Swagger UI, and
//! written to the workspace root by the `gen-openapi` binary.

use axum::Json;
use utoipa::OpenApi;

use geotrack_core::{
    BatteryStatus, ConnectionType, DeviceMetrics, LocationSample, MonitoringMode, Preferences,
    ReportType, TransitionKind, Waypoint, WaypointState, WifiInfo,
};

use super::config::{ConfigResponse, UpdateMonitoringRequest, UpdateMonitoringResponse};
use super::device::{DeviceStateRequest, DeviceStateResponse};
use super::error::ErrorResponse;
use super::geofence::{GeofenceEventRequest, GeofenceEventResponse};
use super::health::{HealthResponse, HealthStatus};
use super::locations::{PublishLocationRequest, ReportLocationRequest, ReportLocationResponse};
use super::messages::{MessagesResponse, PublishResponse};
use super::waypoints::WaypointsResponse;

/// Serve the OpenAPI specification as JSON.
///
/// This endpoint is available at `/api/openapi.json`.
pub async fn get_openapi_spec() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Returns the OpenAPI specification as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if the document cannot be serialized.
pub fn get_openapi_json() -> Result<String, serde_json::Error> {
    ApiDoc::openapi().to_pretty_json()
}

/// Main OpenAPI document structure for geotrack.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "geotrack API",
        version = "0.1.0",
        description = r#"
# geotrack API

geotrack turns raw location fixes and geofence callbacks into location and
waypoint transition messages.

## Overview

1. **Locations**: report fixes; they are filtered by accuracy, checked against
   every waypoint, and published if the monitoring mode allows it
2. **Geofence**: report native enter/exit callbacks for a waypoint
3. **Waypoints**: inspect transition state and publish waypoint messages
4. **Messages**: inspect what the engine handed to the outbound queue

## Monitoring modes

- `quiet`: nothing is published
- `manual`: only explicitly requested locations
- `significant` and `move`: everything
"#,
        license(name = "MIT", url = "https://opensource.org/licenses/MIT")
    ),
    servers(
        (url = "/", description = "Local geotrack server")
    ),
    tags(
        (name = "system", description = "Health checks"),
        (name = "locations", description = "Location sample ingestion and publishing"),
        (name = "geofence", description = "Native geofence enter/exit events"),
        (name = "waypoints", description = "Waypoint state and waypoint messages"),
        (name = "device", description = "Device metrics and status messages"),
        (name = "config", description = "Engine preferences"),
        (name = "messages", description = "Outbound message history")
    ),
    paths(
        // Health endpoints
        super::health::health_check,
        // Location endpoints
        super::locations::report_location,
        super::locations::publish_current_location,
        // Geofence endpoints
        super::geofence::geofence_event,
        // Waypoint endpoints
        super::waypoints::list_waypoints,
        super::waypoints::publish_waypoints,
        super::waypoints::publish_waypoint,
        // Device endpoints
        super::device::update_device,
        super::device::publish_status,
        // Config endpoints
        super::config::get_config,
        super::config::update_monitoring,
        // Message endpoints
        super::messages::get_messages,
    ),
    components(
        schemas(
            // Error types
            ErrorResponse,
            // Health types
            HealthResponse,
            HealthStatus,
            // Shared engine types
            LocationSample,
            WifiInfo,
            ReportType,
            TransitionKind,
            MonitoringMode,
            Preferences,
            Waypoint,
            WaypointState,
            DeviceMetrics,
            BatteryStatus,
            ConnectionType,
            // Location types
            ReportLocationRequest,
            ReportLocationResponse,
            PublishLocationRequest,
            // Geofence types
            GeofenceEventRequest,
            GeofenceEventResponse,
            // Waypoint types
            WaypointsResponse,
            // Device types
            DeviceStateRequest,
            DeviceStateResponse,
            // Config types
            ConfigResponse,
            UpdateMonitoringRequest,
            UpdateMonitoringResponse,
            // Message types
            PublishResponse,
            MessagesResponse,
        )
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_spec_generation() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "geotrack API");
        assert!(spec.paths.paths.contains_key("/api/geofence"));
        assert!(spec.paths.paths.contains_key("/api/waypoints/{id}/publish"));
    }

    #[test]
    fn test_openapi_json_serialization() {
        let json = get_openapi_json().unwrap();
        assert!(json.contains("\"openapi\":"));
        assert!(json.contains("\"geotrack API\""));
    }
}
