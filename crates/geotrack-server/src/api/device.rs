//! Device state API endpoints.
//!
//! The device pushes battery, connectivity and Wi-Fi state here; the engine
//! reads it back when building extended location data and status messages.

use axum::extract::State;
use axum::routing::{post, put};
use axum::{Json, Router};
use geotrack_core::{DeviceMetrics, DeviceMetricsProvider, WifiInfo, WifiInfoProvider};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::ApiResult;
use crate::api::messages::PublishResponse;
use crate::state::SharedState;

/// Creates the device router, mounted at `/device`.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", put(update_device))
}

/// Creates the status router, mounted at `/status`.
pub fn status_router() -> Router<SharedState> {
    Router::new().route("/publish", post(publish_status))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Device state as reported by the device.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "metrics": {
        "battery_level": 87,
        "battery_status": "charging",
        "connection": "wifi",
        "power_save": false,
        "battery_optimizations": false,
        "app_hibernation": false,
        "location_permission": true
    },
    "wifi_enabled": true,
    "wifi": { "ssid": "home-net", "bssid": "aa:bb:cc:dd:ee:ff" }
}))]
pub struct DeviceStateRequest {
    /// Battery and connectivity.
    pub metrics: DeviceMetrics,

    /// Whether Wi-Fi is switched on.
    #[serde(default)]
    pub wifi_enabled: bool,

    /// Network currently attached to.
    #[serde(default)]
    pub wifi: Option<WifiInfo>,
}

/// Device state after the update.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeviceStateResponse {
    /// Battery and connectivity.
    pub metrics: DeviceMetrics,

    /// Whether Wi-Fi is switched on.
    pub wifi_enabled: bool,

    /// Network currently attached to.
    pub wifi: Option<WifiInfo>,
}

// ============================================================================
// Handlers
// ============================================================================

/// Update the reported device state.
#[utoipa::path(
    put,
    path = "/api/device",
    tag = "device",
    operation_id = "updateDevice",
    summary = "Update device state",
    description = "Replaces the battery, connectivity and Wi-Fi state used in \
        extended location data and status messages.",
    request_body = DeviceStateRequest,
    responses(
        (status = 200, description = "Device state updated", body = DeviceStateResponse)
    )
)]
pub async fn update_device(
    State(state): State<SharedState>,
    Json(request): Json<DeviceStateRequest>,
) -> Json<DeviceStateResponse> {
    state.device.set_metrics(request.metrics);
    state.device.set_wifi(request.wifi_enabled, request.wifi);

    Json(DeviceStateResponse {
        metrics: state.device.device_metrics(),
        wifi_enabled: state.device.is_wifi_enabled(),
        wifi: state.device.current_wifi(),
    })
}

/// Publish a device status message.
#[utoipa::path(
    post,
    path = "/api/status/publish",
    tag = "device",
    operation_id = "publishStatus",
    summary = "Publish device status",
    description = "Queues a status message with Wi-Fi, power-save, battery \
        optimisation, hibernation and permission state.",
    responses(
        (status = 200, description = "Status queued", body = PublishResponse)
    )
)]
pub async fn publish_status(State(state): State<SharedState>) -> ApiResult<Json<PublishResponse>> {
    state.processor.publish_status_message().await?;
    Ok(Json(PublishResponse::queued("status")))
}
