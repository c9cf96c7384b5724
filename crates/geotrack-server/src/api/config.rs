//! Configuration API endpoints.
//!
//! Exposes the engine preferences and lets clients switch the monitoring mode.
//! Changes are saved to the config file and reach the engine on its next
//! event.

use axum::extract::State;
use axum::routing::{get, put};
use axum::{Json, Router};
use geotrack_core::{MonitoringMode, Preferences};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Creates the config router with all endpoints.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(get_config))
        .route("/monitoring", put(update_monitoring))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Current configuration.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ConfigResponse {
    /// Engine preferences.
    pub preferences: Preferences,

    /// Timeout for each store or queue call, in milliseconds.
    #[schema(example = 5000)]
    pub collaborator_timeout_ms: u64,
}

/// Request body for changing the monitoring mode.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "mode": "move"
}))]
pub struct UpdateMonitoringRequest {
    /// New monitoring mode.
    pub mode: MonitoringMode,
}

/// Response after changing the monitoring mode.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "success": true,
    "mode": "move"
}))]
pub struct UpdateMonitoringResponse {
    /// Whether the update was applied.
    #[schema(example = true)]
    pub success: bool,

    /// Monitoring mode now in effect.
    pub mode: MonitoringMode,
}

// ============================================================================
// Handlers
// ============================================================================

/// Get current configuration.
#[utoipa::path(
    get,
    path = "/api/config",
    tag = "config",
    operation_id = "getConfig",
    summary = "Get configuration",
    description = "Returns the preferences the engine reads on every event.",
    responses(
        (status = 200, description = "Configuration retrieved", body = ConfigResponse)
    )
)]
pub async fn get_config(State(state): State<SharedState>) -> Json<ConfigResponse> {
    let config = state.config().await;

    Json(ConfigResponse {
        preferences: config.preferences.clone(),
        collaborator_timeout_ms: config.engine.collaborator_timeout_ms,
    })
}

/// Change the monitoring mode.
#[utoipa::path(
    put,
    path = "/api/config/monitoring",
    tag = "config",
    operation_id = "updateMonitoring",
    summary = "Update monitoring mode",
    description = "Switches between quiet, manual, significant and move \
        monitoring. Quiet suppresses every message; manual only publishes \
        explicitly requested locations.",
    request_body = UpdateMonitoringRequest,
    responses(
        (status = 200, description = "Monitoring mode updated", body = UpdateMonitoringResponse),
        (status = 500, description = "Configuration could not be saved", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn update_monitoring(
    State(state): State<SharedState>,
    Json(request): Json<UpdateMonitoringRequest>,
) -> ApiResult<Json<UpdateMonitoringResponse>> {
    let mode = request.mode;
    let preferences = state
        .update_preferences(move |p| p.monitoring = mode)
        .await?;

    Ok(Json(UpdateMonitoringResponse {
        success: true,
        mode: preferences.monitoring,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitoring_request_parses_lowercase() {
        let request: UpdateMonitoringRequest = serde_json::from_str(r#"{"mode":"quiet"}"#).unwrap();
        assert_eq!(request.mode, MonitoringMode::Quiet);
    }
}
