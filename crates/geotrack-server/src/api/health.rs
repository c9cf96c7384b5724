//! Liveness of the engine and its waypoint store.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use geotrack_core::MonitoringMode;
use serde::{Deserialize, Serialize};
use tracing::warn;
use utoipa::ToSchema;

use crate::state::SharedState;

/// Whether the engine can serve events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Store reachable.
    Ok,
    /// The waypoint store could not be read.
    Degraded,
}

/// Engine health snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "status": "ok",
    "version": "0.1.0",
    "tracker_id": "gt",
    "monitoring": "significant",
    "waypoints": 3,
    "messages_dispatched": 42
}))]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,

    /// Crate version.
    #[schema(example = "0.1.0")]
    pub version: String,

    /// Tracker id stamped on outbound messages.
    #[schema(example = "gt")]
    pub tracker_id: String,

    /// Monitoring mode the next event will see.
    pub monitoring: MonitoringMode,

    /// Number of stored waypoints; absent when the store is unreadable.
    #[schema(example = 3)]
    pub waypoints: Option<usize>,

    /// Messages handed to the outbound queue since startup.
    #[schema(example = 42)]
    pub messages_dispatched: u64,
}

/// Creates the health router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(health_check))
}

/// Report engine health.
#[utoipa::path(
    get,
    path = "/health",
    tag = "system",
    operation_id = "healthCheck",
    summary = "Check engine health",
    description = "Reads the waypoint store and reports the active monitoring \
        mode. Answers 503 when the store cannot be read.",
    responses(
        (status = 200, description = "Engine is healthy", body = HealthResponse),
        (status = 503, description = "Waypoint store unreadable", body = HealthResponse)
    )
)]
pub async fn health_check(State(state): State<SharedState>) -> (StatusCode, Json<HealthResponse>) {
    let waypoints = match state.waypoints.load_all().await {
        Ok(waypoints) => Some(waypoints.len()),
        Err(e) => {
            warn!(error = %e, "Health check could not read waypoints");
            None
        }
    };
    let (code, status) = if waypoints.is_some() {
        (StatusCode::OK, HealthStatus::Ok)
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, HealthStatus::Degraded)
    };
    let preferences = state.processor.preferences();

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_owned(),
            tracker_id: preferences.tracker_id,
            monitoring: preferences.monitoring,
            waypoints,
            messages_dispatched: state.outbox.total(),
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degraded_health_serialization() {
        let response = HealthResponse {
            status: HealthStatus::Degraded,
            version: "0.1.0".to_owned(),
            tracker_id: "gt".to_owned(),
            monitoring: MonitoringMode::Quiet,
            waypoints: None,
            messages_dispatched: 0,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["monitoring"], "quiet");
        assert!(json["waypoints"].is_null());
    }
}
