//! Native geofence event API endpoint.
//!
//! Platforms with their own geofencing report region enter/exit callbacks
//! here. These are applied with the circular trigger, so a real transition is
//! followed by a circular location publish.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use geotrack_core::{LocationSample, TransitionKind, TransitionTrigger, WaypointId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::ApiResult;
use crate::state::SharedState;

/// Creates the geofence router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", post(geofence_event))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// A geofence callback from the platform.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "waypoint_id": 1,
    "event": "enter",
    "sample": {
        "latitude": 52.520008,
        "longitude": 13.404954,
        "accuracy": 12.5,
        "timestamp": "2025-05-20T09:00:00Z"
    }
}))]
pub struct GeofenceEventRequest {
    /// Waypoint whose region was crossed.
    #[schema(example = 1)]
    pub waypoint_id: WaypointId,

    /// Whether the region was entered or exited.
    pub event: TransitionKind,

    /// The location that triggered the callback.
    pub sample: LocationSample,
}

/// Result of applying a geofence event.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "waypoint_id": 1,
    "real_transition": true,
    "transition_published": true,
    "location_published": true
}))]
pub struct GeofenceEventResponse {
    /// Waypoint that was evaluated.
    #[schema(example = 1)]
    pub waypoint_id: WaypointId,

    /// Whether the waypoint's state changed observably.
    #[schema(example = true)]
    pub real_transition: bool,

    /// Whether a transition message was queued.
    #[schema(example = true)]
    pub transition_published: bool,

    /// Whether a follow-up circular location message was queued.
    #[schema(example = true)]
    pub location_published: bool,
}

// ============================================================================
// Handlers
// ============================================================================

/// Apply a native geofence event.
#[utoipa::path(
    post,
    path = "/api/geofence",
    tag = "geofence",
    operation_id = "geofenceEvent",
    summary = "Report a geofence enter/exit event",
    description = "Applies a platform geofence callback to the waypoint's \
        transition state. A real transition queues a transition message and \
        then a circular location message, unless monitoring is quiet. Repeated \
        events with the same classification are silent.",
    request_body = GeofenceEventRequest,
    responses(
        (status = 200, description = "Event applied", body = GeofenceEventResponse),
        (status = 404, description = "Waypoint not found", body = crate::api::error::ErrorResponse),
        (status = 422, description = "Location too inaccurate; event discarded", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn geofence_event(
    State(state): State<SharedState>,
    Json(request): Json<GeofenceEventRequest>,
) -> ApiResult<Json<GeofenceEventResponse>> {
    let outcome = state
        .processor
        .on_waypoint_transition(
            request.waypoint_id,
            &request.sample,
            request.event,
            TransitionTrigger::Circular,
        )
        .await?;

    Ok(Json(GeofenceEventResponse {
        waypoint_id: outcome.waypoint_id,
        real_transition: outcome.decision.is_real(),
        transition_published: outcome.announced,
        location_published: outcome.location_published,
    }))
}
