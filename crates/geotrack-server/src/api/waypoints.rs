//! Waypoint API endpoints.
//!
//! Lists waypoints with their transition state and publishes waypoint
//! messages.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use geotrack_core::{Waypoint, WaypointId};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::ApiResult;
use crate::api::messages::PublishResponse;
use crate::state::SharedState;

/// Creates the waypoints router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_waypoints))
        .route("/publish", post(publish_waypoints))
        .route("/{id}/publish", post(publish_waypoint))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// All waypoints with their current transition state.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WaypointsResponse {
    /// Waypoints ordered by id.
    pub waypoints: Vec<Waypoint>,

    /// Descriptions of waypoints the device is currently inside.
    #[schema(example = json!(["Home"]))]
    pub in_regions: Vec<String>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List waypoints.
#[utoipa::path(
    get,
    path = "/api/waypoints",
    tag = "waypoints",
    operation_id = "listWaypoints",
    summary = "List waypoints",
    description = "Returns every waypoint with its last transition state and \
        the time of its last real transition.",
    responses(
        (status = 200, description = "Waypoints retrieved", body = WaypointsResponse),
        (status = 503, description = "Waypoint store unavailable", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn list_waypoints(State(state): State<SharedState>) -> ApiResult<Json<WaypointsResponse>> {
    let waypoints = state
        .waypoints
        .load_all()
        .await
        .map_err(geotrack_core::GeotrackError::from)?;

    Ok(Json(WaypointsResponse {
        in_regions: geotrack_core::message::in_regions(&waypoints),
        waypoints,
    }))
}

/// Publish all waypoints.
#[utoipa::path(
    post,
    path = "/api/waypoints/publish",
    tag = "waypoints",
    operation_id = "publishWaypoints",
    summary = "Publish all waypoints",
    description = "Queues a message containing every waypoint.",
    responses(
        (status = 200, description = "Waypoints queued", body = PublishResponse)
    )
)]
pub async fn publish_waypoints(State(state): State<SharedState>) -> ApiResult<Json<PublishResponse>> {
    state.processor.publish_waypoints_message().await?;
    Ok(Json(PublishResponse::queued("waypoints")))
}

/// Publish a single waypoint.
#[utoipa::path(
    post,
    path = "/api/waypoints/{id}/publish",
    tag = "waypoints",
    operation_id = "publishWaypoint",
    summary = "Publish one waypoint",
    description = "Queues a message describing a single waypoint.",
    params(
        ("id" = u64, Path, description = "Waypoint id")
    ),
    responses(
        (status = 200, description = "Waypoint queued", body = PublishResponse),
        (status = 404, description = "Waypoint not found", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn publish_waypoint(
    State(state): State<SharedState>,
    Path(id): Path<WaypointId>,
) -> ApiResult<Json<PublishResponse>> {
    state.processor.publish_waypoint_message(id).await?;
    Ok(Json(PublishResponse::queued("waypoint")))
}
