//! Location ingestion API endpoints.
//!
//! Samples posted here enter the location pipeline exactly as a device's
//! location callback would deliver them.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use geotrack_core::{LocationOutcome, LocationSample, ReportType};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::api::error::{ApiError, ApiResult};
use crate::api::messages::PublishResponse;
use crate::state::SharedState;

/// Creates the locations router.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", post(report_location))
        .route("/publish", post(publish_current_location))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// A location sample with the reason it is being reported.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "sample": {
        "latitude": 52.520008,
        "longitude": 13.404954,
        "accuracy": 12.5,
        "timestamp": "2025-05-20T09:00:00Z"
    },
    "report_type": "default"
}))]
pub struct ReportLocationRequest {
    /// The location fix.
    pub sample: LocationSample,

    /// Why the location is reported. Defaults to `default`.
    #[serde(default)]
    pub report_type: ReportType,
}

/// What the pipeline did with a reported sample.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "published": false,
    "reason": "DUPLICATE_TIMESTAMP",
    "message": "sample is not newer than the last published location"
}))]
pub struct ReportLocationResponse {
    /// Whether a location message was queued.
    #[schema(example = true)]
    pub published: bool,

    /// Machine-readable reason when nothing was published.
    #[schema(example = "DUPLICATE_TIMESTAMP", nullable)]
    pub reason: Option<String>,

    /// Human-readable explanation when nothing was published.
    #[schema(nullable)]
    pub message: Option<String>,
}

/// Request body for re-publishing the last location.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[schema(example = json!({
    "report_type": "response"
}))]
pub struct PublishLocationRequest {
    /// Report type for the new message. Defaults to `user`.
    #[serde(default = "user_report")]
    pub report_type: ReportType,
}

const fn user_report() -> ReportType {
    ReportType::User
}

// ============================================================================
// Handlers
// ============================================================================

/// Report a new location sample.
///
/// Never fails on pipeline decisions: a sample that is filtered, suppressed or
/// stale yields `published: false` with the reason.
#[utoipa::path(
    post,
    path = "/api/locations",
    tag = "locations",
    operation_id = "reportLocation",
    summary = "Report a location sample",
    description = "Feeds a location fix into the pipeline. The sample is \
        checked against the accuracy threshold, evaluated against every \
        waypoint when fused region detection is enabled, and published if the \
        monitoring mode allows it. Samples not newer than the last published \
        location are ignored unless the report type is explicit.",
    request_body = ReportLocationRequest,
    responses(
        (status = 200, description = "Sample processed", body = ReportLocationResponse)
    )
)]
pub async fn report_location(
    State(state): State<SharedState>,
    Json(request): Json<ReportLocationRequest>,
) -> Json<ReportLocationResponse> {
    let outcome = state
        .processor
        .on_location_changed(request.sample, request.report_type)
        .await;

    Json(match outcome {
        LocationOutcome::Published => ReportLocationResponse {
            published: true,
            reason: None,
            message: None,
        },
        LocationOutcome::Skipped(e) => ReportLocationResponse {
            published: false,
            reason: Some(e.error_code().to_string()),
            message: Some(e.to_string()),
        },
    })
}

/// Publish the last published location again.
#[utoipa::path(
    post,
    path = "/api/locations/publish",
    tag = "locations",
    operation_id = "publishCurrentLocation",
    summary = "Re-publish the current location",
    description = "Publishes the last successfully published location again \
        with the given report type, e.g. in reply to a remote request.",
    request_body = PublishLocationRequest,
    responses(
        (status = 200, description = "Location queued", body = PublishResponse),
        (status = 404, description = "No location published yet", body = crate::api::error::ErrorResponse),
        (status = 409, description = "Suppressed by monitoring mode", body = crate::api::error::ErrorResponse),
        (status = 422, description = "Location too inaccurate", body = crate::api::error::ErrorResponse)
    )
)]
pub async fn publish_current_location(
    State(state): State<SharedState>,
    Json(request): Json<PublishLocationRequest>,
) -> ApiResult<Json<PublishResponse>> {
    state
        .processor
        .publish_current_location(request.report_type)
        .await
        .ok_or_else(|| ApiError::NotFound {
            error_code: "no_current_location".to_string(),
            message: "No location has been published yet".to_string(),
        })??;

    Ok(Json(PublishResponse::queued("location")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_type_defaults() {
        let request: ReportLocationRequest = serde_json::from_str(
            r#"{"sample":{"latitude":1.0,"longitude":2.0,"accuracy":3.0,"timestamp":"2025-05-20T09:00:00Z"}}"#,
        )
        .unwrap();
        assert_eq!(request.report_type, ReportType::Default);

        let publish: PublishLocationRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(publish.report_type, ReportType::User);
    }
}
