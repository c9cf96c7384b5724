//! Outbox API endpoint.
//!
//! The outbound queue is drained into a bounded in-memory outbox. This module
//! exposes it for inspection, along with the acknowledgement returned by the
//! publish endpoints.

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::error::{ApiError, ApiResult};
use crate::state::SharedState;

/// Default number of messages returned by the outbox view.
const DEFAULT_LIMIT: usize = 50;

/// Creates the messages router.
pub fn router() -> Router<SharedState> {
    Router::new().route("/", get(get_messages))
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Acknowledgement returned by publish endpoints.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "queued": true,
    "kind": "location"
}))]
pub struct PublishResponse {
    /// Whether a message was handed to the outbound queue.
    #[schema(example = true)]
    pub queued: bool,

    /// Kind of message that was queued.
    #[schema(example = "location")]
    pub kind: String,
}

impl PublishResponse {
    /// A queued message of `kind`.
    #[must_use]
    pub fn queued(kind: &str) -> Self {
        Self {
            queued: true,
            kind: kind.to_string(),
        }
    }
}

/// Query parameters for the outbox view.
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct MessagesQuery {
    /// Maximum number of messages to return, newest last. Defaults to 50.
    #[param(example = 20, minimum = 1)]
    pub limit: Option<usize>,
}

/// Recent outbound messages.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "total": 3,
    "messages": [
        {
            "_type": "location",
            "tracker_id": "gt",
            "trigger": "u",
            "latitude": 52.520008,
            "longitude": 13.404954,
            "accuracy": 12,
            "timestamp": 1747731600,
            "created_at": 1747731601,
            "in_regions": ["Home"]
        }
    ]
}))]
pub struct MessagesResponse {
    /// Messages dispatched since startup, including ones evicted from the
    /// outbox.
    #[schema(example = 3)]
    pub total: u64,

    /// Outbound messages as they would go on the wire, oldest first.
    #[schema(value_type = Vec<Object>)]
    pub messages: Vec<serde_json::Value>,
}

// ============================================================================
// Handlers
// ============================================================================

/// List recent outbound messages.
#[utoipa::path(
    get,
    path = "/api/messages",
    tag = "messages",
    operation_id = "getMessages",
    summary = "List recent outbound messages",
    description = "Returns the most recent messages the engine handed to the \
        outbound queue, in wire format and oldest first.",
    params(MessagesQuery),
    responses(
        (status = 200, description = "Recent messages", body = MessagesResponse)
    )
)]
pub async fn get_messages(
    State(state): State<SharedState>,
    Query(query): Query<MessagesQuery>,
) -> ApiResult<Json<MessagesResponse>> {
    let limit = query.limit.unwrap_or(DEFAULT_LIMIT);

    let messages = state
        .outbox
        .recent(limit)
        .await
        .iter()
        .map(serde_json::to_value)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| ApiError::InternalError {
            error_code: "serialization_failed".to_string(),
            message: "Failed to serialize outbound messages".to_string(),
            details: Some(e.to_string()),
        })?;

    Ok(Json(MessagesResponse {
        total: state.outbox.total(),
        messages,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_response_serialization() {
        let json = serde_json::to_string(&PublishResponse::queued("status")).unwrap();
        assert!(json.contains("\"queued\":true"));
        assert!(json.contains("\"kind\":\"status\""));
    }
}
