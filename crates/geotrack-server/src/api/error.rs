//! API error types and response handling.
//!
//! This module provides a unified error type for all API handlers
//! with automatic conversion to appropriate HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use geotrack_core::GeotrackError;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result type alias for API handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// Unified API error type.
///
/// Each variant maps to a specific HTTP status code and produces a
/// consistent JSON error response.
#[derive(Debug, Clone)]
pub enum ApiError {
    /// 400 Bad Request - Invalid input from client.
    BadRequest {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 404 Not Found - Resource does not exist.
    NotFound {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 409 Conflict - The pipeline declined to publish in its current state.
    Conflict {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 422 Unprocessable Entity - Well-formed input the pipeline rejects.
    Unprocessable {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 500 Internal Server Error - Unexpected server-side error.
    InternalError {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
        /// Optional details (not exposed to client in production).
        details: Option<String>,
    },

    /// 503 Service Unavailable - The waypoint store or queue failed.
    ServiceUnavailable {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },

    /// 504 Gateway Timeout - A collaborator did not answer in time.
    Timeout {
        /// Machine-readable error code.
        error_code: String,
        /// Human-readable error message.
        message: String,
    },
}

/// Standard JSON error response body.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "error": "WAYPOINT_NOT_FOUND",
    "message": "waypoint 7 not found",
    "details": null
}))]
pub struct ErrorResponse {
    /// Machine-readable error code (e.g., "WAYPOINT_NOT_FOUND").
    #[schema(example = "WAYPOINT_NOT_FOUND")]
    pub error: String,

    /// Human-readable error message.
    #[schema(example = "waypoint 7 not found")]
    pub message: String,

    /// Optional additional details for debugging.
    #[schema(nullable)]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    fn new(error: String, message: String) -> Self {
        Self {
            error,
            message,
            details: None,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_response) = match self {
            Self::BadRequest { error_code, message } => (
                StatusCode::BAD_REQUEST,
                ErrorResponse::new(error_code, message),
            ),

            Self::NotFound { error_code, message } => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new(error_code, message),
            ),

            Self::Conflict { error_code, message } => {
                (StatusCode::CONFLICT, ErrorResponse::new(error_code, message))
            }

            Self::Unprocessable { error_code, message } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse::new(error_code, message),
            ),

            Self::InternalError {
                error_code,
                message,
                details,
            } => {
                tracing::error!(
                    error_code = %error_code,
                    message = %message,
                    details = ?details,
                    "Internal server error"
                );

                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse {
                        error: error_code,
                        message,
                        details: details.map(|d| serde_json::json!(d)),
                    },
                )
            }

            Self::ServiceUnavailable { error_code, message } => {
                tracing::warn!(error_code = %error_code, message = %message, "Collaborator unavailable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    ErrorResponse::new(error_code, message),
                )
            }

            Self::Timeout { error_code, message } => {
                tracing::warn!(error_code = %error_code, message = %message, "Collaborator timed out");
                (
                    StatusCode::GATEWAY_TIMEOUT,
                    ErrorResponse::new(error_code, message),
                )
            }
        };

        (status, Json(error_response)).into_response()
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BadRequest { message, .. } => write!(f, "Bad Request: {message}"),
            Self::NotFound { message, .. } => write!(f, "Not Found: {message}"),
            Self::Conflict { message, .. } => write!(f, "Conflict: {message}"),
            Self::Unprocessable { message, .. } => write!(f, "Unprocessable: {message}"),
            Self::InternalError { message, .. } => write!(f, "Internal Error: {message}"),
            Self::ServiceUnavailable { message, .. } => {
                write!(f, "Service Unavailable: {message}")
            }
            Self::Timeout { message, .. } => write!(f, "Timeout: {message}"),
        }
    }
}

impl std::error::Error for ApiError {}

/// Convert from geotrack-core errors using their status classification.
impl From<GeotrackError> for ApiError {
    fn from(err: GeotrackError) -> Self {
        let error_code = err.error_code().to_string();
        let message = err.to_string();

        match err.http_status_code() {
            404 => Self::NotFound { error_code, message },
            409 => Self::Conflict { error_code, message },
            422 => Self::Unprocessable { error_code, message },
            503 => Self::ServiceUnavailable { error_code, message },
            504 => Self::Timeout { error_code, message },
            _ => Self::InternalError {
                error_code,
                message,
                details: None,
            },
        }
    }
}

impl From<geotrack_core::ConfigError> for ApiError {
    fn from(err: geotrack_core::ConfigError) -> Self {
        match err {
            geotrack_core::ConfigError::ValidationError { .. }
            | geotrack_core::ConfigError::MultipleValidationErrors(_) => Self::BadRequest {
                error_code: "invalid_config".to_string(),
                message: err.to_string(),
            },
            other => Self::InternalError {
                error_code: "config_save_failed".to_string(),
                message: "Failed to save configuration".to_string(),
                details: Some(other.to_string()),
            },
        }
    }
}
