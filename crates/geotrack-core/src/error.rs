//! Unified error types for the geotrack core library.
//!
//! [`GeotrackError`] covers every failure mode of the location pipeline. The
//! configuration and waypoint store modules keep their own error types
//! ([`ConfigError`](crate::config::ConfigError) and
//! [`StoreError`](crate::waypoint::StoreError)) and convert into this one.
//!
//! # Outcomes versus failures
//!
//! Three variants are not failures at all: [`GeotrackError::AccuracyRejected`],
//! [`GeotrackError::MonitoringSuppressed`] and
//! [`GeotrackError::DuplicateTimestamp`] are the expected, silent ways a
//! sample ends without producing a message. They are logged and never retried.
//! Collaborator failures (store, queue, timeouts) fail the single publish
//! attempt that hit them and leave persisted waypoint state untouched.
//!
//! # Example
//!
//! ```rust
//! use geotrack_core::error::{GeotrackError, Result};
//!
//! fn check(accuracy: f64, threshold: u32) -> Result<()> {
//!     if threshold != 0 && accuracy >= f64::from(threshold) {
//!         return Err(GeotrackError::AccuracyRejected { accuracy, threshold });
//!     }
//!     Ok(())
//! }
//!
//! assert!(check(12.0, 10).unwrap_err().is_expected_state());
//! ```

use std::path::PathBuf;
use thiserror::Error;

use crate::types::{MonitoringMode, ReportType};
use crate::waypoint::WaypointId;

/// The unified error type for all geotrack operations.
#[derive(Debug, Error)]
pub enum GeotrackError {
    // =========================================================================
    // PIPELINE OUTCOMES
    // =========================================================================
    /// The sample's radial uncertainty is not below the configured threshold.
    #[error("location accuracy {accuracy}m is outside the accuracy threshold of {threshold}m")]
    AccuracyRejected {
        /// Reported accuracy of the sample in metres.
        accuracy: f64,
        /// Configured threshold in metres.
        threshold: u32,
    },

    /// The monitoring mode forbids a location message for this report type.
    #[error("message suppressed by monitoring settings: {mode}")]
    MonitoringSuppressed {
        /// Active monitoring mode.
        mode: MonitoringMode,
        /// Report type that was refused.
        report_type: ReportType,
    },

    /// The sample is not newer than the last published location.
    #[error("not re-sending message with same timestamp as last")]
    DuplicateTimestamp,

    // =========================================================================
    // COLLABORATOR FAILURES
    // =========================================================================
    /// The waypoint referenced by an event is not in the store.
    #[error("Waypoint {0} not found")]
    WaypointNotFound(WaypointId),

    /// The waypoint store failed to load or persist.
    #[error("Waypoint store error: {0}")]
    StoreError(String),

    /// The outbound queue refused the message.
    #[error("Outbound queue error: {0}")]
    QueueError(String),

    /// A collaborator did not answer in time.
    #[error("{operation} timed out after {millis}ms")]
    CollaboratorTimeout {
        /// Name of the operation that timed out.
        operation: &'static str,
        /// Configured timeout in milliseconds.
        millis: u64,
    },

    // =========================================================================
    // CONFIGURATION ERRORS
    // =========================================================================
    /// The configuration file was not found at the expected path.
    #[error("Configuration file not found at: {}", .0.display())]
    ConfigNotFound(PathBuf),

    /// The configuration file exists but could not be parsed.
    #[error("Failed to parse configuration: {0}")]
    ConfigParseError(String),

    /// The configuration was parsed but contains invalid values.
    #[error("Configuration validation failed: {0}")]
    ConfigValidationError(String),

    // =========================================================================
    // I/O ERRORS
    // =========================================================================
    /// A low-level I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// A specialized [`Result`] type for geotrack operations.
pub type Result<T> = std::result::Result<T, GeotrackError>;

impl GeotrackError {
    /// Returns `true` for the silent outcomes of the pipeline.
    ///
    /// These are not system failures: a future sample may succeed
    /// independently, so callers log them at a low level and move on.
    #[inline]
    #[must_use]
    pub const fn is_expected_state(&self) -> bool {
        matches!(
            self,
            Self::AccuracyRejected { .. }
                | Self::MonitoringSuppressed { .. }
                | Self::DuplicateTimestamp
        )
    }

    /// Returns an HTTP-appropriate status code for this error.
    #[inline]
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            // 404 Not Found
            Self::WaypointNotFound(_) | Self::ConfigNotFound(_) => 404,

            // 409 Conflict - refused by current state or policy
            Self::MonitoringSuppressed { .. } | Self::DuplicateTimestamp => 409,

            // 422 Unprocessable Entity - semantic errors
            Self::AccuracyRejected { .. }
            | Self::ConfigParseError(_)
            | Self::ConfigValidationError(_) => 422,

            // 500 Internal Server Error
            Self::IoError(_) => 500,

            // 503 Service Unavailable - collaborators unavailable
            Self::StoreError(_) | Self::QueueError(_) => 503,

            // 504 Gateway Timeout
            Self::CollaboratorTimeout { .. } => 504,
        }
    }

    /// Returns a machine-readable error code for API responses.
    #[inline]
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::AccuracyRejected { .. } => "ACCURACY_REJECTED",
            Self::MonitoringSuppressed { .. } => "MONITORING_SUPPRESSED",
            Self::DuplicateTimestamp => "DUPLICATE_TIMESTAMP",
            Self::WaypointNotFound(_) => "WAYPOINT_NOT_FOUND",
            Self::StoreError(_) => "STORE_ERROR",
            Self::QueueError(_) => "QUEUE_ERROR",
            Self::CollaboratorTimeout { .. } => "COLLABORATOR_TIMEOUT",
            Self::ConfigNotFound(_) => "CONFIG_NOT_FOUND",
            Self::ConfigParseError(_) => "CONFIG_PARSE_ERROR",
            Self::ConfigValidationError(_) => "CONFIG_VALIDATION_ERROR",
            Self::IoError(_) => "IO_ERROR",
        }
    }
}

// =============================================================================
// CONVERSIONS FROM MODULE-SPECIFIC ERRORS
// =============================================================================

impl From<crate::config::ConfigError> for GeotrackError {
    fn from(err: crate::config::ConfigError) -> Self {
        use crate::config::ConfigError;
        match err {
            ConfigError::NotFound(path) => Self::ConfigNotFound(path),
            ConfigError::Load(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::WriteError { path, source } => {
                Self::IoError(std::io::Error::new(
                    source.kind(),
                    format!("Failed to write {}: {}", path.display(), source),
                ))
            }
            ConfigError::SerializeError(e) => Self::ConfigParseError(e.to_string()),
            ConfigError::ValidationError { field, message } => {
                Self::ConfigValidationError(format!("{field}: {message}"))
            }
            ConfigError::MultipleValidationErrors(errors) => {
                let messages: Vec<String> = errors.into_iter().map(|e| e.to_string()).collect();
                Self::ConfigValidationError(messages.join("; "))
            }
        }
    }
}

impl From<crate::waypoint::StoreError> for GeotrackError {
    fn from(err: crate::waypoint::StoreError) -> Self {
        use crate::waypoint::StoreError;
        match err {
            StoreError::NotFound(id) => Self::WaypointNotFound(id),
            other => Self::StoreError(other.to_string()),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error as IoErr, ErrorKind};

    #[test]
    fn test_expected_state_classification() {
        assert!(GeotrackError::AccuracyRejected {
            accuracy: 50.0,
            threshold: 20
        }
        .is_expected_state());
        assert!(GeotrackError::MonitoringSuppressed {
            mode: MonitoringMode::Quiet,
            report_type: ReportType::Default,
        }
        .is_expected_state());
        assert!(GeotrackError::DuplicateTimestamp.is_expected_state());

        assert!(!GeotrackError::QueueError("closed".into()).is_expected_state());
        assert!(!GeotrackError::WaypointNotFound(1).is_expected_state());
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(GeotrackError::WaypointNotFound(1).http_status_code(), 404);
        assert_eq!(GeotrackError::DuplicateTimestamp.http_status_code(), 409);
        assert_eq!(
            GeotrackError::AccuracyRejected {
                accuracy: 1.0,
                threshold: 1
            }
            .http_status_code(),
            422
        );
        assert_eq!(GeotrackError::StoreError("x".into()).http_status_code(), 503);
        assert_eq!(
            GeotrackError::CollaboratorTimeout {
                operation: "enqueue",
                millis: 5
            }
            .http_status_code(),
            504
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            GeotrackError::DuplicateTimestamp.error_code(),
            "DUPLICATE_TIMESTAMP"
        );
        assert_eq!(
            GeotrackError::MonitoringSuppressed {
                mode: MonitoringMode::Manual,
                report_type: ReportType::Default,
            }
            .error_code(),
            "MONITORING_SUPPRESSED"
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoErr::new(ErrorKind::NotFound, "file not found");
        let err: GeotrackError = io_err.into();
        assert!(matches!(err, GeotrackError::IoError(_)));
    }

    #[test]
    fn test_from_store_error() {
        let err: GeotrackError = crate::waypoint::StoreError::NotFound(7).into();
        assert!(matches!(err, GeotrackError::WaypointNotFound(7)));
    }

    #[test]
    fn test_error_display_messages() {
        let err = GeotrackError::MonitoringSuppressed {
            mode: MonitoringMode::Quiet,
            report_type: ReportType::Default,
        };
        assert_eq!(err.to_string(), "message suppressed by monitoring settings: quiet");

        let err = GeotrackError::AccuracyRejected {
            accuracy: 35.5,
            threshold: 30,
        };
        assert!(err.to_string().contains("35.5"));
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<GeotrackError>();
        assert_sync::<GeotrackError>();
    }
}
