//! Shared value types for the location pipeline.
//!
//! These are transient event types: samples produced by the platform location
//! subsystem, the reason a publish was requested, the monitoring mode, and the
//! enter/exit classification of a sample against a region.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Why a location publish was initiated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    /// Ordinary periodic or background update.
    #[default]
    Default,
    /// User initiated, e.g. a manual refresh.
    User,
    /// Reply to a remote request.
    Response,
    /// Triggered by a geofence transition.
    Circular,
}

impl ReportType {
    /// The short trigger tag carried by location messages.
    #[must_use]
    pub const fn tag(self) -> Option<&'static str> {
        match self {
            Self::Default => None,
            Self::User => Some("u"),
            Self::Response => Some("r"),
            Self::Circular => Some("c"),
        }
    }

    /// Whether a remote party may be waiting for the resulting message.
    #[must_use]
    pub const fn is_response(self) -> bool {
        matches!(self, Self::User | Self::Response | Self::Circular)
    }
}

impl fmt::Display for ReportType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Default => "default",
            Self::User => "user",
            Self::Response => "response",
            Self::Circular => "circular",
        };
        f.write_str(name)
    }
}

/// User-configured policy restricting which reports produce location messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum MonitoringMode {
    /// Only user-initiated reports are published.
    Quiet,
    /// User-initiated and geofence-triggered reports are published.
    Manual,
    /// Everything is published; significant-change tracking.
    #[default]
    Significant,
    /// Everything is published; continuous move tracking.
    Move,
}

impl MonitoringMode {
    /// Numeric code reported in extended location messages.
    #[must_use]
    pub const fn code(self) -> i8 {
        match self {
            Self::Quiet => -1,
            Self::Manual => 0,
            Self::Significant => 1,
            Self::Move => 2,
        }
    }
}

impl fmt::Display for MonitoringMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Quiet => "quiet",
            Self::Manual => "manual",
            Self::Significant => "significant",
            Self::Move => "move",
        };
        f.write_str(name)
    }
}

/// Geometric classification of a sample against a waypoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    /// The sample lies within the region.
    Enter,
    /// The sample lies outside the region.
    #[serde(alias = "leave")]
    Exit,
}

impl TransitionKind {
    /// Event name used in transition messages.
    #[must_use]
    pub const fn event_name(self) -> &'static str {
        match self {
            Self::Enter => "enter",
            Self::Exit => "leave",
        }
    }
}

/// Origin of a transition event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransitionTrigger {
    /// Native geofence callback from the platform.
    Circular,
    /// Derived from a raw location sample by fused detection.
    Location,
}

impl TransitionTrigger {
    /// The short trigger tag carried by transition messages.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Circular => "c",
            Self::Location => "l",
        }
    }
}

/// Wi-Fi network the device was attached to when the sample was taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct WifiInfo {
    /// Network name.
    #[schema(example = "home-net")]
    pub ssid: String,

    /// Access point hardware address.
    #[schema(example = "aa:bb:cc:dd:ee:ff")]
    pub bssid: String,
}

/// A single location fix from the platform location subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LocationSample {
    /// Latitude in degrees.
    #[schema(example = 52.520_008)]
    pub latitude: f64,

    /// Longitude in degrees.
    #[schema(example = 13.404_954)]
    pub longitude: f64,

    /// Radial uncertainty in metres.
    #[schema(example = 12.5)]
    pub accuracy: f64,

    /// When the fix was taken.
    pub timestamp: DateTime<Utc>,

    /// Whether the fix came from a mock location provider.
    #[serde(default)]
    pub is_mock: bool,

    /// Altitude above the WGS84 ellipsoid in metres.
    #[serde(default)]
    pub altitude: Option<f64>,

    /// Ground speed in metres per second.
    #[serde(default)]
    pub speed: Option<f64>,

    /// Wi-Fi context at the time of the fix.
    #[serde(default)]
    pub wifi: Option<WifiInfo>,
}

impl LocationSample {
    /// Create a sample with no optional context.
    #[must_use]
    pub const fn new(latitude: f64, longitude: f64, accuracy: f64, timestamp: DateTime<Utc>) -> Self {
        Self {
            latitude,
            longitude,
            accuracy,
            timestamp,
            is_mock: false,
            altitude: None,
            speed: None,
            wifi: None,
        }
    }

    /// Attach Wi-Fi context.
    #[must_use]
    pub fn with_wifi(mut self, wifi: WifiInfo) -> Self {
        self.wifi = Some(wifi);
        self
    }

    /// Mark the sample as coming from a mock provider.
    #[must_use]
    pub fn mocked(mut self) -> Self {
        self.is_mock = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_type_tags() {
        assert_eq!(ReportType::Default.tag(), None);
        assert_eq!(ReportType::User.tag(), Some("u"));
        assert_eq!(ReportType::Response.tag(), Some("r"));
        assert_eq!(ReportType::Circular.tag(), Some("c"));
    }

    #[test]
    fn test_response_report_types() {
        assert!(!ReportType::Default.is_response());
        assert!(ReportType::User.is_response());
        assert!(ReportType::Response.is_response());
        assert!(ReportType::Circular.is_response());
    }

    #[test]
    fn test_monitoring_mode_codes() {
        assert_eq!(MonitoringMode::Quiet.code(), -1);
        assert_eq!(MonitoringMode::Manual.code(), 0);
        assert_eq!(MonitoringMode::Significant.code(), 1);
        assert_eq!(MonitoringMode::Move.code(), 2);
    }

    #[test]
    fn test_monitoring_mode_serde() {
        let mode: MonitoringMode = serde_json::from_str("\"quiet\"").unwrap();
        assert_eq!(mode, MonitoringMode::Quiet);
        assert_eq!(serde_json::to_string(&MonitoringMode::Move).unwrap(), "\"move\"");
    }

    #[test]
    fn test_sample_deserializes_without_optional_fields() {
        let json = r#"{
            "latitude": 52.5,
            "longitude": 13.4,
            "accuracy": 10.0,
            "timestamp": "2025-01-15T03:30:00Z"
        }"#;
        let sample: LocationSample = serde_json::from_str(json).unwrap();
        assert!(!sample.is_mock);
        assert!(sample.wifi.is_none());
    }

    #[test]
    fn test_transition_kind_accepts_leave() {
        let kind: TransitionKind = serde_json::from_str("\"leave\"").unwrap();
        assert_eq!(kind, TransitionKind::Exit);
    }

    #[test]
    fn test_transition_event_names() {
        assert_eq!(TransitionKind::Enter.event_name(), "enter");
        assert_eq!(TransitionKind::Exit.event_name(), "leave");
        assert_eq!(TransitionTrigger::Circular.tag(), "c");
        assert_eq!(TransitionTrigger::Location.tag(), "l");
    }
}
