//! Outbound message payloads and their construction.
//!
//! Builders never touch the queue; handing a message to the
//! [`OutboundQueue`](crate::queue::OutboundQueue) is the caller's job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::Preferences;
use crate::metrics::{DeviceMetricsProvider, WifiInfoProvider};
use crate::types::{LocationSample, ReportType, TransitionKind, TransitionTrigger};
use crate::waypoint::Waypoint;

/// A message ready for the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_type", rename_all = "lowercase")]
pub enum OutboundMessage {
    /// A location fix.
    Location(LocationMessage),
    /// A waypoint enter/leave event.
    Transition(TransitionMessage),
    /// The full waypoint set.
    Waypoints(WaypointListMessage),
    /// A single waypoint.
    Waypoint(WaypointMessage),
    /// Device status.
    Status(StatusMessage),
}

impl OutboundMessage {
    /// Short name of the message kind.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Location(_) => "location",
            Self::Transition(_) => "transition",
            Self::Waypoints(_) => "waypoints",
            Self::Waypoint(_) => "waypoint",
            Self::Status(_) => "status",
        }
    }

    /// Report type of a location message.
    #[must_use]
    pub const fn report_type(&self) -> Option<ReportType> {
        match self {
            Self::Location(location) => Some(location.trigger),
            _ => None,
        }
    }
}

/// Location message payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationMessage {
    /// Tracker id from configuration.
    pub tracker_id: String,
    /// Why the location was published. Sent as its short tag; ordinary
    /// reports carry none.
    #[serde(
        with = "wire::report_tag",
        default,
        skip_serializing_if = "wire::report_tag::is_untagged"
    )]
    pub trigger: ReportType,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Accuracy in whole metres.
    pub accuracy: i64,
    /// Fix time in epoch seconds.
    pub timestamp: i64,
    /// Build time in epoch seconds.
    pub created_at: i64,
    /// Descriptions of the waypoints the device is inside.
    pub in_regions: Vec<String>,
    /// Extended data, present when enabled in preferences.
    #[serde(flatten, default, skip_serializing_if = "Option::is_none")]
    pub extended: Option<ExtendedLocationData>,
}

/// Device context embedded in extended location messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedLocationData {
    /// Battery level in percent.
    pub battery: u8,
    /// Battery status code.
    pub battery_status: u8,
    /// Connection type code.
    pub connection: String,
    /// Monitoring mode code.
    pub monitoring_mode: i8,
    /// Attached Wi-Fi network name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssid: Option<String>,
    /// Attached access point address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bssid: Option<String>,
    /// Altitude in metres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
    /// Speed in metres per second.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<f64>,
}

/// Transition message payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionMessage {
    /// Tracker id from configuration.
    pub tracker_id: String,
    /// Origin of the transition, sent as its short tag.
    #[serde(with = "wire::transition_tag")]
    pub trigger: TransitionTrigger,
    /// Enter or leave.
    #[serde(with = "wire::event_name")]
    pub event: TransitionKind,
    /// Waypoint description.
    pub description: String,
    /// Triggering latitude.
    pub latitude: f64,
    /// Triggering longitude.
    pub longitude: f64,
    /// Accuracy in whole metres.
    pub accuracy: i64,
    /// Fix time in epoch seconds.
    pub timestamp: i64,
    /// Waypoint creation time in epoch seconds.
    pub waypoint_timestamp: i64,
}

/// A waypoint as announced to the remote side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointMessage {
    /// Waypoint description.
    pub description: String,
    /// Centre latitude.
    pub latitude: f64,
    /// Centre longitude.
    pub longitude: f64,
    /// Radius in metres.
    pub radius: f64,
    /// Creation time in epoch seconds.
    pub timestamp: i64,
}

impl From<&Waypoint> for WaypointMessage {
    fn from(waypoint: &Waypoint) -> Self {
        Self {
            description: waypoint.description.clone(),
            latitude: waypoint.latitude,
            longitude: waypoint.longitude,
            radius: waypoint.radius,
            timestamp: waypoint.created_at.timestamp(),
        }
    }
}

/// Waypoint list payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointListMessage {
    /// All waypoints.
    pub waypoints: Vec<WaypointMessage>,
}

/// Status message payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusMessage {
    /// Wi-Fi switched on.
    pub wifi_enabled: bool,
    /// Power-save mode enabled.
    pub power_save: bool,
    /// Battery optimisations apply.
    pub battery_optimizations: bool,
    /// App may be hibernated.
    pub app_hibernation: bool,
    /// Location permission granted.
    pub location_permission: bool,
}

/// Short wire names for enum fields.
mod wire {
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub mod report_tag {
        use super::{de, Deserialize, Deserializer, Serializer};
        use crate::types::ReportType;

        const TAGGED: [ReportType; 3] = [ReportType::User, ReportType::Response, ReportType::Circular];

        #[allow(clippy::trivially_copy_pass_by_ref)]
        pub fn is_untagged(report_type: &ReportType) -> bool {
            report_type.tag().is_none()
        }

        #[allow(clippy::trivially_copy_pass_by_ref)]
        pub fn serialize<S: Serializer>(report_type: &ReportType, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(report_type.tag().unwrap_or_default())
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ReportType, D::Error> {
            let tag = String::deserialize(deserializer)?;
            if tag.is_empty() {
                return Ok(ReportType::Default);
            }
            TAGGED
                .into_iter()
                .find(|r| r.tag() == Some(tag.as_str()))
                .ok_or_else(|| de::Error::unknown_variant(&tag, &["u", "r", "c"]))
        }
    }

    pub mod transition_tag {
        use super::{de, Deserialize, Deserializer, Serializer};
        use crate::types::TransitionTrigger;

        #[allow(clippy::trivially_copy_pass_by_ref)]
        pub fn serialize<S: Serializer>(trigger: &TransitionTrigger, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(trigger.tag())
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TransitionTrigger, D::Error> {
            let tag = String::deserialize(deserializer)?;
            [TransitionTrigger::Circular, TransitionTrigger::Location]
                .into_iter()
                .find(|t| t.tag() == tag)
                .ok_or_else(|| de::Error::unknown_variant(&tag, &["c", "l"]))
        }
    }

    pub mod event_name {
        use super::{de, Deserialize, Deserializer, Serializer};
        use crate::types::TransitionKind;

        #[allow(clippy::trivially_copy_pass_by_ref)]
        pub fn serialize<S: Serializer>(kind: &TransitionKind, serializer: S) -> Result<S::Ok, S::Error> {
            serializer.serialize_str(kind.event_name())
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<TransitionKind, D::Error> {
            let name = String::deserialize(deserializer)?;
            [TransitionKind::Enter, TransitionKind::Exit]
                .into_iter()
                .find(|k| k.event_name() == name)
                .ok_or_else(|| de::Error::unknown_variant(&name, &["enter", "leave"]))
        }
    }
}

/// Descriptions of the waypoints currently classified inside.
#[must_use]
pub fn in_regions(waypoints: &[Waypoint]) -> Vec<String> {
    waypoints
        .iter()
        .filter(|w| w.is_inside())
        .map(|w| w.description.clone())
        .collect()
}

#[allow(clippy::cast_possible_truncation)]
fn whole_metres(accuracy: f64) -> i64 {
    accuracy.round() as i64
}

/// Assembles outbound messages from a preferences snapshot and device state.
pub struct MessageBuilder<'a> {
    preferences: &'a Preferences,
    metrics: &'a dyn DeviceMetricsProvider,
    wifi: &'a dyn WifiInfoProvider,
}

impl<'a> MessageBuilder<'a> {
    /// Create a builder.
    #[must_use]
    pub fn new(
        preferences: &'a Preferences,
        metrics: &'a dyn DeviceMetricsProvider,
        wifi: &'a dyn WifiInfoProvider,
    ) -> Self {
        Self {
            preferences,
            metrics,
            wifi,
        }
    }

    /// Build a location message.
    ///
    /// `waypoints` must reflect the state at build time; in-regions are
    /// derived from it.
    #[must_use]
    pub fn location(
        &self,
        sample: &LocationSample,
        report_type: ReportType,
        waypoints: &[Waypoint],
        now: DateTime<Utc>,
    ) -> OutboundMessage {
        let extended = self
            .preferences
            .extended_data
            .then(|| self.extended_data(sample));

        OutboundMessage::Location(LocationMessage {
            tracker_id: self.preferences.tracker_id.clone(),
            trigger: report_type,
            latitude: sample.latitude,
            longitude: sample.longitude,
            accuracy: whole_metres(sample.accuracy),
            timestamp: sample.timestamp.timestamp(),
            created_at: now.timestamp(),
            in_regions: in_regions(waypoints),
            extended,
        })
    }

    fn extended_data(&self, sample: &LocationSample) -> ExtendedLocationData {
        let metrics = self.metrics.device_metrics();
        let wifi = sample.wifi.clone().or_else(|| self.wifi.current_wifi());
        let (ssid, bssid) = wifi.map_or((None, None), |w| (Some(w.ssid), Some(w.bssid)));

        ExtendedLocationData {
            battery: metrics.battery_level,
            battery_status: metrics.battery_status.code(),
            connection: metrics.connection.code().to_string(),
            monitoring_mode: self.preferences.monitoring.code(),
            ssid,
            bssid,
            altitude: sample.altitude,
            speed: sample.speed,
        }
    }

    /// Build a transition message.
    #[must_use]
    pub fn transition(
        &self,
        waypoint: &Waypoint,
        triggering: &LocationSample,
        kind: TransitionKind,
        trigger: TransitionTrigger,
    ) -> OutboundMessage {
        OutboundMessage::Transition(TransitionMessage {
            tracker_id: self.preferences.tracker_id.clone(),
            trigger,
            event: kind,
            description: waypoint.description.clone(),
            latitude: triggering.latitude,
            longitude: triggering.longitude,
            accuracy: whole_metres(triggering.accuracy),
            timestamp: triggering.timestamp.timestamp(),
            waypoint_timestamp: waypoint.created_at.timestamp(),
        })
    }

    /// Build a waypoint list message from a snapshot.
    #[must_use]
    pub fn waypoint_list(waypoints: &[Waypoint]) -> OutboundMessage {
        OutboundMessage::Waypoints(WaypointListMessage {
            waypoints: waypoints.iter().map(WaypointMessage::from).collect(),
        })
    }

    /// Build a single waypoint message.
    #[must_use]
    pub fn waypoint(waypoint: &Waypoint) -> OutboundMessage {
        OutboundMessage::Waypoint(WaypointMessage::from(waypoint))
    }

    /// Build a status message.
    #[must_use]
    pub fn status(&self) -> OutboundMessage {
        let metrics = self.metrics.device_metrics();
        OutboundMessage::Status(StatusMessage {
            wifi_enabled: self.wifi.is_wifi_enabled(),
            power_save: metrics.power_save,
            battery_optimizations: metrics.battery_optimizations,
            app_hibernation: metrics.app_hibernation,
            location_permission: metrics.location_permission,
        })
    }
}
