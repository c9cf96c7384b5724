//! Device metrics and Wi-Fi capabilities.
//!
//! The engine only sees these through [`DeviceMetricsProvider`] and
//! [`WifiInfoProvider`]; each platform supplies one implementation. The
//! reference implementation, [`ReportedDeviceMetrics`], stores whatever the
//! device last reported.

use std::sync::RwLock;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::WifiInfo;

/// Charging state of the battery.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BatteryStatus {
    /// Not reported.
    #[default]
    Unknown,
    /// Running on battery.
    Unplugged,
    /// Plugged in and charging.
    Charging,
    /// Plugged in and full.
    Full,
}

impl BatteryStatus {
    /// Numeric code reported in extended location messages.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Unplugged => 1,
            Self::Charging => 2,
            Self::Full => 3,
        }
    }
}

/// Network connectivity of the device.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// No connectivity.
    #[default]
    Offline,
    /// Wi-Fi.
    Wifi,
    /// Mobile data.
    Mobile,
}

impl ConnectionType {
    /// Single-letter code reported in extended location messages.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Offline => "o",
            Self::Wifi => "w",
            Self::Mobile => "m",
        }
    }
}

/// Snapshot of device state at message-build time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeviceMetrics {
    /// Battery level in percent.
    #[schema(example = 87, maximum = 100)]
    pub battery_level: u8,

    /// Charging state.
    pub battery_status: BatteryStatus,

    /// Current connectivity.
    pub connection: ConnectionType,

    /// Power-save mode enabled.
    pub power_save: bool,

    /// Battery optimisations apply to this app.
    pub battery_optimizations: bool,

    /// The platform may hibernate this app.
    pub app_hibernation: bool,

    /// Location permission granted.
    pub location_permission: bool,
}

/// Source of device metrics.
pub trait DeviceMetricsProvider: Send + Sync {
    /// Current device metrics.
    fn device_metrics(&self) -> DeviceMetrics;
}

/// Source of Wi-Fi information.
pub trait WifiInfoProvider: Send + Sync {
    /// Whether Wi-Fi is switched on.
    fn is_wifi_enabled(&self) -> bool;

    /// The network currently attached to, if any.
    fn current_wifi(&self) -> Option<WifiInfo>;
}

#[derive(Debug, Default)]
struct Reported {
    metrics: DeviceMetrics,
    wifi_enabled: bool,
    wifi: Option<WifiInfo>,
}

/// Device metrics pushed by the device itself.
#[derive(Debug, Default)]
pub struct ReportedDeviceMetrics {
    inner: RwLock<Reported>,
}

impl ReportedDeviceMetrics {
    /// Create with default (unknown) metrics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with an initial snapshot.
    #[must_use]
    pub fn with_metrics(metrics: DeviceMetrics) -> Self {
        let provider = Self::new();
        provider.set_metrics(metrics);
        provider
    }

    /// Replace the device metrics.
    pub fn set_metrics(&self, metrics: DeviceMetrics) {
        self.write().metrics = metrics;
    }

    /// Replace the Wi-Fi state.
    pub fn set_wifi(&self, enabled: bool, wifi: Option<WifiInfo>) {
        let mut reported = self.write();
        reported.wifi_enabled = enabled;
        reported.wifi = wifi;
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Reported> {
        // A poisoned lock still holds a complete snapshot.
        self.inner
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Reported> {
        self.inner
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

impl DeviceMetricsProvider for ReportedDeviceMetrics {
    fn device_metrics(&self) -> DeviceMetrics {
        self.read().metrics.clone()
    }
}

impl WifiInfoProvider for ReportedDeviceMetrics {
    fn is_wifi_enabled(&self) -> bool {
        self.read().wifi_enabled
    }

    fn current_wifi(&self) -> Option<WifiInfo> {
        self.read().wifi.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_unknown() {
        let provider = ReportedDeviceMetrics::new();
        let metrics = provider.device_metrics();
        assert_eq!(metrics.battery_status, BatteryStatus::Unknown);
        assert_eq!(metrics.connection, ConnectionType::Offline);
        assert!(!provider.is_wifi_enabled());
        assert!(provider.current_wifi().is_none());
    }

    #[test]
    fn test_reported_values_are_returned() {
        let provider = ReportedDeviceMetrics::with_metrics(DeviceMetrics {
            battery_level: 42,
            battery_status: BatteryStatus::Charging,
            connection: ConnectionType::Wifi,
            ..DeviceMetrics::default()
        });
        provider.set_wifi(
            true,
            Some(WifiInfo {
                ssid: "home".into(),
                bssid: "aa:bb".into(),
            }),
        );

        assert_eq!(provider.device_metrics().battery_level, 42);
        assert!(provider.is_wifi_enabled());
        assert_eq!(provider.current_wifi().unwrap().ssid, "home");
    }

    #[test]
    fn test_codes() {
        assert_eq!(BatteryStatus::Charging.code(), 2);
        assert_eq!(ConnectionType::Mobile.code(), "m");
    }
}
