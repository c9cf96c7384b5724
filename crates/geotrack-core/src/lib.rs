//! # geotrack-core
//!
//! Core logic for the geotrack location reporting client.
//!
//! This crate provides:
//! - A location event pipeline that filters, classifies and publishes samples
//! - Geofence transition detection against circular waypoints
//! - Monitoring-mode policy for what may be sent
//! - Outbound message construction and queueing
//! - Configuration management and persistent waypoint storage
//!
//! ## Architecture
//!
//! The crate is organized into the following modules:
//!
//! - [`processor`] - The pipeline entry points (`on_location_changed`, ...)
//! - [`filter`] - Accuracy threshold check
//! - [`detector`] - Great-circle distance and enter/exit classification
//! - [`transition`] - Per-waypoint transition state machine and locks
//! - [`policy`] - Which report types each monitoring mode permits
//! - [`message`] - Outbound message types and the message builder
//! - [`queue`] - Outbound queue abstraction
//! - [`waypoint`] - Waypoint model and store abstraction
//! - [`storage`] - JSON file-backed waypoint store
//! - [`location_repo`] - Last published location cache
//! - [`metrics`] - Device metrics and Wi-Fi providers
//! - [`config`] - Configuration loading, saving, and validation
//! - [`error`] - Unified error types for the crate
//! - [`types`] - Shared types and OpenAPI schemas

#![forbid(unsafe_code)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs)]

pub mod config;
pub mod detector;
pub mod error;
pub mod filter;
pub mod location_repo;
pub mod message;
pub mod metrics;
pub mod policy;
pub mod processor;
pub mod queue;
pub mod storage;
pub mod transition;
pub mod types;
pub mod waypoint;

// Re-export primary types for convenience
pub use config::{
    default_config_path, is_valid_tracker_id, Config, ConfigError, ConfigResult, EngineConfig,
    Preferences, ServerConfig, StorageConfig,
};
pub use detector::{classify, distance_m};
pub use error::{GeotrackError, Result};
pub use filter::is_within_accuracy_threshold;
pub use location_repo::LocationRepo;
pub use message::{MessageBuilder, OutboundMessage};
pub use metrics::{
    BatteryStatus, ConnectionType, DeviceMetrics, DeviceMetricsProvider, ReportedDeviceMetrics,
    WifiInfoProvider,
};
pub use policy::may_publish_location;
pub use processor::{LocationOutcome, LocationProcessor, TransitionOutcome};
pub use queue::{ChannelQueue, OutboundQueue};
pub use storage::{default_data_dir, JsonWaypointStore};
pub use transition::TransitionDecision;
pub use types::{
    LocationSample, MonitoringMode, ReportType, TransitionKind, TransitionTrigger, WifiInfo,
};
pub use waypoint::{MemoryWaypointStore, Waypoint, WaypointId, WaypointState, WaypointStore};
