//! Waypoints and the waypoint store contract.
//!
//! A waypoint is a named circular region with persisted transition state. The
//! engine reads waypoints, mutates `last_transition`/`last_triggered`, and
//! writes them back through [`WaypointStore::update`], which replaces exactly
//! one record.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::types::TransitionKind;

/// Stable waypoint identifier.
pub type WaypointId = u64;

/// Last known relation between the device and a waypoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum WaypointState {
    /// Never observed.
    #[default]
    Unknown,
    /// Last classified as inside the region.
    Inside,
    /// Last classified as outside the region.
    Outside,
}

impl From<TransitionKind> for WaypointState {
    fn from(kind: TransitionKind) -> Self {
        match kind {
            TransitionKind::Enter => Self::Inside,
            TransitionKind::Exit => Self::Outside,
        }
    }
}

/// A circular region of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Waypoint {
    /// Stable identifier.
    #[schema(example = 1)]
    pub id: WaypointId,

    /// Human-readable name, reported in in-regions and transitions.
    #[schema(example = "Home")]
    pub description: String,

    /// Centre latitude in degrees.
    #[schema(example = 52.520_008)]
    pub latitude: f64,

    /// Centre longitude in degrees.
    #[schema(example = 13.404_954)]
    pub longitude: f64,

    /// Geofence radius in metres.
    #[schema(example = 100.0)]
    pub radius: f64,

    /// Last transition state.
    #[serde(default)]
    pub last_transition: WaypointState,

    /// When the last real transition happened.
    #[serde(default)]
    pub last_triggered: Option<DateTime<Utc>>,

    /// When the waypoint was created.
    pub created_at: DateTime<Utc>,
}

impl Waypoint {
    /// Create a waypoint with no prior observation.
    #[must_use]
    pub fn new(
        id: WaypointId,
        description: impl Into<String>,
        latitude: f64,
        longitude: f64,
        radius: f64,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            description: description.into(),
            latitude,
            longitude,
            radius,
            last_transition: WaypointState::Unknown,
            last_triggered: None,
            created_at,
        }
    }

    /// Whether the waypoint has never been observed.
    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.last_transition == WaypointState::Unknown
    }

    /// Whether the device is currently considered inside.
    #[must_use]
    pub fn is_inside(&self) -> bool {
        self.last_transition == WaypointState::Inside
    }
}

/// Errors from waypoint store implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// No waypoint with this id exists.
    #[error("waypoint {0} not found")]
    NotFound(WaypointId),

    /// Failed to read the backing file.
    #[error("failed to read {path}: {source}")]
    ReadError {
        /// File path.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to write the backing file.
    #[error("failed to write {path}: {source}")]
    WriteError {
        /// File path.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The backing file is not valid waypoint JSON.
    #[error("failed to parse {path}: {source}")]
    ParseError {
        /// File path.
        path: std::path::PathBuf,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Waypoints could not be serialized.
    #[error("failed to serialize waypoints: {0}")]
    SerializeError(#[from] serde_json::Error),
}

/// Result type for waypoint store operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable set of waypoints.
///
/// `update` must replace one record atomically: either the new record is
/// stored in full or the previous one stays authoritative.
#[async_trait]
pub trait WaypointStore: Send + Sync {
    /// Load every waypoint, ordered by id.
    async fn load_all(&self) -> StoreResult<Vec<Waypoint>>;

    /// Load one waypoint.
    async fn get(&self, id: WaypointId) -> StoreResult<Waypoint>;

    /// Replace one waypoint. `notify` asks the store to tell its observers
    /// about the change; stores without observers ignore it.
    async fn update(&self, waypoint: &Waypoint, notify: bool) -> StoreResult<()>;
}

/// In-memory waypoint arena keyed by id.
///
/// Records live in a sharded map, so updates to unrelated waypoints never
/// contend on a store-wide lock.
#[derive(Debug, Default)]
pub struct MemoryWaypointStore {
    records: DashMap<WaypointId, Waypoint>,
}

impl MemoryWaypointStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with waypoints.
    #[must_use]
    pub fn with_waypoints(waypoints: impl IntoIterator<Item = Waypoint>) -> Self {
        let store = Self::new();
        for waypoint in waypoints {
            store.insert(waypoint);
        }
        store
    }

    /// Insert or replace a waypoint.
    pub fn insert(&self, waypoint: Waypoint) {
        self.records.insert(waypoint.id, waypoint);
    }

    /// Number of stored waypoints.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store holds no waypoints.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Snapshot of all records ordered by id.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Waypoint> {
        let mut waypoints: Vec<Waypoint> =
            self.records.iter().map(|entry| entry.value().clone()).collect();
        waypoints.sort_by_key(|w| w.id);
        waypoints
    }
}

#[async_trait]
impl WaypointStore for MemoryWaypointStore {
    async fn load_all(&self) -> StoreResult<Vec<Waypoint>> {
        Ok(self.snapshot())
    }

    async fn get(&self, id: WaypointId) -> StoreResult<Waypoint> {
        self.records
            .get(&id)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, waypoint: &Waypoint, _notify: bool) -> StoreResult<()> {
        let mut entry = self
            .records
            .get_mut(&waypoint.id)
            .ok_or(StoreError::NotFound(waypoint.id))?;
        *entry.value_mut() = waypoint.clone();
        Ok(())
    }
}
