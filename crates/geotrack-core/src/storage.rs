//! File-backed waypoint store.
//!
//! Waypoints live in memory in a [`MemoryWaypointStore`] arena and are flushed
//! to a single JSON file on every update. The file is replaced through a
//! temporary file and a rename, so a crash mid-write leaves the previous
//! version on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::error::Result;
use crate::waypoint::{
    MemoryWaypointStore, StoreError, StoreResult, Waypoint, WaypointId, WaypointStore,
};

/// File name of the waypoint database inside the data directory.
pub const WAYPOINTS_FILE: &str = "waypoints.json";

/// Get the default data directory.
///
/// On Linux: `/var/lib/geotrack/`
/// Elsewhere: the platform data directory, e.g. `~/Library/Application Support/geotrack/`
///
/// # Errors
///
/// Returns an error if no platform data directory can be determined.
pub fn default_data_dir() -> Result<PathBuf> {
    #[cfg(target_os = "linux")]
    {
        Ok(PathBuf::from("/var/lib/geotrack"))
    }
    #[cfg(not(target_os = "linux"))]
    {
        let dirs = directories::ProjectDirs::from("", "", "geotrack").ok_or_else(|| {
            crate::error::GeotrackError::ConfigValidationError(
                "Cannot determine data directory".into(),
            )
        })?;
        Ok(dirs.data_dir().to_path_buf())
    }
}

/// Waypoint store persisted as JSON.
///
/// Writes are serialized by `write_lock`. A change reaches the in-memory arena
/// only after the file holding it has been renamed into place, so a write that
/// fails or is cancelled leaves the previous record authoritative in both.
#[derive(Debug)]
pub struct JsonWaypointStore {
    path: PathBuf,
    arena: MemoryWaypointStore,
    write_lock: Mutex<()>,
}

impl JsonWaypointStore {
    /// Open the store in `data_dir`, loading existing waypoints if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn open(data_dir: impl AsRef<Path>) -> StoreResult<Self> {
        let path = data_dir.as_ref().join(WAYPOINTS_FILE);
        let waypoints = if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            let content =
                tokio::fs::read_to_string(&path)
                    .await
                    .map_err(|source| StoreError::ReadError {
                        path: path.clone(),
                        source,
                    })?;
            serde_json::from_str::<Vec<Waypoint>>(&content).map_err(|source| {
                StoreError::ParseError {
                    path: path.clone(),
                    source,
                }
            })?
        } else {
            Vec::new()
        };

        debug!(path = %path.display(), count = waypoints.len(), "Loaded waypoints");

        Ok(Self {
            path,
            arena: MemoryWaypointStore::with_waypoints(waypoints),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or replace a waypoint and flush.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub async fn insert(&self, waypoint: Waypoint) -> StoreResult<()> {
        self.persist(waypoint, false).await
    }

    /// Write the arena with `waypoint` applied, then commit it to memory.
    ///
    /// With `must_exist`, an unknown id fails before anything is written.
    async fn persist(&self, waypoint: Waypoint, must_exist: bool) -> StoreResult<()> {
        let _guard = self.write_lock.lock().await;

        let mut waypoints = self.arena.snapshot();
        match waypoints.iter_mut().find(|w| w.id == waypoint.id) {
            Some(slot) => *slot = waypoint.clone(),
            None if must_exist => return Err(StoreError::NotFound(waypoint.id)),
            None => {
                waypoints.push(waypoint.clone());
                waypoints.sort_by_key(|w| w.id);
            }
        }

        if let Err(e) = self.write_file(&waypoints).await {
            warn!(waypoint_id = waypoint.id, error = %e, "Failed to persist waypoint, keeping previous state");
            return Err(e);
        }

        // No await between the rename and this commit.
        self.arena.insert(waypoint);
        Ok(())
    }

    async fn write_file(&self, waypoints: &[Waypoint]) -> StoreResult<()> {
        let content = serde_json::to_string_pretty(waypoints)?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| StoreError::WriteError {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|source| StoreError::WriteError {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|source| StoreError::WriteError {
                path: self.path.clone(),
                source,
            })
    }
}

#[async_trait]
impl WaypointStore for JsonWaypointStore {
    async fn load_all(&self) -> StoreResult<Vec<Waypoint>> {
        Ok(self.arena.snapshot())
    }

    async fn get(&self, id: WaypointId) -> StoreResult<Waypoint> {
        self.arena.get(id).await
    }

    async fn update(&self, waypoint: &Waypoint, _notify: bool) -> StoreResult<()> {
        self.persist(waypoint.clone(), true).await
    }
}
