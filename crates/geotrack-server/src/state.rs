//! Application state shared across handlers.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use geotrack_core::{
    default_data_dir, ChannelQueue, Config, ConfigResult, JsonWaypointStore, LocationProcessor,
    LocationRepo, OutboundMessage, Preferences, ReportedDeviceMetrics, WaypointStore,
};
use tokio::sync::{mpsc, watch, Mutex, RwLock, RwLockReadGuard};
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// State handle passed to every handler.
pub type SharedState = Arc<AppState>;

/// Shared application state.
pub struct AppState {
    /// The location event pipeline.
    pub processor: LocationProcessor,
    /// Waypoint store the processor works against.
    pub waypoints: Arc<dyn WaypointStore>,
    /// Device metrics as last reported by the device.
    pub device: Arc<ReportedDeviceMetrics>,
    /// Recently dispatched outbound messages.
    pub outbox: Arc<Outbox>,
    preferences: watch::Sender<Preferences>,
    config: RwLock<Config>,
    config_path: Option<PathBuf>,
}

impl AppState {
    /// Build state from configuration, opening the JSON waypoint store in the
    /// configured (or platform default) data directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the data directory cannot be determined or the
    /// waypoint file cannot be read.
    pub async fn from_config(config: Config, config_path: Option<PathBuf>) -> anyhow::Result<SharedState> {
        let data_dir = match &config.storage.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()?,
        };
        let store = JsonWaypointStore::open(&data_dir).await?;
        info!(path = %store.path().display(), "Opened waypoint store");

        Ok(Self::new(config, config_path, Arc::new(store)))
    }

    /// Build state over an existing waypoint store.
    ///
    /// Spawns the task that moves messages from the outbound queue into the
    /// outbox, so this must run inside a Tokio runtime.
    #[must_use]
    pub fn new(
        config: Config,
        config_path: Option<PathBuf>,
        waypoints: Arc<dyn WaypointStore>,
    ) -> SharedState {
        let (preferences, preferences_rx) = watch::channel(config.preferences.clone());
        let (queue, queue_rx) = ChannelQueue::new(config.engine.outbound_queue_capacity);
        let device = Arc::new(ReportedDeviceMetrics::new());

        let processor = LocationProcessor::new(
            preferences_rx,
            Arc::new(LocationRepo::new()),
            Arc::clone(&waypoints),
            Arc::new(queue),
            device.clone(),
            device.clone(),
        )
        .with_collaborator_timeout(config.engine.collaborator_timeout());

        let outbox = Arc::new(Outbox::new(config.server.outbox_capacity));
        Arc::clone(&outbox).spawn_drain(queue_rx);

        Arc::new(Self {
            processor,
            waypoints,
            device,
            outbox,
            preferences,
            config: RwLock::new(config),
            config_path,
        })
    }

    /// Get read access to config.
    pub async fn config(&self) -> RwLockReadGuard<'_, Config> {
        self.config.read().await
    }

    /// Apply `update` to the preferences, validate, persist, and publish the
    /// new snapshot to the processor.
    ///
    /// Nothing changes if validation or saving fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the updated configuration is invalid or cannot be
    /// written to the config file.
    pub async fn update_preferences(
        &self,
        update: impl FnOnce(&mut Preferences) + Send,
    ) -> ConfigResult<Preferences> {
        let mut config = self.config.write().await;
        let mut next = config.clone();
        update(&mut next.preferences);
        next.validate()?;

        if let Some(path) = &self.config_path {
            next.save(path)?;
        }

        self.preferences.send_replace(next.preferences.clone());
        *config = next;
        info!(mode = %config.preferences.monitoring, "Preferences updated");
        Ok(config.preferences.clone())
    }
}

/// Bounded history of outbound messages handed to the transport.
#[derive(Debug)]
pub struct Outbox {
    capacity: usize,
    messages: Mutex<VecDeque<OutboundMessage>>,
    total: AtomicU64,
}

impl Outbox {
    /// Create an outbox keeping at most `capacity` messages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            messages: Mutex::new(VecDeque::with_capacity(capacity)),
            total: AtomicU64::new(0),
        }
    }

    /// Record a message, evicting the oldest when full.
    pub async fn push(&self, message: OutboundMessage) {
        let mut messages = self.messages.lock().await;
        if messages.len() >= self.capacity {
            messages.pop_front();
        }
        messages.push_back(message);
        self.total.fetch_add(1, Ordering::Relaxed);
    }

    /// The most recent `limit` messages, oldest first.
    pub async fn recent(&self, limit: usize) -> Vec<OutboundMessage> {
        let messages = self.messages.lock().await;
        let skip = messages.len().saturating_sub(limit);
        messages.iter().skip(skip).cloned().collect()
    }

    /// Messages recorded since startup, including evicted ones.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    /// Drain `rx` into the outbox until every sender is gone.
    pub fn spawn_drain(self: Arc<Self>, mut rx: mpsc::Receiver<OutboundMessage>) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(message) = rx.recv().await {
                debug!(kind = message.kind(), "Dispatching outbound message");
                self.push(message).await;
            }
            debug!("Outbound queue closed");
        })
    }
}
