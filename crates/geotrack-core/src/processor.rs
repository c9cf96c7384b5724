//! The location event pipeline.
//!
//! [`LocationProcessor`] receives location samples and native geofence
//! events, drives the accuracy filter, transition detector, transition state
//! machine and monitoring policy, and hands finished messages to the
//! outbound queue.
//!
//! # Re-entrancy
//!
//! A real transition reported by a native geofence callback is followed by a
//! location publish with [`ReportType::Circular`]. A circular publish never
//! runs fused detection, so this nests at most one level deep.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::watch;
use tracing::{debug, info, trace, warn};

use crate::config::Preferences;
use crate::detector::classify;
use crate::error::{GeotrackError, Result};
use crate::filter::is_within_accuracy_threshold;
use crate::location_repo::LocationRepo;
use crate::message::{MessageBuilder, OutboundMessage};
use crate::metrics::{DeviceMetricsProvider, WifiInfoProvider};
use crate::policy::may_publish_location;
use crate::queue::OutboundQueue;
use crate::transition::{self, TransitionDecision, TransitionLocks};
use crate::types::{LocationSample, MonitoringMode, ReportType, TransitionKind, TransitionTrigger};
use crate::waypoint::{Waypoint, WaypointId, WaypointStore};

/// Default timeout for each collaborator call.
pub const DEFAULT_COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(5);

/// What happened to a sample handed to [`LocationProcessor::on_location_changed`].
#[derive(Debug)]
pub enum LocationOutcome {
    /// A location message was enqueued and the sample is now the last
    /// published location.
    Published,
    /// Nothing was published. Already logged; carried for inspection.
    Skipped(GeotrackError),
}

impl LocationOutcome {
    /// Whether a location message was enqueued.
    #[must_use]
    pub const fn is_published(&self) -> bool {
        matches!(self, Self::Published)
    }
}

/// Result of evaluating one waypoint transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionOutcome {
    /// Waypoint that was evaluated.
    pub waypoint_id: WaypointId,
    /// Classification that was applied.
    pub kind: TransitionKind,
    /// Silent or real.
    pub decision: TransitionDecision,
    /// Whether a transition message was enqueued.
    pub announced: bool,
    /// Whether a follow-up circular location message was enqueued.
    pub location_published: bool,
}

/// Orchestrates location and geofence events.
pub struct LocationProcessor {
    preferences: watch::Receiver<Preferences>,
    location_repo: Arc<LocationRepo>,
    waypoints: Arc<dyn WaypointStore>,
    queue: Arc<dyn OutboundQueue>,
    metrics: Arc<dyn DeviceMetricsProvider>,
    wifi: Arc<dyn WifiInfoProvider>,
    locks: TransitionLocks,
    timeout: Duration,
}

impl LocationProcessor {
    /// Create a processor over its collaborators.
    #[must_use]
    pub fn new(
        preferences: watch::Receiver<Preferences>,
        location_repo: Arc<LocationRepo>,
        waypoints: Arc<dyn WaypointStore>,
        queue: Arc<dyn OutboundQueue>,
        metrics: Arc<dyn DeviceMetricsProvider>,
        wifi: Arc<dyn WifiInfoProvider>,
    ) -> Self {
        Self {
            preferences,
            location_repo,
            waypoints,
            queue,
            metrics,
            wifi,
            locks: TransitionLocks::new(),
            timeout: DEFAULT_COLLABORATOR_TIMEOUT,
        }
    }

    /// Bound every store and queue call by `timeout`.
    #[must_use]
    pub const fn with_collaborator_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Snapshot of the current preferences.
    #[must_use]
    pub fn preferences(&self) -> Preferences {
        self.preferences.borrow().clone()
    }

    /// The last-published-location cache.
    #[must_use]
    pub fn location_repo(&self) -> &LocationRepo {
        &self.location_repo
    }

    // =========================================================================
    // LOCATION EVENTS
    // =========================================================================

    /// Handle a new sample from the device, or one supplied by the user.
    ///
    /// Samples not newer than the last published location are dropped unless
    /// the report was explicitly triggered. Failures are logged and returned
    /// as [`LocationOutcome::Skipped`]; none are escalated.
    pub async fn on_location_changed(
        &self,
        sample: LocationSample,
        report_type: ReportType,
    ) -> LocationOutcome {
        trace!(
            latitude = sample.latitude,
            longitude = sample.longitude,
            accuracy = sample.accuracy,
            %report_type,
            "Location changed"
        );

        let is_newer = self
            .location_repo
            .current_location_time()
            .await
            .map_or(true, |last| sample.timestamp > last);

        if !is_newer && report_type == ReportType::Default {
            trace!("Not re-sending message with same timestamp as last");
            return LocationOutcome::Skipped(GeotrackError::DuplicateTimestamp);
        }

        if sample.is_mock {
            debug!("Processing mock location");
        }

        match self.publish_location_message(report_type, &sample).await {
            Ok(()) => {
                let timestamp = sample.timestamp;
                if !self.location_repo.advance_published_location(sample).await {
                    debug!(%timestamp, "A later location was published meanwhile");
                }
                LocationOutcome::Published
            }
            Err(e) => {
                if e.is_expected_state() {
                    debug!(reason = %e, "Not publishing location");
                } else {
                    warn!(error = %e, "Failed to publish location");
                }
                LocationOutcome::Skipped(e)
            }
        }
    }

    /// Publish the last published location again, e.g. on user request.
    ///
    /// Returns `None` if nothing has been published yet.
    pub async fn publish_current_location(&self, report_type: ReportType) -> Option<Result<()>> {
        let sample = self.location_repo.current_published_location().await?;
        Some(self.publish_location_message(report_type, &sample).await)
    }

    /// Evaluate `sample` for publication and enqueue a location message.
    ///
    /// # Errors
    ///
    /// - [`GeotrackError::AccuracyRejected`] if the sample is too inaccurate
    /// - [`GeotrackError::MonitoringSuppressed`] if the monitoring mode
    ///   forbids this report type
    /// - collaborator errors from the store or queue
    pub async fn publish_location_message(
        &self,
        report_type: ReportType,
        sample: &LocationSample,
    ) -> Result<()> {
        let prefs = self.preferences();
        trace!(%report_type, "Maybe publishing location");

        if !is_within_accuracy_threshold(sample, prefs.accuracy_threshold) {
            debug!(
                accuracy = sample.accuracy,
                threshold = prefs.accuracy_threshold,
                "Location accuracy is outside accuracy threshold"
            );
            return Err(GeotrackError::AccuracyRejected {
                accuracy: sample.accuracy,
                threshold: prefs.accuracy_threshold,
            });
        }

        let mut waypoints = self.load_waypoints().await?;

        if prefs.fused_region_detection
            && !waypoints.is_empty()
            && report_type != ReportType::Circular
        {
            trace!(count = waypoints.len(), "Checking location against waypoints");
            self.run_fused_detection(&prefs, sample, &waypoints).await;
            // In-regions must reflect what fused detection just wrote.
            waypoints = self.load_waypoints().await?;
        }

        if !may_publish_location(prefs.monitoring, report_type) {
            debug!(
                mode = %prefs.monitoring,
                %report_type,
                "Location message suppressed by monitoring settings"
            );
            return Err(GeotrackError::MonitoringSuppressed {
                mode: prefs.monitoring,
                report_type,
            });
        }

        let message = MessageBuilder::new(&prefs, &*self.metrics, &*self.wifi).location(
            sample,
            report_type,
            &waypoints,
            Utc::now(),
        );
        self.enqueue(message).await?;

        if report_type.is_response() {
            debug!(%report_type, "Published response location");
        } else {
            trace!("Published location");
        }
        Ok(())
    }

    async fn run_fused_detection(
        &self,
        prefs: &Preferences,
        sample: &LocationSample,
        waypoints: &[Waypoint],
    ) {
        let evaluations = waypoints.iter().map(|waypoint| {
            let kind = classify(sample, waypoint);
            self.process_transition(prefs, waypoint.id, sample, kind, TransitionTrigger::Location)
        });

        // Each evaluation runs to completion; one failing does not stop the rest.
        for (waypoint, result) in waypoints.iter().zip(join_all(evaluations).await) {
            if let Err(e) = result {
                warn!(waypoint_id = waypoint.id, error = %e, "Fused transition failed");
            }
        }
    }

    // =========================================================================
    // WAYPOINT TRANSITIONS
    // =========================================================================

    /// Handle a transition for one waypoint, typically from a native geofence
    /// callback.
    ///
    /// A real transition with [`TransitionTrigger::Circular`] is followed by a
    /// circular location publish unless monitoring is quiet.
    ///
    /// # Errors
    ///
    /// Returns [`GeotrackError::AccuracyRejected`] without touching the
    /// waypoint if the sample is too inaccurate, or a collaborator error.
    pub async fn on_waypoint_transition(
        &self,
        waypoint_id: WaypointId,
        sample: &LocationSample,
        kind: TransitionKind,
        trigger: TransitionTrigger,
    ) -> Result<TransitionOutcome> {
        let prefs = self.preferences();
        let mut outcome = self
            .process_transition(&prefs, waypoint_id, sample, kind, trigger)
            .await?;

        if outcome.announced && trigger == TransitionTrigger::Circular {
            match self
                .publish_location_message(ReportType::Circular, sample)
                .await
            {
                Ok(()) => outcome.location_published = true,
                Err(e) if e.is_expected_state() => {
                    debug!(reason = %e, "Circular location not published");
                }
                Err(e) => warn!(error = %e, "Failed to publish circular location"),
            }
        }

        Ok(outcome)
    }

    async fn process_transition(
        &self,
        prefs: &Preferences,
        waypoint_id: WaypointId,
        sample: &LocationSample,
        kind: TransitionKind,
        trigger: TransitionTrigger,
    ) -> Result<TransitionOutcome> {
        trace!(waypoint_id, ?kind, ?trigger, "Waypoint transition");

        if !is_within_accuracy_threshold(sample, prefs.accuracy_threshold) {
            debug!(waypoint_id, accuracy = sample.accuracy, "Ignoring transition: low accuracy");
            return Err(GeotrackError::AccuracyRejected {
                accuracy: sample.accuracy,
                threshold: prefs.accuracy_threshold,
            });
        }

        let (waypoint, decision) = {
            let _guard = self.locks.acquire(waypoint_id).await;
            let mut waypoint = self
                .with_timeout("load waypoint", async {
                    self.waypoints.get(waypoint_id).await.map_err(Into::into)
                })
                .await?;
            let decision = transition::apply(&mut waypoint, kind, Utc::now());
            self.with_timeout("update waypoint", async {
                self.waypoints
                    .update(&waypoint, false)
                    .await
                    .map_err(Into::into)
            })
            .await?;
            (waypoint, decision)
        };

        let mut outcome = TransitionOutcome {
            waypoint_id,
            kind,
            decision,
            announced: false,
            location_published: false,
        };

        if !decision.is_real() {
            trace!(waypoint_id, state = ?waypoint.last_transition, "Silent transition update");
            return Ok(outcome);
        }

        info!(
            waypoint_id,
            description = %waypoint.description,
            event = kind.event_name(),
            trigger = trigger.tag(),
            "Waypoint transition"
        );

        if prefs.monitoring == MonitoringMode::Quiet {
            debug!(mode = %prefs.monitoring, "Transition message suppressed by monitoring settings");
            return Ok(outcome);
        }

        let message = MessageBuilder::new(prefs, &*self.metrics, &*self.wifi)
            .transition(&waypoint, sample, kind, trigger);
        self.enqueue(message).await?;
        outcome.announced = true;
        Ok(outcome)
    }

    // =========================================================================
    // OTHER MESSAGES
    // =========================================================================

    /// Enqueue a snapshot of every waypoint.
    ///
    /// # Errors
    ///
    /// Returns a collaborator error from the store or queue.
    pub async fn publish_waypoints_message(&self) -> Result<()> {
        let waypoints = self.load_waypoints().await?;
        debug!(count = waypoints.len(), "Publishing waypoints");
        self.enqueue(MessageBuilder::waypoint_list(&waypoints)).await
    }

    /// Enqueue a single waypoint.
    ///
    /// # Errors
    ///
    /// Returns [`GeotrackError::WaypointNotFound`] or a collaborator error.
    pub async fn publish_waypoint_message(&self, waypoint_id: WaypointId) -> Result<()> {
        let waypoint = self
            .with_timeout("load waypoint", async {
                self.waypoints.get(waypoint_id).await.map_err(Into::into)
            })
            .await?;
        self.enqueue(MessageBuilder::waypoint(&waypoint)).await
    }

    /// Enqueue a device status message.
    ///
    /// # Errors
    ///
    /// Returns a collaborator error from the queue.
    pub async fn publish_status_message(&self) -> Result<()> {
        let prefs = self.preferences();
        let message = MessageBuilder::new(&prefs, &*self.metrics, &*self.wifi).status();
        self.enqueue(message).await
    }

    // =========================================================================
    // COLLABORATOR CALLS
    // =========================================================================

    async fn load_waypoints(&self) -> Result<Vec<Waypoint>> {
        self.with_timeout("load waypoints", async {
            self.waypoints.load_all().await.map_err(Into::into)
        })
        .await
    }

    async fn enqueue(&self, message: OutboundMessage) -> Result<()> {
        let kind = message.kind();
        self.with_timeout("enqueue message", self.queue.enqueue(message))
            .await?;
        trace!(kind, "Message queued for sending");
        Ok(())
    }

    async fn with_timeout<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T>> + Send,
    ) -> Result<T> {
        tokio::time::timeout(self.timeout, call)
            .await
            .map_err(|_| GeotrackError::CollaboratorTimeout {
                operation,
                millis: u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX),
            })?
    }
}
