//! End-to-end behaviour of the location pipeline over a file-backed store.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, TimeZone, Utc};
use geotrack_core::processor::DEFAULT_COLLABORATOR_TIMEOUT;
use geotrack_core::{
    ChannelQueue, GeotrackError, JsonWaypointStore, LocationOutcome, LocationProcessor,
    LocationRepo, LocationSample, MonitoringMode, OutboundMessage, Preferences,
    ReportType, ReportedDeviceMetrics, TransitionKind, TransitionTrigger, Waypoint,
    WaypointState, WaypointStore,
};
use tempfile::TempDir;
use tokio::sync::{mpsc, watch};
use tokio_test::{assert_err, assert_ok};

struct Pipeline {
    processor: LocationProcessor,
    store: Arc<JsonWaypointStore>,
    queue: Arc<ChannelQueue>,
    prefs: watch::Receiver<Preferences>,
    rx: mpsc::Receiver<OutboundMessage>,
    _dir: TempDir,
}

impl Pipeline {
    async fn new(waypoints: Vec<Waypoint>, monitoring: MonitoringMode) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(JsonWaypointStore::open(dir.path()).await.unwrap());
        for waypoint in waypoints {
            store.insert(waypoint).await.unwrap();
        }

        let (queue, rx) = ChannelQueue::new(32);
        let queue = Arc::new(queue);
        let (_, prefs) = watch::channel(Preferences {
            monitoring,
            ..Preferences::default()
        });
        let processor = processor(&store, &queue, &prefs, DEFAULT_COLLABORATOR_TIMEOUT);

        Self {
            processor,
            store,
            queue,
            prefs,
            rx,
            _dir: dir,
        }
    }

    /// Another processor over the same store and queue.
    fn processor_with_timeout(&self, timeout: StdDuration) -> LocationProcessor {
        processor(&self.store, &self.queue, &self.prefs, timeout)
    }

    fn drain(&mut self) -> Vec<OutboundMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            messages.push(message);
        }
        messages
    }
}

fn processor(
    store: &Arc<JsonWaypointStore>,
    queue: &Arc<ChannelQueue>,
    prefs: &watch::Receiver<Preferences>,
    timeout: StdDuration,
) -> LocationProcessor {
    let device = Arc::new(ReportedDeviceMetrics::new());
    LocationProcessor::new(
        prefs.clone(),
        Arc::new(LocationRepo::new()),
        store.clone(),
        queue.clone(),
        device.clone(),
        device,
    )
    .with_collaborator_timeout(timeout)
}

fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 5, 20, 9, 0, 0).unwrap()
}

fn office(state: WaypointState) -> Waypoint {
    let mut waypoint = Waypoint::new(7, "Office", 48.8566, 2.3522, 150.0, t0());
    waypoint.last_transition = state;
    waypoint
}

fn at_office() -> LocationSample {
    LocationSample::new(48.8566, 2.3522, 8.0, t0())
}

#[tokio::test]
async fn unknown_waypoint_exit_is_silent_and_persisted() {
    let mut pipeline = Pipeline::new(vec![office(WaypointState::Unknown)], MonitoringMode::Move).await;
    let elsewhere = LocationSample::new(48.9, 2.5, 8.0, t0());

    let outcome = assert_ok!(
        pipeline
            .processor
            .on_waypoint_transition(7, &elsewhere, TransitionKind::Exit, TransitionTrigger::Circular)
            .await
    );

    assert!(!outcome.decision.is_real());
    assert!(pipeline.drain().is_empty());

    let reopened = JsonWaypointStore::open(pipeline.store.path().parent().unwrap())
        .await
        .unwrap();
    let persisted = reopened.get(7).await.unwrap();
    assert_eq!(persisted.last_transition, WaypointState::Outside);
    assert!(persisted.last_triggered.is_none());
}

#[tokio::test]
async fn circular_enter_publishes_transition_then_circular_location() {
    let mut pipeline =
        Pipeline::new(vec![office(WaypointState::Outside)], MonitoringMode::Significant).await;

    let outcome = assert_ok!(
        pipeline
            .processor
            .on_waypoint_transition(7, &at_office(), TransitionKind::Enter, TransitionTrigger::Circular)
            .await
    );
    assert!(outcome.announced);
    assert!(outcome.location_published);

    let messages = pipeline.drain();
    assert_eq!(messages.len(), 2);

    let OutboundMessage::Transition(transition) = &messages[0] else {
        panic!("expected a transition first, got {:?}", messages[0]);
    };
    assert_eq!(transition.event, TransitionKind::Enter);
    assert_eq!(transition.trigger, TransitionTrigger::Circular);
    assert_eq!(transition.description, "Office");

    let OutboundMessage::Location(location) = &messages[1] else {
        panic!("expected a location second, got {:?}", messages[1]);
    };
    assert_eq!(location.trigger, ReportType::Circular);
    assert_eq!(location.in_regions, vec!["Office".to_string()]);
}

#[tokio::test]
async fn quiet_mode_suppresses_default_locations() {
    let mut pipeline = Pipeline::new(vec![], MonitoringMode::Quiet).await;

    let err = assert_err!(
        pipeline
            .processor
            .publish_location_message(ReportType::Default, &at_office())
            .await
    );

    assert!(matches!(
        err,
        GeotrackError::MonitoringSuppressed {
            mode: MonitoringMode::Quiet,
            report_type: ReportType::Default
        }
    ));
    assert!(pipeline.drain().is_empty());
}

#[tokio::test]
async fn equal_timestamp_default_report_is_dropped() {
    let mut pipeline = Pipeline::new(vec![], MonitoringMode::Significant).await;
    let sample = at_office();

    assert!(pipeline
        .processor
        .on_location_changed(sample.clone(), ReportType::Default)
        .await
        .is_published());
    pipeline.drain();

    let repeat = LocationSample::new(48.0, 2.0, 5.0, sample.timestamp);
    let outcome = pipeline
        .processor
        .on_location_changed(repeat, ReportType::Default)
        .await;

    assert!(matches!(
        outcome,
        LocationOutcome::Skipped(GeotrackError::DuplicateTimestamp)
    ));
    assert!(pipeline.drain().is_empty());
    assert_eq!(
        pipeline.processor.location_repo().current_published_location().await,
        Some(sample)
    );
}

#[tokio::test]
async fn equal_timestamp_user_report_is_published() {
    let mut pipeline = Pipeline::new(vec![], MonitoringMode::Significant).await;
    let sample = at_office();

    pipeline
        .processor
        .on_location_changed(sample.clone(), ReportType::Default)
        .await;
    pipeline.drain();

    let outcome = pipeline
        .processor
        .on_location_changed(sample, ReportType::User)
        .await;

    assert!(outcome.is_published());
    let messages = pipeline.drain();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].report_type(), Some(ReportType::User));
}

#[tokio::test]
async fn repeated_samples_inside_announce_once() {
    let mut pipeline = Pipeline::new(vec![office(WaypointState::Unknown)], MonitoringMode::Move).await;

    for offset in 0..3 {
        let mut sample = at_office();
        sample.timestamp = t0() + Duration::seconds(offset);
        assert!(pipeline
            .processor
            .on_location_changed(sample, ReportType::Default)
            .await
            .is_published());
    }

    let transitions = pipeline
        .drain()
        .into_iter()
        .filter(|m| matches!(m, OutboundMessage::Transition(_)))
        .count();
    assert_eq!(transitions, 1);

    let stored = pipeline.store.get(7).await.unwrap();
    assert!(stored.is_inside());
}

#[tokio::test]
async fn older_sample_is_dropped() {
    let mut pipeline = Pipeline::new(vec![], MonitoringMode::Significant).await;

    pipeline
        .processor
        .on_location_changed(at_office(), ReportType::Default)
        .await;
    pipeline.drain();

    let mut stale = at_office();
    stale.timestamp = t0() - Duration::minutes(5);
    let outcome = pipeline
        .processor
        .on_location_changed(stale, ReportType::Default)
        .await;

    assert!(!outcome.is_published());
    assert!(pipeline.drain().is_empty());
}

#[tokio::test]
async fn timed_out_transition_is_announced_on_retry() {
    let mut pipeline =
        Pipeline::new(vec![office(WaypointState::Outside)], MonitoringMode::Significant).await;

    let hasty = pipeline.processor_with_timeout(StdDuration::from_nanos(1));
    let first = hasty
        .on_waypoint_transition(7, &at_office(), TransitionKind::Enter, TransitionTrigger::Location)
        .await;
    let announced_first = first.as_ref().is_ok_and(|outcome| outcome.announced);
    if let Err(e) = &first {
        assert!(matches!(e, GeotrackError::CollaboratorTimeout { .. }), "{e}");
        assert_eq!(
            pipeline.store.get(7).await.unwrap().last_transition,
            WaypointState::Outside
        );
    }

    // Abandoned blocking file operations may still be running.
    tokio::time::sleep(StdDuration::from_millis(50)).await;

    let retry = assert_ok!(
        pipeline
            .processor
            .on_waypoint_transition(7, &at_office(), TransitionKind::Enter, TransitionTrigger::Location)
            .await
    );

    assert!(announced_first != retry.announced);
    let transitions = pipeline
        .drain()
        .into_iter()
        .filter(|m| matches!(m, OutboundMessage::Transition(_)))
        .count();
    assert_eq!(transitions, 1);

    let reopened = JsonWaypointStore::open(pipeline.store.path().parent().unwrap())
        .await
        .unwrap();
    assert!(reopened.get(7).await.unwrap().is_inside());
}
