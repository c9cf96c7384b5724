//! Per-waypoint transition state machine.
//!
//! ```text
//!            Enter               Exit
//! Unknown ─────────▶ Inside ◀─────────▶ Outside
//!    │                 (real both ways)    ▲
//!    └──────────────── Exit (silent) ──────┘
//! ```
//!
//! Exactly two cases are silent: a classification equal to the current state,
//! and an exit from a waypoint that was never observed. Everything else is a
//! real transition that stamps `last_triggered` and may be announced.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::types::TransitionKind;
use crate::waypoint::{Waypoint, WaypointId, WaypointState};

/// Whether a classification changes a waypoint observably.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionDecision {
    /// State is recorded but nothing is announced.
    Silent,
    /// A real transition: announce it.
    Real,
}

impl TransitionDecision {
    /// Whether this is a real transition.
    #[must_use]
    pub const fn is_real(self) -> bool {
        matches!(self, Self::Real)
    }
}

/// Decide how `classification` affects a waypoint currently in `current`.
#[must_use]
pub fn decide(current: WaypointState, classification: TransitionKind) -> TransitionDecision {
    let unchanged = current == WaypointState::from(classification);
    let unknown_exit =
        current == WaypointState::Unknown && classification == TransitionKind::Exit;

    if unchanged || unknown_exit {
        TransitionDecision::Silent
    } else {
        TransitionDecision::Real
    }
}

/// Apply `classification` to `waypoint` in place.
///
/// `last_transition` is always updated; `last_triggered` only on a real
/// transition.
pub fn apply(
    waypoint: &mut Waypoint,
    classification: TransitionKind,
    now: DateTime<Utc>,
) -> TransitionDecision {
    let decision = decide(waypoint.last_transition, classification);
    waypoint.last_transition = classification.into();
    if decision.is_real() {
        waypoint.last_triggered = Some(now);
    }
    decision
}

/// One async lock per waypoint id.
///
/// Held across read, decide and write of a single waypoint so concurrent
/// events for the same waypoint cannot interleave. Waypoints with different
/// ids never share a lock. An entry lives only while someone holds or awaits
/// it, so ids that never resolve to a waypoint leave nothing behind.
#[derive(Debug, Default)]
pub struct TransitionLocks {
    locks: DashMap<WaypointId, Arc<Mutex<()>>>,
}

impl TransitionLocks {
    /// Create an empty lock table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to waypoint `id`.
    pub async fn acquire(&self, id: WaypointId) -> TransitionGuard<'_> {
        let lock = Arc::clone(&self.locks.entry(id).or_default());
        let guard = lock.lock_owned().await;
        TransitionGuard {
            locks: self,
            id,
            guard: Some(guard),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.locks.len()
    }
}

/// Exclusive access to one waypoint, released on drop.
#[derive(Debug)]
pub struct TransitionGuard<'a> {
    locks: &'a TransitionLocks,
    id: WaypointId,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for TransitionGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // A count of one means the table holds the only reference.
        self.locks
            .locks
            .remove_if(&self.id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use TransitionDecision::{Real, Silent};
    use TransitionKind::{Enter, Exit};
    use WaypointState::{Inside, Outside, Unknown};

    #[test]
    fn test_decision_table() {
        assert_eq!(decide(Unknown, Exit), Silent);
        assert_eq!(decide(Unknown, Enter), Real);
        assert_eq!(decide(Inside, Exit), Real);
        assert_eq!(decide(Outside, Enter), Real);
        assert_eq!(decide(Inside, Enter), Silent);
        assert_eq!(decide(Outside, Exit), Silent);
    }

    #[test]
    fn test_apply_silent_keeps_last_triggered() {
        let mut wp = Waypoint::new(1, "Home", 0.0, 0.0, 50.0, Utc::now());
        assert_eq!(apply(&mut wp, Exit, Utc::now()), Silent);
        assert_eq!(wp.last_transition, Outside);
        assert!(wp.last_triggered.is_none());
    }

    #[test]
    fn test_apply_real_stamps_last_triggered() {
        let mut wp = Waypoint::new(1, "Home", 0.0, 0.0, 50.0, Utc::now());
        let now = Utc::now();
        assert_eq!(apply(&mut wp, Enter, now), Real);
        assert_eq!(wp.last_transition, Inside);
        assert_eq!(wp.last_triggered, Some(now));
    }

    #[test]
    fn test_repeated_classification_is_idempotent() {
        let mut wp = Waypoint::new(1, "Home", 0.0, 0.0, 50.0, Utc::now());
        assert_eq!(apply(&mut wp, Enter, Utc::now()), Real);
        let stamped = wp.last_triggered;
        assert_eq!(apply(&mut wp, Enter, Utc::now()), Silent);
        assert_eq!(wp.last_triggered, stamped);
    }

    #[tokio::test]
    async fn test_same_id_is_exclusive() {
        let locks = TransitionLocks::new();
        let guard = locks.acquire(7).await;

        let blocked = tokio::time::timeout(Duration::from_millis(20), locks.acquire(7)).await;
        assert!(blocked.is_err());

        drop(guard);
        let reacquired = tokio::time::timeout(Duration::from_millis(20), locks.acquire(7)).await;
        assert!(reacquired.is_ok());
    }

    #[tokio::test]
    async fn test_different_ids_do_not_block() {
        let locks = TransitionLocks::new();
        let _first = locks.acquire(1).await;
        let second = tokio::time::timeout(Duration::from_millis(20), locks.acquire(2)).await;
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn test_released_locks_are_forgotten() {
        let locks = TransitionLocks::new();
        for id in 0..1_000 {
            drop(locks.acquire(id).await);
        }
        assert_eq!(locks.len(), 0);
    }

    #[tokio::test]
    async fn test_waiting_acquirer_keeps_entry_alive() {
        let locks = Arc::new(TransitionLocks::new());
        let first = locks.acquire(3).await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _second = locks.acquire(3).await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        drop(first);
        assert_eq!(locks.len(), 1);

        waiter.await.unwrap();
        assert_eq!(locks.len(), 0);
    }
}
