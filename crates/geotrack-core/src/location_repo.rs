//! Cache of the most recently published location.

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::types::LocationSample;

/// Holds the last location that was successfully published.
#[derive(Debug, Default)]
pub struct LocationRepo {
    current: RwLock<Option<LocationSample>>,
}

impl LocationRepo {
    /// Create an empty repo.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The last published location, if any.
    pub async fn current_published_location(&self) -> Option<LocationSample> {
        self.current.read().await.clone()
    }

    /// Timestamp of the last published location, if any.
    pub async fn current_location_time(&self) -> Option<DateTime<Utc>> {
        self.current.read().await.as_ref().map(|s| s.timestamp)
    }

    /// Record `sample` as the last published location unless a later one is
    /// already recorded. Equal timestamps replace.
    ///
    /// Returns whether the cache changed.
    pub async fn advance_published_location(&self, sample: LocationSample) -> bool {
        let mut current = self.current.write().await;
        if current
            .as_ref()
            .is_some_and(|last| last.timestamp > sample.timestamp)
        {
            return false;
        }
        *current = Some(sample);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_empty_repo() {
        let repo = LocationRepo::new();
        assert!(repo.current_published_location().await.is_none());
        assert!(repo.current_location_time().await.is_none());
    }

    #[tokio::test]
    async fn test_equal_timestamp_replaces() {
        let repo = LocationRepo::new();
        let first = LocationSample::new(1.0, 1.0, 5.0, Utc::now());
        let second = LocationSample::new(2.0, 2.0, 5.0, first.timestamp);

        assert!(repo.advance_published_location(first).await);
        assert!(repo.advance_published_location(second.clone()).await);

        assert_eq!(repo.current_published_location().await, Some(second));
    }

    #[tokio::test]
    async fn test_older_sample_never_rewinds() {
        let repo = LocationRepo::new();
        let latest = LocationSample::new(1.0, 1.0, 5.0, Utc::now());
        let stale = LocationSample::new(2.0, 2.0, 5.0, latest.timestamp - Duration::seconds(30));

        assert!(repo.advance_published_location(latest.clone()).await);
        assert!(!repo.advance_published_location(stale).await);

        assert_eq!(repo.current_location_time().await, Some(latest.timestamp));
    }
}
