//! Periodic expiry of visitor records.

use crate::visitor_store::DynVisitorStore;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

/// Sweeps a [`DynVisitorStore`] every `interval`, removing records older than `retention`.
#[derive(Clone)]
pub struct ExpiryReaper {
    store: DynVisitorStore,
    interval: Duration,
    retention: Duration,
}

impl ExpiryReaper {
    /// # Panics
    ///
    /// Panics if `interval` is zero.
    #[must_use]
    pub fn new(store: DynVisitorStore, interval: Duration, retention: Duration) -> Self {
        assert!(!interval.is_zero(), "reaper interval must be non-zero");
        ExpiryReaper {
            store,
            interval,
            retention,
        }
    }

    /// Sweep once as of `now`, returning the number of records removed.
    pub async fn sweep_at(&self, now: OffsetDateTime) -> usize {
        let removed = self.store.sweep(now, self.retention).await;
        if removed > 0 {
            tracing::debug!("expired {removed} visitor records");
        }
        removed
    }

    /// Sweep forever. The first sweep happens one interval after the call.
    pub async fn run(self) {
        tracing::info!(
            "sweeping visitor records every {:?}, retaining for {:?}",
            self.interval,
            self.retention
        );
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            self.sweep_at(OffsetDateTime::now_utc()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::visitor_store::InMemoryVisitorStore;
    use std::str::FromStr;
    use std::sync::Arc;
    use trust_dns_server::client::rr::{LowerName, Name};

    #[tokio::test]
    async fn sweep_at_applies_retention() {
        let store: DynVisitorStore = Arc::new(InMemoryVisitorStore::new());
        let host = Name::from_str("sub.example.com.").unwrap();
        let t0 = OffsetDateTime::now_utc();
        store
            .record_sighting_at(&host, "9.9.9.9".parse().unwrap(), t0)
            .await;
        store
            .record_sighting_at(
                &host,
                "8.8.8.8".parse().unwrap(),
                t0 + Duration::from_secs(1),
            )
            .await;

        let reaper = ExpiryReaper::new(
            store.clone(),
            Duration::from_secs(60),
            Duration::from_secs(300),
        );
        assert_eq!(reaper.sweep_at(t0 + Duration::from_secs(300)).await, 0);
        assert_eq!(reaper.sweep_at(t0 + Duration::from_secs(301)).await, 1);
        assert!(store.lookup(&LowerName::from(&host)).await.is_none());
    }

    #[tokio::test]
    async fn run_sweeps_periodically() {
        let store: DynVisitorStore = Arc::new(InMemoryVisitorStore::new());
        let host = Name::from_str("stale.example.com.").unwrap();
        let long_ago = OffsetDateTime::now_utc() - Duration::from_secs(3600);
        store
            .record_sighting_at(&host, "9.9.9.9".parse().unwrap(), long_ago)
            .await;

        let reaper = ExpiryReaper::new(
            store.clone(),
            Duration::from_millis(10),
            Duration::from_secs(300),
        );
        let handle = tokio::spawn(reaper.run());
        tokio::time::sleep(Duration::from_millis(100)).await;
        handle.abort();

        assert!(store.is_empty().await);
    }

    #[test]
    #[should_panic(expected = "non-zero")]
    fn zero_interval_rejected() {
        let store: DynVisitorStore = Arc::new(InMemoryVisitorStore::new());
        let _ = ExpiryReaper::new(store, Duration::ZERO, Duration::from_secs(300));
    }
}
