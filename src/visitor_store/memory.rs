use crate::visitor_store::{VisitorRecord, VisitorStore};
use std::collections::HashMap;
use std::net::IpAddr;
use std::time::Duration;
use time::OffsetDateTime;
use tokio::sync::Mutex;
use trust_dns_server::client::rr::{LowerName, Name};

/// A [`VisitorStore`] held in a single map behind one exclusive lock.
///
/// The lock is only held for map operations, never across I/O.
#[derive(Default, Debug)]
pub struct InMemoryVisitorStore {
    records: Mutex<HashMap<LowerName, VisitorRecord>>,
}

impl InMemoryVisitorStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl VisitorStore for InMemoryVisitorStore {
    async fn record_sighting_at(&self, hostname: &Name, ip: IpAddr, now: OffsetDateTime) {
        let mut records = self.records.lock().await;
        records
            .entry(LowerName::from(hostname))
            .and_modify(|record| record.observe(ip))
            .or_insert_with(|| VisitorRecord::new(hostname.clone(), ip, now));
    }

    async fn lookup(&self, hostname: &LowerName) -> Option<VisitorRecord> {
        self.records.lock().await.get(hostname).cloned()
    }

    async fn sweep(&self, now: OffsetDateTime, retention: Duration) -> usize {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now, retention));
        before - records.len()
    }

    async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}
