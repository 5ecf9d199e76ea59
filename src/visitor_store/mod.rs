//! Visitor record storage.
//!
//! Tracks, per queried hostname, the addresses of the resolvers that looked it up. Records are
//! written by the [DNS server][crate::dns] for every answered `A`/`AAAA` query inside the zone,
//! read by the [lookup API][crate::api], and expired by the [`reaper::ExpiryReaper`].
//!
//! A record's age is measured from the *first* sighting of its hostname. Later sightings add
//! new addresses but never extend the record's lifetime, so every record expires a fixed
//! retention window after it was created.
//!
//! Only an in-memory implementation is provided, [`memory::InMemoryVisitorStore`]. Nothing is
//! kept across restarts.

use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use trust_dns_server::client::rr::{LowerName, Name};

pub mod memory;
pub mod reaper;

#[allow(clippy::module_name_repetitions)]
pub use memory::InMemoryVisitorStore;
pub use reaper::ExpiryReaper;

/// `DynVisitorStore` is a type alias for a [`VisitorStore`] shared between the DNS handler, the
/// reaper and the lookup API. Implementations synchronize internally.
#[allow(clippy::module_name_repetitions)]
pub type DynVisitorStore = Arc<dyn VisitorStore + Send + Sync>;

/// The set of resolver addresses observed for one hostname.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitorRecord {
    /// The hostname as it was first queried, original case preserved.
    pub hostname: Name,
    /// Observed addresses in first-seen order, without duplicates.
    pub ips: Vec<IpAddr>,
    /// When the hostname was first seen. Never refreshed.
    pub created_at: OffsetDateTime,
}

impl VisitorRecord {
    fn new(hostname: Name, ip: IpAddr, created_at: OffsetDateTime) -> Self {
        VisitorRecord {
            hostname,
            ips: vec![ip],
            created_at,
        }
    }

    fn observe(&mut self, ip: IpAddr) {
        if !self.ips.contains(&ip) {
            self.ips.push(ip);
        }
    }

    /// Returns true once `now` is strictly more than `retention` past the record's creation.
    #[must_use]
    pub fn is_expired(&self, now: OffsetDateTime, retention: Duration) -> bool {
        now - self.created_at > retention
    }
}

/// An async trait describing storage of [`VisitorRecord`]s keyed by case-insensitive hostname.
#[async_trait::async_trait]
pub trait VisitorStore {
    /// Record that `ip` resolved `hostname` at `now`.
    ///
    /// Creates the record on first sighting. Otherwise appends `ip` if it hasn't been seen
    /// before for this hostname, leaving the creation time untouched.
    async fn record_sighting_at(&self, hostname: &Name, ip: IpAddr, now: OffsetDateTime);

    /// Record that `ip` resolved `hostname` just now.
    async fn record_sighting(&self, hostname: &Name, ip: IpAddr) {
        self.record_sighting_at(hostname, ip, OffsetDateTime::now_utc())
            .await;
    }

    /// Get a snapshot of the record for `hostname` (if any).
    async fn lookup(&self, hostname: &LowerName) -> Option<VisitorRecord>;

    /// Remove every record older than `retention` at `now`, returning how many were removed.
    async fn sweep(&self, now: OffsetDateTime, retention: Duration) -> usize;

    /// The number of hostnames currently tracked.
    async fn len(&self) -> usize;

    async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
