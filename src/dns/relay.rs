//! Round-robin relay of ACME challenge `TXT` lookups.

use crate::error::Error;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use trust_dns_client::client::{AsyncClient, ClientHandle};
use trust_dns_client::op::Message;
use trust_dns_client::rr::{DNSClass, LowerName, Name, RData, RecordType};
use trust_dns_client::udp::UdpClientStream;

/// `DynUpstreamResolver` is a type alias for an [`UpstreamResolver`] shared by every relay
/// attempt.
pub type DynUpstreamResolver = Arc<dyn UpstreamResolver + Send + Sync>;

/// Sends a single `TXT` query to a single upstream server.
#[async_trait::async_trait]
pub trait UpstreamResolver {
    /// Query `server` for the `TXT` strings of `name`. An answer without TXT data is returned as
    /// an empty `Vec`.
    async fn query_txt(&self, server: SocketAddr, name: &Name) -> Result<Vec<String>, Error>;
}

/// An [`UpstreamResolver`] speaking plain DNS over UDP, bounding each query by `timeout`.
#[derive(Debug, Clone)]
pub struct UdpUpstreamResolver {
    timeout: Duration,
}

impl UdpUpstreamResolver {
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        UdpUpstreamResolver { timeout }
    }

    async fn exchange(&self, server: SocketAddr, name: &Name) -> Result<Vec<String>, Error> {
        let stream = UdpClientStream::<UdpSocket>::with_timeout(server, self.timeout);
        let (mut client, background) = AsyncClient::connect(stream).await?;
        tokio::spawn(background);
        let response = client
            .query(name.clone(), DNSClass::IN, RecordType::TXT)
            .await?;
        Ok(txt_strings(&response))
    }
}

#[async_trait::async_trait]
impl UpstreamResolver for UdpUpstreamResolver {
    async fn query_txt(&self, server: SocketAddr, name: &Name) -> Result<Vec<String>, Error> {
        tokio::time::timeout(self.timeout, self.exchange(server, name))
            .await
            .map_err(|_| Error::UpstreamTimeout {
                server,
                timeout: self.timeout,
            })?
    }
}

fn txt_strings(message: &Message) -> Vec<String> {
    message
        .answers()
        .iter()
        .filter_map(|record| match record.data() {
            Some(RData::TXT(txt)) => Some(txt),
            _ => None,
        })
        .flat_map(|txt| txt.txt_data().iter())
        .map(|data| String::from_utf8_lossy(data).into_owned())
        .collect()
}

/// Relays `TXT` queries for the ACME challenge name to a pool of upstream servers.
///
/// Every attempt advances a cursor shared by all concurrent relays, so consecutive attempts
/// (from this query or any other) spread across the pool. Each relay tries at most one attempt
/// per configured server.
pub struct AcmeRelay {
    challenge_domain: LowerName,
    servers: Vec<SocketAddr>,
    cursor: AtomicUsize,
    resolver: DynUpstreamResolver,
}

impl AcmeRelay {
    #[must_use]
    pub fn new(
        challenge_domain: LowerName,
        servers: Vec<SocketAddr>,
        resolver: DynUpstreamResolver,
    ) -> Self {
        AcmeRelay {
            challenge_domain,
            servers,
            cursor: AtomicUsize::new(0),
            resolver,
        }
    }

    /// Returns true if `name` is exactly the challenge name, ignoring case.
    #[must_use]
    pub fn is_challenge(&self, name: &LowerName) -> bool {
        *name == self.challenge_domain
    }

    /// Fetch the TXT strings for `name` from the first upstream server that has any.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UpstreamQueryFailure`] if no servers are configured, or if every
    /// attempt failed or came back without TXT data.
    pub async fn relay(&self, name: &Name) -> Result<Vec<String>, Error> {
        let attempts = self.servers.len();
        for _ in 0..attempts {
            let server = self.next_server();
            tracing::debug!("querying upstream {server} for {name} TXT");
            match self.resolver.query_txt(server, name).await {
                Ok(txts) if !txts.is_empty() => return Ok(txts),
                Ok(_) => tracing::warn!("upstream {server} returned no TXT data for {name}"),
                Err(err) => tracing::warn!("upstream {server} failed for {name}: {err}"),
            }
        }
        Err(Error::UpstreamQueryFailure {
            name: name.clone(),
            attempts,
        })
    }

    fn next_server(&self) -> SocketAddr {
        let index = self.cursor.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
        self.servers[index % self.servers.len()]
    }
}
