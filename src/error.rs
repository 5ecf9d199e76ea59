//! Error types.

use std::net::SocketAddr;
use std::time::Duration;
use trust_dns_client::error::ClientError;
use trust_dns_server::client::rr::{Name, RecordType};
use trust_dns_server::proto::error::ProtoError;

/// Error enumerates the possible dnspeek error states.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Returned by the [ACME relay][crate::dns::relay::AcmeRelay] when every configured upstream
    /// server failed, or answered without any TXT data. Also returned without any network
    /// attempt when no upstream servers are configured.
    ///
    /// Surfaced to DNS clients as a `SERVFAIL` response.
    #[error("all {attempts} upstream servers failed to answer TXT for \"{name}\"")]
    UpstreamQueryFailure { name: Name, attempts: usize },

    /// Returned when a synthesized resource record can't be built, e.g. because a configured
    /// target address doesn't parse. The affected answer is omitted from the response.
    #[error("unable to build {record_type} record: {reason}")]
    RecordConstruction {
        record_type: RecordType,
        reason: String,
    },

    /// Returned when a single upstream TXT query doesn't complete in time.
    #[error("upstream {server} did not answer within {timeout:?}")]
    UpstreamTimeout { server: SocketAddr, timeout: Duration },

    /// Returned when the upstream DNS client fails a query.
    #[error("upstream client error")]
    UpstreamClient(#[from] ClientError),

    /// Returned when the [`/json` API endpoint][crate::api#json-get] is requested without a
    /// `Host` header.
    #[error("missing host name")]
    HostMissing,

    /// Returned when the `Host` header of a [`/json` API endpoint][crate::api#json-get] request
    /// isn't a valid DNS name.
    #[error("invalid host name \"{0}\"")]
    InvalidHost(String),

    /// Returned when the [`/json` API endpoint][crate::api#json-get] is requested for a host
    /// that has no visitor record.
    #[error("not found")]
    NotFound(Name),

    /// Returned when a loaded [`Config`][crate::config::Config] is internally inconsistent.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Returned when a generic IO error occurs.
    #[error("an IO error occurred")]
    IO(#[from] std::io::Error),

    /// Returned when [trying to load a `Config`][crate::config::Config::try_from_file] fails
    /// due to invalid JSON content.
    #[error("invalid JSON")]
    InvalidJSON(#[from] serde_json::Error),

    /// Returned when the dnspeek DNS server encounters a generic DNS protocol error.
    #[error("DNS error")]
    DNSError(#[from] ProtoError),
}
