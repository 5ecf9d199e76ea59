//! dnspeek
//!
//! An authoritative DNS server that shows which resolvers looked up a name.
//!
//! Every `A`/`AAAA` query for a name inside the configured zone is answered with the configured
//! target address, and the address of the resolver that asked is remembered against the queried
//! name for a few minutes. A web page served from a random subdomain can then ask the
//! [lookup API][crate::api] which resolvers fetched its hostname, e.g. to show a visitor which
//! DNS provider their device really uses.
//!
//! Queries for the zone's [ACME][RFC-8555] [DNS-01] challenge name are relayed to upstream
//! resolvers, so certificates for the zone can be issued while another service holds the
//! challenge records.
//!
//! [RFC-8555]: https://www.rfc-editor.org/rfc/rfc8555
//! [DNS-01]: https://www.rfc-editor.org/rfc/rfc8555#section-8.4
//!
#![warn(clippy::pedantic)]

pub mod api;
pub mod config;
pub mod dns;
pub mod error;
pub mod visitor_store;

pub use api::new as new_http;
pub use config::{Config, Shared};
pub use dns::new as new_dns;
pub use visitor_store::{DynVisitorStore, ExpiryReaper, InMemoryVisitorStore};
