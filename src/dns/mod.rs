//! Authoritative DNS server.
//!
//! Every response is marked authoritative. Every question of a message is answered, in order,
//! over UDP and optionally TCP. Questions are answered from the static
//! [Config][`crate::config::Config`], except for the ACME challenge name which is relayed to an
//! upstream resolver.
//!
//! # Zone Records
//!
//! `SOA`, `NS`, `A`, `AAAA` and `HTTPS` queries are answered for
//! every name ending in [`Config::domain`][`crate::config::Config::domain`]. The check is a
//! case-insensitive text suffix, not a label comparison. Queries for other names, or for other
//! record types, get an empty `NOERROR` response.
//!
//! E.g. with config:
//! ```json
//! {
//!   "domain": "example.com.",
//!   "soa_admin": "hostmaster@example.com",
//!   "target_ns": "ns1.example.com.",
//!   "target_ipv4": "93.184.216.34",
//!   "target_ipv6": "2606:2800:220:1:248:1893:25c8:1946",
//!   ...
//! }
//! ```
//!
//! Queries would return:
//!
//! ```bash
//! ❯ dig @127.0.0.1 -p 5353 +short anything.example.com A
//! 93.184.216.34
//! ❯ dig @127.0.0.1 -p 5353 +short anything.example.com AAAA
//! 2606:2800:220:1:248:1893:25c8:1946
//! ❯ dig @127.0.0.1 -p 5353 +short example.com NS
//! ns1.example.com.
//! ❯ dig @127.0.0.1 -p 5353 +short example.com SOA
//! example.com. hostmaster.example.com. 2025012400 3600 600 604800 86400
//! ❯ dig @127.0.0.1 -p 5353 +short example.com HTTPS
//! 1 . alpn="h2" port=443
//! ```
//!
//! `SOA` timers and serial come from [`Config::soa`][`crate::config::Config::soa`].
//!
//! Answered `A` and `AAAA` queries are recorded in the [visitor store][crate::visitor_store]
//! against the queried name and the address of the resolver that asked.
//!
//! A zone record that can't be built from the configuration (e.g. an unparseable
//! `target_ipv4`) is left out of the response and logged.
//!
//! # ACME Challenge
//!
//! Queries for exactly [`Config::acme_challenge_domain`][`crate::config::Config::acme_challenge_domain`]
//! are relayed as `TXT` queries to the
//! [`Config::acme_upstream_servers`][`crate::config::Config::acme_upstream_servers`] in round
//! robin, trying each server at most once. The first server to answer with TXT data wins, and
//! its strings are returned as `TXT` answers. If none does, the response is `SERVFAIL`.
//!
//! Each upstream attempt is bounded by
//! [`Config::acme_upstream_timeout`][`crate::config::Config::acme_upstream_timeout`].

mod handlers;
pub mod relay;
pub mod router;
pub mod server;
pub mod synth;

pub use handlers::Handler;
pub use router::{QueryRouter, Question, Reply};
pub use server::{new, DnsServer};
