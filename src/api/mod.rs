//! Read-only HTTP API over the [visitor store][crate::visitor_store].
//!
//! A web page served from a random subdomain of the zone can call this API to find out which
//! resolvers looked that subdomain up.
//!
//! # API Endpoints
//!
//! ## `/` (GET)
//!
//!   Returns HTTP 200 (OK) and the plain text body `up`.
//!
//! ## `/healthcheck` (GET)
//!
//!   Returns HTTP 200 (OK) and the JSON body `{"ok":"healthy"}` when the service is operational.
//!
//! ## `/json` (GET)
//!
//!   Looks up the visitor record for the hostname in the request's `Host` header. Any port is
//!   ignored, and the name is treated as fully qualified.
//!
//!   For a known hostname, returns HTTP 200 (OK) and a JSON response body of the form:
//!
//!   ```json
//!   {
//!     "domain": "d9a1f3.example.com.",
//!     "ips": ["192.0.2.53", "2001:db8::53"],
//!     "known": false,
//!     "requesterIP": "198.51.100.7"
//!   }
//!   ```
//!
//!   Where `ips` are the resolver addresses that queried `domain`, in first-seen order, and
//!   `known` is true when every one of them is inside a
//!   [`Config::known_resolvers`][`crate::config::Config::known_resolvers`] network.
//!   `requesterIP` is the first `X-Forwarded-For` address if present, otherwise the HTTP peer.
//!
//!   Returns HTTP 400 (Bad Request) without a usable `Host` header, and HTTP 404 (Not Found)
//!   when no record exists (or it has expired).
//!
//! Responses allow any CORS origin.

mod api_error;
mod model;
mod routes;
pub mod server;

pub use server::new;
