use crate::error::Error;
use ipnetwork::IpNetwork;
use lazy_static::lazy_static;
use serde::Deserialize;
use serde_with::{serde_as, DurationSeconds};
use std::borrow::Cow;
use std::fs::File;
use std::io::BufReader;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use time::macros::format_description;
use time::OffsetDateTime;
use trust_dns_server::client::rr::{LowerName, Name};

pub type Shared = Arc<Config>;

#[serde_as]
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    /// The zone this server is authoritative for.
    pub domain: LowerName,
    pub soa_admin: String,
    pub target_ns: String,
    pub target_ipv4: String,
    pub target_ipv6: String,
    #[serde(default)]
    pub soa: SoaPolicy,

    /// The one name whose TXT queries are relayed upstream.
    pub acme_challenge_domain: LowerName,
    #[serde(default)]
    pub acme_upstream_servers: Vec<SocketAddr>,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_upstream_timeout")]
    pub acme_upstream_timeout: Duration,

    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_visitor_retention")]
    pub visitor_retention: Duration,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval: Duration,

    pub dns_udp_bind_addr: SocketAddr,
    pub dns_tcp_bind_addr: Option<SocketAddr>,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_dns_tcp_timeout")]
    pub dns_tcp_timeout: Duration,

    pub api_bind_addr: SocketAddr,
    #[serde_as(as = "DurationSeconds<u64>")]
    #[serde(default = "default_api_timeout")]
    pub api_timeout: Duration,
    /// Resolver networks whose visits are reported as `known` by the lookup API.
    #[serde(default)]
    pub known_resolvers: Vec<IpNetwork>,
}

/// Serial and timer values used for synthesized `SOA` answers.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct SoaPolicy {
    pub serial: SerialPolicy,
    pub refresh: i32,
    pub retry: i32,
    pub expire: i32,
    pub minimum: u32,
}

impl Default for SoaPolicy {
    fn default() -> Self {
        SoaPolicy {
            serial: SerialPolicy::default(),
            refresh: 3_600,
            retry: 600,
            expire: 604_800,
            minimum: 86_400,
        }
    }
}

/// How the `SOA` serial is chosen.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SerialPolicy {
    /// Always the same serial.
    Fixed(u32),
    /// `YYYYMMDD00` for the current UTC date.
    Date,
}

pub const DEFAULT_SOA_SERIAL: u32 = 2_025_012_400;

impl Default for SerialPolicy {
    fn default() -> Self {
        SerialPolicy::Fixed(DEFAULT_SOA_SERIAL)
    }
}

lazy_static! {
    static ref SERIAL_FORMATTER: &'static [time::format_description::FormatItem<'static>] =
        format_description!(version = 2, "[year][month][day]00");
}

impl SerialPolicy {
    #[must_use]
    pub fn serial_at(&self, now: OffsetDateTime) -> u32 {
        match self {
            SerialPolicy::Fixed(serial) => *serial,
            // NB: the formatted date is ten digits and fits a u32 until the year 4294.
            SerialPolicy::Date => now
                .format(*SERIAL_FORMATTER)
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_SOA_SERIAL),
        }
    }
}

fn default_upstream_timeout() -> Duration {
    Duration::from_secs(2)
}

fn default_visitor_retention() -> Duration {
    Duration::from_secs(5 * 60)
}

fn default_sweep_interval() -> Duration {
    Duration::from_secs(60)
}

fn default_dns_tcp_timeout() -> Duration {
    Duration::from_secs(5)
}

fn default_api_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Config {
    pub fn try_from_file(p: impl AsRef<Path>) -> Result<Self, Error> {
        let f = File::open(p)?;
        let reader = BufReader::new(f);
        let conf: Config = serde_json::from_reader(reader)?;
        conf.validate()?;
        Ok(conf)
    }

    pub fn soa_admin(&self) -> Result<Name, Error> {
        Ok(Name::from_str(&self.sanitized_soa_admin())?)
    }

    /// Returns true if every address falls within one of the known resolver networks.
    pub fn all_known(&self, ips: &[IpAddr]) -> bool {
        ips.iter().all(|ip| {
            self.known_resolvers
                .iter()
                .any(|network| network.contains(*ip))
        })
    }

    fn sanitized_soa_admin(&self) -> Cow<'_, str> {
        match self.soa_admin.split_once('@') {
            Some((user, domain)) => {
                let user = user.replace('.', "\\.");
                Cow::Owned(format!("{user}.{domain}"))
            }
            _ => Cow::Borrowed(&self.soa_admin),
        }
    }

    fn validate(&self) -> Result<(), Error> {
        if self.sweep_interval.is_zero() {
            return Err(Error::InvalidConfig(
                "sweep_interval must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
