//! Static answers for names inside the configured zone.

use crate::config::Shared;
use crate::error::Error;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use time::OffsetDateTime;
use trust_dns_proto::rr::rdata::svcb::{Alpn, SvcParamKey, SvcParamValue, SVCB};
use trust_dns_proto::rr::rdata::SOA;
use trust_dns_server::client::rr::{Name, RData, Record, RecordType};

/// TTL of every synthesized answer except `SOA`.
pub const ANSWER_TTL: u32 = 60;
/// TTL of the synthesized `SOA` answer.
pub const SOA_TTL: u32 = 3_600;

/// The outcome of synthesizing an answer for one question.
#[derive(Debug)]
pub enum Synthesis {
    Answer(Record),
    Skipped(SkipReason),
}

/// Why no answer was synthesized.
#[derive(Debug)]
pub enum SkipReason {
    /// The name isn't the zone or a name below it.
    OutOfZone,
    /// Nothing is synthesized for this record type.
    UnsupportedType(RecordType),
    /// The record couldn't be built from the configuration.
    Malformed(Error),
}

impl Synthesis {
    #[must_use]
    pub fn answer(&self) -> Option<&Record> {
        match self {
            Synthesis::Answer(record) => Some(record),
            Synthesis::Skipped(_) => None,
        }
    }
}

/// Builds `SOA`, `NS`, `A`, `AAAA` and `HTTPS` answers from the [`Config`][crate::config::Config].
#[derive(Clone)]
pub struct AnswerSynthesizer {
    config: Shared,
}

impl AnswerSynthesizer {
    #[must_use]
    pub fn new(config: Shared) -> Self {
        AnswerSynthesizer { config }
    }

    /// Returns true if `name` ends with the zone name, ignoring case.
    ///
    /// This is a plain text suffix test, so `badexample.com.` is inside `example.com.`.
    #[must_use]
    pub fn in_zone(&self, name: &Name) -> bool {
        let zone = self.config.domain.to_string();
        name.to_ascii()
            .to_ascii_lowercase()
            .trim_end_matches('.')
            .ends_with(zone.trim_end_matches('.'))
    }

    /// Synthesize the answer for a `query_type` question about `name`. The answer is owned by
    /// `name` exactly as it was asked.
    #[must_use]
    pub fn synthesize(&self, name: &Name, query_type: RecordType) -> Synthesis {
        self.synthesize_at(name, query_type, OffsetDateTime::now_utc())
    }

    pub(crate) fn synthesize_at(
        &self,
        name: &Name,
        query_type: RecordType,
        now: OffsetDateTime,
    ) -> Synthesis {
        let rdata = match query_type {
            RecordType::SOA | RecordType::NS | RecordType::A | RecordType::AAAA
            | RecordType::HTTPS => {
                if !self.in_zone(name) {
                    return Synthesis::Skipped(SkipReason::OutOfZone);
                }
                match query_type {
                    RecordType::SOA => self.soa_rdata(now),
                    RecordType::NS => self.ns_rdata(),
                    RecordType::A => self.a_rdata(),
                    RecordType::AAAA => self.aaaa_rdata(),
                    _ => Ok(Self::https_rdata()),
                }
            }
            other => return Synthesis::Skipped(SkipReason::UnsupportedType(other)),
        };

        match rdata {
            Ok(rdata) => {
                let ttl = if query_type == RecordType::SOA {
                    SOA_TTL
                } else {
                    ANSWER_TTL
                };
                Synthesis::Answer(Record::from_rdata(name.clone(), ttl, rdata))
            }
            Err(err) => Synthesis::Skipped(SkipReason::Malformed(err)),
        }
    }

    fn soa_rdata(&self, now: OffsetDateTime) -> Result<RData, Error> {
        let soa_admin = self
            .config
            .soa_admin()
            .map_err(|err| construction_error(RecordType::SOA, err))?;
        let policy = &self.config.soa;
        Ok(RData::SOA(SOA::new(
            (&self.config.domain).into(),
            soa_admin,
            policy.serial.serial_at(now),
            policy.refresh,
            policy.retry,
            policy.expire,
            policy.minimum,
        )))
    }

    fn ns_rdata(&self) -> Result<RData, Error> {
        let target = configured(RecordType::NS, &self.config.target_ns)?;
        let ns = Name::from_str(target).map_err(|err| construction_error(RecordType::NS, err))?;
        Ok(RData::NS(ns))
    }

    fn a_rdata(&self) -> Result<RData, Error> {
        let target = configured(RecordType::A, &self.config.target_ipv4)?;
        let ip = Ipv4Addr::from_str(target).map_err(|err| construction_error(RecordType::A, err))?;
        Ok(RData::A(ip))
    }

    fn aaaa_rdata(&self) -> Result<RData, Error> {
        let target = configured(RecordType::AAAA, &self.config.target_ipv6)?;
        let ip =
            Ipv6Addr::from_str(target).map_err(|err| construction_error(RecordType::AAAA, err))?;
        Ok(RData::AAAA(ip))
    }

    fn https_rdata() -> RData {
        RData::HTTPS(SVCB::new(
            1,
            Name::root(),
            vec![
                (
                    SvcParamKey::Alpn,
                    SvcParamValue::Alpn(Alpn(vec!["h2".to_string()])),
                ),
                (SvcParamKey::Port, SvcParamValue::Port(443)),
            ],
        ))
    }
}

fn configured(record_type: RecordType, target: &str) -> Result<&str, Error> {
    match target.trim() {
        "" => Err(Error::RecordConstruction {
            record_type,
            reason: "no target configured".to_string(),
        }),
        target => Ok(target),
    }
}

fn construction_error(record_type: RecordType, err: impl std::fmt::Display) -> Error {
    Error::RecordConstruction {
        record_type,
        reason: err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::test_config;
    use crate::config::{Config, SerialPolicy};
    use std::sync::Arc;

    fn synthesizer(config: Config) -> AnswerSynthesizer {
        AnswerSynthesizer::new(Arc::new(config))
    }

    fn name(s: &str) -> Name {
        Name::from_ascii(s).unwrap()
    }

    fn answer_data(synthesis: &Synthesis) -> RData {
        synthesis.answer().unwrap().data().unwrap().clone()
    }

    #[test]
    fn a_answer_points_at_target() {
        let synth = synthesizer(test_config());
        for host in ["example.com.", "sub.example.com.", "a.b.c.example.com."] {
            let synthesis = synth.synthesize(&name(host), RecordType::A);
            let record = synthesis.answer().unwrap();
            assert_eq!(record.name(), &name(host));
            assert_eq!(record.ttl(), ANSWER_TTL);
            assert_eq!(
                record.data(),
                Some(&RData::A(Ipv4Addr::new(1, 2, 3, 4)))
            );
        }
    }

    #[test]
    fn aaaa_answer_points_at_target() {
        let synth = synthesizer(test_config());
        let synthesis = synth.synthesize(&name("sub.example.com."), RecordType::AAAA);
        assert_eq!(
            answer_data(&synthesis),
            RData::AAAA("2001:db8::1".parse().unwrap())
        );
    }

    #[test]
    fn zone_match_ignores_case() {
        let synth = synthesizer(test_config());
        let synthesis = synth.synthesize(&name("TEST.EXAMPLE.COM."), RecordType::A);
        let record = synthesis.answer().unwrap();
        assert_eq!(record.name().to_string(), "TEST.EXAMPLE.COM.");
    }

    #[test]
    fn suffix_match_is_textual() {
        let synth = synthesizer(test_config());
        let synthesis = synth.synthesize(&name("BadExample.com."), RecordType::A);
        let record = synthesis.answer().unwrap();
        assert_eq!(record.name().to_string(), "BadExample.com.");
        assert_eq!(record.data(), Some(&RData::A(Ipv4Addr::new(1, 2, 3, 4))));
    }

    #[test]
    fn out_of_zone_is_skipped() {
        let synth = synthesizer(test_config());
        for host in ["example.org.", "example.com.org.", "com."] {
            let synthesis = synth.synthesize(&name(host), RecordType::A);
            assert!(
                matches!(synthesis, Synthesis::Skipped(SkipReason::OutOfZone)),
                "{host}"
            );
        }
    }

    #[test]
    fn unsupported_types_are_skipped() {
        let synth = synthesizer(test_config());
        for record_type in [RecordType::MX, RecordType::TXT, RecordType::CAA] {
            let synthesis = synth.synthesize(&name("sub.example.com."), record_type);
            assert!(matches!(
                synthesis,
                Synthesis::Skipped(SkipReason::UnsupportedType(t)) if t == record_type
            ));
        }
    }

    #[test]
    fn ns_answer() {
        let synth = synthesizer(test_config());
        let synthesis = synth.synthesize(&name("example.com."), RecordType::NS);
        assert_eq!(synthesis.answer().unwrap().ttl(), ANSWER_TTL);
        assert_eq!(answer_data(&synthesis), RData::NS(name("ns1.example.com.")));
    }

    #[test]
    fn soa_answer_uses_policy() {
        let synth = synthesizer(test_config());
        let synthesis = synth.synthesize(&name("sub.example.com."), RecordType::SOA);
        assert_eq!(synthesis.answer().unwrap().ttl(), SOA_TTL);
        let RData::SOA(soa) = answer_data(&synthesis) else {
            panic!("expected SOA");
        };
        assert_eq!(soa.mname(), &name("example.com."));
        assert_eq!(soa.rname(), &name("hostmaster.example.com."));
        assert_eq!(soa.serial(), 2_025_012_400);
        assert_eq!(soa.refresh(), 3_600);
        assert_eq!(soa.retry(), 600);
        assert_eq!(soa.expire(), 604_800);
        assert_eq!(soa.minimum(), 86_400);
    }

    #[test]
    fn soa_serial_from_date() {
        let mut config = test_config();
        config.soa.serial = SerialPolicy::Date;
        let synth = synthesizer(config);
        let now = time::macros::datetime!(2023-03-12 08:00 UTC);
        let synthesis = synth.synthesize_at(&name("example.com."), RecordType::SOA, now);
        let RData::SOA(soa) = answer_data(&synthesis) else {
            panic!("expected SOA");
        };
        assert_eq!(soa.serial(), 2_023_031_200);
    }

    #[test]
    fn https_answer_advertises_h2() {
        let synth = synthesizer(test_config());
        let synthesis = synth.synthesize(&name("sub.example.com."), RecordType::HTTPS);
        let RData::HTTPS(svcb) = answer_data(&synthesis) else {
            panic!("expected HTTPS");
        };
        assert_eq!(svcb.svc_priority(), 1);
        assert!(svcb.target_name().is_root());
        assert_eq!(
            svcb.svc_params(),
            &[
                (
                    SvcParamKey::Alpn,
                    SvcParamValue::Alpn(Alpn(vec!["h2".to_string()]))
                ),
                (SvcParamKey::Port, SvcParamValue::Port(443)),
            ]
        );
    }

    #[test]
    fn malformed_targets_are_skipped_with_reason() {
        let mut config = test_config();
        config.target_ipv4 = "not-an-ip".to_string();
        config.target_ipv6 = "1.2.3.4".to_string();
        config.target_ns = String::new();
        let synth = synthesizer(config);

        for record_type in [RecordType::A, RecordType::AAAA, RecordType::NS] {
            let synthesis = synth.synthesize(&name("sub.example.com."), record_type);
            assert!(
                matches!(
                    &synthesis,
                    Synthesis::Skipped(SkipReason::Malformed(Error::RecordConstruction {
                        record_type: t,
                        ..
                    })) if *t == record_type
                ),
                "{record_type}: {synthesis:?}"
            );
        }
    }
}
