//! Per-message dispatch of questions to the ACME relay or the answer synthesizer.

use crate::dns::relay::AcmeRelay;
use crate::dns::synth::{AnswerSynthesizer, SkipReason, Synthesis, ANSWER_TTL};
use crate::visitor_store::DynVisitorStore;
use std::net::IpAddr;
use trust_dns_server::client::op::ResponseCode;
use trust_dns_server::client::rr::rdata::TXT;
use trust_dns_server::client::rr::{LowerName, Name, RData, Record, RecordType};

/// One question from an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Question {
    pub name: Name,
    pub query_type: RecordType,
}

impl Question {
    #[must_use]
    pub fn new(name: Name, query_type: RecordType) -> Self {
        Question { name, query_type }
    }
}

/// The answers and response code for one inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub response_code: ResponseCode,
    pub answers: Vec<Record>,
}

impl Default for Reply {
    fn default() -> Self {
        Reply {
            response_code: ResponseCode::NoError,
            answers: Vec::new(),
        }
    }
}

/// Routes every question of a message, in order, and assembles a single [`Reply`].
///
/// A question for the ACME challenge name is relayed upstream and ends routing for the whole
/// message. Anything else is answered by the [`AnswerSynthesizer`]; answered `A`/`AAAA`
/// questions are recorded as a sighting of the requester in the visitor store.
pub struct QueryRouter {
    synthesizer: AnswerSynthesizer,
    relay: AcmeRelay,
    store: DynVisitorStore,
}

impl QueryRouter {
    #[must_use]
    pub fn new(synthesizer: AnswerSynthesizer, relay: AcmeRelay, store: DynVisitorStore) -> Self {
        QueryRouter {
            synthesizer,
            relay,
            store,
        }
    }

    pub async fn route(&self, questions: &[Question], src: IpAddr) -> Reply {
        let mut reply = Reply::default();
        for question in questions {
            tracing::debug!(
                "query from {src}: {} {}",
                question.name,
                question.query_type
            );

            if self.relay.is_challenge(&LowerName::from(&question.name)) {
                self.relay_challenge(&question.name, &mut reply).await;
                return reply;
            }

            match self
                .synthesizer
                .synthesize(&question.name, question.query_type)
            {
                Synthesis::Answer(record) => {
                    if matches!(question.query_type, RecordType::A | RecordType::AAAA) {
                        self.store.record_sighting(&question.name, src).await;
                    }
                    reply.answers.push(record);
                }
                Synthesis::Skipped(SkipReason::Malformed(err)) => {
                    tracing::warn!("omitting answer for {}: {err}", question.name);
                }
                Synthesis::Skipped(reason) => {
                    tracing::debug!("no answer for {}: {reason:?}", question.name);
                }
            }
        }
        reply
    }

    async fn relay_challenge(&self, name: &Name, reply: &mut Reply) {
        match self.relay.relay(name).await {
            Ok(txts) => reply.answers.extend(txts.into_iter().map(|txt| {
                Record::from_rdata(name.clone(), ANSWER_TTL, RData::TXT(TXT::new(vec![txt])))
            })),
            Err(err) => {
                tracing::warn!("{err}");
                reply.response_code = ResponseCode::ServFail;
            }
        }
    }
}
