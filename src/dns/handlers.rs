use crate::dns::router::{QueryRouter, Question, Reply};
use std::net::IpAddr;
use std::sync::Arc;
use tracing::{debug, error};
use trust_dns_proto::serialize::binary::{BinDecodable, BinDecoder};
use trust_dns_server::client::op::{Header, Message, MessageType, OpCode, ResponseCode};

/// Turns inbound DNS messages into authoritative responses.
///
/// Every question of a query message is handed to the [`QueryRouter`] in one batch, so a
/// message with several questions gets a single response carrying the answers to all of them.
#[derive(Clone)]
pub struct Handler {
    router: Arc<QueryRouter>,
}

impl Handler {
    pub(crate) fn new(router: Arc<QueryRouter>) -> Self {
        Handler { router }
    }

    /// Answer the wire-format `request` received from `src`, returning the wire-format response.
    ///
    /// Returns `None` if the request is too short to carry a header.
    pub async fn handle_bytes(&self, request: &[u8], src: IpAddr) -> Option<Vec<u8>> {
        let response = match Message::from_vec(request) {
            Ok(request) => self.handle_message(&request, src).await,
            Err(err) => {
                let header = Header::read(&mut BinDecoder::new(request)).ok()?;
                debug!("malformed request {} from {src}: {err}", header.id());
                Message::error_msg(header.id(), header.op_code(), ResponseCode::FormErr)
            }
        };

        match response.to_vec() {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                error!("unable to encode response {}: {err}", response.id());
                Message::error_msg(response.id(), response.op_code(), ResponseCode::ServFail)
                    .to_vec()
                    .ok()
            }
        }
    }

    /// Answer `request`, received from `src`.
    pub async fn handle_message(&self, request: &Message, src: IpAddr) -> Message {
        // If it isn't a query, return NOTIMPL.
        if request.op_code() != OpCode::Query || request.message_type() != MessageType::Query {
            return Self::handle_notimpl(request);
        }

        let questions: Vec<Question> = request
            .queries()
            .iter()
            .map(|query| Question::new(query.name().clone(), query.query_type()))
            .collect();
        let reply = self.router.route(&questions, src).await;
        Self::auth_response(request, reply)
    }

    fn handle_notimpl(request: &Message) -> Message {
        let mut response = Message::error_msg(request.id(), request.op_code(), ResponseCode::NotImp);
        response.add_queries(request.queries().iter().cloned());
        response
    }

    fn auth_response(request: &Message, reply: Reply) -> Message {
        let mut header = Header::response_from_request(request.header());
        header.set_authoritative(true);
        header.set_response_code(reply.response_code);

        let mut response = Message::new();
        response
            .set_header(header)
            .add_queries(request.queries().iter().cloned())
            .add_answers(reply.answers);
        response
    }
}
