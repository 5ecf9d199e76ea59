use crate::visitor_store::VisitorRecord;
use serde::Serialize;

#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub(super) struct LookupResult {
    pub domain: String,
    pub ips: Vec<String>,
    pub known: bool,
    #[serde(rename = "requesterIP")]
    pub requester_ip: String,
}

impl LookupResult {
    pub fn new(record: &VisitorRecord, known: bool, requester_ip: String) -> Self {
        LookupResult {
            domain: record.hostname.to_string(),
            ips: record.ips.iter().map(ToString::to_string).collect(),
            known,
            requester_ip,
        }
    }
}
