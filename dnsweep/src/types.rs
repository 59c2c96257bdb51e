//! Shared data model: question types, the DNS Answer produced by the
//! external DNS client, and the Enriched Answer the resolver worker builds
//! on top of it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The eleven record types the pipeline knows how to request and render,
/// in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QuestionType {
    A,
    AAAA,
    CNAME,
    PTR,
    SOA,
    ANY,
    TXT,
    SRV,
    MX,
    NS,
    CAA,
}

/// Canonical iteration order, used by both the bitmask set and the
/// table-driven output formatter.
pub const ALL_QUESTION_TYPES: [QuestionType; 11] = [
    QuestionType::A,
    QuestionType::AAAA,
    QuestionType::CNAME,
    QuestionType::PTR,
    QuestionType::SOA,
    QuestionType::ANY,
    QuestionType::TXT,
    QuestionType::SRV,
    QuestionType::MX,
    QuestionType::NS,
    QuestionType::CAA,
];

impl QuestionType {
    fn bit(self) -> u16 {
        1 << ALL_QUESTION_TYPES.iter().position(|t| *t == self).expect("exhaustive table")
    }

    pub fn label(self) -> &'static str {
        match self {
            QuestionType::A => "A",
            QuestionType::AAAA => "AAAA",
            QuestionType::CNAME => "CNAME",
            QuestionType::PTR => "PTR",
            QuestionType::SOA => "SOA",
            QuestionType::ANY => "ANY",
            QuestionType::TXT => "TXT",
            QuestionType::SRV => "SRV",
            QuestionType::MX => "MX",
            QuestionType::NS => "NS",
            QuestionType::CAA => "CAA",
        }
    }
}

impl fmt::Display for QuestionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// An ordered subset of [`QuestionType`], stored as a bitmask. Iteration
/// always yields types in canonical order regardless of insertion order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QuestionTypeSet(u16);

impl QuestionTypeSet {
    pub fn empty() -> Self {
        Self(0)
    }

    /// The default set: `{A}`, used when empty or when wildcard filtering
    /// is requested.
    pub fn default_a() -> Self {
        let mut set = Self::empty();
        set.insert(QuestionType::A);
        set
    }

    pub fn insert(&mut self, t: QuestionType) {
        self.0 |= t.bit();
    }

    pub fn contains(&self, t: QuestionType) -> bool {
        self.0 & t.bit() != 0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn len(&self) -> usize {
        self.iter().count()
    }

    pub fn iter(&self) -> impl Iterator<Item = QuestionType> + '_ {
        ALL_QUESTION_TYPES.iter().copied().filter(move |t| self.contains(*t))
    }

    /// Normalizes the set: empty becomes `{A}`; if wildcard filtering is
    /// requested, `{A}` is forced regardless of what was configured, since
    /// wildcard detection works off A records.
    pub fn normalized(self, wildcard_filtering: bool) -> Self {
        if wildcard_filtering || self.is_empty() {
            Self::default_a()
        } else {
            self
        }
    }
}

impl FromIterator<QuestionType> for QuestionTypeSet {
    fn from_iter<I: IntoIterator<Item = QuestionType>>(iter: I) -> Self {
        let mut set = Self::empty();
        for t in iter {
            set.insert(t);
        }
        set
    }
}

/// Textual DNS response code, matching dig/`named`-style names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseCode {
    NoError,
    FormErr,
    ServFail,
    NxDomain,
    NotImp,
    Refused,
    YxDomain,
    YxRrSet,
    NxRrSet,
    NotAuth,
    NotZone,
    Other(u16),
}

impl fmt::Display for ResponseCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ResponseCode::NoError => "NOERROR",
            ResponseCode::FormErr => "FORMERR",
            ResponseCode::ServFail => "SERVFAIL",
            ResponseCode::NxDomain => "NXDOMAIN",
            ResponseCode::NotImp => "NOTIMP",
            ResponseCode::Refused => "REFUSED",
            ResponseCode::YxDomain => "YXDOMAIN",
            ResponseCode::YxRrSet => "YXRRSET",
            ResponseCode::NxRrSet => "NXRRSET",
            ResponseCode::NotAuth => "NOTAUTH",
            ResponseCode::NotZone => "NOTZONE",
            ResponseCode::Other(code) => return write!(f, "RCODE{code}"),
        };
        write!(f, "{s}")
    }
}

impl From<hickory_proto::op::ResponseCode> for ResponseCode {
    fn from(rcode: hickory_proto::op::ResponseCode) -> Self {
        use hickory_proto::op::ResponseCode as H;
        match rcode {
            H::NoError => ResponseCode::NoError,
            H::FormErr => ResponseCode::FormErr,
            H::ServFail => ResponseCode::ServFail,
            H::NXDomain => ResponseCode::NxDomain,
            H::NotImp => ResponseCode::NotImp,
            H::Refused => ResponseCode::Refused,
            H::YXDomain => ResponseCode::YxDomain,
            H::YXRRSet => ResponseCode::YxRrSet,
            H::NXRRSet => ResponseCode::NxRrSet,
            H::NotAuth => ResponseCode::NotAuth,
            H::NotZone => ResponseCode::NotZone,
            other => ResponseCode::Other(u16::from(other)),
        }
    }
}

/// Per-type textual record lists, populated by whichever of the eleven
/// question types were queried. Each bucket holds the record's textual
/// presentation (e.g. an A record's buckets holds dotted-quad strings).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecordSet {
    pub a: Vec<String>,
    pub aaaa: Vec<String>,
    pub cname: Vec<String>,
    pub ptr: Vec<String>,
    pub soa: Vec<SoaRecord>,
    pub txt: Vec<String>,
    pub srv: Vec<String>,
    pub mx: Vec<String>,
    pub ns: Vec<String>,
    pub caa: Vec<String>,
}

impl RecordSet {
    /// Textual records for a given type, used by the table-driven output
    /// formatter. SOA is rendered specially by the caller since it
    /// contributes two textual fields per record.
    pub fn for_type(&self, t: QuestionType) -> Vec<String> {
        match t {
            QuestionType::A => self.a.clone(),
            QuestionType::AAAA => self.aaaa.clone(),
            QuestionType::CNAME => self.cname.clone(),
            QuestionType::PTR => self.ptr.clone(),
            QuestionType::SOA => self.soa_textual(),
            QuestionType::ANY => Vec::new(),
            QuestionType::TXT => self.txt.clone(),
            QuestionType::SRV => self.srv.clone(),
            QuestionType::MX => self.mx.clone(),
            QuestionType::NS => self.ns.clone(),
            QuestionType::CAA => self.caa.clone(),
        }
    }

    /// SOA records contribute both the NS (mname) and Mbox (rname) fields
    /// as textual records, deduplicated.
    pub fn soa_textual(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        let mut out = Vec::new();
        for soa in &self.soa {
            for field in [&soa.mname, &soa.rname] {
                if seen.insert(field.clone()) {
                    out.push(field.clone());
                }
            }
        }
        out
    }

    pub fn is_empty(&self) -> bool {
        self.a.is_empty()
            && self.aaaa.is_empty()
            && self.cname.is_empty()
            && self.ptr.is_empty()
            && self.soa.is_empty()
            && self.txt.is_empty()
            && self.srv.is_empty()
            && self.mx.is_empty()
            && self.ns.is_empty()
            && self.caa.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SoaRecord {
    pub mname: String,
    pub rname: String,
}

/// A single hop's worth of intermediate data gathered during a recursive
/// resolution trace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceHop {
    pub server: String,
    pub raw: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TraceData {
    pub hops: Vec<TraceHop>,
}

/// The result of a zone-transfer (AXFR) attempt.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransferData {
    pub records: Vec<String>,
    pub raw: String,
}

/// ASN metadata folded from one or more ASN-client responses into a single
/// description.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsnDescription {
    pub as_number: u32,
    pub org: String,
    pub country: String,
    pub ranges: Vec<String>,
}

/// The opaque answer produced by the external DNS client: per-type record
/// lists plus the raw wire-format text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub host: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub response_code: ResponseCode,
    pub records: RecordSet,
    pub raw: String,
    /// True when the answer was served from a local hosts file rather than
    /// a real upstream query.
    pub from_hosts_file: bool,
}

impl Answer {
    pub fn is_empty_answer(&self) -> bool {
        self.records.is_empty() && self.raw.is_empty()
    }
}

/// `Answer` augmented with the optional post-processing passes: trace,
/// zone transfer, ASN, and CDN data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedAnswer {
    #[serde(flatten)]
    pub answer: Answer,
    pub trace: Option<TraceData>,
    pub zone_transfer: Option<TransferData>,
    pub asn: Option<AsnDescription>,
    pub is_cdn_ip: bool,
    pub cdn_name: Option<String>,
}

impl EnrichedAnswer {
    pub fn bare(answer: Answer) -> Self {
        Self {
            answer,
            trace: None,
            zone_transfer: None,
            asn: None,
            is_cdn_ip: false,
            cdn_name: None,
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).unwrap_or_default()
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        serde_json::from_slice(bytes).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_question_type_set_is_a() {
        let set = QuestionTypeSet::empty().normalized(false);
        assert!(set.contains(QuestionType::A));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn wildcard_filtering_forces_a_only() {
        let mut set = QuestionTypeSet::empty();
        set.insert(QuestionType::TXT);
        set.insert(QuestionType::MX);
        let normalized = set.normalized(true);
        assert!(normalized.contains(QuestionType::A));
        assert_eq!(normalized.len(), 1);
    }

    #[test]
    fn iteration_is_canonical_order_regardless_of_insertion() {
        let mut set = QuestionTypeSet::empty();
        set.insert(QuestionType::NS);
        set.insert(QuestionType::A);
        set.insert(QuestionType::TXT);
        let order: Vec<_> = set.iter().collect();
        assert_eq!(order, vec![QuestionType::A, QuestionType::TXT, QuestionType::NS]);
    }

    #[test]
    fn soa_textual_dedupes() {
        let mut records = RecordSet::default();
        records.soa.push(SoaRecord {
            mname: "ns1.example.com".into(),
            rname: "hostmaster.example.com".into(),
        });
        records.soa.push(SoaRecord {
            mname: "ns1.example.com".into(),
            rname: "hostmaster.example.com".into(),
        });
        assert_eq!(
            records.soa_textual(),
            vec!["ns1.example.com".to_string(), "hostmaster.example.com".to_string()]
        );
    }
}
