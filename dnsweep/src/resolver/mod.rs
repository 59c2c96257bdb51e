//! The DNS client contract and the resolver worker pool built on top of
//! it.
//!
//! `DnsClient` is the external collaborator boundary: the underlying wire
//! protocol details (query/retry/parse) are left to the implementation, so
//! only the contract is specified here. [`client::HickoryDnsClient`] is a
//! real implementation built on `hickory-resolver`/`hickory-proto`, not a
//! stub, though its trace/AXFR support stays minimal since those
//! operations are secondary to core enumeration.

pub mod client;
pub mod pool;

use std::net::IpAddr;

use async_trait::async_trait;

use crate::types::{Answer, QuestionTypeSet, TraceData, TransferData};

/// Error produced by a single DNS-client operation. Never promoted to
/// [`crate::error::RunnerError`]: these are swallowed by the resolver
/// worker that issued the query.
#[derive(Debug, Clone)]
pub struct DnsQueryError {
    pub message: String,
    pub response_code: Option<crate::types::ResponseCode>,
}

impl std::fmt::Display for DnsQueryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

pub type DnsResult<T> = std::result::Result<T, DnsQueryError>;

/// External DNS client contract.
#[async_trait]
pub trait DnsClient: Send + Sync {
    /// Issues one logical query per configured question type and merges
    /// the results into a single [`Answer`]. Returns `Ok(None)` when the
    /// result is entirely empty.
    async fn query_multiple(&self, host: &str, types: QuestionTypeSet) -> DnsResult<Option<Answer>>;

    /// Recursive resolution trace.
    async fn trace(&self, host: &str) -> DnsResult<TraceData>;

    /// Zone transfer attempt.
    async fn axfr(&self, host: &str) -> DnsResult<TransferData>;

    /// A plain A/AAAA lookup, used by ASN enrichment when an answer has no
    /// A records of its own.
    async fn lookup(&self, host: &str) -> DnsResult<Vec<IpAddr>>;

    /// CDN classification for a resolved host.
    async fn cdn_check(&self, host: &str) -> DnsResult<(bool, Option<String>)>;
}
