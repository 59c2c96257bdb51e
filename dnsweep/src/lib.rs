//! `dnsweep`: a concurrent bulk DNS enumeration pipeline.
//!
//! - `commands` holds the CLI surface (`base`) and the top-level `run`
//!   orchestration entry point.
//! - `input` expands heterogeneous input tokens (hosts, CIDRs, ASNs,
//!   `FUZZ` patterns) into the work set.
//! - `workset` is the persistent, order-preserving host -> answer map.
//! - `ratelimiter` is the token-bucket gate in front of resolver workers.
//! - `resolver` holds the `DnsClient` external-collaborator trait, its
//!   hickory-backed implementation, and the worker pool.
//! - `wildcard` is the second-pass wildcard-subtree detector.
//! - `resume` persists/restores the scan cursor.
//! - `output` is the formatting sink.
//! - `asn` / `cdn` are the ASN-enrichment and CDN-classification
//!   collaborators (external, interfaces only).
//! - `runner` owns every shared resource and wires the pipeline together.
pub mod asn;
pub mod cdn;
pub mod commands;
pub mod config;
pub mod error;
pub mod host;
pub mod input;
pub mod output;
pub mod ratelimiter;
pub mod resolver;
pub mod resume;
pub mod runner;
pub mod types;
pub mod wildcard;
pub mod workset;

/// A thin abstraction implemented by the CLI type to execute work.
///
/// The method takes ownership of `self` so implementors can move owned
/// fields (paths, configuration) without requiring extra cloning.
pub trait CommandHandler {
    fn handle(self) -> error::Result<()>;
}
