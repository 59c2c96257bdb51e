//! CLI surface for `dnsweep`.
//!
//! The enumeration pipeline is a single operation rather than a family of
//! subcommands, so `Cli` is a flat `clap::Parser` struct. Dispatch still
//! goes through the `CommandHandler` trait so `main.rs` stays a thin
//! wrapper.

use std::path::PathBuf;

use clap::Parser;

use crate::CommandHandler;

/// Bulk DNS enumeration: expand inputs, resolve concurrently, optionally
/// filter wildcards, and emit results.
#[derive(Parser, Debug)]
#[command(name = "dnsweep", version)]
pub struct Cli {
    /// Inline hosts/CIDRs/ASNs/patterns, comma delimited.
    #[arg(value_name = "DOMAIN", num_args = 0..)]
    pub domain: Vec<String>,

    /// Read input tokens from this file instead of the positional args.
    #[arg(short = 'l', long = "list", value_name = "FILE")]
    pub list: Option<PathBuf>,

    /// Wordlist used for `FUZZ` patterns and bare-host cross-products.
    #[arg(short = 'w', long = "wordlist", value_name = "FILE")]
    pub wordlist: Option<PathBuf>,

    /// Comma-separated resolver addresses (`host:port`).
    #[arg(short = 'r', long = "resolvers")]
    pub resolvers: Option<String>,

    /// Concurrent resolver worker threads.
    #[arg(short = 't', long = "threads", default_value_t = 25)]
    pub threads: usize,

    /// Queries per second across all workers; unset means unlimited.
    #[arg(long = "rl", value_name = "N")]
    pub rate_limit: Option<u32>,

    /// Per-query retry count, passed through to the DNS client.
    #[arg(long = "retries", default_value_t = 2)]
    pub retries: u32,

    /// Resume a prior run from its persisted cursor.
    #[arg(long = "resume")]
    pub resume: bool,

    /// Stream hosts directly, skipping the persistent work set (implies
    /// no resume support for this run).
    #[arg(long = "stream")]
    pub stream: bool,

    /// Enable the wildcard-detection pass, rooted at this domain.
    #[arg(long = "wd", value_name = "ROOT")]
    pub wildcard_domain: Option<String>,

    /// Minimum hosts sharing an IP before that IP's hosts are probed for
    /// wildcard DNS.
    #[arg(long = "wt", default_value_t = 5)]
    pub wildcard_threshold: usize,

    /// A record.
    #[arg(short = 'a', long = "a")]
    pub a: bool,
    /// AAAA record.
    #[arg(long = "aaaa")]
    pub aaaa: bool,
    /// CNAME record.
    #[arg(long = "cname")]
    pub cname: bool,
    /// PTR record.
    #[arg(long = "ptr")]
    pub ptr: bool,
    /// SOA record.
    #[arg(long = "soa")]
    pub soa: bool,
    /// ANY record.
    #[arg(long = "any")]
    pub any: bool,
    /// TXT record.
    #[arg(long = "txt")]
    pub txt: bool,
    /// SRV record.
    #[arg(long = "srv")]
    pub srv: bool,
    /// MX record.
    #[arg(long = "mx")]
    pub mx: bool,
    /// NS record.
    #[arg(long = "ns")]
    pub ns: bool,
    /// CAA record.
    #[arg(long = "caa")]
    pub caa: bool,

    /// Emit one JSON object per line.
    #[arg(short = 'j', long = "json")]
    pub json: bool,

    /// Emit concatenated raw DNS wire-format text.
    #[arg(long = "raw")]
    pub raw: bool,

    /// `host [TYPE] [record]` per matched record.
    #[arg(long = "resp")]
    pub resp: bool,

    /// Bare record only, one per matched record.
    #[arg(long = "resp-only")]
    pub resp_only: bool,

    /// Also write results to this file.
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Follow the recursive resolution chain.
    #[arg(long = "trace")]
    pub trace: bool,

    /// Attempt a zone transfer (AXFR).
    #[arg(long = "axfr")]
    pub axfr: bool,

    /// Annotate answers with ASN/org/country/CIDR data.
    #[arg(long = "asn")]
    pub asn: bool,

    /// Annotate answers with CDN name / is-CDN-IP.
    #[arg(long = "cdn")]
    pub cdn: bool,

    /// Treat local-hosts-file answers as eligible even without a matching
    /// rcode.
    #[arg(long = "hf", default_value_t = true)]
    pub hosts_file_query: bool,

    /// Only emit hosts whose response code is in this comma-separated list.
    #[arg(long = "rcode", value_delimiter = ',')]
    pub rcode: Vec<String>,

    /// Suppress hosts with at least one record of any of these types.
    #[arg(long = "ft", value_delimiter = ',')]
    pub filter_type: Vec<String>,

    /// Only log warnings/errors.
    #[arg(long = "silent")]
    pub silent: bool,

    /// Log at debug level.
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Print a progress line to stderr every 1000 resolved hosts.
    #[arg(long = "stats")]
    pub stats: bool,
}

impl CommandHandler for Cli {
    fn handle(self) -> crate::error::Result<()> {
        crate::commands::run::execute(self)
    }
}
