//! The Resolver Worker Pool: N concurrent workers consuming hosts from the
//! work channel, invoking the [`super::DnsClient`], optionally augmenting
//! with trace/AXFR/ASN/CDN, and either storing the answer into the Work
//! Set (wildcard pass enabled) or forwarding a formatted output record.

use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::asn::AsnClient;
use crate::config::{Options, OutputFormat};
use crate::error::Notice;
use crate::host::Host;
use crate::output::OutputRecord;
use crate::ratelimiter::RateLimiter;
use crate::resolver::DnsClient;
use crate::types::{Answer, AsnDescription, EnrichedAnswer, ALL_QUESTION_TYPES};
use crate::workset::WorkSet;

pub struct ResolverPool {
    dns: Arc<dyn DnsClient>,
    asn_client: Option<Arc<dyn AsnClient>>,
    rate_limiter: Arc<RateLimiter>,
    options: Arc<Options>,
}

impl ResolverPool {
    pub fn new(
        dns: Arc<dyn DnsClient>,
        asn_client: Option<Arc<dyn AsnClient>>,
        rate_limiter: Arc<RateLimiter>,
        options: Arc<Options>,
    ) -> Self {
        Self { dns, asn_client, rate_limiter, options }
    }

    /// Spawns `options.threads` worker tasks consuming from `work_rx`.
    /// Returns their join handles; the caller awaits all of them to learn
    /// the pool has quiesced.
    ///
    /// When `work_set` is `Some`, every answer is written back into the
    /// Work Set instead of being emitted — the wildcard-enabled branch.
    pub fn spawn(
        &self,
        work_rx: mpsc::Receiver<String>,
        output_tx: mpsc::Sender<OutputRecord>,
        work_set: Option<Arc<Mutex<WorkSet>>>,
    ) -> Vec<tokio::task::JoinHandle<()>> {
        let rx = Arc::new(Mutex::new(work_rx));
        let resolved = Arc::new(AtomicUsize::new(0));

        (0..self.options.threads.max(1))
            .map(|_| {
                let rx = rx.clone();
                let dns = self.dns.clone();
                let asn_client = self.asn_client.clone();
                let rate_limiter = self.rate_limiter.clone();
                let options = self.options.clone();
                let output_tx = output_tx.clone();
                let work_set = work_set.clone();
                let resolved = resolved.clone();
                tokio::spawn(async move {
                    loop {
                        let host = {
                            let mut guard = rx.lock().await;
                            guard.recv().await
                        };
                        let Some(host) = host else { break };
                        process_host(
                            &host,
                            dns.as_ref(),
                            asn_client.as_ref(),
                            &rate_limiter,
                            &options,
                            work_set.as_ref(),
                            &output_tx,
                        )
                        .await;
                        report_progress(&options, &resolved);
                    }
                })
            })
            .collect()
    }
}

fn report_progress(options: &Options, resolved: &AtomicUsize) {
    let Some(every) = options.stats_every else { return };
    let n = resolved.fetch_add(1, Ordering::Relaxed) + 1;
    if n % every as usize == 0 {
        log::info!("resolved {n} hosts so far");
    }
}

async fn process_host(
    raw_host: &str,
    dns: &dyn DnsClient,
    asn_client: Option<&Arc<dyn AsnClient>>,
    rate_limiter: &RateLimiter,
    options: &Options,
    work_set: Option<&Arc<Mutex<WorkSet>>>,
    output_tx: &mpsc::Sender<OutputRecord>,
) {
    // Step 1: URL -> host reduction.
    let host = Host::parse(raw_host).map(Host::into_string).unwrap_or_else(|| raw_host.to_string());

    // Step 2: rate-limit token.
    rate_limiter.take().await;

    // Step 3: multi-type query; drop silently on an entirely empty result.
    let answer = match dns.query_multiple(&host, options.question_types).await {
        Ok(Some(answer)) => answer,
        Ok(None) => {
            Notice::QueryEmpty { host: host.clone() }.log();
            return;
        }
        Err(e) => {
            Notice::QueryPartial { host: host.clone(), detail: e.to_string() }.log();
            return;
        }
    };

    // Step 4: response-code allow-list, unless the answer came from the
    // local hosts file.
    if !answer.from_hosts_file
        && !options.rcode_allowlist.is_empty()
        && !options.rcode_allowlist.contains(&answer.response_code)
    {
        return;
    }

    let mut enriched = EnrichedAnswer::bare(answer);

    // Step 5: trace, concatenating raw forms and freeing per-hop raw.
    if options.trace {
        match dns.trace(&host).await {
            Ok(mut trace) => {
                let mut raw_chain = vec![enriched.answer.raw.clone()];
                raw_chain.extend(trace.hops.iter().map(|hop| hop.raw.clone()));
                enriched.answer.raw = raw_chain.join("\n");
                for hop in &mut trace.hops {
                    hop.raw.clear();
                }
                enriched.trace = Some(trace);
            }
            Err(e) => log::debug!("trace failed for {host}: {e}"),
        }
    }

    // Step 6: zone transfer.
    if options.axfr {
        match dns.axfr(&host).await {
            Ok(transfer) => {
                let empty = transfer.records.is_empty();
                if empty && options.only_axfr && options.output_format != OutputFormat::Json {
                    return;
                }
                enriched.zone_transfer = Some(transfer);
            }
            Err(e) => log::debug!("axfr failed for {host}: {e}"),
        }
    }

    // Step 7: CDN classification.
    if options.cdn {
        match dns.cdn_check(&host).await {
            Ok((is_cdn, name)) => {
                enriched.is_cdn_ip = is_cdn;
                enriched.cdn_name = name;
            }
            Err(e) => log::debug!("cdn check failed for {host}: {e}"),
        }
    }

    // Step 8: ASN enrichment.
    if options.asn {
        if let Some(asn_client) = asn_client {
            enriched.asn = enrich_asn(dns, asn_client.as_ref(), &host, &enriched.answer).await;
        }
    }

    // Step 9: dispatch.
    match work_set {
        Some(work_set) => {
            let bytes = enriched.to_bytes();
            let mut guard = work_set.lock().await;
            if let Err(e) = guard.set(&host, bytes) {
                Notice::StoreError { host: host.clone(), detail: e.to_string() }.log();
            }
        }
        None => {
            if response_type_filter_hides(options, &enriched) {
                return;
            }
            let _ = output_tx.send(OutputRecord { host, answer: enriched }).await;
        }
    }
}

/// The non-wildcard dispatch branch: suppress when the response filter is
/// configured and the answer has at least one record of any filtered type.
fn response_type_filter_hides(options: &Options, enriched: &EnrichedAnswer) -> bool {
    !options.response_type_filter.is_empty()
        && ALL_QUESTION_TYPES
            .into_iter()
            .any(|t| options.response_type_filter.contains(t) && !enriched.answer.records.for_type(t).is_empty())
}

/// If the answer carries no A records, perform an extra A lookup; query
/// the ASN client for every resulting IP (and for the host itself when it
/// is a literal IP); fold the responses into one description.
async fn enrich_asn(dns: &dyn DnsClient, asn_client: &dyn AsnClient, host: &str, answer: &Answer) -> Option<AsnDescription> {
    let mut ips: Vec<IpAddr> = answer.records.a.iter().filter_map(|s| s.parse().ok()).collect();
    ips.extend(answer.records.aaaa.iter().filter_map(|s| s.parse().ok()));

    if ips.is_empty() {
        if let Ok(extra) = dns.lookup(host).await {
            ips.extend(extra);
        }
    }

    if let Ok(literal) = host.parse::<IpAddr>() {
        if !ips.contains(&literal) {
            ips.push(literal);
        }
    }

    if ips.is_empty() {
        return None;
    }

    let mut responses = Vec::new();
    for ip in &ips {
        match asn_client.get_data(*ip).await {
            Ok(r) => responses.extend(r),
            Err(e) => log::debug!("asn lookup failed for {ip}: {e}"),
        }
    }

    if responses.is_empty() {
        return None;
    }

    let cidrs = asn_client.get_cidr(&responses);
    crate::asn::fold(&responses, cidrs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InputSource, OutputFormat};
    use crate::types::{QuestionType, QuestionTypeSet, RecordSet, ResponseCode};
    use async_trait::async_trait;
    use std::net::IpAddr;

    fn base_options() -> Options {
        Options {
            input: InputSource::Inline(String::new()),
            wordlist: None,
            resolvers: Vec::new(),
            question_types: QuestionTypeSet::default_a(),
            threads: 1,
            rate_per_second: None,
            retries: 1,
            resume: false,
            stream: true,
            wildcard_domain: None,
            wildcard_threshold: 5,
            output_format: OutputFormat::HostOnly,
            output_file: None,
            trace: false,
            axfr: false,
            asn: false,
            cdn: false,
            hosts_file_query: false,
            rcode_allowlist: Vec::new(),
            response_type_filter: QuestionTypeSet::empty(),
            silent: false,
            verbose: false,
            stats_every: None,
            only_axfr: false,
        }
    }

    struct StubDns {
        rcode: ResponseCode,
    }

    #[async_trait]
    impl DnsClient for StubDns {
        async fn query_multiple(
            &self,
            host: &str,
            _types: QuestionTypeSet,
        ) -> crate::resolver::DnsResult<Option<Answer>> {
            Ok(Some(Answer {
                host: host.to_string(),
                timestamp: chrono::Utc::now(),
                response_code: self.rcode,
                records: RecordSet::default(),
                raw: String::new(),
                from_hosts_file: false,
            }))
        }

        async fn trace(&self, _host: &str) -> crate::resolver::DnsResult<crate::types::TraceData> {
            Ok(crate::types::TraceData::default())
        }

        async fn axfr(&self, _host: &str) -> crate::resolver::DnsResult<crate::types::TransferData> {
            Ok(crate::types::TransferData::default())
        }

        async fn lookup(&self, _host: &str) -> crate::resolver::DnsResult<Vec<IpAddr>> {
            Ok(Vec::new())
        }

        async fn cdn_check(&self, _host: &str) -> crate::resolver::DnsResult<(bool, Option<String>)> {
            Ok((false, None))
        }
    }

    #[tokio::test]
    async fn rcode_filter_suppresses_non_matching_hosts() {
        let mut options = base_options();
        options.rcode_allowlist = vec![ResponseCode::NxDomain];
        let options = Arc::new(options);

        let (output_tx, mut output_rx) = mpsc::channel(4);
        let rate_limiter = RateLimiter::unlimited();

        process_host(
            "a.test",
            &StubDns { rcode: ResponseCode::NoError },
            None,
            &rate_limiter,
            &options,
            None,
            &output_tx,
        )
        .await;
        process_host(
            "b.test",
            &StubDns { rcode: ResponseCode::NxDomain },
            None,
            &rate_limiter,
            &options,
            None,
            &output_tx,
        )
        .await;
        drop(output_tx);

        let mut emitted = Vec::new();
        while let Some(record) = output_rx.recv().await {
            emitted.push(record.host);
        }
        assert_eq!(emitted, vec!["b.test".to_string()]);
    }

    #[tokio::test]
    async fn response_type_filter_hides_matching_types() {
        let mut options = base_options();
        options.response_type_filter = {
            let mut set = QuestionTypeSet::empty();
            set.insert(QuestionType::A);
            set
        };
        let enriched = EnrichedAnswer::bare(Answer {
            host: "a.test".into(),
            timestamp: chrono::Utc::now(),
            response_code: ResponseCode::NoError,
            records: RecordSet { a: vec!["1.1.1.1".into()], ..Default::default() },
            raw: String::new(),
            from_hosts_file: false,
        });
        assert!(response_type_filter_hides(&options, &enriched));
    }
}
