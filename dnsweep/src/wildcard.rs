//! The Wildcard Filter: after the first resolver pass, groups hosts by
//! answer IP, probes random non-existent siblings along each candidate's
//! label chain, and marks hosts whose answer IPs are a subset of what
//! those probes returned as synthetic wildcard responses.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::sync::{mpsc, Mutex};

use crate::config::Options;
use crate::output::OutputRecord;
use crate::resolver::DnsClient;
use crate::types::EnrichedAnswer;
use crate::workset::WorkSet;

/// Maps a parent label to the sorted list of answer IPs seen when probing
/// a random non-existent sibling at that level.
#[derive(Default)]
pub struct WildcardCache {
    probes: Mutex<HashMap<String, Vec<String>>>,
}

impl WildcardCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached probe answer for `parent`, probing and caching it
    /// first if this is the first time `parent` has been seen.
    async fn probe_or_cached(&self, parent: &str, dns: &dyn DnsClient) -> Vec<String> {
        if let Some(cached) = self.probes.lock().await.get(parent).cloned() {
            return cached;
        }

        let probe_host = format!("{}.{}", random_label(), parent);
        let mut ips = match dns.lookup(&probe_host).await {
            Ok(ips) => ips.into_iter().map(|ip| ip.to_string()).collect::<Vec<_>>(),
            Err(_) => Vec::new(),
        };
        ips.sort();
        ips.dedup();

        self.probes.lock().await.insert(parent.to_string(), ips.clone());
        ips
    }
}

fn random_label() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(12).map(char::from).collect::<String>().to_lowercase()
}

/// The set of hosts proven to be wildcard subdomains; written only by the
/// wildcard pass, read-only thereafter.
#[derive(Default)]
pub struct WildcardRootSet {
    hosts: Mutex<HashSet<String>>,
}

impl WildcardRootSet {
    pub fn new() -> Self {
        Self::default()
    }

    async fn mark(&self, host: &str) {
        self.hosts.lock().await.insert(host.to_string());
    }

    async fn contains(&self, host: &str) -> bool {
        self.hosts.lock().await.contains(host)
    }

    pub async fn len(&self) -> usize {
        self.hosts.lock().await.len()
    }
}

/// Non-leaf parent suffixes of `host`, longest to shortest, excluding the
/// root zone. `x1.wild.example.com` yields
/// `["wild.example.com", "example.com"]`.
fn parent_suffixes(host: &str) -> Vec<String> {
    let labels: Vec<&str> = host.split('.').collect();
    if labels.len() < 2 {
        return Vec::new();
    }
    (1..labels.len() - 1).map(|i| labels[i..].join(".")).collect()
}

/// The label-walk test: `true` if every IP in `host`'s own answer is
/// covered by the union of probe answers seen walking up its ancestor
/// chain.
async fn is_wildcard(host: &str, answer_ips: &[String], cache: &WildcardCache, dns: &dyn DnsClient) -> bool {
    if answer_ips.is_empty() {
        return false;
    }

    let mut covered: HashSet<String> = HashSet::new();
    for parent in parent_suffixes(host) {
        let probed = cache.probe_or_cached(&parent, dns).await;
        covered.extend(probed);
    }

    answer_ips.iter().all(|ip| covered.contains(ip))
}

/// Groups the Work Set by answer IP, enqueues candidates from IPs meeting
/// the threshold, and runs the label-walk test over them. Returns the
/// populated [`WildcardRootSet`] and the suppression count.
pub async fn run(
    work_set: &Mutex<WorkSet>,
    dns: &Arc<dyn DnsClient>,
    options: &Options,
) -> (WildcardRootSet, usize) {
    let root_set = WildcardRootSet::new();
    let cache = Arc::new(WildcardCache::new());

    let entries = work_set.lock().await.scan();

    let mut ip_to_hosts: HashMap<String, Vec<String>> = HashMap::new();
    let mut distinct_ips: Vec<String> = Vec::new();
    let mut host_ips: HashMap<String, Vec<String>> = HashMap::new();

    for (host, bytes) in &entries {
        let Some(bytes) = bytes else { continue };
        let Some(enriched) = EnrichedAnswer::from_bytes(bytes) else { continue };
        let ips = enriched.answer.records.a.clone();
        host_ips.insert(host.clone(), ips.clone());
        for ip in ips {
            let bucket = ip_to_hosts.entry(ip.clone()).or_insert_with(|| {
                distinct_ips.push(ip.clone());
                Vec::new()
            });
            bucket.push(host.clone());
        }
    }

    let mut candidates: Vec<String> = Vec::new();
    let mut seen_candidates: HashSet<String> = HashSet::new();
    for ip in &distinct_ips {
        let hosts = &ip_to_hosts[ip];
        if hosts.len() < options.wildcard_threshold {
            continue;
        }
        for host in hosts {
            if seen_candidates.insert(host.clone()) {
                candidates.push(host.clone());
            }
        }
    }

    if candidates.is_empty() {
        return (root_set, 0);
    }

    let host_ips = Arc::new(host_ips);
    let worker_count = options.threads.min(distinct_ips.len()).max(1);
    let (tx, rx) = mpsc::channel::<String>(candidates.len().max(1));
    let rx = Arc::new(Mutex::new(rx));

    for host in &candidates {
        let _ = tx.send(host.clone()).await;
    }
    drop(tx);

    let root_set = Arc::new(root_set);
    let mut handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        let rx = rx.clone();
        let dns = dns.clone();
        let cache = cache.clone();
        let root_set = root_set.clone();
        let host_ips = host_ips.clone();
        handles.push(tokio::spawn(async move {
            loop {
                let host = {
                    let mut guard = rx.lock().await;
                    guard.recv().await
                };
                let Some(host) = host else { break };
                let ips = host_ips.get(&host).cloned().unwrap_or_default();
                if is_wildcard(&host, &ips, &cache, dns.as_ref()).await {
                    root_set.mark(&host).await;
                }
            }
        }));
    }

    for handle in handles {
        let _ = handle.await;
    }

    let root_set = Arc::try_unwrap(root_set).unwrap_or_else(|arc| {
        // Another clone outlived the join; this shouldn't happen since every
        // worker has exited, but degrade to a fresh empty set rather than
        // panic.
        log::debug!("wildcard root set arc had {} outstanding references after join", Arc::strong_count(&arc));
        WildcardRootSet::new()
    });
    let suppressed = root_set.len().await;
    (root_set, suppressed)
}

/// Re-scans the Work Set and emits every host that is either the
/// configured wildcard-domain root, or not in the Wildcard Root Set. Each
/// host emitted at most once, in the scan order `run` established.
pub async fn reemit(
    work_set: &Mutex<WorkSet>,
    root_set: &WildcardRootSet,
    options: &Options,
    output_tx: &mpsc::Sender<OutputRecord>,
) {
    let entries = work_set.lock().await.scan();
    for (host, bytes) in entries {
        let Some(bytes) = bytes else { continue };
        let Some(enriched) = EnrichedAnswer::from_bytes(&bytes) else { continue };

        let is_configured_root = options.wildcard_domain.as_deref() == Some(host.as_str());
        if is_configured_root || !root_set.contains(&host).await {
            let _ = output_tx.send(OutputRecord { host, answer: enriched }).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{InputSource, OutputFormat};
    use crate::types::{Answer, QuestionTypeSet, RecordSet, ResponseCode};
    use async_trait::async_trait;
    use std::net::IpAddr;

    struct StubDns {
        wildcard_ip: &'static str,
    }

    #[async_trait]
    impl DnsClient for StubDns {
        async fn query_multiple(&self, _host: &str, _types: QuestionTypeSet) -> crate::resolver::DnsResult<Option<Answer>> {
            unimplemented!("not exercised by wildcard tests")
        }
        async fn trace(&self, _host: &str) -> crate::resolver::DnsResult<crate::types::TraceData> {
            unimplemented!()
        }
        async fn axfr(&self, _host: &str) -> crate::resolver::DnsResult<crate::types::TransferData> {
            unimplemented!()
        }
        async fn lookup(&self, _host: &str) -> crate::resolver::DnsResult<Vec<IpAddr>> {
            Ok(vec![self.wildcard_ip.parse().unwrap()])
        }
        async fn cdn_check(&self, _host: &str) -> crate::resolver::DnsResult<(bool, Option<String>)> {
            Ok((false, None))
        }
    }

    fn options(threshold: usize) -> Options {
        Options {
            input: InputSource::Inline(String::new()),
            wordlist: None,
            resolvers: Vec::new(),
            question_types: QuestionTypeSet::default_a(),
            threads: 4,
            rate_per_second: None,
            retries: 1,
            resume: false,
            stream: false,
            wildcard_domain: Some("wild.example.com".to_string()),
            wildcard_threshold: threshold,
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

    fn answer_bytes(host: &str, ip: &str) -> Vec<u8> {
        EnrichedAnswer::bare(Answer {
            host: host.to_string(),
            timestamp: chrono::Utc::now(),
            response_code: ResponseCode::NoError,
            records: RecordSet { a: vec![ip.to_string()], ..Default::default() },
            raw: String::new(),
            from_hosts_file: false,
        })
        .to_bytes()
    }

    #[test]
    fn parent_suffixes_walk_longest_to_shortest_excluding_root() {
        let suffixes = parent_suffixes("x1.wild.example.com");
        assert_eq!(suffixes, vec!["wild.example.com".to_string(), "example.com".to_string()]);
    }

    #[test]
    fn short_host_has_no_parent_suffixes() {
        assert!(parent_suffixes("example.com").is_empty());
    }

    #[tokio::test]
    async fn ten_hosts_sharing_an_ip_above_threshold_are_all_suppressed() {
        let work_set = Mutex::new(WorkSet::in_memory());
        {
            let mut ws = work_set.lock().await;
            for i in 1..=10 {
                let host = format!("x{i}.wild.example.com");
                ws.put_if_absent(&host);
                ws.set(&host, answer_bytes(&host, "10.0.0.1")).unwrap();
            }
        }

        let dns: Arc<dyn DnsClient> = Arc::new(StubDns { wildcard_ip: "10.0.0.1" });
        let options = options(5);
        let (root_set, suppressed) = run(&work_set, &dns, &options).await;
        assert_eq!(suppressed, 10);

        let (tx, mut rx) = mpsc::channel(16);
        reemit(&work_set, &root_set, &options, &tx).await;
        drop(tx);
        let mut emitted = Vec::new();
        while let Some(record) = rx.recv().await {
            emitted.push(record.host);
        }
        assert!(emitted.is_empty());
    }

    #[tokio::test]
    async fn below_threshold_hosts_are_not_probed_and_pass_through() {
        let work_set = Mutex::new(WorkSet::in_memory());
        {
            let mut ws = work_set.lock().await;
            for i in 1..=3 {
                let host = format!("x{i}.wild.example.com");
                ws.put_if_absent(&host);
                ws.set(&host, answer_bytes(&host, "10.0.0.2")).unwrap();
            }
        }

        let dns: Arc<dyn DnsClient> = Arc::new(StubDns { wildcard_ip: "10.0.0.2" });
        let options = options(5);
        let (root_set, suppressed) = run(&work_set, &dns, &options).await;
        assert_eq!(suppressed, 0);

        let (tx, mut rx) = mpsc::channel(16);
        reemit(&work_set, &root_set, &options, &tx).await;
        drop(tx);
        let mut emitted = Vec::new();
        while let Some(record) = rx.recv().await {
            emitted.push(record.host);
        }
        assert_eq!(emitted.len(), 3);
    }

    #[tokio::test]
    async fn configured_root_is_always_reemitted() {
        let work_set = Mutex::new(WorkSet::in_memory());
        {
            let mut ws = work_set.lock().await;
            for i in 1..=5 {
                let host = format!("x{i}.wild.example.com");
                ws.put_if_absent(&host);
                ws.set(&host, answer_bytes(&host, "10.0.0.3")).unwrap();
            }
            ws.put_if_absent("wild.example.com");
            ws.set("wild.example.com", answer_bytes("wild.example.com", "10.0.0.3")).unwrap();
        }

        let dns: Arc<dyn DnsClient> = Arc::new(StubDns { wildcard_ip: "10.0.0.3" });
        let options = options(5);
        let (root_set, _) = run(&work_set, &dns, &options).await;

        let (tx, mut rx) = mpsc::channel(16);
        reemit(&work_set, &root_set, &options, &tx).await;
        drop(tx);
        let mut emitted = Vec::new();
        while let Some(record) = rx.recv().await {
            emitted.push(record.host);
        }
        assert_eq!(emitted, vec!["wild.example.com".to_string()]);
    }
}
