//! The Runner: owns the Work Set, Rate Limiter, channels, and every
//! collaborator for the duration of one pipeline run, and sequences
//! expansion, resolution, the optional wildcard pass, and output.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};

use crate::asn::{AsnClient, HttpAsnClient, HttpAsnPrefixExpander};
use crate::cdn::StaticRangeCdnClassifier;
use crate::config::Options;
use crate::error::Result;
use crate::input::Expander;
use crate::output::OutputSink;
use crate::resolver::client::HickoryDnsClient;
use crate::resolver::pool::ResolverPool;
use crate::resolver::DnsClient;
use crate::resume::ResumeCoordinator;
use crate::wildcard;
use crate::workset::WorkSet;

/// The output-channel capacity; bounded so a slow sink applies backpressure
/// to resolver workers instead of buffering every answer in memory.
const OUTPUT_CHANNEL_CAPACITY: usize = 1024;

pub struct Runner {
    options: Arc<Options>,
    dns: Arc<dyn DnsClient>,
    asn_client: Option<Arc<dyn AsnClient>>,
    resume: ResumeCoordinator,
}

impl Runner {
    pub fn new(options: Options) -> Result<Self> {
        let cdn = Box::new(StaticRangeCdnClassifier::new());
        let dns: Arc<dyn DnsClient> = Arc::new(HickoryDnsClient::new(
            &options.resolvers,
            options.retries,
            options.hosts_file_query,
            cdn,
        )?);
        let asn_client: Option<Arc<dyn AsnClient>> = if options.asn {
            Some(Arc::new(HttpAsnClient::new()))
        } else {
            None
        };
        let resume = ResumeCoordinator::new(ResumeCoordinator::default_path());

        Ok(Self {
            options: Arc::new(options),
            dns,
            asn_client,
            resume,
        })
    }

    /// Runs the full pipeline: expansion, resolution, optional wildcard
    /// filtering, and output. Returns once the sink has drained and (unless
    /// streaming) the final resume state has been saved.
    pub async fn run(self) -> Result<()> {
        let options = self.options.clone();

        // `-stream` bypasses the persistent Work Set and resume support in
        // favor of a throwaway in-memory one; otherwise hosts spill to a
        // scratch file so large inputs don't have to fit in memory.
        let mut work_set = if options.stream {
            WorkSet::in_memory()
        } else {
            let path = std::env::temp_dir().join(format!("dnsweep-workset-{}.bin", std::process::id()));
            WorkSet::on_disk(path)?
        };

        let wordlist = match &options.wordlist {
            Some(path) => Some(crate::input::load_wordlist(path)?),
            None => None,
        };
        let asn_expander = HttpAsnPrefixExpander::new();
        let expander = Expander::new(wordlist, Some(&asn_expander));
        let stats = expander.expand_into(&options.input, &mut work_set).await?;
        log::info!("expanded input into {} unique hosts", stats.unique_hosts);

        let resume_path = ResumeCoordinator::default_path();
        let start_index = ResumeCoordinator::load_if_resuming(&resume_path, options.resume).unwrap_or(0);

        let rate_limiter = Arc::new(crate::ratelimiter::RateLimiter::from_config(options.rate_per_second));
        let pool = ResolverPool::new(self.dns.clone(), self.asn_client.clone(), rate_limiter, options.clone());

        let (output_tx, output_rx) = mpsc::channel(OUTPUT_CHANNEL_CAPACITY);
        let sink = OutputSink::new(&options)?;
        let sink_handle = tokio::spawn(sink.run(output_rx));

        let work_set = Arc::new(Mutex::new(work_set));
        let wildcard_enabled = options.wildcard_filtering_enabled();

        let resume = Arc::new(self.resume);
        spawn_resume_signal_handler(resume.clone());

        let entries = work_set.lock().await.scan();
        let total = entries.len();
        let (work_tx, work_rx) = mpsc::channel::<String>(options.threads.max(1) * 4);

        let worker_handles = pool.spawn(work_rx, output_tx.clone(), wildcard_enabled.then(|| work_set.clone()));

        feed_scan(entries, start_index, &resume, work_tx).await;

        for handle in worker_handles {
            let _ = handle.await;
        }

        if wildcard_enabled {
            let (root_set, suppressed) = wildcard::run(&work_set, &self.dns, &options).await;
            log::info!("wildcard pass suppressed {suppressed} of {total} hosts");
            wildcard::reemit(&work_set, &root_set, &options, &output_tx).await;
        }

        drop(output_tx);
        let _ = sink_handle.await;

        if !options.stream {
            if let Err(e) = resume.save() {
                log::warn!("failed to persist resume state: {e}");
            }
        }

        Ok(())
    }
}

/// Before each host is pushed from the Work Set scan onto the worker
/// channel, update (current-index, current-host). `start_index`
/// fast-forwards past a prior resume cursor.
async fn feed_scan(
    entries: Vec<(String, Option<Vec<u8>>)>,
    start_index: usize,
    resume: &ResumeCoordinator,
    work_tx: mpsc::Sender<String>,
) {
    for (index, (host, _)) in entries.into_iter().enumerate() {
        if index < start_index {
            continue;
        }
        resume.advance(index, &host);
        if work_tx.send(host).await.is_err() {
            break;
        }
    }
}

/// Installs a best-effort Ctrl-C handler that persists the resume cursor
/// before exiting; a failure to install one is logged, not fatal, since
/// the rest of the pipeline still runs to completion and saves on exit
/// regardless.
fn spawn_resume_signal_handler(resume: Arc<ResumeCoordinator>) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            if let Err(e) = resume.save() {
                log::warn!("failed to persist resume state on interrupt: {e}");
            }
            std::process::exit(130);
        }
    });
}
