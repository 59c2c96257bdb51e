//! Validated pipeline configuration. `commands::base::Cli` is the raw clap
//! surface; [`Options`] is what the [`crate::runner::Runner`] actually
//! consumes, built once via [`Options::build`] so every `ConfigError` is
//! raised before a single worker starts.

use std::path::PathBuf;

use crate::error::{Result, RunnerError};
use crate::types::{QuestionType, QuestionTypeSet, ResponseCode};

#[derive(Debug, Clone)]
pub enum InputSource {
    File(PathBuf),
    Stdin,
    Inline(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Raw,
    /// `-resp`: `host [TYPE] [record]`.
    WithType,
    /// `-resp-only`: bare record only.
    RecordOnly,
    /// Neither `-resp` nor `-resp-only`: bare host, once per host.
    HostOnly,
    /// `-rcode` without any of the above: `host [RCODE]`.
    ResponseCode,
}

#[derive(Debug, Clone)]
pub struct Options {
    pub input: InputSource,
    pub wordlist: Option<PathBuf>,
    pub resolvers: Vec<String>,
    pub question_types: QuestionTypeSet,
    pub threads: usize,
    pub rate_per_second: Option<u32>,
    pub retries: u32,

    pub resume: bool,
    pub stream: bool,

    pub wildcard_domain: Option<String>,
    pub wildcard_threshold: usize,

    pub output_format: OutputFormat,
    pub output_file: Option<PathBuf>,

    pub trace: bool,
    pub axfr: bool,
    pub asn: bool,
    pub cdn: bool,
    pub hosts_file_query: bool,

    pub rcode_allowlist: Vec<ResponseCode>,
    pub response_type_filter: QuestionTypeSet,

    pub silent: bool,
    pub verbose: bool,
    pub stats_every: Option<u64>,

    /// True when AXFR was requested and no other record type was explicitly
    /// asked for, so `question_types` only holds the `{A}` default by
    /// fallback rather than by request. An empty transfer is discarded in
    /// this case unless the output format is JSON.
    pub only_axfr: bool,
}

impl Options {
    pub fn wildcard_filtering_enabled(&self) -> bool {
        self.wildcard_domain.is_some()
    }

    pub fn build(cli: &crate::commands::base::Cli) -> Result<Self> {
        let input = match (&cli.list, cli.domain.is_empty()) {
            (Some(path), _) => InputSource::File(path.clone()),
            (None, false) => InputSource::Inline(cli.domain.join(",")),
            (None, true) => {
                if atty_is_stdin_piped() {
                    InputSource::Stdin
                } else {
                    return Err(RunnerError::config_error(
                        "no input provided: pass -l <file>, inline domains, or pipe to stdin",
                    ));
                }
            }
        };

        if cli.resume && cli.stream {
            return Err(RunnerError::config_error(
                "-resume and -stream are mutually exclusive: -stream bypasses the persistent work set that resume relies on",
            ));
        }

        if cli.threads == 0 {
            return Err(RunnerError::config_error("-t/--threads must be at least 1"));
        }

        let mut question_types = QuestionTypeSet::empty();
        for (enabled, t) in [
            (cli.a, QuestionType::A),
            (cli.aaaa, QuestionType::AAAA),
            (cli.cname, QuestionType::CNAME),
            (cli.ptr, QuestionType::PTR),
            (cli.soa, QuestionType::SOA),
            (cli.any, QuestionType::ANY),
            (cli.txt, QuestionType::TXT),
            (cli.srv, QuestionType::SRV),
            (cli.mx, QuestionType::MX),
            (cli.ns, QuestionType::NS),
            (cli.caa, QuestionType::CAA),
        ] {
            if enabled {
                question_types.insert(t);
            }
        }
        let explicit_types_requested = cli.a
            || cli.aaaa
            || cli.cname
            || cli.ptr
            || cli.soa
            || cli.any
            || cli.txt
            || cli.srv
            || cli.mx
            || cli.ns
            || cli.caa;
        let only_axfr = cli.axfr && !explicit_types_requested;

        let question_types = question_types.normalized(cli.wildcard_domain.is_some());

        let output_format = if cli.json {
            OutputFormat::Json
        } else if cli.raw {
            OutputFormat::Raw
        } else if cli.resp {
            OutputFormat::WithType
        } else if cli.resp_only {
            OutputFormat::RecordOnly
        } else if !cli.rcode.is_empty() {
            OutputFormat::ResponseCode
        } else {
            OutputFormat::HostOnly
        };

        let rcode_allowlist = cli
            .rcode
            .iter()
            .map(|s| parse_rcode(s))
            .collect::<Result<Vec<_>>>()?;

        let response_type_filter = cli
            .filter_type
            .iter()
            .map(|s| parse_question_type(s))
            .collect::<Result<QuestionTypeSet>>()?;

        let resolvers = match &cli.resolvers {
            Some(raw) => raw.split(',').map(|s| s.trim().to_string()).collect(),
            None => Vec::new(),
        };

        Ok(Options {
            input,
            wordlist: cli.wordlist.clone(),
            resolvers,
            question_types,
            threads: cli.threads,
            rate_per_second: cli.rate_limit,
            retries: cli.retries,
            resume: cli.resume,
            stream: cli.stream,
            wildcard_domain: cli.wildcard_domain.clone(),
            wildcard_threshold: cli.wildcard_threshold,
            output_format,
            output_file: cli.output.clone(),
            trace: cli.trace,
            axfr: cli.axfr,
            asn: cli.asn,
            cdn: cli.cdn,
            hosts_file_query: cli.hosts_file_query,
            rcode_allowlist,
            response_type_filter,
            silent: cli.silent,
            verbose: cli.verbose,
            stats_every: if cli.stats { Some(1000) } else { None },
            only_axfr,
        })
    }
}

fn atty_is_stdin_piped() -> bool {
    use std::io::IsTerminal;
    !std::io::stdin().is_terminal()
}

fn parse_rcode(raw: &str) -> Result<ResponseCode> {
    Ok(match raw.trim().to_ascii_uppercase().as_str() {
        "NOERROR" => ResponseCode::NoError,
        "FORMERR" => ResponseCode::FormErr,
        "SERVFAIL" => ResponseCode::ServFail,
        "NXDOMAIN" => ResponseCode::NxDomain,
        "NOTIMP" => ResponseCode::NotImp,
        "REFUSED" => ResponseCode::Refused,
        "YXDOMAIN" => ResponseCode::YxDomain,
        "YXRRSET" => ResponseCode::YxRrSet,
        "NXRRSET" => ResponseCode::NxRrSet,
        "NOTAUTH" => ResponseCode::NotAuth,
        "NOTZONE" => ResponseCode::NotZone,
        other => {
            return Err(RunnerError::config_error(format!("unknown rcode '{other}'")));
        }
    })
}

fn parse_question_type(raw: &str) -> Result<QuestionType> {
    Ok(match raw.trim().to_ascii_uppercase().as_str() {
        "A" => QuestionType::A,
        "AAAA" => QuestionType::AAAA,
        "CNAME" => QuestionType::CNAME,
        "PTR" => QuestionType::PTR,
        "SOA" => QuestionType::SOA,
        "ANY" => QuestionType::ANY,
        "TXT" => QuestionType::TXT,
        "SRV" => QuestionType::SRV,
        "MX" => QuestionType::MX,
        "NS" => QuestionType::NS,
        "CAA" => QuestionType::CAA,
        other => {
            return Err(RunnerError::config_error(format!("unknown record type '{other}'")));
        }
    })
}
