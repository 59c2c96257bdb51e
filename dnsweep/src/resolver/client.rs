//! `HickoryDnsClient`: the default [`super::DnsClient`] implementation,
//! built on `hickory-resolver`/`hickory-proto`.

use std::collections::BTreeMap;
use std::fs;
use std::net::{IpAddr, SocketAddr};

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RData, RecordType};
use hickory_resolver::config::{NameServerConfig, ResolverConfig, ResolverOpts};
use hickory_resolver::name_server::TokioConnectionProvider;
use hickory_resolver::Resolver;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use super::{DnsClient, DnsQueryError, DnsResult};
use crate::cdn::CdnClassifier;
use crate::types::{Answer, QuestionType, QuestionTypeSet, RecordSet, ResponseCode, SoaRecord, TraceData, TraceHop, TransferData};

type TokioResolver = Resolver<TokioConnectionProvider>;

pub struct HickoryDnsClient {
    resolver: TokioResolver,
    resolver_addrs: Vec<SocketAddr>,
    hosts_file: HostsFile,
    hosts_file_enabled: bool,
    cdn: Box<dyn CdnClassifier>,
}

impl HickoryDnsClient {
    pub fn new(resolvers: &[String], retries: u32, hosts_file_enabled: bool, cdn: Box<dyn CdnClassifier>) -> crate::error::Result<Self> {
        let mut opts = ResolverOpts::default();
        opts.attempts = retries as usize;
        opts.use_hosts_file = if hosts_file_enabled {
            hickory_resolver::config::ResolveHosts::Always
        } else {
            hickory_resolver::config::ResolveHosts::Never
        };

        let mut resolver_addrs = Vec::new();
        let config = if resolvers.is_empty() {
            ResolverConfig::default()
        } else {
            let mut config = ResolverConfig::new();
            for raw in resolvers {
                let addr: SocketAddr = if raw.contains(':') {
                    raw.parse().map_err(|e| {
                        crate::error::RunnerError::resolver_init_error(format!("invalid resolver '{raw}': {e}"))
                    })?
                } else {
                    format!("{raw}:53").parse().map_err(|e| {
                        crate::error::RunnerError::resolver_init_error(format!("invalid resolver '{raw}': {e}"))
                    })?
                };
                resolver_addrs.push(addr);
                config.add_name_server(NameServerConfig::new(addr, hickory_proto::xfer::Protocol::Udp));
            }
            config
        };

        let resolver = Resolver::builder_with_config(config, TokioConnectionProvider::default())
            .with_options(opts)
            .build();

        Ok(Self {
            resolver,
            resolver_addrs,
            hosts_file: HostsFile::load(),
            hosts_file_enabled,
            cdn,
        })
    }

    fn resolver_socket_addr(&self) -> Option<SocketAddr> {
        self.resolver_addrs.first().copied()
    }

    async fn query_one(&self, name: &Name, record_type: RecordType, records: &mut RecordSet) -> (bool, Option<ResponseCode>) {
        match self.resolver.lookup(name.clone(), record_type).await {
            Ok(lookup) => {
                let mut got_any = false;
                for record in lookup.record_iter() {
                    if let Some(rdata) = record.data() {
                        extract_into(records, rdata);
                        got_any = true;
                    }
                }
                (got_any, Some(ResponseCode::NoError))
            }
            Err(err) => (false, rcode_from_error(&err)),
        }
    }
}

#[async_trait]
impl DnsClient for HickoryDnsClient {
    async fn query_multiple(&self, host: &str, types: QuestionTypeSet) -> DnsResult<Option<Answer>> {
        if self.hosts_file_enabled {
            if let Some(ips) = self.hosts_file.lookup(host) {
                let mut records = RecordSet::default();
                for ip in ips {
                    match ip {
                        IpAddr::V4(v4) => records.a.push(v4.to_string()),
                        IpAddr::V6(v6) => records.aaaa.push(v6.to_string()),
                    }
                }
                return Ok(Some(Answer {
                    host: host.to_string(),
                    timestamp: chrono::Utc::now(),
                    response_code: ResponseCode::NoError,
                    raw: format!("; {host} answer from /etc/hosts"),
                    records,
                    from_hosts_file: true,
                }));
            }
        }

        let name = Name::from_ascii(host).map_err(|e| DnsQueryError {
            message: format!("invalid name {host}: {e}"),
            response_code: None,
        })?;

        let mut wire_types: Vec<QuestionType> = types.iter().collect();
        if types.contains(QuestionType::ANY) {
            wire_types = crate::types::ALL_QUESTION_TYPES
                .into_iter()
                .filter(|t| *t != QuestionType::ANY)
                .collect();
        }

        let mut records = RecordSet::default();
        let mut any_data = false;
        let mut response_code = None;
        for qtype in wire_types {
            let (got, code) = self.query_one(&name, record_type_for(qtype), &mut records).await;
            any_data |= got;
            if let Some(code) = code {
                response_code = Some(code);
            }
        }

        if !any_data && records.is_empty() {
            return Ok(None);
        }

        Ok(Some(Answer {
            host: host.to_string(),
            timestamp: chrono::Utc::now(),
            response_code: response_code.unwrap_or(ResponseCode::NoError),
            raw: render_raw(host, &records),
            records,
            from_hosts_file: false,
        }))
    }

    async fn trace(&self, host: &str) -> DnsResult<TraceData> {
        let name = Name::from_ascii(host).map_err(|e| DnsQueryError {
            message: format!("invalid name {host}: {e}"),
            response_code: None,
        })?;

        // A full root-to-authority trace would require driving the
        // resolution ourselves hop by hop; this records the single hop our
        // configured resolver itself took.
        match self.resolver.lookup(name, RecordType::A).await {
            Ok(lookup) => {
                let raw = lookup
                    .record_iter()
                    .filter_map(|r| r.data().map(|d| d.to_string()))
                    .collect::<Vec<_>>()
                    .join("\n");
                Ok(TraceData {
                    hops: vec![TraceHop {
                        server: self
                            .resolver_socket_addr()
                            .map(|a| a.to_string())
                            .unwrap_or_else(|| "system-default".to_string()),
                        raw,
                    }],
                })
            }
            Err(err) => Err(DnsQueryError {
                message: err.to_string(),
                response_code: rcode_from_error(&err),
            }),
        }
    }

    async fn axfr(&self, host: &str) -> DnsResult<TransferData> {
        let addr = self.resolver_socket_addr().ok_or_else(|| DnsQueryError {
            message: "axfr requires at least one configured resolver".to_string(),
            response_code: None,
        })?;

        let name = Name::from_ascii(host).map_err(|e| DnsQueryError {
            message: format!("invalid name {host}: {e}"),
            response_code: None,
        })?;

        let mut message = Message::new();
        message.set_id(rand::random());
        message.set_message_type(MessageType::Query);
        message.set_op_code(OpCode::Query);
        let mut query = Query::new();
        query.set_name(name);
        query.set_query_type(RecordType::AXFR);
        message.add_query(query);

        let bytes = message.to_vec().map_err(|e| DnsQueryError {
            message: format!("axfr encode failed: {e}"),
            response_code: None,
        })?;

        let mut stream = TcpStream::connect(addr).await.map_err(|e| DnsQueryError {
            message: format!("axfr connect failed: {e}"),
            response_code: None,
        })?;
        stream
            .write_all(&(bytes.len() as u16).to_be_bytes())
            .await
            .map_err(io_err)?;
        stream.write_all(&bytes).await.map_err(io_err)?;

        let mut records = Vec::new();
        let mut raw = String::new();
        let mut soa_seen = 0u32;
        loop {
            let mut len_buf = [0u8; 2];
            stream.read_exact(&mut len_buf).await.map_err(io_err)?;
            let resp_len = u16::from_be_bytes(len_buf) as usize;
            let mut buf = vec![0u8; resp_len];
            stream.read_exact(&mut buf).await.map_err(io_err)?;
            let resp = Message::from_vec(&buf).map_err(|e| DnsQueryError {
                message: format!("axfr decode failed: {e}"),
                response_code: None,
            })?;

            for answer in resp.answers() {
                let text = answer
                    .data()
                    .map(|d| format!("{} {} {}", answer.name(), answer.record_type(), d))
                    .unwrap_or_default();
                raw.push_str(&text);
                raw.push('\n');
                records.push(text);
                if answer.record_type() == RecordType::SOA {
                    soa_seen += 1;
                }
            }

            if soa_seen >= 2 || resp.answer_count() == 0 {
                break;
            }
        }

        Ok(TransferData { records, raw })
    }

    async fn lookup(&self, host: &str) -> DnsResult<Vec<IpAddr>> {
        self.resolver
            .lookup_ip(host)
            .await
            .map(|lookup| lookup.iter().collect())
            .map_err(|e| DnsQueryError {
                message: e.to_string(),
                response_code: rcode_from_error(&e),
            })
    }

    async fn cdn_check(&self, host: &str) -> DnsResult<(bool, Option<String>)> {
        Ok(self.cdn.classify(host))
    }
}

fn io_err(e: std::io::Error) -> DnsQueryError {
    DnsQueryError {
        message: e.to_string(),
        response_code: None,
    }
}

fn record_type_for(t: QuestionType) -> RecordType {
    match t {
        QuestionType::A => RecordType::A,
        QuestionType::AAAA => RecordType::AAAA,
        QuestionType::CNAME => RecordType::CNAME,
        QuestionType::PTR => RecordType::PTR,
        QuestionType::SOA => RecordType::SOA,
        QuestionType::ANY => RecordType::ANY,
        QuestionType::TXT => RecordType::TXT,
        QuestionType::SRV => RecordType::SRV,
        QuestionType::MX => RecordType::MX,
        QuestionType::NS => RecordType::NS,
        QuestionType::CAA => RecordType::CAA,
    }
}

fn extract_into(records: &mut RecordSet, rdata: &RData) {
    match rdata {
        RData::A(ip) => records.a.push(ip.to_string()),
        RData::AAAA(ip) => records.aaaa.push(ip.to_string()),
        RData::CNAME(name) => records.cname.push(name.to_string()),
        RData::PTR(name) => records.ptr.push(name.to_string()),
        RData::NS(name) => records.ns.push(name.to_string()),
        RData::MX(mx) => records.mx.push(format!("{} {}", mx.preference(), mx.exchange())),
        RData::TXT(txt) => records.txt.push(txt.to_string()),
        RData::SRV(srv) => records
            .srv
            .push(format!("{} {} {} {}", srv.priority(), srv.weight(), srv.port(), srv.target())),
        RData::CAA(caa) => records.caa.push(caa.to_string()),
        RData::SOA(soa) => records.soa.push(SoaRecord {
            mname: soa.mname().to_string(),
            rname: soa.rname().to_string(),
        }),
        _ => {}
    }
}

fn render_raw(host: &str, records: &RecordSet) -> String {
    let mut lines = vec![format!("; answer for {host}")];
    for qtype in crate::types::ALL_QUESTION_TYPES {
        for record in records.for_type(qtype) {
            lines.push(format!("{host} IN {qtype} {record}"));
        }
    }
    lines.join("\n")
}

fn rcode_from_error(err: &hickory_resolver::ResolveError) -> Option<ResponseCode> {
    use hickory_resolver::ResolveErrorKind;
    match err.kind() {
        ResolveErrorKind::NoRecordsFound { response_code, .. } => Some((*response_code).into()),
        _ => None,
    }
}

/// A minimal `/etc/hosts` reader, so answers served from the local hosts
/// file can be distinguished from real upstream queries.
struct HostsFile {
    entries: BTreeMap<String, Vec<IpAddr>>,
}

impl HostsFile {
    fn load() -> Self {
        let mut entries: BTreeMap<String, Vec<IpAddr>> = BTreeMap::new();
        let path = if cfg!(windows) {
            r"C:\Windows\System32\drivers\etc\hosts".to_string()
        } else {
            "/etc/hosts".to_string()
        };
        if let Ok(contents) = fs::read_to_string(path) {
            for line in contents.lines() {
                let line = line.split('#').next().unwrap_or("").trim();
                if line.is_empty() {
                    continue;
                }
                let mut parts = line.split_whitespace();
                let Some(ip_str) = parts.next() else { continue };
                let Ok(ip) = ip_str.parse::<IpAddr>() else { continue };
                for name in parts {
                    entries.entry(name.to_lowercase()).or_default().push(ip);
                }
            }
        }
        Self { entries }
    }

    fn lookup(&self, host: &str) -> Option<Vec<IpAddr>> {
        self.entries.get(host).cloned()
    }
}
