//! Input Expander: normalizes and expands each raw input token (literal
//! host, CIDR, ASN, `FUZZ` pattern, or bare-host + wordlist cross-product)
//! into concrete hostnames, deduplicating them into the Work Set.

use std::io::{BufRead, BufReader, Read, Write};
use std::path::Path;

use ipnet::IpNet;

use crate::asn::AsnPrefixExpander;
use crate::config::InputSource;
use crate::error::{Result, RunnerError};
use crate::host::Host;
use crate::workset::WorkSet;

const FUZZ_TOKEN: &str = "FUZZ";

/// Statistics reported after expansion completes.
#[derive(Debug, Default)]
pub struct ExpansionStats {
    pub unique_hosts: usize,
}

pub struct Expander<'a> {
    wordlist: Option<Vec<String>>,
    asn_expander: Option<&'a dyn AsnPrefixExpander>,
}

impl<'a> Expander<'a> {
    pub fn new(wordlist: Option<Vec<String>>, asn_expander: Option<&'a dyn AsnPrefixExpander>) -> Self {
        Self { wordlist, asn_expander }
    }

    /// Reads `source`, expands every line, and inserts each resulting host
    /// into `work_set` via insert-if-absent. Duplicate hosts are counted
    /// once.
    pub async fn expand_into(&self, source: &InputSource, work_set: &mut WorkSet) -> Result<ExpansionStats> {
        let lines = read_lines(source)?;
        let mut unique = 0usize;
        for raw_line in lines {
            let line = raw_line.trim();
            if line.is_empty() {
                continue;
            }
            for host in self.expand_line(line).await? {
                if work_set.put_if_absent(host.as_str()) {
                    unique += 1;
                }
            }
        }
        log::info!("input expansion produced {unique} unique hosts");
        Ok(ExpansionStats { unique_hosts: unique })
    }

    async fn expand_line(&self, line: &str) -> Result<Vec<Host>> {
        if let Ok(net) = line.parse::<IpNet>() {
            return Ok(expand_cidr(net));
        }

        if let Some(asn) = parse_asn(line) {
            return self.expand_asn(asn).await;
        }

        if line.contains(FUZZ_TOKEN) {
            return Ok(self.expand_fuzz(line));
        }

        if let Some(wordlist) = &self.wordlist {
            return Ok(wordlist
                .iter()
                .filter_map(|w| Host::parse(&format!("{w}.{line}")))
                .collect());
        }

        Ok(Host::parse(line).into_iter().collect())
    }

    fn expand_fuzz(&self, pattern: &str) -> Vec<Host> {
        let Some(wordlist) = &self.wordlist else {
            return Host::parse(pattern).into_iter().collect();
        };
        wordlist
            .iter()
            .filter_map(|w| Host::parse(&pattern.replace(FUZZ_TOKEN, w)))
            .collect()
    }

    async fn expand_asn(&self, asn: u32) -> Result<Vec<Host>> {
        let Some(expander) = self.asn_expander else {
            return Err(RunnerError::config_error(format!(
                "AS{asn} given but no ASN expansion collaborator is configured"
            )));
        };
        let prefixes = expander.announced_prefixes(asn).await?;
        Ok(prefixes.into_iter().flat_map(expand_cidr).collect())
    }
}

/// Parses `AS15169`-style tokens (case-insensitive).
fn parse_asn(line: &str) -> Option<u32> {
    let rest = line.strip_prefix("AS").or_else(|| line.strip_prefix("as"))?;
    rest.parse::<u32>().ok()
}

/// Enumerates usable host addresses in `net`, excluding the network and
/// broadcast addresses (`192.0.2.0/30` -> `{.1, .2}`).
fn expand_cidr(net: IpNet) -> Vec<Host> {
    match net {
        IpNet::V4(v4) => v4.hosts().filter_map(|ip| Host::parse(&ip.to_string())).collect(),
        IpNet::V6(v6) => v6.hosts().filter_map(|ip| Host::parse(&ip.to_string())).collect(),
    }
}

/// Loads a wordlist file: one non-empty, trimmed word per line.
pub fn load_wordlist(path: &Path) -> Result<Vec<String>> {
    let contents = std::fs::read_to_string(path).map_err(|e| RunnerError::input_read_error(&e))?;
    Ok(contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect())
}

fn read_lines(source: &InputSource) -> Result<Vec<String>> {
    match source {
        InputSource::File(path) => read_file_lines(path),
        InputSource::Inline(raw) => Ok(raw.split(',').map(|s| s.trim().to_string()).collect()),
        InputSource::Stdin => read_stdin_via_scratch_file(),
    }
}

fn read_file_lines(path: &Path) -> Result<Vec<String>> {
    let file = std::fs::File::open(path).map_err(|e| RunnerError::input_read_error(&e))?;
    BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| RunnerError::input_read_error(&e))
}

/// Copies stdin to a scratch file so it can be re-read.
fn read_stdin_via_scratch_file() -> Result<Vec<String>> {
    let mut buf = Vec::new();
    std::io::stdin()
        .read_to_end(&mut buf)
        .map_err(|e| RunnerError::input_read_error(&e))?;

    let scratch = std::env::temp_dir().join(format!("dnsweep-stdin-{}.txt", std::process::id()));
    let mut file = std::fs::File::create(&scratch).map_err(|e| RunnerError::input_read_error(&e))?;
    file.write_all(&buf).map_err(|e| RunnerError::input_read_error(&e))?;
    read_file_lines(&scratch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct NoAsn;
    #[async_trait]
    impl AsnPrefixExpander for NoAsn {
        async fn announced_prefixes(&self, _asn: u32) -> Result<Vec<IpNet>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn cidr_expansion_excludes_network_and_broadcast() {
        let expander = Expander::new(None, None);
        let hosts = expander.expand_line("192.0.2.0/30").await.unwrap();
        let strs: Vec<_> = hosts.iter().map(Host::as_str).collect();
        assert_eq!(strs, vec!["192.0.2.1", "192.0.2.2"]);
    }

    #[tokio::test]
    async fn fuzz_pattern_cross_products_wordlist() {
        let expander = Expander::new(Some(vec!["a".into(), "b".into(), "c".into()]), None);
        let hosts = expander.expand_line("FUZZ.example.com").await.unwrap();
        let strs: Vec<_> = hosts.iter().map(Host::as_str).collect();
        assert_eq!(strs, vec!["a.example.com", "b.example.com", "c.example.com"]);
    }

    #[tokio::test]
    async fn bare_host_with_wordlist_cross_products() {
        let expander = Expander::new(Some(vec!["www".into(), "api".into()]), None);
        let hosts = expander.expand_line("example.com").await.unwrap();
        let strs: Vec<_> = hosts.iter().map(Host::as_str).collect();
        assert_eq!(strs, vec!["www.example.com", "api.example.com"]);
    }

    #[tokio::test]
    async fn bare_host_without_wordlist_passes_through() {
        let expander = Expander::new(None, None);
        let hosts = expander.expand_line("example.com").await.unwrap();
        let strs: Vec<_> = hosts.iter().map(Host::as_str).collect();
        assert_eq!(strs, vec!["example.com"]);
    }

    #[tokio::test]
    async fn asn_without_collaborator_errors() {
        let expander = Expander::new(None, None);
        assert!(expander.expand_line("AS15169").await.is_err());
    }

    #[tokio::test]
    async fn asn_with_collaborator_returns_empty_for_no_prefixes() {
        let no_asn = NoAsn;
        let expander = Expander::new(None, Some(&no_asn));
        let hosts = expander.expand_line("AS15169").await.unwrap();
        assert!(hosts.is_empty());
    }

    #[tokio::test]
    async fn expand_into_deduplicates_across_lines() {
        let expander = Expander::new(None, None);
        let mut ws = WorkSet::in_memory();
        let stats = expander
            .expand_into(&InputSource::Inline("a.example.com,a.example.com,b.example.com".into()), &mut ws)
            .await
            .unwrap();
        assert_eq!(stats.unique_hosts, 2);
        assert_eq!(ws.len(), 2);
    }
}
