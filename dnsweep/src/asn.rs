//! ASN enrichment collaborator (`get_data`/`get_cidr`) and the CIDR/ASN
//! expansion collaborator the Input Expander uses to turn an `AS<n>` token
//! into announced prefixes. Both are external collaborator boundaries;
//! this module gives the contract a concrete HTTP-backed implementation
//! (bgpview.io) rather than leaving it unimplemented.

use std::net::IpAddr;

use async_trait::async_trait;
use ipnet::IpNet;
use serde::Deserialize;

use crate::error::Result;
use crate::types::AsnDescription;

/// One ASN-client response: AS-number, org, and country, carrying the
/// prefix it was matched against so [`AsnClient::get_cidr`] can extract
/// ranges without a second round trip.
#[derive(Debug, Clone)]
pub struct AsnResponse {
    pub as_number: u32,
    pub org: String,
    pub country: String,
    pub cidr: String,
}

/// External collaborator boundary.
#[async_trait]
pub trait AsnClient: Send + Sync {
    async fn get_data(&self, ip: IpAddr) -> Result<Vec<AsnResponse>>;
    fn get_cidr(&self, responses: &[AsnResponse]) -> Vec<String>;
}

/// Folds one or more ASN-client responses into a single [`AsnDescription`]:
/// the first answer's AS number/org/country, with the union of CIDR
/// ranges.
pub fn fold(responses: &[AsnResponse], cidrs: Vec<String>) -> Option<AsnDescription> {
    let first = responses.first()?;
    let mut ranges = cidrs;
    ranges.sort();
    ranges.dedup();
    Some(AsnDescription {
        as_number: first.as_number,
        org: first.org.clone(),
        country: first.country.clone(),
        ranges,
    })
}

#[derive(Deserialize)]
struct BgpViewIpResponse {
    data: BgpViewIpData,
}

#[derive(Deserialize)]
struct BgpViewIpData {
    prefixes: Vec<BgpViewIpPrefix>,
}

#[derive(Deserialize)]
struct BgpViewIpPrefix {
    prefix: String,
    asn: BgpViewAsn,
}

#[derive(Deserialize)]
struct BgpViewAsn {
    asn: u32,
    name: String,
    description: String,
    country_code: String,
}

/// `bgpview.io`-backed [`AsnClient`]: a concrete, working default rather
/// than a stub.
pub struct HttpAsnClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAsnClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://api.bgpview.io".to_string(),
        }
    }
}

impl Default for HttpAsnClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AsnClient for HttpAsnClient {
    async fn get_data(&self, ip: IpAddr) -> Result<Vec<AsnResponse>> {
        let url = format!("{}/ip/{}", self.base_url, ip);
        let body: BgpViewIpResponse = self.http.get(&url).send().await?.json().await?;
        Ok(body
            .data
            .prefixes
            .into_iter()
            .map(|p| AsnResponse {
                as_number: p.asn.asn,
                org: if p.asn.description.is_empty() { p.asn.name } else { p.asn.description },
                country: p.asn.country_code,
                cidr: p.prefix,
            })
            .collect())
    }

    fn get_cidr(&self, responses: &[AsnResponse]) -> Vec<String> {
        responses.iter().map(|r| r.cidr.clone()).collect()
    }
}

#[derive(Deserialize)]
struct BgpViewAsnResponse {
    data: BgpViewAsnData,
}

#[derive(Deserialize)]
struct BgpViewAsnData {
    ipv4_prefixes: Vec<BgpViewPrefixEntry>,
    ipv6_prefixes: Vec<BgpViewPrefixEntry>,
}

#[derive(Deserialize)]
struct BgpViewPrefixEntry {
    prefix: String,
}

/// Resolves an ASN identifier (`AS15169`) to its announced prefixes, for
/// later enumeration into individual addresses.
#[async_trait]
pub trait AsnPrefixExpander: Send + Sync {
    async fn announced_prefixes(&self, asn: u32) -> Result<Vec<IpNet>>;
}

pub struct HttpAsnPrefixExpander {
    http: reqwest::Client,
    base_url: String,
}

impl HttpAsnPrefixExpander {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: "https://api.bgpview.io".to_string(),
        }
    }
}

impl Default for HttpAsnPrefixExpander {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl AsnPrefixExpander for HttpAsnPrefixExpander {
    async fn announced_prefixes(&self, asn: u32) -> Result<Vec<IpNet>> {
        let url = format!("{}/asn/{asn}/prefixes", self.base_url);
        let body: BgpViewAsnResponse = self.http.get(&url).send().await?.json().await?;
        Ok(body
            .data
            .ipv4_prefixes
            .into_iter()
            .chain(body.data.ipv6_prefixes)
            .filter_map(|p| p.prefix.parse::<IpNet>().ok())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_keeps_first_responses_identity_and_unions_ranges() {
        let responses = vec![
            AsnResponse {
                as_number: 15169,
                org: "Google LLC".into(),
                country: "US".into(),
                cidr: "8.8.8.0/24".into(),
            },
            AsnResponse {
                as_number: 15169,
                org: "Google LLC".into(),
                country: "US".into(),
                cidr: "8.8.4.0/24".into(),
            },
        ];
        let cidrs = vec!["8.8.4.0/24".to_string(), "8.8.8.0/24".to_string(), "8.8.8.0/24".to_string()];
        let folded = fold(&responses, cidrs).unwrap();
        assert_eq!(folded.as_number, 15169);
        assert_eq!(folded.ranges, vec!["8.8.4.0/24".to_string(), "8.8.8.0/24".to_string()]);
    }

    #[test]
    fn fold_of_empty_responses_is_none() {
        assert!(fold(&[], Vec::new()).is_none());
    }
}
