//! CDN-IP classifier collaborator: `classify(host) -> (is_cdn, name)`.
//! [`StaticRangeCdnClassifier`] gives the contract a concrete, table-driven
//! implementation against well-known CDN CIDR ranges rather than leaving it
//! unimplemented.

use std::net::IpAddr;

use ipnet::IpNet;

/// External collaborator boundary.
pub trait CdnClassifier: Send + Sync {
    /// Returns `(is_cdn_ip, cdn_name)` for `host`. Matches only when `host`
    /// is itself an IP literal; callers that hold a resolved answer's A/AAAA
    /// records should classify those instead.
    fn classify(&self, host: &str) -> (bool, Option<String>);
}

struct CdnRange {
    net: IpNet,
    name: &'static str,
}

/// A small table of well-known CDN ranges, checked in order.
pub struct StaticRangeCdnClassifier {
    ranges: Vec<CdnRange>,
}

const KNOWN_RANGES: &[(&str, &str)] = &[
    ("173.245.48.0/20", "Cloudflare"),
    ("103.21.244.0/22", "Cloudflare"),
    ("104.16.0.0/13", "Cloudflare"),
    ("172.64.0.0/13", "Cloudflare"),
    ("151.101.0.0/16", "Fastly"),
    ("199.232.0.0/16", "Fastly"),
    ("23.235.32.0/20", "Akamai"),
    ("104.64.0.0/10", "Akamai"),
    ("13.32.0.0/15", "CloudFront"),
    ("52.84.0.0/15", "CloudFront"),
    ("142.250.0.0/15", "Google"),
    ("34.64.0.0/10", "Google"),
];

impl StaticRangeCdnClassifier {
    pub fn new() -> Self {
        let ranges = KNOWN_RANGES
            .iter()
            .filter_map(|(cidr, name)| cidr.parse().ok().map(|net| CdnRange { net, name }))
            .collect();
        Self { ranges }
    }

    pub fn classify_ip(&self, ip: IpAddr) -> (bool, Option<String>) {
        for range in &self.ranges {
            if range.net.contains(&ip) {
                return (true, Some(range.name.to_string()));
            }
        }
        (false, None)
    }
}

impl Default for StaticRangeCdnClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl CdnClassifier for StaticRangeCdnClassifier {
    fn classify(&self, host: &str) -> (bool, Option<String>) {
        match host.parse::<IpAddr>() {
            Ok(ip) => self.classify_ip(ip),
            Err(_) => (false, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_cloudflare_range() {
        let classifier = StaticRangeCdnClassifier::new();
        let (is_cdn, name) = classifier.classify("104.16.1.1");
        assert!(is_cdn);
        assert_eq!(name.as_deref(), Some("Cloudflare"));
    }

    #[test]
    fn non_cdn_ip_is_not_classified() {
        let classifier = StaticRangeCdnClassifier::new();
        let (is_cdn, name) = classifier.classify("8.8.8.8");
        assert!(!is_cdn);
        assert!(name.is_none());
    }

    #[test]
    fn non_ip_host_is_not_classified() {
        let classifier = StaticRangeCdnClassifier::new();
        assert_eq!(classifier.classify("example.com"), (false, None));
    }
}
