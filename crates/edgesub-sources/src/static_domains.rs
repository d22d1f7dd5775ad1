//! Built-in table of CDN-fronted domains.

use async_trait::async_trait;
use edgesub_core::{Endpoint, EndpointSource, SourceError, SourceKind, SourceQuery};

/// One entry of the domain table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DomainEntry {
    pub domain: &'static str,
    /// Display alias; the domain itself when absent.
    pub alias: Option<&'static str>,
}

impl DomainEntry {
    const fn plain(domain: &'static str) -> Self {
        Self {
            domain,
            alias: None,
        }
    }
}

/// The default domain table.
pub const DEFAULT_DOMAINS: &[DomainEntry] = &[
    DomainEntry {
        domain: "cloudflare.182682.xyz",
        alias: Some("cloudflare.182682.xyz"),
    },
    DomainEntry::plain("freeyx.cloudflare88.eu.org"),
    DomainEntry::plain("bestcf.top"),
    DomainEntry::plain("cdn.2020111.xyz"),
    DomainEntry::plain("cf.0sm.com"),
    DomainEntry::plain("cf.090227.xyz"),
    DomainEntry::plain("cf.zhetengsha.eu.org"),
    DomainEntry::plain("cfip.1323123.xyz"),
    DomainEntry::plain("cloudflare-ip.mofashi.ltd"),
    DomainEntry::plain("cf.877771.xyz"),
    DomainEntry::plain("xn--b6gac.eu.org"),
];

/// Serves a fixed domain table; never fails.
#[derive(Debug, Clone)]
pub struct StaticDomainSource {
    entries: Vec<DomainEntry>,
}

impl StaticDomainSource {
    /// Creates a source over `entries`.
    pub fn new(entries: impl Into<Vec<DomainEntry>>) -> Self {
        Self {
            entries: entries.into(),
        }
    }

    /// Returns the endpoints, in table order.
    pub fn endpoints(&self) -> Vec<Endpoint> {
        self.entries
            .iter()
            .map(|entry| {
                Endpoint::new(entry.domain)
                    .with_label(entry.alias.unwrap_or(entry.domain))
                    .with_origin(SourceKind::StaticDomain)
            })
            .collect()
    }
}

impl Default for StaticDomainSource {
    fn default() -> Self {
        Self::new(DEFAULT_DOMAINS)
    }
}

#[async_trait]
impl EndpointSource for StaticDomainSource {
    fn kind(&self) -> SourceKind {
        SourceKind::StaticDomain
    }

    async fn fetch(&self, _query: &SourceQuery) -> Result<Vec<Endpoint>, SourceError> {
        Ok(self.endpoints())
    }
}
