//! Scraped address table.
//!
//! The upstream publishes one HTML page per IP version. Each table row carries
//! a carrier line name, an address and a data-center code in cells tagged with
//! `data-label` attributes; rows without all three are ignored.

use async_trait::async_trait;
use edgesub_core::{Carrier, Endpoint, EndpointSource, SourceError, SourceKind, SourceQuery};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::http::HttpFetcher;

/// Default IPv4 address page.
pub const DEFAULT_V4_URL: &str = "https://www.wetest.vip/page/cloudflare/address_v4.html";

/// Default IPv6 address page.
pub const DEFAULT_V6_URL: &str = "https://www.wetest.vip/page/cloudflare/address_v6.html";

static ROW_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<tr[\s\S]*?</tr>").expect("valid regex"));

static CELLS_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"<td data-label="线路名称">(.+?)</td>[\s\S]*?<td data-label="优选地址">([\d.:a-fA-F]+)</td>[\s\S]*?<td data-label="数据中心">(.+?)</td>"#,
    )
    .expect("valid regex")
});

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<.*?>").expect("valid regex"));

/// One parsed table row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedRow {
    pub line: String,
    pub address: String,
    pub colo: String,
}

impl From<ScrapedRow> for Endpoint {
    fn from(row: ScrapedRow) -> Self {
        let carrier = Carrier::detect(&row.line);
        Endpoint::new(row.address)
            .with_label(row.line)
            .with_region(row.colo)
            .with_carrier(carrier)
            .with_origin(SourceKind::Scraped)
    }
}

/// Extracts the address rows from one page.
pub fn parse_address_table(html: &str) -> Vec<ScrapedRow> {
    ROW_RE
        .find_iter(html)
        .filter_map(|row| CELLS_RE.captures(row.as_str()))
        .map(|caps| ScrapedRow {
            line: strip_tags(&caps[1]),
            address: caps[2].trim().to_string(),
            colo: strip_tags(&caps[3]),
        })
        .collect()
}

fn strip_tags(cell: &str) -> String {
    TAG_RE.replace_all(cell.trim(), "").trim().to_string()
}

/// Fetches the IPv4 and IPv6 address pages.
#[derive(Debug, Clone)]
pub struct ScrapedSource {
    fetcher: HttpFetcher,
    v4_url: String,
    v6_url: String,
}

impl ScrapedSource {
    /// Creates a source reading the default pages.
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self {
            fetcher,
            v4_url: DEFAULT_V4_URL.to_string(),
            v6_url: DEFAULT_V6_URL.to_string(),
        }
    }

    /// Overrides the page locations.
    pub fn with_urls(mut self, v4_url: impl Into<String>, v6_url: impl Into<String>) -> Self {
        self.v4_url = v4_url.into();
        self.v6_url = v6_url.into();
        self
    }

    async fn fetch_page(&self, url: &str, enabled: bool) -> Option<Result<Vec<Endpoint>, SourceError>> {
        if !enabled {
            return None;
        }
        let result = self.fetcher.get_text(url).await.map_err(SourceError::from);
        Some(result.map(|html| {
            let rows = parse_address_table(&html);
            debug!(url, rows = rows.len(), "Parsed address table");
            rows.into_iter().map(Endpoint::from).collect()
        }))
    }
}

#[async_trait]
impl EndpointSource for ScrapedSource {
    fn kind(&self) -> SourceKind {
        SourceKind::Scraped
    }

    /// Fetches the pages for the requested IP versions concurrently.
    ///
    /// Fails only when every requested page failed.
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<Endpoint>, SourceError> {
        let (v4, v6) = futures::join!(
            self.fetch_page(&self.v4_url, query.ipv4),
            self.fetch_page(&self.v6_url, query.ipv6),
        );

        let mut endpoints = Vec::new();
        let mut last_err = None;
        let mut any_ok = false;
        for page in [v4, v6].into_iter().flatten() {
            match page {
                Ok(found) => {
                    any_ok = true;
                    endpoints.extend(found);
                }
                Err(e) => {
                    warn!(error = %e, "Address page unavailable");
                    last_err = Some(e);
                }
            }
        }

        match last_err {
            Some(e) if !any_ok => Err(e),
            _ => Ok(endpoints),
        }
    }
}
