//! Remote `host:port#label` list.

use async_trait::async_trait;
use edgesub_core::{Endpoint, EndpointSource, SourceError, SourceKind, SourceQuery};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::http::HttpFetcher;

/// Default list location.
pub const DEFAULT_LIST_URL: &str =
    "https://raw.githubusercontent.com/qwer-search/bestip/refs/heads/main/kejilandbestip.txt";

static LINE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\[([0-9A-Fa-f:.]+)\]|([^:\[\]]+)):(\d+)#(.*)$").expect("valid regex")
});

/// Parses a remote list body.
///
/// Carriage returns are stripped; blank lines, malformed lines and ports
/// outside `1..=65535` are skipped. An empty label falls back to the host.
pub fn parse_remote_list(body: &str) -> Vec<Endpoint> {
    body.replace('\r', "")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(parse_line)
        .collect()
}

fn parse_line(line: &str) -> Option<Endpoint> {
    let Some(caps) = LINE_RE.captures(line) else {
        debug!(line, "Skipping malformed list line");
        return None;
    };
    let host = caps.get(1).or_else(|| caps.get(2))?.as_str().trim();
    let port: u16 = caps[3].parse().ok().filter(|p| *p != 0)?;
    let label = caps[4].trim();

    Some(
        Endpoint::new(host)
            .with_port(port)
            .with_label(if label.is_empty() { host } else { label })
            .with_origin(SourceKind::RemoteList),
    )
}

/// Fetches the remote list, honouring a per-request location override.
#[derive(Debug, Clone)]
pub struct RemoteListSource {
    fetcher: HttpFetcher,
    default_url: String,
}

impl RemoteListSource {
    /// Creates a source reading [`DEFAULT_LIST_URL`].
    pub fn new(fetcher: HttpFetcher) -> Self {
        Self {
            fetcher,
            default_url: DEFAULT_LIST_URL.to_string(),
        }
    }

    /// Overrides the default location.
    pub fn with_default_url(mut self, url: impl Into<String>) -> Self {
        self.default_url = url.into();
        self
    }

    /// Returns the location used for `query`.
    pub fn resolve_url<'a>(&'a self, query: &'a SourceQuery) -> &'a str {
        query
            .list_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(self.default_url.as_str())
    }
}

#[async_trait]
impl EndpointSource for RemoteListSource {
    fn kind(&self) -> SourceKind {
        SourceKind::RemoteList
    }

    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<Endpoint>, SourceError> {
        let url = self.resolve_url(query);
        let body = self.fetcher.get_text(url).await?;
        Ok(parse_remote_list(&body))
    }
}
