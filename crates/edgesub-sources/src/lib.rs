//! Edgesub Sources - HTTP-backed endpoint sources.
//!
//! This crate provides the concrete [`EndpointSource`] implementations:
//! - [`StaticDomainSource`]: the built-in CDN-fronted domain table
//! - [`ScrapedSource`]: the scraped IPv4/IPv6 address pages
//! - [`RemoteListSource`]: a remote `host:port#label` list
//!
//! It also provides the [`Prober`] used by the latency test routes.

pub mod error;
pub mod http;
pub mod probe;
pub mod remote_list;
pub mod scraped;
pub mod static_domains;

use std::sync::Arc;
use std::time::Duration;

use edgesub_core::{EndpointSource, SourceSet};
use tracing::info;

pub use error::{FetchError, Result};
pub use http::{HttpFetcher, DEFAULT_FETCH_TIMEOUT};
pub use probe::{ProbeResult, Prober};
pub use remote_list::{parse_remote_list, RemoteListSource, DEFAULT_LIST_URL};
pub use scraped::{parse_address_table, ScrapedSource, DEFAULT_V4_URL, DEFAULT_V6_URL};
pub use static_domains::{DomainEntry, StaticDomainSource, DEFAULT_DOMAINS};

/// Locations and limits for the network-backed sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourcesConfig {
    /// Default remote list location; requests may override it.
    pub remote_list_url: String,
    /// IPv4 address page.
    pub scrape_v4_url: String,
    /// IPv6 address page.
    pub scrape_v6_url: String,
    /// Bound on every outbound fetch.
    pub fetch_timeout: Duration,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            remote_list_url: DEFAULT_LIST_URL.to_string(),
            scrape_v4_url: DEFAULT_V4_URL.to_string(),
            scrape_v6_url: DEFAULT_V6_URL.to_string(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }
}

/// Builds the production source set from `config`.
pub fn build_source_set(config: &SourcesConfig) -> Result<SourceSet> {
    let fetcher = HttpFetcher::new(config.fetch_timeout)?;

    let static_domains: Arc<dyn EndpointSource> = Arc::new(StaticDomainSource::default());
    let scraped: Arc<dyn EndpointSource> = Arc::new(
        ScrapedSource::new(fetcher.clone())
            .with_urls(&config.scrape_v4_url, &config.scrape_v6_url),
    );
    let remote_list: Arc<dyn EndpointSource> = Arc::new(
        RemoteListSource::new(fetcher).with_default_url(&config.remote_list_url),
    );

    info!(
        timeout = ?config.fetch_timeout,
        remote_list = %config.remote_list_url,
        "Endpoint sources configured"
    );

    Ok(SourceSet::new(static_domains, scraped, remote_list))
}

#[cfg(test)]
mod tests {
    use edgesub_core::SourceKind;

    use super::*;

    #[test]
    fn default_config_points_at_upstreams() {
        let config = SourcesConfig::default();
        assert_eq!(config.remote_list_url, DEFAULT_LIST_URL);
        assert_eq!(config.fetch_timeout, Duration::from_secs(10));
    }

    #[test]
    fn source_set_is_wired_in_order() {
        let set = build_source_set(&SourcesConfig::default()).unwrap();
        assert_eq!(set.static_domains.kind(), SourceKind::StaticDomain);
        assert_eq!(set.scraped.kind(), SourceKind::Scraped);
        assert_eq!(set.remote_list.kind(), SourceKind::RemoteList);
    }
}
