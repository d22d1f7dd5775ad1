//! Aggregation driver.
//!
//! Runs one subscription request: fetches the enabled sources concurrently,
//! plans ports and synthesizes links for every endpoint, and substitutes the
//! failure sentinel when nothing was produced.
//!
//! All policy arrives in the [`SubscriptionRequest`]; the driver holds no state
//! between calls. Dropping the returned future abandons the aggregation and
//! any in-flight source fetches with it.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::credential::Credential;
use crate::endpoint::{Carrier, Endpoint, SourceKind};
use crate::error::SourceError;
use crate::link::{LinkDescriptor, LinkRecord, Protocol, WsTransport};
use crate::synth::{
    LinkSynthesizer, SynthContext, TrojanSynthesizer, VlessSynthesizer, VmessSynthesizer,
};

/// Display name of the failure sentinel.
pub const SENTINEL_NAME: &str = "All-Sources-Failed";

/// Display label given to the native endpoint when it carries none.
pub const NATIVE_LABEL: &str = "原生地址";

/// Per-request parameters handed to every source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceQuery {
    /// Fetch IPv4 addresses.
    pub ipv4: bool,
    /// Fetch IPv6 addresses.
    pub ipv6: bool,
    /// Override for the remote list location.
    pub list_url: Option<String>,
}

/// A provider of endpoints.
#[async_trait]
pub trait EndpointSource: Send + Sync {
    /// Which source this is.
    fn kind(&self) -> SourceKind;

    /// Fetches and maps the source's endpoints.
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<Endpoint>, SourceError>;
}

/// The three fetchable sources, in aggregation order.
#[derive(Clone)]
pub struct SourceSet {
    pub static_domains: Arc<dyn EndpointSource>,
    pub scraped: Arc<dyn EndpointSource>,
    pub remote_list: Arc<dyn EndpointSource>,
}

impl SourceSet {
    /// Creates a source set.
    pub fn new(
        static_domains: Arc<dyn EndpointSource>,
        scraped: Arc<dyn EndpointSource>,
        remote_list: Arc<dyn EndpointSource>,
    ) -> Self {
        Self {
            static_domains,
            scraped,
            remote_list,
        }
    }
}

/// Per-source enable flags. All enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceToggles {
    pub static_domains: bool,
    pub scraped: bool,
    pub remote_list: bool,
}

impl Default for SourceToggles {
    fn default() -> Self {
        Self {
            static_domains: true,
            scraped: true,
            remote_list: true,
        }
    }
}

impl SourceToggles {
    /// Every source disabled; only the native endpoint is used.
    pub fn native_only() -> Self {
        Self {
            static_domains: false,
            scraped: false,
            remote_list: false,
        }
    }
}

/// Per-protocol enable flags. Only VLESS is enabled by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolToggles {
    pub vless: bool,
    pub trojan: bool,
    pub vmess: bool,
}

impl Default for ProtocolToggles {
    fn default() -> Self {
        Self {
            vless: true,
            trojan: false,
            vmess: false,
        }
    }
}

impl ProtocolToggles {
    /// Returns true if VLESS is used, which it is when nothing is enabled.
    pub fn vless_effective(&self) -> bool {
        self.vless || !(self.trojan || self.vmess)
    }

    /// The enabled synthesizers in protocol order; never empty.
    pub fn synthesizers(&self) -> Vec<&'static dyn LinkSynthesizer> {
        let mut synths: Vec<&'static dyn LinkSynthesizer> = Vec::with_capacity(3);
        if self.vless_effective() {
            synths.push(&VlessSynthesizer);
        }
        if self.trojan {
            synths.push(&TrojanSynthesizer);
        }
        if self.vmess {
            synths.push(&VmessSynthesizer);
        }
        synths
    }
}

/// Filters for the scraped source. Everything admitted by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrapeFilter {
    pub ipv4: bool,
    pub ipv6: bool,
    pub mobile: bool,
    pub unicom: bool,
    pub telecom: bool,
}

impl Default for ScrapeFilter {
    fn default() -> Self {
        Self {
            ipv4: true,
            ipv6: true,
            mobile: true,
            unicom: true,
            telecom: true,
        }
    }
}

impl ScrapeFilter {
    /// Returns true if the scraped endpoint passes both IP-version and carrier
    /// filters.
    pub fn admits(&self, endpoint: &Endpoint) -> bool {
        let version_ok = if endpoint.is_ipv6() {
            self.ipv6
        } else {
            self.ipv4
        };
        let carrier_ok = match endpoint.carrier {
            Some(Carrier::Mobile) => self.mobile,
            Some(Carrier::Unicom) => self.unicom,
            Some(Carrier::Telecom) => self.telecom,
            None => true,
        };
        version_ok && carrier_ok
    }
}

/// Everything one subscription request decides.
#[derive(Debug, Clone)]
pub struct SubscriptionRequest {
    pub credential: Credential,
    /// Domain used for SNI and the websocket `Host` header.
    pub presentation_domain: String,
    /// Websocket path.
    pub ws_path: String,
    /// The requesting host, always aggregated first.
    pub native: Endpoint,
    pub sources: SourceToggles,
    pub protocols: ProtocolToggles,
    pub scrape_filter: ScrapeFilter,
    /// Drop plaintext plans where the protocol allows it.
    pub suppress_plaintext: bool,
    /// Override for the remote list location.
    pub remote_list_url: Option<String>,
}

impl SubscriptionRequest {
    /// Creates a request with default flags.
    ///
    /// An unlabelled native endpoint is labelled [`NATIVE_LABEL`].
    pub fn new(credential: Credential, presentation_domain: impl Into<String>, native: Endpoint) -> Self {
        let mut native = native.with_origin(SourceKind::Native);
        if native.label.is_none() {
            native.label = Some(NATIVE_LABEL.to_string());
        }
        Self {
            credential,
            presentation_domain: presentation_domain.into(),
            ws_path: "/".to_string(),
            native,
            sources: SourceToggles::default(),
            protocols: ProtocolToggles::default(),
            scrape_filter: ScrapeFilter::default(),
            suppress_plaintext: false,
            remote_list_url: None,
        }
    }

    fn source_query(&self) -> SourceQuery {
        SourceQuery {
            ipv4: self.scrape_filter.ipv4,
            ipv6: self.scrape_filter.ipv6,
            list_url: self.remote_list_url.clone(),
        }
    }
}

/// The descriptor substituted when aggregation produced nothing.
pub fn sentinel_link() -> LinkDescriptor {
    LinkDescriptor::new(LinkRecord {
        protocol: Protocol::Vless,
        credential: Credential::nil().to_string(),
        address: "127.0.0.1".to_string(),
        port: 80,
        tls: None,
        transport: WsTransport {
            host: "error.com".to_string(),
            path: "/".to_string(),
        },
        name: SENTINEL_NAME.to_string(),
    })
}

/// Runs the aggregation for one request. The result is never empty.
///
/// Order: native endpoint, static domains, scraped addresses, remote list;
/// within a source by endpoint, then by protocol (VLESS, Trojan, VMess).
/// The remote list only feeds VLESS and ignores plaintext suppression.
pub async fn aggregate(request: &SubscriptionRequest, sources: &SourceSet) -> Vec<LinkDescriptor> {
    let query = request.source_query();

    let (static_domains, scraped, remote_list) = futures::join!(
        collect(sources.static_domains.as_ref(), request.sources.static_domains, &query),
        collect(sources.scraped.as_ref(), request.sources.scraped, &query),
        collect(sources.remote_list.as_ref(), request.sources.remote_list, &query),
    );

    let ctx = SynthContext::new(
        &request.credential,
        &request.presentation_domain,
        &request.ws_path,
    );
    let synths = request.protocols.synthesizers();
    let suppress = request.suppress_plaintext;

    let mut links = Vec::new();
    push_links(&mut links, std::slice::from_ref(&request.native), &synths, suppress, &ctx);
    push_links(&mut links, &static_domains, &synths, suppress, &ctx);

    let before = scraped.len();
    let scraped: Vec<Endpoint> = scraped
        .into_iter()
        .filter(|e| request.scrape_filter.admits(e))
        .collect();
    if scraped.len() < before {
        debug!(dropped = before - scraped.len(), "Scrape filter dropped endpoints");
    }
    push_links(&mut links, &scraped, &synths, suppress, &ctx);

    if request.protocols.vless_effective() {
        for endpoint in &remote_list {
            links.extend(VlessSynthesizer.synthesize_endpoint(endpoint, false, &ctx));
        }
    }

    if links.is_empty() {
        warn!("Aggregation produced no links, substituting sentinel");
        links.push(sentinel_link());
    }

    links
}

async fn collect(source: &dyn EndpointSource, enabled: bool, query: &SourceQuery) -> Vec<Endpoint> {
    if !enabled {
        return Vec::new();
    }

    let name = source.kind().name();
    match source.fetch(query).await {
        Ok(endpoints) => {
            debug!(source = name, count = endpoints.len(), "Source fetched");
            endpoints
        }
        Err(e) => {
            warn!(source = name, error = %e, "Source unavailable, contributing no endpoints");
            Vec::new()
        }
    }
}

fn push_links(
    links: &mut Vec<LinkDescriptor>,
    endpoints: &[Endpoint],
    synths: &[&'static dyn LinkSynthesizer],
    suppress_plaintext: bool,
    ctx: &SynthContext<'_>,
) {
    for endpoint in endpoints {
        for synth in synths {
            links.extend(synth.synthesize_endpoint(endpoint, suppress_plaintext, ctx));
        }
    }
}
