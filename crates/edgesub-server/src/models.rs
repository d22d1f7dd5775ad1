//! API request and response models.

use std::time::Duration;

use edgesub_core::{
    Credential, Endpoint, ProtocolToggles, RenderTarget, ScrapeFilter, SourceToggles,
    SubscriptionRequest,
};
use edgesub_sources::probe::{DEFAULT_CONCURRENCY, DEFAULT_PROBE_PORT, DEFAULT_PROBE_TIMEOUT};
use edgesub_sources::ProbeResult;
use serde::{Deserialize, Serialize};

use crate::error::{ApiError, Result};

/// Query parameters for GET /{credential}/sub.
///
/// Flags are free-form strings: most are on unless given as `no`, a few are
/// off unless given as `yes`.
#[derive(Debug, Default, Deserialize)]
pub struct SubscriptionQuery {
    /// Presentation domain used for SNI and the websocket `Host` header.
    pub domain: Option<String>,
    /// Static domain source.
    pub epd: Option<String>,
    /// Scraped address source.
    pub epi: Option<String>,
    /// Remote list source.
    pub egi: Option<String>,
    /// Remote list location override.
    pub piu: Option<String>,
    /// VLESS.
    pub ev: Option<String>,
    /// Trojan.
    pub et: Option<String>,
    /// VMess.
    pub vm: Option<String>,
    pub ipv4: Option<String>,
    pub ipv6: Option<String>,
    #[serde(rename = "ispMobile")]
    pub isp_mobile: Option<String>,
    #[serde(rename = "ispUnicom")]
    pub isp_unicom: Option<String>,
    #[serde(rename = "ispTelecom")]
    pub isp_telecom: Option<String>,
    /// Suppress plaintext ports.
    pub dkby: Option<String>,
    /// Websocket path.
    pub path: Option<String>,
    /// Output format name.
    pub target: Option<String>,
}

fn on_unless_no(flag: &Option<String>) -> bool {
    flag.as_deref() != Some("no")
}

fn on_if_yes(flag: &Option<String>) -> bool {
    flag.as_deref() == Some("yes")
}

impl SubscriptionQuery {
    /// Resolves the render target.
    pub fn render_target(&self) -> RenderTarget {
        RenderTarget::from_name(self.target.as_deref())
    }

    /// Builds the aggregation request for `credential`, served from `native`.
    pub fn to_request(&self, credential: Credential, native: Endpoint) -> Result<SubscriptionRequest> {
        let domain = self
            .domain
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or_else(|| ApiError::BadRequest("missing domain parameter".to_string()))?;

        let mut request = SubscriptionRequest::new(credential, domain, native);
        request.sources = SourceToggles {
            static_domains: on_unless_no(&self.epd),
            scraped: on_unless_no(&self.epi),
            remote_list: on_unless_no(&self.egi),
        };
        request.protocols = ProtocolToggles {
            vless: self.ev.is_none() || on_if_yes(&self.ev),
            trojan: on_if_yes(&self.et),
            vmess: on_if_yes(&self.vm),
        };
        request.scrape_filter = ScrapeFilter {
            ipv4: on_unless_no(&self.ipv4),
            ipv6: on_unless_no(&self.ipv6),
            mobile: on_unless_no(&self.isp_mobile),
            unicom: on_unless_no(&self.isp_unicom),
            telecom: on_unless_no(&self.isp_telecom),
        };
        request.suppress_plaintext = on_if_yes(&self.dkby);
        if let Some(path) = self.path.as_deref().filter(|p| !p.is_empty()) {
            request.ws_path = path.to_string();
        }
        request.remote_list_url = self.piu.clone().filter(|u| !u.trim().is_empty());

        Ok(request)
    }
}

/// Query parameters for GET /test.
#[derive(Debug, Deserialize)]
pub struct ProbeQuery {
    /// Target host, optionally with its own port.
    pub host: Option<String>,
    /// Port used when `host` carries none (default: 443).
    #[serde(default = "default_probe_port")]
    pub port: u16,
    /// Timeout in milliseconds (default: 5000).
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout: u64,
}

fn default_probe_port() -> u16 {
    DEFAULT_PROBE_PORT
}

fn default_probe_timeout_ms() -> u64 {
    DEFAULT_PROBE_TIMEOUT.as_millis() as u64
}

fn default_concurrency() -> usize {
    DEFAULT_CONCURRENCY
}

/// Request body for POST /batch-test.
#[derive(Debug, Deserialize)]
pub struct BatchProbeRequest {
    #[serde(default)]
    pub hosts: Vec<String>,
    #[serde(default = "default_probe_port")]
    pub port: u16,
    #[serde(default = "default_probe_timeout_ms")]
    pub timeout: u64,
    /// Probes in flight at once (default: 5).
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
}

/// Converts a client timeout in milliseconds; zero means the default.
pub fn probe_timeout(ms: u64) -> Duration {
    if ms == 0 {
        DEFAULT_PROBE_TIMEOUT
    } else {
        Duration::from_millis(ms)
    }
}

/// Response body for POST /batch-test.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchProbeResponse {
    pub success: bool,
    pub results: Vec<ProbeResult>,
    pub total: usize,
    pub success_count: usize,
}

impl From<Vec<ProbeResult>> for BatchProbeResponse {
    fn from(results: Vec<ProbeResult>) -> Self {
        let success_count = results.iter().filter(|r| r.success).count();
        Self {
            success: true,
            total: results.len(),
            success_count,
            results,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UUID: &str = "123e4567-e89b-12d3-a456-426614174000";

    fn query(pairs: &[(&str, &str)]) -> SubscriptionQuery {
        let mut q = SubscriptionQuery {
            domain: Some("example.com".to_string()),
            ..Default::default()
        };
        for (k, v) in pairs {
            let v = Some(v.to_string());
            match *k {
                "epd" => q.epd = v,
                "epi" => q.epi = v,
                "egi" => q.egi = v,
                "ev" => q.ev = v,
                "et" => q.et = v,
                "vm" => q.vm = v,
                "ipv6" => q.ipv6 = v,
                "ispUnicom" => q.isp_unicom = v,
                "dkby" => q.dkby = v,
                "path" => q.path = v,
                "piu" => q.piu = v,
                _ => panic!("unexpected key {k}"),
            }
        }
        q
    }

    fn request(q: &SubscriptionQuery) -> SubscriptionRequest {
        q.to_request(Credential::parse(UUID).unwrap(), Endpoint::new("worker.example.net"))
            .unwrap()
    }

    #[test]
    fn defaults() {
        let req = request(&query(&[]));
        assert_eq!(req.presentation_domain, "example.com");
        assert_eq!(req.sources, SourceToggles::default());
        assert_eq!(req.protocols, ProtocolToggles::default());
        assert_eq!(req.scrape_filter, ScrapeFilter::default());
        assert!(!req.suppress_plaintext);
        assert_eq!(req.ws_path, "/");
        assert_eq!(req.remote_list_url, None);
    }

    #[test]
    fn source_flags_disable_only_on_no() {
        let req = request(&query(&[("epd", "no"), ("epi", "off"), ("egi", "no")]));
        assert!(!req.sources.static_domains);
        assert!(req.sources.scraped);
        assert!(!req.sources.remote_list);
    }

    #[test]
    fn protocol_flags() {
        let req = request(&query(&[("ev", "no"), ("et", "yes"), ("vm", "true")]));
        assert!(!req.protocols.vless);
        assert!(req.protocols.trojan);
        assert!(!req.protocols.vmess);

        let req = request(&query(&[("ev", "yes"), ("vm", "yes")]));
        assert!(req.protocols.vless);
        assert!(req.protocols.vmess);
    }

    #[test]
    fn filters_path_and_suppression() {
        let req = request(&query(&[
            ("ipv6", "no"),
            ("ispUnicom", "no"),
            ("dkby", "yes"),
            ("path", "/ws?ed=2048"),
            ("piu", "https://list.example/ips.txt"),
        ]));
        assert!(req.scrape_filter.ipv4);
        assert!(!req.scrape_filter.ipv6);
        assert!(!req.scrape_filter.unicom);
        assert!(req.scrape_filter.mobile);
        assert!(req.suppress_plaintext);
        assert_eq!(req.ws_path, "/ws?ed=2048");
        assert_eq!(req.remote_list_url.as_deref(), Some("https://list.example/ips.txt"));
    }

    #[test]
    fn missing_domain_is_rejected() {
        let q = SubscriptionQuery::default();
        let err = q
            .to_request(Credential::parse(UUID).unwrap(), Endpoint::new("h"))
            .unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn batch_response_counts_successes() {
        let ok = ProbeResult {
            success: true,
            host: "a".to_string(),
            port: 443,
            latency: 10,
            ip: None,
            location: None,
            colo: None,
            error: None,
        };
        let failed = ProbeResult {
            success: false,
            error: Some("HTTP 500".to_string()),
            ..ok.clone()
        };
        let response = BatchProbeResponse::from(vec![ok, failed]);
        assert_eq!(response.total, 2);
        assert_eq!(response.success_count, 1);

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["successCount"], 1);
    }
}
