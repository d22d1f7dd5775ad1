//! Latency probe against the CDN trace endpoint.
//!
//! A probe requests `/cdn-cgi/trace` from the target and measures the time to
//! a complete response. HTTPS is used on 443 and 8443, plain HTTP elsewhere.

use std::sync::Arc;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{debug, info};

use crate::error::Result;
use crate::http::USER_AGENT;

/// Port used when neither the host nor the request names one.
pub const DEFAULT_PROBE_PORT: u16 = 443;

/// Per-probe timeout used when the request names none.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_millis(5000);

/// Probes run at once in a batch unless the request says otherwise.
pub const DEFAULT_CONCURRENCY: usize = 5;

static IP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"ip=(\S+)").expect("valid regex"));
static LOC_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"loc=(\S+)").expect("valid regex"));
static COLO_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"colo=(\S+)").expect("valid regex"));

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub success: bool,
    /// The host as requested, including any port it carried.
    pub host: String,
    pub port: u16,
    /// Milliseconds until the response completed, or the timeout.
    pub latency: u64,
    pub ip: Option<String>,
    pub location: Option<String>,
    pub colo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProbeResult {
    fn failure(host: &str, port: u16, latency: u64, error: impl Into<String>) -> Self {
        Self {
            success: false,
            host: host.to_string(),
            port,
            latency,
            ip: None,
            location: None,
            colo: None,
            error: Some(error.into()),
        }
    }
}

/// Splits an optional port off `host`.
///
/// Accepts `name`, `name:port`, `[v6]`, `[v6]:port` and bare IPv6 literals.
/// An unparsable port falls back to `default_port`.
pub fn split_host_port(host: &str, default_port: u16) -> (String, u16) {
    let host = host.trim();
    if let Some(rest) = host.strip_prefix('[') {
        if let Some((addr, tail)) = rest.split_once(']') {
            let port = tail
                .strip_prefix(':')
                .and_then(|p| p.parse().ok())
                .unwrap_or(default_port);
            return (addr.to_string(), port);
        }
    }
    match host.split_once(':') {
        Some((name, port)) if !port.contains(':') => {
            (name.to_string(), port.parse().unwrap_or(default_port))
        }
        _ => (host.to_string(), default_port),
    }
}

/// Builds the trace URL for a bare host and port.
pub fn trace_url(host: &str, port: u16) -> String {
    let scheme = if port == 443 || port == 8443 { "https" } else { "http" };
    if host.contains(':') {
        format!("{scheme}://[{host}]:{port}/cdn-cgi/trace")
    } else {
        format!("{scheme}://{host}:{port}/cdn-cgi/trace")
    }
}

fn capture(re: &Regex, body: &str) -> Option<String> {
    re.captures(body).map(|c| c[1].to_string())
}

/// Issues trace requests and measures their latency.
#[derive(Debug, Clone)]
pub struct Prober {
    client: reqwest::Client,
}

impl Prober {
    /// Creates a prober.
    ///
    /// Targets are addressed by IP, so certificate names are not checked.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self { client })
    }

    /// Probes one host. Never fails; failures are reported in the result.
    pub async fn probe(&self, host: &str, port: u16, timeout: Duration) -> ProbeResult {
        let (target, port) = split_host_port(host, port);
        let url = trace_url(&target, port);
        let start = Instant::now();

        let outcome = tokio::time::timeout(timeout, async {
            let response = self.client.get(&url).send().await?;
            let status = response.status();
            let body = response.text().await?;
            Ok::<_, reqwest::Error>((status, body))
        })
        .await;
        let elapsed = start.elapsed().as_millis() as u64;

        let result = match outcome {
            Err(_) => ProbeResult::failure(
                host,
                port,
                timeout.as_millis() as u64,
                format!("timed out after {} ms", timeout.as_millis()),
            ),
            Ok(Err(e)) => ProbeResult::failure(host, port, elapsed, e.to_string()),
            Ok(Ok((status, _))) if !status.is_success() => {
                ProbeResult::failure(host, port, elapsed, format!("HTTP {}", status.as_u16()))
            }
            Ok(Ok((_, body))) => ProbeResult {
                success: true,
                host: host.to_string(),
                port,
                latency: elapsed,
                ip: capture(&IP_RE, &body),
                location: capture(&LOC_RE, &body),
                colo: capture(&COLO_RE, &body),
                error: None,
            },
        };

        debug!(url, success = result.success, latency = result.latency, "Probe finished");
        result
    }

    /// Probes every host with at most `concurrency` probes in flight.
    ///
    /// Results are sorted successes first, then by ascending latency.
    pub async fn probe_many(
        &self,
        hosts: &[String],
        port: u16,
        timeout: Duration,
        concurrency: usize,
    ) -> Vec<ProbeResult> {
        let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
        let mut handles = Vec::with_capacity(hosts.len());

        for host in hosts {
            let sem = semaphore.clone();
            let prober = self.clone();
            let host = host.clone();
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire_owned().await;
                prober.probe(&host, port, timeout).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        for (handle, host) in handles.into_iter().zip(hosts) {
            match handle.await {
                Ok(result) => results.push(result),
                Err(e) => results.push(ProbeResult::failure(
                    host,
                    port,
                    timeout.as_millis() as u64,
                    e.to_string(),
                )),
            }
        }

        sort_results(&mut results);
        let ok = results.iter().filter(|r| r.success).count();
        info!(total = results.len(), ok, "Batch probe finished");
        results
    }
}

/// Successes first, then ascending latency.
pub fn sort_results(results: &mut [ProbeResult]) {
    results.sort_by_key(|r| (!r.success, r.latency));
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Address Tests ====================

    #[test]
    fn split_plain_and_ported_hosts() {
        assert_eq!(split_host_port("1.2.3.4", 443), ("1.2.3.4".to_string(), 443));
        assert_eq!(split_host_port("1.2.3.4:8443", 443), ("1.2.3.4".to_string(), 8443));
        assert_eq!(split_host_port("cf.example.org:80", 443), ("cf.example.org".to_string(), 80));
        assert_eq!(split_host_port("1.2.3.4:abc", 2053), ("1.2.3.4".to_string(), 2053));
    }

    #[test]
    fn split_ipv6_hosts() {
        assert_eq!(split_host_port("[::1]:443", 80), ("::1".to_string(), 443));
        assert_eq!(split_host_port("[2606:4700::1]", 8443), ("2606:4700::1".to_string(), 8443));
        assert_eq!(split_host_port("2606:4700::1", 443), ("2606:4700::1".to_string(), 443));
    }

    #[test]
    fn trace_url_scheme_follows_port() {
        assert_eq!(trace_url("1.2.3.4", 443), "https://1.2.3.4:443/cdn-cgi/trace");
        assert_eq!(trace_url("1.2.3.4", 8443), "https://1.2.3.4:8443/cdn-cgi/trace");
        assert_eq!(trace_url("1.2.3.4", 2053), "http://1.2.3.4:2053/cdn-cgi/trace");
        assert_eq!(trace_url("::1", 80), "http://[::1]:80/cdn-cgi/trace");
    }

    #[test]
    fn trace_fields_are_extracted() {
        let body = "fl=1f1\nh=1.2.3.4\nip=203.0.113.9\nts=1\nvisit_scheme=https\nloc=HK\ncolo=HKG\n";
        assert_eq!(capture(&IP_RE, body).as_deref(), Some("203.0.113.9"));
        assert_eq!(capture(&LOC_RE, body).as_deref(), Some("HK"));
        assert_eq!(capture(&COLO_RE, body).as_deref(), Some("HKG"));
        assert_eq!(capture(&COLO_RE, "nothing"), None);
    }

    // ==================== Ordering Tests ====================

    #[test]
    fn successes_first_then_latency() {
        let ok = |host: &str, latency| ProbeResult {
            success: true,
            host: host.to_string(),
            port: 443,
            latency,
            ip: None,
            location: None,
            colo: None,
            error: None,
        };
        let mut results = vec![
            ProbeResult::failure("f", 443, 10, "HTTP 500"),
            ok("slow", 300),
            ok("fast", 20),
        ];
        sort_results(&mut results);
        let hosts: Vec<_> = results.iter().map(|r| r.host.as_str()).collect();
        assert_eq!(hosts, vec!["fast", "slow", "f"]);
    }

    // ==================== Probe Tests ====================

    #[tokio::test]
    async fn unreachable_host_reports_failure() {
        let prober = Prober::new().unwrap();
        let result = prober
            .probe("127.0.0.1:1", DEFAULT_PROBE_PORT, Duration::from_millis(500))
            .await;
        assert!(!result.success);
        assert_eq!(result.host, "127.0.0.1:1");
        assert_eq!(result.port, 1);
        assert!(result.error.is_some());
    }

    #[tokio::test]
    async fn batch_keeps_every_host() {
        let prober = Prober::new().unwrap();
        let hosts = vec!["127.0.0.1:1".to_string(), "127.0.0.1:2".to_string()];
        let results = prober
            .probe_many(&hosts, 80, Duration::from_millis(500), 1)
            .await;
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.success));
    }
}
