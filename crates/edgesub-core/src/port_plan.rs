//! Port and TLS classification.
//!
//! Decides which `(port, tls)` pairs a synthesizer emits for an endpoint.

use crate::endpoint::Endpoint;

/// Ports the CDN terminates TLS on.
pub const TLS_PORTS: [u16; 6] = [443, 2053, 2083, 2087, 2096, 8443];

/// Ports the CDN serves plain HTTP on.
pub const PLAINTEXT_PORTS: [u16; 7] = [80, 8080, 8880, 2052, 2082, 2086, 2095];

/// TLS port used when an endpoint has no explicit port.
pub const DEFAULT_TLS_PORT: u16 = 443;

/// Plaintext port used when an endpoint has no explicit port.
pub const DEFAULT_PLAINTEXT_PORT: u16 = 80;

/// One `(port, tls)` pair to synthesize a link for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortPlan {
    pub port: u16,
    pub tls: bool,
}

impl PortPlan {
    /// A TLS plan on `port`.
    pub fn tls(port: u16) -> Self {
        Self { port, tls: true }
    }

    /// A plaintext plan on `port`.
    pub fn plaintext(port: u16) -> Self {
        Self { port, tls: false }
    }
}

/// Port-set membership.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortClass {
    Tls,
    Plaintext,
    Unknown,
}

/// Classifies a port against the TLS and plaintext sets.
pub fn classify_port(port: u16) -> PortClass {
    if TLS_PORTS.contains(&port) {
        PortClass::Tls
    } else if PLAINTEXT_PORTS.contains(&port) {
        PortClass::Plaintext
    } else {
        PortClass::Unknown
    }
}

/// What a protocol does with an explicit plaintext port while plaintext is
/// suppressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaintextPolicy {
    /// Emit the plaintext plan anyway; suppression only removes the default
    /// plaintext port.
    Keep,
    /// Drop the plan.
    Drop,
}

/// Plans the ports for one endpoint.
///
/// Without an explicit port this yields the default TLS port and, unless
/// `suppress_plaintext`, the default plaintext port. With an explicit port it
/// yields at most one plan; unknown ports are TLS. The result is empty only
/// for an explicit plaintext port under [`PlaintextPolicy::Drop`] with
/// suppression on, which callers treat as "skip this endpoint".
pub fn plan_ports(
    endpoint: &Endpoint,
    suppress_plaintext: bool,
    policy: PlaintextPolicy,
) -> Vec<PortPlan> {
    match endpoint.port {
        Some(port) => match classify_port(port) {
            PortClass::Tls | PortClass::Unknown => vec![PortPlan::tls(port)],
            PortClass::Plaintext => {
                if suppress_plaintext && policy == PlaintextPolicy::Drop {
                    Vec::new()
                } else {
                    vec![PortPlan::plaintext(port)]
                }
            }
        },
        None => {
            let mut plans = vec![PortPlan::tls(DEFAULT_TLS_PORT)];
            if !suppress_plaintext {
                plans.push(PortPlan::plaintext(DEFAULT_PLAINTEXT_PORT));
            }
            plans
        }
    }
}
