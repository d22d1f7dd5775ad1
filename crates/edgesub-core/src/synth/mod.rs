//! Protocol link synthesizers.
//!
//! Each synthesizer turns an [`Endpoint`] and a [`PortPlan`] into at most one
//! [`LinkDescriptor`]. The variants differ in protocol, in the display-name
//! tag, and in how they treat an explicit plaintext port while plaintext is
//! suppressed (see [`PlaintextPolicy`]).

mod trojan;
mod vless;
mod vmess;

pub use trojan::TrojanSynthesizer;
pub use vless::VlessSynthesizer;
pub use vmess::VmessSynthesizer;

use tracing::debug;

use crate::credential::Credential;
use crate::endpoint::Endpoint;
use crate::link::{LinkDescriptor, LinkRecord, Protocol, TlsSettings, WsTransport};
use crate::port_plan::{plan_ports, PlaintextPolicy, PortPlan};

/// Per-request values shared by every synthesized link.
#[derive(Debug, Clone, Copy)]
pub struct SynthContext<'a> {
    /// Shared identity token / password.
    pub credential: &'a Credential,
    /// Domain used for SNI and the websocket `Host` header.
    pub presentation_domain: &'a str,
    /// Websocket path.
    pub ws_path: &'a str,
}

impl<'a> SynthContext<'a> {
    /// Creates a context. An empty path becomes `/`.
    pub fn new(credential: &'a Credential, presentation_domain: &'a str, ws_path: &'a str) -> Self {
        Self {
            credential,
            presentation_domain,
            ws_path: if ws_path.is_empty() { "/" } else { ws_path },
        }
    }
}

/// Trait for protocol link synthesizers.
pub trait LinkSynthesizer: Send + Sync {
    /// The protocol this synthesizer emits.
    fn protocol(&self) -> Protocol;

    /// Tag inserted into the display name after the port (e.g. `-Trojan`).
    fn name_tag(&self) -> &'static str {
        ""
    }

    /// Treatment of explicit plaintext ports under suppression.
    fn plaintext_policy(&self) -> PlaintextPolicy;

    /// Synthesizes one link for `endpoint` on `plan`.
    fn synthesize(
        &self,
        endpoint: &Endpoint,
        plan: PortPlan,
        ctx: &SynthContext<'_>,
    ) -> Option<LinkDescriptor> {
        if endpoint.address.is_empty() {
            debug!(protocol = %self.protocol(), "Skipping endpoint with empty address");
            return None;
        }

        let name = format!(
            "{}-{}{}-WS{}",
            endpoint.display_base(),
            plan.port,
            self.name_tag(),
            if plan.tls { "-TLS" } else { "" }
        );

        Some(LinkDescriptor::new(LinkRecord {
            protocol: self.protocol(),
            credential: ctx.credential.to_string(),
            address: endpoint.address.clone(),
            port: plan.port,
            tls: plan.tls.then(|| TlsSettings::new(ctx.presentation_domain)),
            transport: WsTransport {
                host: ctx.presentation_domain.to_string(),
                path: ctx.ws_path.to_string(),
            },
            name,
        }))
    }

    /// Plans the ports of one endpoint and synthesizes a link per plan.
    fn synthesize_endpoint(
        &self,
        endpoint: &Endpoint,
        suppress_plaintext: bool,
        ctx: &SynthContext<'_>,
    ) -> Vec<LinkDescriptor> {
        plan_ports(endpoint, suppress_plaintext, self.plaintext_policy())
            .into_iter()
            .filter_map(|plan| self.synthesize(endpoint, plan, ctx))
            .collect()
    }

    /// Synthesizes links for every endpoint, in endpoint order.
    fn synthesize_all(
        &self,
        endpoints: &[Endpoint],
        suppress_plaintext: bool,
        ctx: &SynthContext<'_>,
    ) -> Vec<LinkDescriptor> {
        endpoints
            .iter()
            .flat_map(|e| self.synthesize_endpoint(e, suppress_plaintext, ctx))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    pub const UUID: &str = "123e4567-e89b-12d3-a456-426614174000";

    pub fn credential() -> Credential {
        Credential::parse(UUID).unwrap()
    }
}
