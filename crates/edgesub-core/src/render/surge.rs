//! Surge-style INI proxy list.

use std::fmt::Write;

use tracing::debug;

use super::{Rendered, Renderer, UniqueNames, TEXT_PLAIN};
use crate::error::RenderError;
use crate::link::{LinkDescriptor, LinkRecord, Protocol};

/// Renders a `[Proxy]` section and a single `PROXY` select group.
#[derive(Debug, Clone, Copy, Default)]
pub struct SurgeRenderer;

impl Renderer for SurgeRenderer {
    fn name(&self) -> &'static str {
        "surge"
    }

    fn render(&self, links: &[LinkDescriptor]) -> Result<Rendered, RenderError> {
        let mut body = String::from("[Proxy]\n");
        let mut names = Vec::with_capacity(links.len());
        let mut unique = UniqueNames::default();

        for (i, link) in links.iter().enumerate() {
            let record = link.record();
            if !is_renderable(record) {
                debug!(renderer = self.name(), name = link.name(), "Skipping incomplete descriptor");
                continue;
            }
            let name = if record.name.is_empty() {
                unique.claim(&format!("Node-{}", i + 1))
            } else {
                unique.claim(&record.name)
            };
            let _ = writeln!(body, "{}", proxy_line(&name, record));
            names.push(name);
        }

        body.push_str("\n[Proxy Group]\n");
        if names.is_empty() {
            body.push_str("PROXY = select, DIRECT\n");
        } else {
            let _ = writeln!(body, "PROXY = select, {}", names.join(", "));
        }

        Ok(Rendered {
            body,
            content_type: TEXT_PLAIN,
        })
    }
}

fn is_renderable(record: &LinkRecord) -> bool {
    !record.address.is_empty() && !record.credential.is_empty() && record.port != 0
}

fn proxy_line(name: &str, r: &LinkRecord) -> String {
    let credential_key = match r.protocol {
        Protocol::Trojan => "password",
        Protocol::Vless | Protocol::Vmess => "username",
    };
    format!(
        "{} = {}, {}, {}, {}={}, tls={}, ws=true, ws-path={}, ws-headers=Host:{}",
        name,
        r.protocol.scheme(),
        r.address,
        r.port,
        credential_key,
        r.credential,
        r.is_tls(),
        r.transport.path,
        r.transport.host
    )
}
