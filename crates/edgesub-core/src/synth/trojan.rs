//! Trojan over websocket.

use crate::link::Protocol;
use crate::port_plan::PlaintextPolicy;

use super::LinkSynthesizer;

/// Emits `trojan://` links, using the credential as the password.
///
/// Unlike VLESS, an explicit plaintext port is dropped while plaintext is
/// suppressed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrojanSynthesizer;

impl LinkSynthesizer for TrojanSynthesizer {
    fn protocol(&self) -> Protocol {
        Protocol::Trojan
    }

    fn name_tag(&self) -> &'static str {
        "-Trojan"
    }

    fn plaintext_policy(&self) -> PlaintextPolicy {
        PlaintextPolicy::Drop
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Endpoint;
    use crate::synth::test_support::*;
    use crate::synth::SynthContext;

    #[test]
    fn password_link_without_cipher_marker() {
        let c = credential();
        let ctx = SynthContext::new(&c, "example.com", "/");
        let links = TrojanSynthesizer.synthesize_endpoint(
            &Endpoint::new("1.2.3.4").with_port(2096),
            false,
            &ctx,
        );
        assert_eq!(links.len(), 1);
        let uri = links[0].uri();
        assert!(uri.starts_with(&format!("trojan://{UUID}@1.2.3.4:2096?security=tls")));
        assert!(!uri.contains("encryption"));
        assert_eq!(links[0].name(), "1.2.3.4-2096-Trojan-WS-TLS");
    }

    #[test]
    fn explicit_plaintext_port_dropped_under_suppression() {
        let c = credential();
        let ctx = SynthContext::new(&c, "example.com", "/");
        let endpoint = Endpoint::new("1.2.3.4").with_port(2052);
        assert!(TrojanSynthesizer
            .synthesize_endpoint(&endpoint, true, &ctx)
            .is_empty());

        let links = TrojanSynthesizer.synthesize_endpoint(&endpoint, false, &ctx);
        assert_eq!(links[0].name(), "1.2.3.4-2052-Trojan-WS");
    }
}
