//! VMess over websocket.

use crate::link::Protocol;
use crate::port_plan::PlaintextPolicy;

use super::LinkSynthesizer;

/// Emits `vmess://` links wrapping a base64 JSON record.
///
/// Never drops an explicit plaintext port.
#[derive(Debug, Clone, Copy, Default)]
pub struct VmessSynthesizer;

impl LinkSynthesizer for VmessSynthesizer {
    fn protocol(&self) -> Protocol {
        Protocol::Vmess
    }

    fn name_tag(&self) -> &'static str {
        "-VMess"
    }

    fn plaintext_policy(&self) -> PlaintextPolicy {
        PlaintextPolicy::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::Endpoint;
    use crate::link::LinkDescriptor;
    use crate::synth::test_support::*;
    use crate::synth::SynthContext;

    #[test]
    fn opaque_record_decodes_back() {
        let c = credential();
        let ctx = SynthContext::new(&c, "example.com", "/");
        let links = VmessSynthesizer.synthesize_endpoint(
            &Endpoint::new("2606:4700::1").with_label("v6").with_port(443),
            false,
            &ctx,
        );
        assert_eq!(links.len(), 1);
        assert!(links[0].uri().starts_with("vmess://"));

        let decoded = LinkDescriptor::parse(links[0].uri()).unwrap();
        assert_eq!(decoded.record(), links[0].record());
        assert_eq!(decoded.name(), "v6-443-VMess-WS-TLS");
        assert_eq!(decoded.record().credential, UUID);
    }

    #[test]
    fn explicit_plaintext_port_kept_under_suppression() {
        let c = credential();
        let ctx = SynthContext::new(&c, "example.com", "/");
        let links = VmessSynthesizer.synthesize_endpoint(
            &Endpoint::new("1.2.3.4").with_port(8880),
            true,
            &ctx,
        );
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].name(), "1.2.3.4-8880-VMess-WS");
        assert!(!links[0].record().is_tls());
    }
}
