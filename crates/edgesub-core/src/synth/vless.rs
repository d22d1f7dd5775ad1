//! VLESS over websocket, the primary protocol.

use crate::link::Protocol;
use crate::port_plan::PlaintextPolicy;

use super::LinkSynthesizer;

/// Emits `vless://` links.
///
/// Plaintext suppression only removes the default plaintext port; an explicit
/// plaintext port is still emitted as plaintext.
#[derive(Debug, Clone, Copy, Default)]
pub struct VlessSynthesizer;

impl LinkSynthesizer for VlessSynthesizer {
    fn protocol(&self) -> Protocol {
        Protocol::Vless
    }

    fn plaintext_policy(&self) -> PlaintextPolicy {
        PlaintextPolicy::Keep
    }
}
