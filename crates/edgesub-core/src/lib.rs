//! Edgesub Core - endpoint classification, link synthesis and rendering.
//!
//! This crate holds the subscription pipeline:
//!
//! ```text
//! sources → Endpoint → PortPlan → LinkSynthesizer → LinkDescriptor → Renderer
//! ```
//!
//! Nothing here performs network I/O. Endpoint sources are reached through the
//! [`EndpointSource`] trait and every request-level policy travels in a
//! [`SubscriptionRequest`] value, so one aggregation never observes another.
//!
//! ## Example
//!
//! ```
//! use edgesub_core::{
//!     render, Credential, Endpoint, RenderTarget, SynthContext, VlessSynthesizer,
//!     LinkSynthesizer,
//! };
//!
//! let credential = Credential::parse("123e4567-e89b-12d3-a456-426614174000").unwrap();
//! let ctx = SynthContext::new(&credential, "example.com", "/");
//! let endpoint = Endpoint::new("worker.example.net").with_port(443);
//!
//! let links = VlessSynthesizer.synthesize_all(&[endpoint], false, &ctx);
//! assert_eq!(links.len(), 1);
//! assert!(links[0].name().ends_with("-443-WS-TLS"));
//!
//! let out = render(&links, RenderTarget::StructuredYaml).unwrap();
//! assert!(out.body.contains("servername: example.com"));
//! ```

pub mod aggregate;
pub mod credential;
pub mod endpoint;
pub mod error;
pub mod link;
pub mod port_plan;
pub mod render;
pub mod synth;

pub use aggregate::{
    aggregate, sentinel_link, EndpointSource, ProtocolToggles, ScrapeFilter, SourceQuery,
    SourceSet, SourceToggles, SubscriptionRequest, NATIVE_LABEL,
};
pub use credential::Credential;
pub use endpoint::{Carrier, Endpoint, SourceKind};
pub use error::{CredentialError, LinkParseError, RenderError, SourceError};
pub use link::{LinkDescriptor, LinkRecord, Protocol, TlsSettings, WsTransport};
pub use port_plan::{classify_port, plan_ports, PlaintextPolicy, PortClass, PortPlan};
pub use render::{render, RenderTarget, Rendered, Renderer};
pub use synth::{
    LinkSynthesizer, SynthContext, TrojanSynthesizer, VlessSynthesizer, VmessSynthesizer,
};
