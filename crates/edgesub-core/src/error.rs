//! Error types for the subscription pipeline.

use thiserror::Error;

/// The credential is not a canonical 8-4-4-4-12 hex UUID.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid credential: {0:?} is not a UUID")]
pub struct CredentialError(pub String);

/// Failure reported by an endpoint source.
///
/// The aggregation driver never propagates these; a failed source contributes
/// zero endpoints.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The upstream could not be reached or answered with an error.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// The upstream did not answer within the configured bound.
    #[error("fetch timed out after {0:?}")]
    Timeout(std::time::Duration),

    /// The upstream answered but nothing usable could be parsed.
    #[error("parse failed: {0}")]
    Parse(String),
}

/// A share link could not be decoded back into a record.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LinkParseError {
    /// Scheme is not one of `vless`, `trojan`, `vmess`.
    #[error("unsupported scheme: {0}")]
    UnsupportedScheme(String),

    /// The link is not a valid URI.
    #[error("malformed link: {0}")]
    Malformed(String),

    /// A required component is absent.
    #[error("missing {0}")]
    Missing(&'static str),

    /// The VMess payload is not base64-wrapped JSON.
    #[error("invalid vmess payload: {0}")]
    VmessPayload(String),
}

/// Rendering failed as a whole.
///
/// Individual descriptors that cannot be rendered are skipped, so this is only
/// raised when the output serializer itself fails.
#[derive(Debug, Error)]
pub enum RenderError {
    /// YAML serialization error.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
