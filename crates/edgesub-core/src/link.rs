//! Link records and the share-link codec.
//!
//! A [`LinkRecord`] is the structured form of one synthesized connection:
//! protocol, credential, address, port, TLS settings, websocket transport and
//! display name. Renderers consume records directly; the share-link URI is
//! produced once, when the [`LinkDescriptor`] is built, and can be decoded back
//! with [`LinkDescriptor::parse`].

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use base64::{engine::general_purpose::STANDARD, Engine};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::{Deserialize, Serialize};
use url::{form_urlencoded, Url};

use crate::error::LinkParseError;

/// TLS client fingerprint advertised on every TLS link.
pub const TLS_FINGERPRINT: &str = "chrome";

/// Characters left unescaped in a display-name fragment.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Supported proxy protocols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Primary protocol; the credential is a user id.
    Vless,
    /// The credential is a password.
    Trojan,
    /// Opaque base64 JSON record.
    Vmess,
}

impl Protocol {
    /// URI scheme, also the client-side type name.
    pub fn scheme(&self) -> &'static str {
        match self {
            Protocol::Vless => "vless",
            Protocol::Trojan => "trojan",
            Protocol::Vmess => "vmess",
        }
    }

    /// Parses a URI scheme.
    pub fn from_scheme(scheme: &str) -> Option<Self> {
        match scheme.to_ascii_lowercase().as_str() {
            "vless" => Some(Protocol::Vless),
            "trojan" => Some(Protocol::Trojan),
            "vmess" => Some(Protocol::Vmess),
            _ => None,
        }
    }
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// TLS parameters of a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TlsSettings {
    /// Server name indication.
    pub sni: String,
    /// Client hello fingerprint.
    pub fingerprint: String,
}

impl TlsSettings {
    /// TLS towards `sni` with the default fingerprint.
    pub fn new(sni: impl Into<String>) -> Self {
        Self {
            sni: sni.into(),
            fingerprint: TLS_FINGERPRINT.to_string(),
        }
    }
}

/// Websocket transport parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WsTransport {
    /// `Host` header.
    pub host: String,
    /// Request path.
    pub path: String,
}

/// Structured form of one link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub protocol: Protocol,
    pub credential: String,
    /// Bare address, IPv6 without brackets.
    pub address: String,
    pub port: u16,
    /// Present when the link uses TLS.
    pub tls: Option<TlsSettings>,
    pub transport: WsTransport,
    /// Display name.
    pub name: String,
}

impl LinkRecord {
    /// Returns true if the link uses TLS.
    pub fn is_tls(&self) -> bool {
        self.tls.is_some()
    }

    /// Returns the address bracketed for use in a URI authority.
    pub fn authority_host(&self) -> Cow<'_, str> {
        if self.address.contains(':') {
            Cow::Owned(format!("[{}]", self.address))
        } else {
            Cow::Borrowed(&self.address)
        }
    }

    /// Serializes the record to its share-link form.
    pub fn to_uri(&self) -> String {
        match self.protocol {
            Protocol::Vless | Protocol::Trojan => self.to_url_link(),
            Protocol::Vmess => self.to_vmess_link(),
        }
    }

    fn to_url_link(&self) -> String {
        let mut query = form_urlencoded::Serializer::new(String::new());
        if self.protocol == Protocol::Vless {
            query.append_pair("encryption", "none");
        }
        match &self.tls {
            Some(tls) => {
                query.append_pair("security", "tls");
                query.append_pair("sni", &tls.sni);
                query.append_pair("fp", &tls.fingerprint);
            }
            None => {
                query.append_pair("security", "none");
            }
        }
        query.append_pair("type", "ws");
        query.append_pair("host", &self.transport.host);
        query.append_pair("path", &self.transport.path);

        format!(
            "{}://{}@{}:{}?{}#{}",
            self.protocol.scheme(),
            self.credential,
            self.authority_host(),
            self.port,
            query.finish(),
            utf8_percent_encode(&self.name, COMPONENT)
        )
    }

    fn to_vmess_link(&self) -> String {
        let payload = VmessPayload::from(self);
        // Serializing a struct of strings cannot fail.
        let json = serde_json::to_string(&payload).unwrap_or_default();
        format!("vmess://{}", STANDARD.encode(json))
    }
}

/// The VMess share-link JSON record, in canonical field order.
#[derive(Debug, Serialize, Deserialize)]
struct VmessPayload {
    #[serde(default)]
    v: String,
    #[serde(default)]
    ps: String,
    add: String,
    port: String,
    id: String,
    #[serde(default)]
    aid: String,
    #[serde(default)]
    scy: String,
    #[serde(default)]
    net: String,
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    host: String,
    #[serde(default)]
    path: String,
    #[serde(default)]
    tls: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    sni: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fp: Option<String>,
}

impl From<&LinkRecord> for VmessPayload {
    fn from(record: &LinkRecord) -> Self {
        Self {
            v: "2".to_string(),
            ps: record.name.clone(),
            add: record.address.clone(),
            port: record.port.to_string(),
            id: record.credential.clone(),
            aid: "0".to_string(),
            scy: "auto".to_string(),
            net: "ws".to_string(),
            kind: "none".to_string(),
            host: record.transport.host.clone(),
            path: record.transport.path.clone(),
            tls: if record.is_tls() { "tls" } else { "none" }.to_string(),
            sni: record.tls.as_ref().map(|t| t.sni.clone()),
            fp: record.tls.as_ref().map(|t| t.fingerprint.clone()),
        }
    }
}

impl TryFrom<VmessPayload> for LinkRecord {
    type Error = LinkParseError;

    fn try_from(p: VmessPayload) -> Result<Self, Self::Error> {
        let port = p
            .port
            .trim()
            .parse()
            .map_err(|_| LinkParseError::Missing("port"))?;
        if p.add.is_empty() {
            return Err(LinkParseError::Missing("host"));
        }
        if p.id.is_empty() {
            return Err(LinkParseError::Missing("credential"));
        }
        let tls = (p.tls == "tls").then(|| TlsSettings {
            sni: p.sni.unwrap_or_else(|| p.host.clone()),
            fingerprint: p.fp.unwrap_or_else(|| TLS_FINGERPRINT.to_string()),
        });
        Ok(LinkRecord {
            protocol: Protocol::Vmess,
            credential: p.id,
            address: strip_brackets(&p.add).to_string(),
            port,
            tls,
            transport: WsTransport {
                host: p.host,
                path: if p.path.is_empty() { "/".to_string() } else { p.path },
            },
            name: p.ps,
        })
    }
}

fn strip_brackets(host: &str) -> &str {
    host.strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host)
}

/// A synthesized link: its structured record plus the serialized URI.
///
/// Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDescriptor {
    record: LinkRecord,
    uri: String,
}

impl LinkDescriptor {
    /// Builds a descriptor, serializing the record.
    pub fn new(record: LinkRecord) -> Self {
        let uri = record.to_uri();
        Self { record, uri }
    }

    /// Decodes a `vless://`, `trojan://` or `vmess://` share link.
    ///
    /// The original text is kept as the descriptor's URI.
    pub fn parse(link: &str) -> Result<Self, LinkParseError> {
        let link = link.trim();
        let (scheme, rest) = link
            .split_once("://")
            .ok_or_else(|| LinkParseError::Malformed(link.to_string()))?;
        let protocol = Protocol::from_scheme(scheme)
            .ok_or_else(|| LinkParseError::UnsupportedScheme(scheme.to_string()))?;

        let record = match protocol {
            Protocol::Vmess => parse_vmess(rest)?,
            Protocol::Vless | Protocol::Trojan => parse_url_link(protocol, link)?,
        };

        Ok(Self {
            record,
            uri: link.to_string(),
        })
    }

    /// The structured record.
    pub fn record(&self) -> &LinkRecord {
        &self.record
    }

    /// The share-link URI.
    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// The display name.
    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// The protocol.
    pub fn protocol(&self) -> Protocol {
        self.record.protocol
    }
}

impl fmt::Display for LinkDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.uri)
    }
}

fn parse_url_link(protocol: Protocol, link: &str) -> Result<LinkRecord, LinkParseError> {
    let url = Url::parse(link).map_err(|e| LinkParseError::Malformed(e.to_string()))?;

    let credential = percent_decode_str(url.username())
        .decode_utf8_lossy()
        .into_owned();
    if credential.is_empty() {
        return Err(LinkParseError::Missing("credential"));
    }
    let address = url
        .host_str()
        .map(strip_brackets)
        .filter(|h| !h.is_empty())
        .ok_or(LinkParseError::Missing("host"))?
        .to_string();
    let port = url.port().ok_or(LinkParseError::Missing("port"))?;

    let mut params: HashMap<String, String> = url.query_pairs().into_owned().collect();
    let host = params.remove("host").unwrap_or_default();
    let path = params
        .remove("path")
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| "/".to_string());
    let tls = (params.get("security").map(String::as_str) == Some("tls")).then(|| TlsSettings {
        sni: params.remove("sni").unwrap_or_else(|| host.clone()),
        fingerprint: params
            .remove("fp")
            .unwrap_or_else(|| TLS_FINGERPRINT.to_string()),
    });
    let name = url
        .fragment()
        .map(|f| percent_decode_str(f).decode_utf8_lossy().into_owned())
        .unwrap_or_default();

    Ok(LinkRecord {
        protocol,
        credential,
        address,
        port,
        tls,
        transport: WsTransport { host, path },
        name,
    })
}

fn parse_vmess(payload: &str) -> Result<LinkRecord, LinkParseError> {
    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| LinkParseError::VmessPayload(e.to_string()))?;
    let payload: VmessPayload = serde_json::from_slice(&bytes)
        .map_err(|e| LinkParseError::VmessPayload(e.to_string()))?;
    LinkRecord::try_from(payload)
}
