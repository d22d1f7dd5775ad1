//! Uniform endpoint shape emitted by every source adapter.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Which source produced an endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// The host the subscription was requested from.
    Native,
    /// Built-in table of CDN-fronted domains.
    StaticDomain,
    /// Scraped address table with carrier tags.
    Scraped,
    /// Remote `host:port#label` list.
    RemoteList,
}

impl SourceKind {
    /// Returns a short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            SourceKind::Native => "native",
            SourceKind::StaticDomain => "static_domain",
            SourceKind::Scraped => "scraped",
            SourceKind::RemoteList => "remote_list",
        }
    }
}

/// Mobile carrier a scraped address is optimised for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Carrier {
    Mobile,
    Unicom,
    Telecom,
}

impl Carrier {
    /// Detects the carrier from a scraped line name.
    ///
    /// Recognises both the Chinese carrier names used by the upstream table
    /// and their English names.
    pub fn detect(line_name: &str) -> Option<Carrier> {
        let lower = line_name.to_lowercase();
        if line_name.contains("移动") || lower.contains("mobile") {
            Some(Carrier::Mobile)
        } else if line_name.contains("联通") || lower.contains("unicom") {
            Some(Carrier::Unicom)
        } else if line_name.contains("电信") || lower.contains("telecom") {
            Some(Carrier::Telecom)
        } else {
            None
        }
    }
}

/// A candidate connection target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    /// Hostname, IPv4 literal, or bare IPv6 literal (no brackets).
    pub address: String,
    /// Explicit port; default ports apply when absent.
    pub port: Option<u16>,
    /// Display name source; falls back to `address`.
    pub label: Option<String>,
    /// Data-center code appended to the display name.
    pub region: Option<String>,
    /// Carrier tag, scraped endpoints only.
    pub carrier: Option<Carrier>,
    /// Producing source.
    pub origin: SourceKind,
}

impl Endpoint {
    /// Creates a native endpoint for `address` with no port or label.
    ///
    /// Surrounding brackets on an IPv6 literal are removed.
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into();
        let address = match address
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
        {
            Some(inner) => inner.to_string(),
            None => address,
        };
        Self {
            address,
            port: None,
            label: None,
            region: None,
            carrier: None,
            origin: SourceKind::Native,
        }
    }

    /// Sets the explicit port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the display label. Blank labels are ignored.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        let label = label.into();
        if !label.trim().is_empty() {
            self.label = Some(label);
        }
        self
    }

    /// Sets the region code. Blank codes are ignored.
    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        let region = region.into();
        let region = region.trim();
        if !region.is_empty() {
            self.region = Some(region.to_string());
        }
        self
    }

    /// Sets the carrier tag.
    pub fn with_carrier(mut self, carrier: Option<Carrier>) -> Self {
        self.carrier = carrier;
        self
    }

    /// Sets the producing source.
    pub fn with_origin(mut self, origin: SourceKind) -> Self {
        self.origin = origin;
        self
    }

    /// Returns true if the address is an IPv6 literal.
    pub fn is_ipv6(&self) -> bool {
        self.address.contains(':')
    }

    /// Returns the address as it must appear in a URI authority.
    pub fn authority_host(&self) -> Cow<'_, str> {
        if self.is_ipv6() {
            Cow::Owned(format!("[{}]", self.address))
        } else {
            Cow::Borrowed(&self.address)
        }
    }

    /// Returns `{label}[-{region}]` with whitespace in the label replaced by `_`.
    pub fn display_base(&self) -> String {
        let label = self.label.as_deref().unwrap_or(&self.address);
        let mut base: String = label
            .chars()
            .map(|c| if c.is_whitespace() { '_' } else { c })
            .collect();
        if let Some(region) = &self.region {
            base.push('-');
            base.push_str(region);
        }
        base
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_base_falls_back_to_address() {
        let e = Endpoint::new("cf.example.org");
        assert_eq!(e.display_base(), "cf.example.org");
    }

    #[test]
    fn display_base_replaces_whitespace_and_appends_region() {
        let e = Endpoint::new("1.1.1.1")
            .with_label("China Telecom  Line")
            .with_region(" SJC ");
        assert_eq!(e.display_base(), "China_Telecom__Line-SJC");
    }

    #[test]
    fn blank_label_and_region_are_ignored() {
        let e = Endpoint::new("1.1.1.1").with_label("  ").with_region("");
        assert!(e.label.is_none());
        assert!(e.region.is_none());
        assert_eq!(e.display_base(), "1.1.1.1");
    }

    #[test]
    fn ipv6_is_bracketed_in_authority() {
        let e = Endpoint::new("2606:4700::1111");
        assert!(e.is_ipv6());
        assert_eq!(e.authority_host(), "[2606:4700::1111]");

        let v4 = Endpoint::new("1.2.3.4");
        assert!(!v4.is_ipv6());
        assert_eq!(v4.authority_host(), "1.2.3.4");
    }

    #[test]
    fn new_strips_brackets() {
        let e = Endpoint::new("[2606:4700::1]");
        assert_eq!(e.address, "2606:4700::1");
    }

    #[test]
    fn carrier_detection() {
        assert_eq!(Carrier::detect("移动"), Some(Carrier::Mobile));
        assert_eq!(Carrier::detect("联通 优选"), Some(Carrier::Unicom));
        assert_eq!(Carrier::detect("电信"), Some(Carrier::Telecom));
        assert_eq!(Carrier::detect("China Telecom"), Some(Carrier::Telecom));
        assert_eq!(Carrier::detect("多线"), None);
    }
}
