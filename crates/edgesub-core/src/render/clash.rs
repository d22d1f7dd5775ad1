//! Clash-style YAML config.

use serde::Serialize;
use tracing::debug;

use super::{Rendered, Renderer, UniqueNames, TEXT_YAML};
use crate::error::RenderError;
use crate::link::{LinkDescriptor, LinkRecord, Protocol};

/// Group listing every node.
pub const PROXY_GROUP: &str = "PROXY";

/// Primary selection group, target of the catch-all rule.
pub const SELECT_GROUP: &str = "🚀 Node Select";

/// Direct-first group.
pub const DIRECT_GROUP: &str = "🎯 Direct";

/// Node inserted when no descriptor could be rendered.
pub const PLACEHOLDER_NODE: &str = "Placeholder-Node";

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ClashConfig {
    port: u16,
    socks_port: u16,
    allow_lan: bool,
    mode: &'static str,
    log_level: &'static str,
    external_controller: &'static str,
    proxies: Vec<ClashProxy>,
    proxy_groups: Vec<ProxyGroup>,
    rules: Vec<&'static str>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "kebab-case")]
struct ClashProxy {
    name: String,
    #[serde(rename = "type")]
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uuid: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cipher: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    network: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    servername: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    skip_cert_verify: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ws_opts: Option<WsOpts>,
}

#[derive(Debug, Serialize)]
struct WsOpts {
    path: String,
    headers: WsHeaders,
}

#[derive(Debug, Serialize)]
struct WsHeaders {
    #[serde(rename = "Host")]
    host: String,
}

#[derive(Debug, Serialize)]
struct ProxyGroup {
    name: &'static str,
    #[serde(rename = "type")]
    kind: &'static str,
    proxies: Vec<String>,
}

impl ClashProxy {
    fn placeholder() -> Self {
        Self {
            name: PLACEHOLDER_NODE.to_string(),
            kind: "direct",
            server: None,
            port: None,
            uuid: None,
            password: None,
            cipher: None,
            network: None,
            tls: None,
            servername: None,
            skip_cert_verify: None,
            ws_opts: None,
        }
    }
}

impl TryFrom<&LinkRecord> for ClashProxy {
    type Error = &'static str;

    fn try_from(r: &LinkRecord) -> Result<Self, Self::Error> {
        let (uuid, password, cipher) = match r.protocol {
            Protocol::Vless => (Some(r.credential.clone()), None, Some("auto")),
            Protocol::Trojan => (None, Some(r.credential.clone()), None),
            Protocol::Vmess => return Err("vmess records are opaque"),
        };
        if r.address.is_empty() || r.credential.is_empty() || r.port == 0 {
            return Err("incomplete record");
        }

        Ok(Self {
            name: r.name.clone(),
            kind: r.protocol.scheme(),
            server: Some(r.address.clone()),
            port: Some(r.port),
            uuid,
            password,
            cipher,
            network: Some("ws"),
            tls: Some(r.is_tls()),
            servername: r.tls.as_ref().map(|t| t.sni.clone()),
            skip_cert_verify: r.tls.as_ref().map(|_| false),
            ws_opts: Some(WsOpts {
                path: r.transport.path.clone(),
                headers: WsHeaders {
                    host: r.transport.host.clone(),
                },
            }),
        })
    }
}

/// Renders a Clash config with two selection groups and a minimal rule set.
///
/// VMess descriptors are left out. Proxy names are unique within the document.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClashRenderer;

impl Renderer for ClashRenderer {
    fn name(&self) -> &'static str {
        "clash"
    }

    fn render(&self, links: &[LinkDescriptor]) -> Result<Rendered, RenderError> {
        let mut unique = UniqueNames::default();
        let mut proxies: Vec<ClashProxy> = links
            .iter()
            .filter_map(|link| match ClashProxy::try_from(link.record()) {
                Ok(mut proxy) => {
                    proxy.name = unique.claim(&proxy.name);
                    Some(proxy)
                }
                Err(reason) => {
                    debug!(
                        renderer = self.name(),
                        name = link.name(),
                        reason,
                        "Skipping descriptor"
                    );
                    None
                }
            })
            .collect();
        if proxies.is_empty() {
            proxies.push(ClashProxy::placeholder());
        }

        let names: Vec<String> = proxies.iter().map(|p| p.name.clone()).collect();
        let config = ClashConfig {
            port: 7890,
            socks_port: 7891,
            allow_lan: false,
            mode: "rule",
            log_level: "info",
            external_controller: "127.0.0.1:9090",
            proxies,
            proxy_groups: vec![
                ProxyGroup {
                    name: PROXY_GROUP,
                    kind: "select",
                    proxies: names.clone(),
                },
                ProxyGroup {
                    name: SELECT_GROUP,
                    kind: "select",
                    proxies: names,
                },
                ProxyGroup {
                    name: DIRECT_GROUP,
                    kind: "select",
                    proxies: vec!["DIRECT".to_string(), SELECT_GROUP.to_string()],
                },
            ],
            rules: vec![
                "DOMAIN-SUFFIX,local,DIRECT",
                "IP-CIDR,127.0.0.0/8,DIRECT",
                "GEOIP,CN,DIRECT",
                "MATCH,🚀 Node Select",
            ],
        };

        Ok(Rendered {
            body: serde_yaml::to_string(&config)?,
            content_type: TEXT_YAML,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_yaml::Value;

    use super::*;
    use crate::aggregate::sentinel_link;
    use crate::credential::Credential;
    use crate::endpoint::Endpoint;
    use crate::synth::{
        LinkSynthesizer, SynthContext, TrojanSynthesizer, VlessSynthesizer, VmessSynthesizer,
    };

    const UUID: &str = "123e4567-e89b-12d3-a456-426614174000";

    fn render_yaml(links: &[LinkDescriptor]) -> Value {
        let out = ClashRenderer.render(links).unwrap();
        assert_eq!(out.content_type, TEXT_YAML);
        serde_yaml::from_str(&out.body).unwrap()
    }

    fn synth(s: &dyn LinkSynthesizer, endpoint: Endpoint) -> Vec<LinkDescriptor> {
        let c = Credential::parse(UUID).unwrap();
        let ctx = SynthContext::new(&c, "example.com", "/ws");
        s.synthesize_endpoint(&endpoint, false, &ctx)
    }

    #[test]
    fn header_groups_and_rules() {
        let doc = render_yaml(&[sentinel_link()]);
        assert_eq!(doc["port"], 7890);
        assert_eq!(doc["socks-port"], 7891);
        assert_eq!(doc["allow-lan"], false);
        assert_eq!(doc["mode"], "rule");

        let groups = doc["proxy-groups"].as_sequence().unwrap();
        assert_eq!(groups.len(), 3);
        assert_eq!(groups[0]["name"], PROXY_GROUP);
        assert_eq!(groups[1]["name"], SELECT_GROUP);
        assert_eq!(groups[0]["proxies"][0], "All-Sources-Failed");
        assert_eq!(groups[1]["proxies"][0], "All-Sources-Failed");

        let rules = doc["rules"].as_sequence().unwrap();
        assert_eq!(rules.last().unwrap(), "MATCH,🚀 Node Select");
    }

    #[test]
    fn tls_vless_round_trip() {
        let links = synth(&VlessSynthesizer, Endpoint::new("2606:4700::1").with_port(2053));
        let doc = render_yaml(&links);
        let node = &doc["proxies"][0];

        assert_eq!(node["type"], "vless");
        assert_eq!(node["server"], "2606:4700::1");
        assert_eq!(node["port"], 2053);
        assert_eq!(node["uuid"], UUID);
        assert_eq!(node["cipher"], "auto");
        assert_eq!(node["network"], "ws");
        assert_eq!(node["tls"], true);
        assert_eq!(node["servername"], "example.com");
        assert_eq!(node["skip-cert-verify"], false);
        assert_eq!(node["ws-opts"]["path"], "/ws");
        assert_eq!(node["ws-opts"]["headers"]["Host"], "example.com");
    }

    #[test]
    fn tls_trojan_round_trip() {
        let links = synth(&TrojanSynthesizer, Endpoint::new("1.2.3.4").with_port(443));
        let doc = render_yaml(&links);
        let node = &doc["proxies"][0];

        assert_eq!(node["type"], "trojan");
        assert_eq!(node["port"], 443);
        assert_eq!(node["password"], UUID);
        assert_eq!(node["servername"], "example.com");
        assert!(node.get("uuid").is_none());
        assert!(node.get("cipher").is_none());
    }

    #[test]
    fn plaintext_node_has_no_servername() {
        let links = synth(&VlessSynthesizer, Endpoint::new("1.2.3.4").with_port(80));
        let doc = render_yaml(&links);
        let node = &doc["proxies"][0];
        assert_eq!(node["tls"], false);
        assert!(node.get("servername").is_none());
        assert!(node.get("skip-cert-verify").is_none());
    }

    #[test]
    fn vmess_is_excluded() {
        let mut links = synth(&VmessSynthesizer, Endpoint::new("1.2.3.4").with_port(443));
        links.extend(synth(&VlessSynthesizer, Endpoint::new("5.6.7.8").with_port(443)));
        let doc = render_yaml(&links);

        let proxies = doc["proxies"].as_sequence().unwrap();
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0]["server"], "5.6.7.8");
        assert_eq!(doc["proxy-groups"][0]["proxies"].as_sequence().unwrap().len(), 1);
    }

    #[test]
    fn only_vmess_yields_placeholder() {
        let links = synth(&VmessSynthesizer, Endpoint::new("1.2.3.4").with_port(443));
        let doc = render_yaml(&links);

        let proxies = doc["proxies"].as_sequence().unwrap();
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0]["name"], PLACEHOLDER_NODE);
        assert_eq!(proxies[0]["type"], "direct");
        assert_eq!(doc["proxy-groups"][1]["proxies"][0], PLACEHOLDER_NODE);
    }

    #[test]
    fn incomplete_records_fall_back_to_placeholder() {
        let base = synth(&VlessSynthesizer, Endpoint::new("1.2.3.4").with_port(443))
            .remove(0)
            .record()
            .clone();
        let mut no_address = base.clone();
        no_address.address.clear();
        let mut no_credential = base.clone();
        no_credential.credential.clear();
        let mut no_port = base;
        no_port.port = 0;

        let links: Vec<LinkDescriptor> = [no_address, no_credential, no_port]
            .into_iter()
            .map(LinkDescriptor::new)
            .collect();
        let doc = render_yaml(&links);

        let proxies = doc["proxies"].as_sequence().unwrap();
        assert_eq!(proxies.len(), 1);
        assert_eq!(proxies[0]["name"], PLACEHOLDER_NODE);
        assert_eq!(doc["proxy-groups"][0]["proxies"][0], PLACEHOLDER_NODE);
    }

    #[test]
    fn repeated_names_get_suffixes() {
        let mut links = Vec::new();
        for address in ["1.1.1.1", "2.2.2.2", "3.3.3.3"] {
            links.extend(synth(
                &VlessSynthesizer,
                Endpoint::new(address)
                    .with_label("电信")
                    .with_region("LAX")
                    .with_port(443),
            ));
        }
        let doc = render_yaml(&links);

        let names: Vec<&str> = doc["proxies"]
            .as_sequence()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec!["电信-LAX-443-WS-TLS", "电信-LAX-443-WS-TLS-2", "电信-LAX-443-WS-TLS-3"]
        );
        assert_eq!(doc["proxy-groups"][1]["proxies"][2], "电信-LAX-443-WS-TLS-3");
    }

    #[test]
    fn numeric_looking_names_stay_strings() {
        let links = synth(
            &VlessSynthesizer,
            Endpoint::new("1.2.3.4").with_label("123").with_port(443),
        );
        let doc = render_yaml(&links);
        assert_eq!(doc["proxies"][0]["name"], "123-443-WS-TLS");
    }
}
