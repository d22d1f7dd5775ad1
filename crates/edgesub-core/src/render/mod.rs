//! Subscription renderers.
//!
//! A [`RenderTarget`] selects one [`Renderer`] from a fixed table. Renderers
//! read the structured [`LinkRecord`](crate::LinkRecord) of each descriptor;
//! a descriptor a renderer cannot express is skipped, and a renderer whose
//! every descriptor was skipped still produces a structurally valid document.

mod clash;
mod raw;
mod surge;

pub use clash::ClashRenderer;
pub use raw::Base64Renderer;
pub use surge::SurgeRenderer;

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::RenderError;
use crate::link::LinkDescriptor;

/// Content type of plain-text payloads.
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Content type of YAML payloads.
pub const TEXT_YAML: &str = "text/yaml; charset=utf-8";

/// Output format of a subscription.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RenderTarget {
    /// Base64 of the newline-joined links.
    #[default]
    Raw,
    /// Clash-style YAML config.
    StructuredYaml,
    /// Surge-style INI proxy list.
    IniProxy,
    /// Quantumult alias; same bytes as `Raw`.
    Base64Ini,
}

impl RenderTarget {
    /// Resolves a client-supplied target name.
    ///
    /// Unknown or absent names render as [`RenderTarget::Raw`].
    pub fn from_name(name: Option<&str>) -> Self {
        let Some(name) = name else {
            return RenderTarget::Raw;
        };
        match name.trim().to_ascii_lowercase().as_str() {
            "clash" | "clashr" | "structured-yaml" => RenderTarget::StructuredYaml,
            "surge" | "surge2" | "surge3" | "surge4" | "ini-proxy" => RenderTarget::IniProxy,
            "quantumult" | "quanx" | "base64-ini" => RenderTarget::Base64Ini,
            _ => RenderTarget::Raw,
        }
    }

    /// Canonical name.
    pub fn name(&self) -> &'static str {
        match self {
            RenderTarget::Raw => "raw",
            RenderTarget::StructuredYaml => "structured-yaml",
            RenderTarget::IniProxy => "ini-proxy",
            RenderTarget::Base64Ini => "base64-ini",
        }
    }

    /// The renderer for this target.
    pub fn renderer(self) -> &'static dyn Renderer {
        match self {
            RenderTarget::Raw | RenderTarget::Base64Ini => &Base64Renderer,
            RenderTarget::StructuredYaml => &ClashRenderer,
            RenderTarget::IniProxy => &SurgeRenderer,
        }
    }
}

impl FromStr for RenderTarget {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(Some(s)))
    }
}

impl fmt::Display for RenderTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A rendered subscription payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rendered {
    pub body: String,
    pub content_type: &'static str,
}

/// Trait for subscription renderers.
pub trait Renderer: Send + Sync {
    /// Returns the renderer name.
    fn name(&self) -> &'static str;

    /// Renders the descriptors.
    fn render(&self, links: &[LinkDescriptor]) -> Result<Rendered, RenderError>;
}

/// Renders `links` in the format selected by `target`.
pub fn render(links: &[LinkDescriptor], target: RenderTarget) -> Result<Rendered, RenderError> {
    let renderer = target.renderer();
    debug!(renderer = renderer.name(), links = links.len(), "Rendering subscription");
    renderer.render(links)
}

/// Display names handed out within one document.
///
/// A repeated name gets the first free `-2`, `-3`, ... suffix.
#[derive(Debug, Default)]
pub(crate) struct UniqueNames {
    taken: HashSet<String>,
}

impl UniqueNames {
    pub(crate) fn claim(&mut self, name: &str) -> String {
        if self.taken.insert(name.to_string()) {
            return name.to_string();
        }
        (2..)
            .map(|n| format!("{name}-{n}"))
            .find(|candidate| self.taken.insert(candidate.clone()))
            .unwrap_or_else(|| name.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::sentinel_link;

    #[test]
    fn target_aliases() {
        assert_eq!(RenderTarget::from_name(None), RenderTarget::Raw);
        assert_eq!(RenderTarget::from_name(Some("base64")), RenderTarget::Raw);
        assert_eq!(RenderTarget::from_name(Some("unknown")), RenderTarget::Raw);
        assert_eq!(RenderTarget::from_name(Some("Clash")), RenderTarget::StructuredYaml);
        assert_eq!(RenderTarget::from_name(Some("clashr")), RenderTarget::StructuredYaml);
        assert_eq!(RenderTarget::from_name(Some("surge3")), RenderTarget::IniProxy);
        assert_eq!(RenderTarget::from_name(Some("quanx")), RenderTarget::Base64Ini);
        assert_eq!("quantumult".parse::<RenderTarget>().unwrap(), RenderTarget::Base64Ini);
    }

    #[test]
    fn canonical_names_round_trip() {
        for target in [
            RenderTarget::Raw,
            RenderTarget::StructuredYaml,
            RenderTarget::IniProxy,
            RenderTarget::Base64Ini,
        ] {
            assert_eq!(RenderTarget::from_name(Some(target.name())), target);
        }
    }

    #[test]
    fn base64_ini_matches_raw_bytes() {
        let links = vec![sentinel_link()];
        let raw = render(&links, RenderTarget::Raw).unwrap();
        let ini = render(&links, RenderTarget::Base64Ini).unwrap();
        assert_eq!(raw, ini);
    }

    #[test]
    fn every_renderer_accepts_the_sentinel() {
        let links = vec![sentinel_link()];
        for target in [
            RenderTarget::Raw,
            RenderTarget::StructuredYaml,
            RenderTarget::IniProxy,
            RenderTarget::Base64Ini,
        ] {
            let out = render(&links, target).unwrap();
            assert!(!out.body.is_empty(), "{target} rendered nothing");
        }
    }

    #[test]
    fn content_types() {
        let links = vec![sentinel_link()];
        assert_eq!(render(&links, RenderTarget::Raw).unwrap().content_type, TEXT_PLAIN);
        assert_eq!(
            render(&links, RenderTarget::StructuredYaml).unwrap().content_type,
            TEXT_YAML
        );
        assert_eq!(render(&links, RenderTarget::IniProxy).unwrap().content_type, TEXT_PLAIN);
    }

    #[test]
    fn targets_select_renderers() {
        assert_eq!(RenderTarget::Raw.renderer().name(), "base64");
        assert_eq!(RenderTarget::Base64Ini.renderer().name(), "base64");
        assert_eq!(RenderTarget::StructuredYaml.renderer().name(), "clash");
        assert_eq!(RenderTarget::IniProxy.renderer().name(), "surge");
    }

    #[test]
    fn unique_names_suffix_repeats() {
        let mut names = UniqueNames::default();
        assert_eq!(names.claim("a"), "a");
        assert_eq!(names.claim("a"), "a-2");
        assert_eq!(names.claim("a-3"), "a-3");
        assert_eq!(names.claim("a"), "a-4");
        assert_eq!(names.claim("b"), "b");
    }
}
