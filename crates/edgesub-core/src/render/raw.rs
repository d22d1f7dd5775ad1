//! Base64 link list, used for `raw` and `base64-ini`.

use base64::{engine::general_purpose::STANDARD, Engine};

use super::{Rendered, Renderer, TEXT_PLAIN};
use crate::error::RenderError;
use crate::link::LinkDescriptor;

/// Base64 of the newline-joined share links.
#[derive(Debug, Clone, Copy, Default)]
pub struct Base64Renderer;

impl Renderer for Base64Renderer {
    fn name(&self) -> &'static str {
        "base64"
    }

    fn render(&self, links: &[LinkDescriptor]) -> Result<Rendered, RenderError> {
        let joined = links
            .iter()
            .map(LinkDescriptor::uri)
            .collect::<Vec<_>>()
            .join("\n");
        Ok(Rendered {
            body: STANDARD.encode(joined),
            content_type: TEXT_PLAIN,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::sentinel_link;

    #[test]
    fn decodes_to_newline_joined_links() {
        let a = LinkDescriptor::parse("trojan://pw@a.example:443?security=tls#a").unwrap();
        let b = sentinel_link();
        let out = Base64Renderer.render(&[a.clone(), b.clone()]).unwrap();

        let decoded = String::from_utf8(STANDARD.decode(out.body).unwrap()).unwrap();
        assert_eq!(decoded, format!("{}\n{}", a.uri(), b.uri()));
    }
}
