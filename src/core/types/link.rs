//! A single typed link between resources.

use crate::core::error::Result;
use crate::core::protocol::{self, LinkHeader};
use serde_json::{Map, Value};
use url::Url;

/// A relation from a context resource to a target.
///
/// `href` may be relative or a URI template; it is resolved against
/// `context` only when needed. Two links that resolve to the same URI point
/// at the same cached resource.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Link {
    pub rel: String,
    pub href: String,
    pub context: Url,
    pub title: Option<String>,
    pub name: Option<String>,
    /// Hint for the target's media type (`type` attribute).
    pub media_type: Option<String>,
    pub hreflang: Option<String>,
    pub templated: bool,
}

impl Link {
    pub fn new(rel: impl Into<String>, href: impl Into<String>, context: Url) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
            context,
            title: None,
            name: None,
            media_type: None,
            hreflang: None,
            templated: false,
        }
    }

    /// A `self` link pointing at `uri`.
    pub fn to_self(uri: &Url) -> Self {
        Self::new(protocol::rels::SELF, uri.as_str(), uri.clone())
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub fn with_templated(mut self, templated: bool) -> Self {
        self.templated = templated;
        self
    }

    /// Absolute target URI. Templated links are expanded with no variables.
    pub fn resolve(&self) -> Result<Url> {
        if self.templated {
            return self.expand(&Map::new());
        }
        protocol::resolve(&self.context, &self.href)
    }

    /// Absolute target URI after URI-template expansion.
    ///
    /// Non-templated links ignore `vars`.
    pub fn expand(&self, vars: &Map<String, Value>) -> Result<Url> {
        if !self.templated {
            return protocol::resolve(&self.context, &self.href);
        }
        let expanded = protocol::expand_template(&self.href, vars)?;
        protocol::resolve(&self.context, &expanded)
    }

    /// Do both links resolve to the same absolute URI?
    pub fn same_target(&self, other: &Link) -> bool {
        match (self.resolve(), other.resolve()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }

    /// One link per relation type named in a `Link` header entry.
    pub fn from_header(header: &LinkHeader, context: &Url) -> Vec<Link> {
        header
            .rels
            .iter()
            .map(|rel| Link {
                rel: rel.clone(),
                href: header.href.clone(),
                context: header
                    .param("anchor")
                    .and_then(|anchor| context.join(anchor).ok())
                    .unwrap_or_else(|| context.clone()),
                title: header.param("title").map(str::to_string),
                name: header.param("name").map(str::to_string),
                media_type: header.param("type").map(str::to_string),
                hreflang: header.param("hreflang").map(str::to_string),
                templated: false,
            })
            .collect()
    }

    pub fn to_header(&self) -> LinkHeader {
        let mut header = LinkHeader::new(self.href.clone(), self.rel.clone());
        if let Some(title) = &self.title {
            header = header.with_param("title", title.clone());
        }
        if let Some(media_type) = &self.media_type {
            header = header.with_param("type", media_type.clone());
        }
        if let Some(hreflang) = &self.hreflang {
            header = header.with_param("hreflang", hreflang.clone());
        }
        header
    }
}
