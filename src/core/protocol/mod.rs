//! Protocol-level utilities: header grammar, media types, URI templates.

pub mod constants;
pub mod headers;
pub mod uri_template;

pub use constants::*;
pub use headers::*;
pub use uri_template::{expand_template, is_template};

use crate::core::error::Result;
use url::Url;

/// Resolve `href` against `base` (RFC 3986 reference resolution).
#[inline]
pub fn resolve(base: &Url, href: &str) -> Result<Url> {
    Ok(base.join(href)?)
}
