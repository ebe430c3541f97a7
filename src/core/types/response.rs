//! HTTP response as returned by the network and middleware chain.

use crate::core::protocol::{self, LinkHeader};
use bytes::Bytes;
use std::collections::BTreeMap;
use url::Url;

/// A fully buffered HTTP response.
///
/// Header names are stored lowercased. Repeated headers are joined with
/// `", "` which keeps list-valued headers such as `Link` parseable.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    /// Final URL of the exchange, when known.
    pub url: Option<Url>,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Bytes>) -> Self {
        HttpResponse {
            status,
            url: None,
            headers: BTreeMap::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Add a header value, joining with an existing one.
    pub fn append_header(&mut self, name: impl AsRef<str>, value: &str) {
        let name = name.as_ref().to_ascii_lowercase();
        match self.headers.get_mut(&name) {
            Some(existing) => {
                existing.push_str(", ");
                existing.push_str(value);
            }
            None => {
                self.headers.insert(name, value.to_string());
            }
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    pub fn has_header(&self, name: &str) -> bool {
        self.header(name).is_some()
    }

    /// Media type of the body without parameters, lowercased.
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type")
            .and_then(protocol::parse_media_type)
    }

    /// Links from the `Link` header; an unparsable header yields none.
    pub fn link_header(&self) -> Vec<LinkHeader> {
        match self.header("link") {
            Some(value) => protocol::parse_link_header(value).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed Link header: {}", e);
                Vec::new()
            }),
            None => Vec::new(),
        }
    }

    pub fn body_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    #[inline]
    pub fn is_no_content(&self) -> bool {
        self.status == 204
    }
}

impl Default for HttpResponse {
    fn default() -> Self {
        HttpResponse::new(200, Bytes::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_case_insensitive() {
        let response = HttpResponse::new(200, "test").with_header("Content-Type", "text/html");
        assert_eq!(response.header("content-type"), Some("text/html"));
        assert_eq!(response.header("CONTENT-TYPE"), Some("text/html"));
    }

    #[test]
    fn test_content_type_strips_parameters() {
        let response = HttpResponse::new(200, "{}")
            .with_header("content-type", "Application/HAL+JSON; charset=utf-8");
        assert_eq!(response.content_type().as_deref(), Some("application/hal+json"));
    }

    #[test]
    fn test_content_type_missing() {
        assert!(HttpResponse::new(200, "").content_type().is_none());
    }

    #[test]
    fn test_append_header_joins() {
        let mut response = HttpResponse::new(200, "");
        response.append_header("Link", "</a>; rel=\"next\"");
        response.append_header("link", "</b>; rel=\"prev\"");
        assert_eq!(response.link_header().len(), 2);
    }

    #[test]
    fn test_is_success() {
        assert!(HttpResponse::new(200, "").is_success());
        assert!(HttpResponse::new(204, "").is_success());
        assert!(!HttpResponse::new(304, "").is_success());
        assert!(!HttpResponse::new(404, "").is_success());
    }

    #[test]
    fn test_body_str_invalid_utf8() {
        let response = HttpResponse::new(200, vec![0x80, 0x81]);
        assert_eq!(response.body_str(), None);
    }
}
