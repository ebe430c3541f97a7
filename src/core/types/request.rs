//! Outgoing HTTP request as seen by the middleware chain.

use bytes::Bytes;
use http::Method;
use std::collections::BTreeMap;
use url::Url;

/// Whether the exchange may populate the state cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheMode {
    #[default]
    Default,
    /// The response must not be stored as a new canonical representation.
    NoCache,
}

/// An HTTP request travelling through the middleware chain.
///
/// Header names are stored lowercased.
#[derive(Clone, Debug)]
pub struct HttpRequest {
    pub method: Method,
    pub url: Url,
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
    pub cache: CacheMode,
}

impl HttpRequest {
    pub fn new(method: Method, url: Url) -> Self {
        Self {
            method,
            url,
            headers: BTreeMap::new(),
            body: Bytes::new(),
            cache: CacheMode::Default,
        }
    }

    #[inline]
    pub fn get(url: Url) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn with_headers<I, K, V>(mut self, headers: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        for (k, v) in headers {
            self.set_header(k, v);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_cache_mode(mut self, cache: CacheMode) -> Self {
        self.cache = cache;
        self
    }

    pub fn set_header(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
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

    /// `scheme://host[:port]` of the target URL.
    pub fn origin(&self) -> String {
        self.url.origin().ascii_serialization()
    }

    /// GET, HEAD, OPTIONS and TRACE never change server state.
    #[inline]
    pub fn is_safe_method(&self) -> bool {
        is_safe_method(&self.method)
    }

    /// Identity of a request for de-duplication: method, URL and headers.
    pub(crate) fn dedup_key(&self) -> String {
        let mut key = format!("{} {}", self.method, self.url);
        for (k, v) in &self.headers {
            key.push('\n');
            key.push_str(k);
            key.push(':');
            key.push_str(v);
        }
        key
    }
}

#[inline]
pub fn is_safe_method(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_headers_lowercased() {
        let req = HttpRequest::get(url("https://example.org/")).with_header("Accept", "text/html");
        assert_eq!(req.headers.get("accept").map(String::as_str), Some("text/html"));
        assert_eq!(req.header("ACCEPT"), Some("text/html"));
    }

    #[test]
    fn test_safe_methods() {
        assert!(HttpRequest::get(url("https://example.org/")).is_safe_method());
        assert!(!HttpRequest::new(Method::POST, url("https://example.org/")).is_safe_method());
        assert!(!HttpRequest::new(Method::DELETE, url("https://example.org/")).is_safe_method());
    }

    #[test]
    fn test_origin() {
        let req = HttpRequest::get(url("https://api.example.org:8443/a/b?c=d"));
        assert_eq!(req.origin(), "https://api.example.org:8443");
    }

    #[test]
    fn test_dedup_key_depends_on_headers() {
        let a = HttpRequest::get(url("https://example.org/x"));
        let b = HttpRequest::get(url("https://example.org/x")).with_header("prefer", "transclude");
        let c = HttpRequest::get(url("https://example.org/x"));
        assert_ne!(a.dedup_key(), b.dedup_key());
        assert_eq!(a.dedup_key(), c.dedup_key());
    }
}
