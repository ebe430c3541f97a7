//! Configuration for the hypermedia client.
//!
//! # Configuration Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `request_timeout_ms` | 30000 | Per-request timeout of the native network |
//! | `pool_max_idle_per_host` | 100 | Idle connections kept per host |
//! | `proxy_url` | empty | Route all requests through this proxy |
//! | `user_agent` | crate name/version | `User-Agent` sent by the native network |
//! | `enable_logging` | false | Log every exchange at debug level |
//! | `collection_rels` | `item`, `items` | Embedded relations that populate `State::collection` |
//! | `default_content_types` | true | Register every built-in format |
//! | `cache_policy` | `Forever` | Which state cache the client starts with |
//!
//! # Examples
//!
//! ```
//! use hateoas_client::{CachePolicy, ClientConfig};
//! use std::time::Duration;
//!
//! let config = ClientConfig {
//!     cache_policy: CachePolicy::Short(Duration::from_secs(30)),
//!     ..Default::default()
//! };
//! assert!(config.collection_rels.contains(&"item".to_string()));
//! ```

use std::time::Duration;

/// How long fetched states stay in the client's cache.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum CachePolicy {
    /// Until invalidated by a mutation or an explicit clear.
    #[default]
    Forever,
    /// Until invalidated, or until the entry is older than the duration.
    Short(Duration),
    /// Nothing is kept; every `get()` hits the network.
    Never,
}

/// Configuration for the hypermedia client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    /// Request timeout in milliseconds (native network only).
    pub request_timeout_ms: u64,

    /// Maximum idle pooled connections per host (native network only).
    pub pool_max_idle_per_host: usize,

    /// Proxy URL (optional).
    ///
    /// If set, requests will be routed through this proxy.
    pub proxy_url: String,

    /// `User-Agent` header value (native network only).
    pub user_agent: Option<String>,

    /// Enable request logging.
    ///
    /// When enabled, every exchange is logged with `tracing` at debug level.
    pub enable_logging: bool,

    /// Embedded relations whose arrays become the state's collection.
    pub collection_rels: Vec<String>,

    /// Register HAL, HAL-FORMS, JSON, Siren, JSON:API, Collection+JSON, HTML
    /// and event-stream factories on construction.
    pub default_content_types: bool,

    /// Cache used for fetched states.
    pub cache_policy: CachePolicy,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            request_timeout_ms: 30000,
            pool_max_idle_per_host: 100,
            proxy_url: String::new(),
            user_agent: Some(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()),
            enable_logging: false,
            collection_rels: vec!["item".to_string(), "items".to_string()],
            default_content_types: true,
            cache_policy: CachePolicy::Forever,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    #[must_use]
    pub fn with_collection_rel(mut self, rel: impl Into<String>) -> Self {
        let rel = rel.into();
        if !self.collection_rels.contains(&rel) {
            self.collection_rels.push(rel);
        }
        self
    }

    #[must_use]
    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout_ms = timeout.as_millis() as u64;
        self
    }

    #[inline]
    pub fn is_collection_rel(&self, rel: &str) -> bool {
        self.collection_rels.iter().any(|r| r == rel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.request_timeout_ms, 30000);
        assert!(!config.enable_logging);
        assert!(config.default_content_types);
        assert_eq!(config.cache_policy, CachePolicy::Forever);
        assert!(config.is_collection_rel("item"));
        assert!(config.is_collection_rel("items"));
        assert!(!config.is_collection_rel("author"));
    }

    #[test]
    fn test_partial_override() {
        let config = ClientConfig {
            enable_logging: true,
            ..Default::default()
        };
        assert!(config.enable_logging);
        assert_eq!(config.pool_max_idle_per_host, 100);
    }

    #[test]
    fn test_builders() {
        let config = ClientConfig::default()
            .with_cache_policy(CachePolicy::Never)
            .with_collection_rel("entries")
            .with_collection_rel("item")
            .with_request_timeout(Duration::from_secs(5));
        assert_eq!(config.cache_policy, CachePolicy::Never);
        assert_eq!(config.collection_rels.len(), 3);
        assert_eq!(config.request_timeout_ms, 5000);
    }
}
