//! Hypermedia client.
//!
//! The [`Client`] is the entry point: it hands out one [`Resource`] per
//! absolute URI, negotiates content types, owns the state cache and tracks
//! which cached URIs invalidate which.
//!
//! # Module Organization
//!
//! ```text
//! client/
//! ├── instance       - Client, WeakClient
//! ├── fetch          - middleware pipeline and origin matching
//! ├── middleware     - built-in accept, cache and warning middlewares
//! ├── cache          - state cache policies
//! ├── dependencies   - inv-by dependency graph
//! ├── config         - client configuration
//! └── native_network - reqwest network (feature "native")
//! ```
//!
//! # Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Client`] | Resource identity map, cache and fetch pipeline |
//! | [`ClientConfig`] | Client configuration options |
//! | [`StateCache`] | Storage for fetched states |
//! | [`Fetcher`] | Middleware chain in front of a network |
//! | [`DependencyGraph`] | Which URIs go stale together |
//!
//! # Examples
//!
//! ```no_run
//! use hateoas_client::{CachePolicy, Client, ClientConfig};
//! use std::time::Duration;
//!
//! # async fn run() -> hateoas_client::Result<()> {
//! let config = ClientConfig::default().with_cache_policy(CachePolicy::Short(Duration::from_secs(30)));
//! let client = Client::with_config("https://api.example.org/", config)?;
//!
//! let articles = client.go("/articles")?;
//! let state = articles.get().await?;
//! let first = state.follow("item").get().await?;
//! # let _ = first;
//! # Ok(())
//! # }
//! ```
//!
//! [`Resource`]: crate::core::resource::Resource

mod cache;
mod config;
mod dependencies;
mod fetch;
mod instance;
pub mod middleware;
#[cfg(feature = "native")]
mod native_network;

pub use cache::{cache_for_policy, ForeverCache, NeverCache, ShortCache, StateCache};
pub use config::{CachePolicy, ClientConfig};
pub use dependencies::DependencyGraph;
pub use fetch::{error_for_response, Fetcher, OriginMatcher};
pub use instance::{Client, WeakClient};
#[cfg(feature = "native")]
pub use native_network::NativeNetwork;

#[cfg(test)]
pub(crate) mod testing {
    use super::{Client, ClientConfig};
    use crate::core::error::Result;
    use crate::core::traits::Network;
    use crate::core::types::{HttpRequest, HttpResponse};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tracing::subscriber::DefaultGuard;

    struct Offline;

    #[async_trait]
    impl Network for Offline {
        async fn send(&self, _request: HttpRequest) -> Result<HttpResponse> {
            Ok(HttpResponse::new(404, ""))
        }
    }

    /// Client for `https://api.example.org/` whose network answers 404.
    pub fn offline_client() -> Client {
        Client::with_network("https://api.example.org/", Arc::new(Offline), ClientConfig::default())
            .unwrap()
    }

    /// Collects log output on the current thread while alive.
    pub struct LogCapture {
        buf: Arc<Mutex<Vec<u8>>>,
        _guard: DefaultGuard,
    }

    struct Sink(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Sink {
        fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(data);
            Ok(data.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl LogCapture {
        pub fn start() -> Self {
            let buf = Arc::new(Mutex::new(Vec::new()));
            let sink = buf.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_writer(move || Sink(sink.clone()))
                .with_ansi(false)
                .finish();
            Self {
                buf,
                _guard: tracing::subscriber::set_default(subscriber),
            }
        }

        pub fn contents(&self) -> String {
            String::from_utf8_lossy(&self.buf.lock()).into_owned()
        }
    }
}
