use crate::core::client::WeakClient;
use crate::core::error::Result;
use crate::core::protocol::{header_names, rels};
use crate::core::traits::{Middleware, Next};
use crate::core::types::{CacheMode, HttpRequest, HttpResponse, Link};
use async_trait::async_trait;
use http::Method;
use std::sync::Arc;

/// Keeps the client cache consistent with successful mutations.
///
/// After a 2xx response to an unsafe method:
///
/// - DELETE marks the request URL deleted; any other method except POST
///   marks it stale.
/// - The `Location` header and `Link` targets with relation `invalidates`
///   are marked stale.
/// - A `Content-Location` body is parsed and stored as that URI's state,
///   unless the request opted out with [`CacheMode::NoCache`].
pub struct CacheMiddleware {
    client: WeakClient,
}

impl CacheMiddleware {
    pub fn new(client: WeakClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Middleware for CacheMiddleware {
    async fn handle(&self, request: HttpRequest, next: Next<'_>) -> Result<HttpResponse> {
        let method = request.method.clone();
        let url = request.url.clone();
        let cache_mode = request.cache;
        let safe = request.is_safe_method();

        let response = next.run(request).await?;
        if safe || !response.is_success() {
            return Ok(response);
        }
        let client = self.client.upgrade()?;

        let mut stale = Vec::new();
        let mut deleted = Vec::new();
        if method == Method::DELETE {
            deleted.push(url.to_string());
        } else if method != Method::POST {
            stale.push(url.to_string());
        }
        if let Some(location) = response.header(header_names::LOCATION) {
            if let Ok(target) = url.join(location) {
                stale.push(target.to_string());
            }
        }
        for link in response.link_header() {
            if link.rels.iter().any(|r| r == rels::INVALIDATES) {
                if let Ok(target) = url.join(&link.href) {
                    stale.push(target.to_string());
                }
            }
        }
        if !stale.is_empty() || !deleted.is_empty() {
            tracing::debug!(
                "{} {} invalidates {} stale, {} deleted",
                method,
                url,
                stale.len(),
                deleted.len()
            );
            client.clear_resource_cache(&stale, &deleted);
        }

        if cache_mode != CacheMode::NoCache {
            if let Some(content_location) = response.header(header_names::CONTENT_LOCATION) {
                let link = Link::new(rels::SELF, content_location, url.clone());
                match client.get_state_for_response(&link, response.clone()) {
                    Ok(state) => client.cache_state(Arc::new(state)),
                    Err(e) => tracing::warn!(
                        "Could not cache Content-Location {} of {} {}: {}",
                        content_location,
                        method,
                        url,
                        e
                    ),
                }
            }
        }

        Ok(response)
    }
}
