//! Resources: identity-stable handles for URIs, and relation chains.
//!
//! A [`Resource`] is obtained from [`Client::go`] and is the same object for
//! the same absolute URI for the lifetime of the client. It fetches and
//! mutates state, and broadcasts [`ResourceEvent`]s when the client's cache
//! changes under it.
//!
//! [`Client::go`]: crate::core::client::Client::go

mod options;
mod relation;
mod state_resource;

pub use options::{RequestBody, RequestOptions};
pub use relation::ResourceRelation;
pub use state_resource::StateResource;

use crate::core::client::{Client, WeakClient};
use crate::core::error::{HateoasError, Result};
use crate::core::protocol::{header_names, media_types};
use crate::core::state::State;
use crate::core::types::Link;
use http::Method;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tokio::sync::broadcast;
use url::Url;

const EVENT_CAPACITY: usize = 16;

/// Cache notifications for one resource.
#[derive(Clone, Debug)]
pub enum ResourceEvent {
    /// A new state was stored for this URI.
    Update(Arc<State>),
    /// The cached state was evicted; the next `get()` refetches.
    Stale,
    /// The resource was deleted on the server.
    Delete,
}

#[derive(Clone)]
pub struct Resource {
    inner: Arc<ResourceInner>,
}

struct ResourceInner {
    uri: Url,
    client: WeakClient,
    events: broadcast::Sender<ResourceEvent>,
}

impl Resource {
    pub(crate) fn new(uri: Url, client: WeakClient) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(ResourceInner {
                uri,
                client,
                events,
            }),
        }
    }

    pub fn uri(&self) -> &Url {
        &self.inner.uri
    }

    pub fn ptr_eq(&self, other: &Resource) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn client(&self) -> Result<Client> {
        self.inner.client.upgrade()
    }

    /// Receive cache events for this resource.
    ///
    /// Slow receivers lose the oldest events, see [`broadcast::Receiver`].
    pub fn subscribe(&self) -> broadcast::Receiver<ResourceEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn emit(&self, event: ResourceEvent) {
        // No receivers is not an error.
        let _ = self.inner.events.send(event);
    }

    /// Cached state, if any.
    pub fn cached_state(&self) -> Option<Arc<State>> {
        self.client().ok()?.cache().get(&self.inner.uri)
    }

    /// Cached state, or fetch it.
    ///
    /// Concurrent calls for an uncached resource share one request.
    pub async fn get(&self) -> Result<Arc<State>> {
        if let Some(state) = self.cached_state() {
            return Ok(state);
        }
        self.refresh().await
    }

    /// Fetch the state, ignoring the cache, and store the result.
    pub async fn refresh(&self) -> Result<Arc<State>> {
        self.request(RequestOptions::default()).await
    }

    /// Send a request to this resource and parse the response.
    ///
    /// GET responses are de-duplicated and cached. Responses to other methods
    /// are returned but not stored; the cache middleware handles any
    /// invalidation they imply.
    pub async fn request(&self, options: RequestOptions) -> Result<Arc<State>> {
        let client = self.client()?;
        let link = Link::to_self(&self.inner.uri);
        let method = options.method();
        let request = options.into_request(self.inner.uri.clone())?;

        if method == Method::GET {
            return client.fetch_state(link, request).await;
        }
        let response = client.fetch_or_throw(request).await?;
        Ok(Arc::new(client.get_state_for_response(&link, response)?))
    }

    /// Replace the resource with a JSON body.
    pub async fn put(&self, body: Value) -> Result<()> {
        let client = self.client()?;
        let request = RequestOptions::new()
            .with_method(Method::PUT)
            .with_json(body)
            .into_request(self.inner.uri.clone())?;
        client.fetch_or_throw(request).await?;
        Ok(())
    }

    /// Send `state` back to the server with PUT and cache it as this
    /// resource's state.
    pub async fn put_state(&self, state: &State) -> Result<()> {
        let client = self.client()?;
        let content_type = state
            .content_type()
            .unwrap_or_else(|| media_types::JSON.to_string());
        let request = RequestOptions::new()
            .with_method(Method::PUT)
            .with_body(state.serialize_body()?, content_type)
            .into_request(self.inner.uri.clone())?;
        client.fetch_or_throw(request).await?;

        let mut stored = state.clone();
        stored.uri = self.inner.uri.clone();
        client.cache_state(Arc::new(stored));
        Ok(())
    }

    /// POST a JSON body and return the response state.
    pub async fn post(&self, body: Value) -> Result<Arc<State>> {
        self.request(RequestOptions::new().with_method(Method::POST).with_json(body))
            .await
    }

    /// POST a JSON body and return the resource the server created.
    ///
    /// A `205 Reset Content` answer returns this resource.
    pub async fn post_follow(&self, body: Value) -> Result<Resource> {
        let client = self.client()?;
        let request = RequestOptions::new()
            .with_method(Method::POST)
            .with_json(body)
            .into_request(self.inner.uri.clone())?;
        let response = client.fetch_or_throw(request).await?;

        if response.status == 205 {
            return Ok(self.clone());
        }
        let location = response.header(header_names::LOCATION).ok_or_else(|| {
            HateoasError::HeaderParse(format!(
                "POST to {} returned no Location header",
                self.inner.uri
            ))
        })?;
        Ok(client.go_url(self.inner.uri.join(location)?))
    }

    /// PATCH with a JSON body and return the response state.
    pub async fn patch(&self, body: Value) -> Result<Arc<State>> {
        self.request(RequestOptions::new().with_method(Method::PATCH).with_json(body))
            .await
    }

    pub async fn delete(&self) -> Result<()> {
        let client = self.client()?;
        let request = RequestOptions::new()
            .with_method(Method::DELETE)
            .into_request(self.inner.uri.clone())?;
        client.fetch_or_throw(request).await?;
        Ok(())
    }

    /// Start a relation chain at this resource. No I/O until it is resolved.
    pub fn follow(&self, rel: impl Into<String>) -> ResourceRelation {
        ResourceRelation::from_resource(self.clone(), rel)
    }

    /// A resource for every link of `rel` on the current state.
    pub async fn follow_all(&self, rel: &str) -> Result<Vec<Resource>> {
        self.get().await?.follow_all(rel)
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Resource").field(&self.inner.uri.as_str()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::testing::offline_client;

    #[tokio::test]
    async fn test_not_found_is_an_error() {
        let client = offline_client();
        let err = client.go("/missing").unwrap().get().await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(client.pending_requests(), 0);
    }

    #[test]
    fn test_dropped_client() {
        let client = offline_client();
        let resource = client.go("/a").unwrap();
        drop(client);
        assert!(resource.cached_state().is_none());
        assert!(matches!(resource.client(), Err(HateoasError::ClientDropped)));
    }

    #[tokio::test]
    async fn test_update_event_on_cache_store() {
        let client = offline_client();
        let resource = client.go("/a").unwrap();
        let mut events = resource.subscribe();
        let state = State::new(
            resource.uri().clone(),
            crate::core::state::StateData::Empty,
            crate::core::state::StateFormat::Binary,
        );
        client.cache_state(Arc::new(state));
        match events.recv().await.unwrap() {
            ResourceEvent::Update(s) => assert_eq!(&s.uri, resource.uri()),
            other => panic!("expected update, got {:?}", other),
        }
        assert!(resource.cached_state().is_some());
    }
}
