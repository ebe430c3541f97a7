use crate::core::action::{NoopSchemaPlugin, SchemaPlugin};
use crate::core::client::cache::{cache_for_policy, StateCache};
use crate::core::client::dependencies::DependencyGraph;
use crate::core::client::fetch::Fetcher;
use crate::core::client::middleware::{AcceptMiddleware, CacheMiddleware, WarningMiddleware};
use crate::core::client::ClientConfig;
use crate::core::error::{HateoasError, Result};
use crate::core::protocol::rels;
use crate::core::resource::{Resource, ResourceEvent};
use crate::core::state::{ContentTypeRegistry, State, StateFactory};
use crate::core::traits::{Middleware, Network};
use crate::core::types::{CacheMode, HttpRequest, HttpResponse, Link};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::{Mutex, RwLock};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Weak};
use url::Url;

type SharedFetch = Shared<BoxFuture<'static, std::result::Result<Arc<State>, Arc<HateoasError>>>>;

/// Hypermedia client.
///
/// Owns the resource identity map, the content-type registry, the state
/// cache and the cache dependency graph. Cloning is cheap and every clone
/// shares the same state.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

/// Non-owning handle held by resources, states and actions.
#[derive(Clone, Default)]
pub struct WeakClient {
    inner: Weak<ClientInner>,
}

struct ClientInner {
    bookmark: Url,
    config: ClientConfig,
    fetcher: Fetcher,
    resources: Mutex<HashMap<Url, Resource>>,
    cache: RwLock<Arc<dyn StateCache>>,
    dependencies: Mutex<DependencyGraph>,
    content_types: RwLock<ContentTypeRegistry>,
    schema_plugin: RwLock<Arc<dyn SchemaPlugin>>,
    pending: Mutex<HashMap<String, SharedFetch>>,
}

impl Client {
    /// Client for `bookmark` using the native network and default config.
    #[cfg(feature = "native")]
    pub fn new(bookmark: &str) -> Result<Self> {
        Self::with_config(bookmark, ClientConfig::default())
    }

    #[cfg(feature = "native")]
    pub fn with_config(bookmark: &str, config: ClientConfig) -> Result<Self> {
        let network = crate::core::client::NativeNetwork::from_config(&config)?;
        Self::with_network(bookmark, Arc::new(network), config)
    }

    /// Client over any [`Network`].
    ///
    /// Registers the accept, cache and warning middlewares for every origin.
    pub fn with_network(
        bookmark: &str,
        network: Arc<dyn Network>,
        config: ClientConfig,
    ) -> Result<Self> {
        let bookmark = Url::parse(bookmark)?;
        let content_types = if config.default_content_types {
            ContentTypeRegistry::with_defaults()
        } else {
            ContentTypeRegistry::new()
        };
        let cache = cache_for_policy(config.cache_policy);

        let inner = Arc::new_cyclic(|weak: &Weak<ClientInner>| {
            let handle = WeakClient {
                inner: weak.clone(),
            };
            let fetcher = Fetcher::new(network).with_logging(config.enable_logging);
            fetcher.push(Arc::new(AcceptMiddleware::new(handle.clone())));
            fetcher.push(Arc::new(CacheMiddleware::new(handle)));
            fetcher.push(Arc::new(WarningMiddleware));

            ClientInner {
                bookmark,
                config,
                fetcher,
                resources: Mutex::new(HashMap::new()),
                cache: RwLock::new(cache),
                dependencies: Mutex::new(DependencyGraph::new()),
                content_types: RwLock::new(content_types),
                schema_plugin: RwLock::new(Arc::new(NoopSchemaPlugin)),
                pending: Mutex::new(HashMap::new()),
            }
        });
        Ok(Self { inner })
    }

    pub fn bookmark(&self) -> &Url {
        &self.inner.bookmark
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn downgrade(&self) -> WeakClient {
        WeakClient {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn ptr_eq(&self, other: &Client) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Resource at the bookmark URI.
    pub fn bookmark_resource(&self) -> Resource {
        self.go_url(self.inner.bookmark.clone())
    }

    /// Resource for `href`, resolved against the bookmark.
    ///
    /// An empty `href` is the bookmark itself.
    pub fn go(&self, href: &str) -> Result<Resource> {
        let uri = self.inner.bookmark.join(href)?;
        Ok(self.go_url(uri))
    }

    /// Resource a link points to. Templated links expand with no variables.
    pub fn go_link(&self, link: &Link) -> Result<Resource> {
        Ok(self.go_url(link.resolve()?))
    }

    /// The one resource for an absolute URI, created on first use.
    pub fn go_url(&self, uri: Url) -> Resource {
        let mut resources = self.inner.resources.lock();
        resources
            .entry(uri.clone())
            .or_insert_with(|| Resource::new(uri, self.downgrade()))
            .clone()
    }

    /// Register a middleware for origins matching `origin` (`*` for all).
    ///
    /// User middlewares run after the built-in ones, in registration order.
    pub fn use_middleware(&self, middleware: Arc<dyn Middleware>, origin: &str) -> Result<()> {
        self.inner.fetcher.use_middleware(middleware, origin)
    }

    /// Add or replace the factory for a media type; `q` orders `Accept`.
    pub fn register_content_type(&self, media_type: &str, factory: Arc<dyn StateFactory>, q: f32) {
        self.inner
            .content_types
            .write()
            .register(media_type, factory, q);
    }

    pub fn accept_header(&self) -> String {
        self.inner.content_types.read().accept_header()
    }

    pub fn set_schema_plugin(&self, plugin: Arc<dyn SchemaPlugin>) {
        *self.inner.schema_plugin.write() = plugin;
    }

    pub fn schema_plugin(&self) -> Arc<dyn SchemaPlugin> {
        self.inner.schema_plugin.read().clone()
    }

    /// Replace the state cache. Existing entries are not carried over.
    pub fn set_cache(&self, cache: Arc<dyn StateCache>) {
        *self.inner.cache.write() = cache;
    }

    pub fn cache(&self) -> Arc<dyn StateCache> {
        self.inner.cache.read().clone()
    }

    /// Run a request through the middleware chain. Any status is `Ok`.
    pub async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.inner.fetcher.fetch(request).await
    }

    /// Run a request; non-2xx responses become [`HateoasError::Http`] or
    /// [`HateoasError::Problem`].
    pub async fn fetch_or_throw(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.inner.fetcher.fetch_or_throw(request).await
    }

    /// Parse a response with the factory negotiated from its content type.
    pub fn get_state_for_response(&self, link: &Link, response: HttpResponse) -> Result<State> {
        let factory = self.inner.content_types.read().negotiate(&response);
        factory.create(self, link, &response)
    }

    /// Store a state and everything embedded in it.
    ///
    /// `inv-by` links register dependencies, every stored state is announced
    /// to its resource with [`ResourceEvent::Update`]. Partial states are
    /// announced neither in the cache nor to resources.
    pub fn cache_state(&self, state: Arc<State>) {
        let flattened = flatten(state);

        {
            let mut dependencies = self.inner.dependencies.lock();
            for s in &flattened {
                for link in s.links.get_many(rels::INV_BY) {
                    match link.resolve() {
                        Ok(target) => dependencies.add(target, s.uri.clone()),
                        Err(e) => tracing::warn!("Ignoring inv-by link {}: {}", link.href, e),
                    }
                }
            }
        }

        let cache = self.cache();
        for s in &flattened {
            cache.store(s.clone());
        }
        tracing::debug!("Cached {} state(s)", flattened.len());

        for s in flattened {
            let uri = s.uri.clone();
            self.emit(&uri, ResourceEvent::Update(s));
        }
    }

    /// Evict stale and deleted URIs, plus everything linked to them through
    /// the dependency graph, in either direction.
    ///
    /// URIs resolve against the bookmark. Resources for deleted URIs receive
    /// [`ResourceEvent::Delete`], all others [`ResourceEvent::Stale`].
    pub fn clear_resource_cache<S: AsRef<str>>(&self, stale: &[S], deleted: &[S]) {
        let resolve = |href: &S| match self.inner.bookmark.join(href.as_ref()) {
            Ok(uri) => Some(uri),
            Err(e) => {
                tracing::warn!("Ignoring invalid URI {}: {}", href.as_ref(), e);
                None
            }
        };
        let deleted: HashSet<Url> = deleted.iter().filter_map(resolve).collect();
        let seeds: Vec<Url> = stale
            .iter()
            .filter_map(resolve)
            .chain(deleted.iter().cloned())
            .collect();

        let affected = self.inner.dependencies.lock().closure(seeds);
        let cache = self.cache();
        for uri in &affected {
            cache.delete(uri);
        }
        tracing::debug!("Invalidated {} URI(s)", affected.len());

        for uri in affected {
            let event = if deleted.contains(&uri) {
                ResourceEvent::Delete
            } else {
                ResourceEvent::Stale
            };
            self.emit(&uri, event);
        }
    }

    /// Drop every cached state and dependency edge.
    pub fn clear_cache(&self) {
        self.cache().clear();
        self.inner.dependencies.lock().clear();
    }

    /// Fetch with GET de-duplication: identical requests issued while one is
    /// in flight share its outcome. The state is parsed and, unless the
    /// request says [`CacheMode::NoCache`], cached.
    pub(crate) async fn fetch_state(&self, link: Link, request: HttpRequest) -> Result<Arc<State>> {
        let key = request.dedup_key();
        let shared = {
            let mut pending = self.inner.pending.lock();
            match pending.get(&key) {
                Some(existing) => {
                    tracing::debug!("Joining in-flight {} {}", request.method, request.url);
                    existing.clone()
                }
                None => {
                    // The request runs on its own task so it settles and
                    // clears its key even when every waiter goes away.
                    let client = self.clone();
                    let own_key = key.clone();
                    let task = tokio::spawn(async move {
                        let outcome = client.fetch_and_cache(&link, request).await;
                        client.inner.pending.lock().remove(&own_key);
                        outcome
                    });
                    let weak = self.downgrade();
                    let own_key = key.clone();
                    let fetch = async move {
                        match task.await {
                            Ok(outcome) => outcome.map_err(Arc::new),
                            Err(e) => {
                                if let Ok(client) = weak.upgrade() {
                                    client.inner.pending.lock().remove(&own_key);
                                }
                                Err(Arc::new(HateoasError::Network(format!(
                                    "Fetch task failed: {}",
                                    e
                                ))))
                            }
                        }
                    }
                    .boxed()
                    .shared();
                    pending.insert(key, fetch.clone());
                    fetch
                }
            }
        };
        // A caller that turns out to be the only waiter gets the error as is.
        shared.await.map_err(|e| match Arc::try_unwrap(e) {
            Ok(owned) => owned,
            Err(e) => HateoasError::Shared(e),
        })
    }

    async fn fetch_and_cache(&self, link: &Link, request: HttpRequest) -> Result<Arc<State>> {
        let store = request.cache != CacheMode::NoCache;
        let response = self.fetch_or_throw(request).await?;
        let state = Arc::new(self.get_state_for_response(link, response)?);
        if store {
            self.cache_state(state.clone());
        }
        Ok(state)
    }

    /// Number of GETs currently in flight.
    pub fn pending_requests(&self) -> usize {
        self.inner.pending.lock().len()
    }

    fn emit(&self, uri: &Url, event: ResourceEvent) {
        let resource = self.inner.resources.lock().get(uri).cloned();
        if let Some(resource) = resource {
            resource.emit(event);
        }
    }
}

/// `state` plus every embedded and collection state, once per URI.
fn flatten(state: Arc<State>) -> Vec<Arc<State>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    let mut stack = vec![state];
    while let Some(s) = stack.pop() {
        if s.is_partial || !seen.insert(s.uri.clone()) {
            continue;
        }
        stack.extend(s.collection.iter().cloned());
        stack.extend(s.all_embedded());
        out.push(s);
    }
    out
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("bookmark", &self.inner.bookmark.as_str())
            .field("resources", &self.inner.resources.lock().len())
            .finish()
    }
}

impl WeakClient {
    /// A handle not attached to any client.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn upgrade(&self) -> Result<Client> {
        self.inner
            .upgrade()
            .map(|inner| Client { inner })
            .ok_or(HateoasError::ClientDropped)
    }
}

impl fmt::Debug for WeakClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.inner.strong_count() > 0 {
            "WeakClient(live)"
        } else {
            "WeakClient(dropped)"
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::testing::offline_client;
    use crate::core::state::{StateData, StateFormat};
    use serde_json::json;

    fn state(client: &Client, path: &str) -> State {
        State::new(
            client.bookmark().join(path).unwrap(),
            StateData::Json(json!({"path": path})),
            StateFormat::Hal,
        )
        .with_client(client)
    }

    #[test]
    fn test_go_is_idempotent() {
        let client = offline_client();
        let a = client.go("/articles/1").unwrap();
        let b = client.go("https://api.example.org/articles/1").unwrap();
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&client.go("/articles/2").unwrap()));
        assert!(client.go("").unwrap().ptr_eq(&client.bookmark_resource()));
    }

    #[test]
    fn test_cache_state_round_trip() {
        let client = offline_client();
        let s = Arc::new(state(&client, "/a"));
        client.cache_state(s.clone());
        assert_eq!(client.cache().get(&s.uri).unwrap().data, s.data);
    }

    #[test]
    fn test_cache_state_flattens_embedded_but_not_partial() {
        let client = offline_client();
        let mut parent = state(&client, "/list");
        let full = Arc::new(state(&client, "/list/1"));
        let partial = Arc::new(state(&client, "/list/2").with_partial(true));
        parent.push_embedded("item", vec![full.clone(), partial.clone()], true, true);
        client.cache_state(Arc::new(parent));

        let cache = client.cache();
        assert!(cache.has(&full.uri));
        assert!(!cache.has(&partial.uri));
    }

    #[test]
    fn test_inv_by_dependencies_drive_invalidation() {
        let client = offline_client();
        let mut a = state(&client, "/a");
        a.links.add_rel("inv-by", "/b");
        let mut b = state(&client, "/b");
        b.links.add_rel("inv-by", "/c");
        let c = state(&client, "/c");
        for s in [a, b, c] {
            client.cache_state(Arc::new(s));
        }

        client.clear_resource_cache(&["/c"], &[]);
        let cache = client.cache();
        for path in ["/a", "/b", "/c"] {
            assert!(!cache.has(&client.bookmark().join(path).unwrap()), "{}", path);
        }
    }

    #[tokio::test]
    async fn test_events_on_clear() {
        let client = offline_client();
        let stale = client.go("/stale").unwrap();
        let gone = client.go("/gone").unwrap();
        let mut stale_rx = stale.subscribe();
        let mut gone_rx = gone.subscribe();

        client.clear_resource_cache(&["/stale"], &["/gone"]);
        assert!(matches!(stale_rx.recv().await.unwrap(), ResourceEvent::Stale));
        assert!(matches!(gone_rx.recv().await.unwrap(), ResourceEvent::Delete));
    }

    #[test]
    fn test_weak_client_after_drop() {
        let client = offline_client();
        let weak = client.downgrade();
        assert!(weak.upgrade().is_ok());
        drop(client);
        assert!(matches!(weak.upgrade(), Err(HateoasError::ClientDropped)));
    }
}
