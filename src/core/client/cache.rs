//! State cache implementations.
//!
//! | Cache | Behavior |
//! |-------|----------|
//! | [`ForeverCache`] | Keeps every state until it is invalidated |
//! | [`ShortCache`] | Like `ForeverCache`, entries also expire after a fixed age |
//! | [`NeverCache`] | Stores nothing |

use crate::core::client::CachePolicy;
use crate::core::state::State;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// Storage for fetched states, keyed by absolute URI.
///
/// Implementations only hold immutable snapshots: a state is replaced,
/// never edited in place.
pub trait StateCache: Send + Sync + 'static {
    fn store(&self, state: Arc<State>);
    fn get(&self, uri: &Url) -> Option<Arc<State>>;
    fn has(&self, uri: &Url) -> bool {
        self.get(uri).is_some()
    }
    fn delete(&self, uri: &Url);
    fn clear(&self);
}

/// Build the cache selected by a [`CachePolicy`].
pub fn cache_for_policy(policy: CachePolicy) -> Arc<dyn StateCache> {
    match policy {
        CachePolicy::Forever => Arc::new(ForeverCache::new()),
        CachePolicy::Short(ttl) => Arc::new(ShortCache::new(ttl)),
        CachePolicy::Never => Arc::new(NeverCache),
    }
}

#[derive(Default)]
pub struct ForeverCache {
    entries: Mutex<HashMap<Url, Arc<State>>>,
}

impl ForeverCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl StateCache for ForeverCache {
    fn store(&self, state: Arc<State>) {
        self.entries.lock().insert(state.uri.clone(), state);
    }

    fn get(&self, uri: &Url) -> Option<Arc<State>> {
        self.entries.lock().get(uri).cloned()
    }

    fn delete(&self, uri: &Url) {
        self.entries.lock().remove(uri);
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Cache whose entries expire `ttl` after they were stored.
pub struct ShortCache {
    ttl: Duration,
    entries: Mutex<HashMap<Url, (Instant, Arc<State>)>>,
}

impl ShortCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}

impl StateCache for ShortCache {
    fn store(&self, state: Arc<State>) {
        self.entries
            .lock()
            .insert(state.uri.clone(), (Instant::now(), state));
    }

    fn get(&self, uri: &Url) -> Option<Arc<State>> {
        let mut entries = self.entries.lock();
        match entries.get(uri) {
            Some((stored, state)) if stored.elapsed() < self.ttl => Some(state.clone()),
            Some(_) => {
                entries.remove(uri);
                None
            }
            None => None,
        }
    }

    fn delete(&self, uri: &Url) {
        self.entries.lock().remove(uri);
    }

    fn clear(&self) {
        self.entries.lock().clear();
    }
}

/// Cache that never retains anything.
pub struct NeverCache;

impl StateCache for NeverCache {
    fn store(&self, _state: Arc<State>) {}

    fn get(&self, _uri: &Url) -> Option<Arc<State>> {
        None
    }

    fn delete(&self, _uri: &Url) {}

    fn clear(&self) {}
}
