//! Immutable snapshots of fetched representations.
//!
//! # Module Structure
//!
//! ```text
//! state/
//! ├── factory          - StateFactory trait and content-type registry
//! ├── hal              - HAL and HAL-FORMS
//! ├── siren            - Siren
//! ├── jsonapi          - JSON:API
//! ├── collection_json  - Collection+JSON
//! ├── html             - HTML links and forms
//! ├── binary           - Opaque bodies
//! └── stream           - text/event-stream bodies
//! ```
//!
//! Every factory produces a [`State`]: the payload with its protocol envelope
//! removed, the links found in both the `Link` header and the body, the
//! forms it advertises, and the embedded representations it carries.

pub mod binary;
pub mod collection_json;
pub mod factory;
pub mod hal;
pub mod html;
pub mod jsonapi;
pub mod siren;
pub mod stream;

pub use binary::BinaryStateFactory;
pub use collection_json::CollectionJsonStateFactory;
pub use factory::{ContentTypeRegistry, StateFactory};
pub use hal::HalStateFactory;
pub use html::HtmlStateFactory;
pub use jsonapi::JsonApiStateFactory;
pub use siren::SirenStateFactory;
pub use stream::StreamStateFactory;

use crate::core::action::{Action, Form};
use crate::core::client::{Client, WeakClient};
use crate::core::error::{HateoasError, Result};
use crate::core::protocol;
use crate::core::resource::{Resource, ResourceRelation};
use crate::core::types::{Link, Links};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::Method;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use url::Url;

/// Payload of a state, with the protocol envelope removed.
#[derive(Clone, Debug, PartialEq)]
pub enum StateData {
    Json(Value),
    Text(String),
    Bytes(Bytes),
    Empty,
}

impl StateData {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            StateData::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            StateData::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            StateData::Bytes(b) => Some(b),
            _ => None,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, StateData::Empty)
    }
}

/// Wire format a state was parsed from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StateFormat {
    Hal,
    Siren,
    JsonApi,
    CollectionJson,
    Html,
    Binary,
    Stream,
}

/// Representations embedded under one relation.
#[derive(Clone, Debug)]
pub struct EmbeddedGroup {
    pub rel: String,
    pub states: Vec<Arc<State>>,
    /// The payload held an array, even if it had one element.
    pub many: bool,
}

/// An immutable snapshot of one representation of a resource.
#[derive(Clone)]
pub struct State {
    /// Absolute URI of the resource this represents.
    pub uri: Url,
    pub data: StateData,
    pub links: Links,
    pub forms: Vec<Form>,
    pub embedded: Vec<EmbeddedGroup>,
    /// Children of list-like representations; empty otherwise.
    pub collection: Vec<Arc<State>>,
    /// Response headers, lowercased. Empty for embedded states.
    pub headers: BTreeMap<String, String>,
    pub timestamp: DateTime<Utc>,
    /// Summary representation that must not be trusted as full detail.
    pub is_partial: bool,
    pub format: StateFormat,
    client: WeakClient,
}

impl State {
    /// A state with no links, forms or embedded content.
    pub fn new(uri: Url, data: StateData, format: StateFormat) -> Self {
        Self {
            links: Links::new(uri.clone()),
            uri,
            data,
            forms: Vec::new(),
            embedded: Vec::new(),
            collection: Vec::new(),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
            is_partial: false,
            format,
            client: WeakClient::new(),
        }
    }

    pub fn with_client(mut self, client: &Client) -> Self {
        self.client = client.downgrade();
        self
    }

    pub fn with_links(mut self, links: Links) -> Self {
        self.links = links;
        self
    }

    pub fn with_partial(mut self, partial: bool) -> Self {
        self.is_partial = partial;
        self
    }

    pub fn with_headers(mut self, headers: BTreeMap<String, String>) -> Self {
        self.headers = headers;
        self
    }

    /// Add embedded states under `rel`; collection relations also fill
    /// [`State::collection`].
    pub(crate) fn push_embedded(
        &mut self,
        rel: &str,
        states: Vec<Arc<State>>,
        many: bool,
        is_collection: bool,
    ) {
        if states.is_empty() {
            return;
        }
        if is_collection {
            self.collection.extend(states.iter().cloned());
        }
        match self.embedded.iter_mut().find(|g| g.rel == rel) {
            Some(group) => {
                group.states.extend(states);
                group.many = true;
            }
            None => self.embedded.push(EmbeddedGroup {
                rel: rel.to_string(),
                states,
                many,
            }),
        }
    }

    pub(crate) fn client(&self) -> Result<Client> {
        self.client.upgrade()
    }

    #[inline]
    pub fn format(&self) -> StateFormat {
        self.format
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Media type of the response this state was parsed from.
    pub fn content_type(&self) -> Option<String> {
        self.header(protocol::header_names::CONTENT_TYPE)
            .and_then(protocol::parse_media_type)
    }

    #[inline]
    pub fn has_link(&self, rel: &str) -> bool {
        self.links.has(rel)
    }

    /// First link of `rel`, or [`HateoasError::RelationNotFound`].
    pub fn get_link(&self, rel: &str) -> Result<&Link> {
        self.links
            .get(rel)
            .ok_or_else(|| HateoasError::RelationNotFound {
                rel: rel.to_string(),
                uri: self.uri.to_string(),
            })
    }

    /// Start a relation chain at this state. No I/O until it is resolved.
    pub fn follow(self: &Arc<Self>, rel: impl Into<String>) -> ResourceRelation {
        ResourceRelation::from_state(self.clone(), rel)
    }

    /// A resource for every link of `rel`.
    pub fn follow_all(&self, rel: &str) -> Result<Vec<Resource>> {
        let client = self.client()?;
        self.links
            .get_many(rel)
            .iter()
            .map(|link| client.go_link(link))
            .collect()
    }

    /// States embedded under `rel`.
    pub fn embedded(&self, rel: &str) -> &[Arc<State>] {
        self.embedded_group(rel)
            .map(|g| g.states.as_slice())
            .unwrap_or(&[])
    }

    pub fn embedded_group(&self, rel: &str) -> Option<&EmbeddedGroup> {
        self.embedded.iter().find(|g| g.rel == rel)
    }

    /// Every embedded state, relation by relation.
    pub fn all_embedded(&self) -> Vec<Arc<State>> {
        self.embedded
            .iter()
            .flat_map(|g| g.states.iter().cloned())
            .collect()
    }

    pub fn actions(&self) -> Vec<Action> {
        self.forms
            .iter()
            .map(|form| Action::new(form.clone(), self.client.clone()))
            .collect()
    }

    pub fn has_action(&self, name: &str) -> bool {
        self.forms.iter().any(|f| f.name == name)
    }

    /// The action called `name`.
    ///
    /// Fails with [`HateoasError::AmbiguousAction`] when several forms share
    /// the name; use [`State::action_by`] to pick one by method.
    pub fn action(&self, name: &str) -> Result<Action> {
        self.action_by(name, None)
    }

    pub fn action_by(&self, name: &str, method: Option<&Method>) -> Result<Action> {
        let candidates: Vec<&Form> = self
            .forms
            .iter()
            .filter(|f| f.name == name)
            .filter(|f| method.map_or(true, |m| &f.method == m))
            .collect();

        match candidates.as_slice() {
            [] => Err(HateoasError::ActionNotFound {
                name: name.to_string(),
                uri: self.uri.to_string(),
            }),
            [form] => Ok(Action::new((*form).clone(), self.client.clone())),
            many => Err(HateoasError::AmbiguousAction {
                name: name.to_string(),
                count: many.len(),
            }),
        }
    }

    /// Body suitable for sending this state back with PUT.
    ///
    /// HAL states re-attach their links as `_links`.
    pub fn serialize_body(&self) -> Result<Bytes> {
        match &self.data {
            StateData::Json(value) => {
                let value = match (self.format, value) {
                    (StateFormat::Hal, Value::Object(map)) => {
                        let mut body = Map::new();
                        body.insert("_links".to_string(), hal::serialize_links(&self.links));
                        body.extend(map.iter().map(|(k, v)| (k.clone(), v.clone())));
                        Value::Object(body)
                    }
                    _ => value.clone(),
                };
                Ok(Bytes::from(serde_json::to_vec(&value)?))
            }
            StateData::Text(s) => Ok(Bytes::from(s.clone())),
            StateData::Bytes(b) => Ok(b.clone()),
            StateData::Empty => Ok(Bytes::new()),
        }
    }

    /// Deserialize the payload into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(match &self.data {
            StateData::Json(value) => T::deserialize(value)?,
            StateData::Text(s) => serde_json::from_str(s)?,
            StateData::Bytes(b) => serde_json::from_slice(b)?,
            StateData::Empty => serde_json::from_value(Value::Null)?,
        })
    }

    /// A list state holding `items`, used when a relation is embedded as
    /// several representations.
    pub(crate) fn synthetic_collection(
        uri: Url,
        items: Vec<Arc<State>>,
        format: StateFormat,
        client: WeakClient,
    ) -> State {
        let data = Value::Array(
            items
                .iter()
                .map(|s| s.data.as_json().cloned().unwrap_or(Value::Null))
                .collect(),
        );
        let mut links = Links::new(uri.clone());
        links.add(Link::to_self(&uri));
        for item in &items {
            links.add(Link::new(protocol::rels::ITEM, item.uri.as_str(), uri.clone()));
        }

        let mut state = State::new(uri, StateData::Json(data), format).with_links(links);
        state.collection = items;
        state.client = client;
        state
    }
}

impl std::fmt::Debug for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("State")
            .field("uri", &self.uri.as_str())
            .field("format", &self.format)
            .field("data", &self.data)
            .field("links", &self.links.len())
            .field("forms", &self.forms.len())
            .field("collection", &self.collection.len())
            .field("is_partial", &self.is_partial)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    fn uri() -> Url {
        Url::parse("https://api.example.org/articles/1").unwrap()
    }

    fn form(name: &str, method: Method) -> Form {
        Form::new(uri(), name, method)
    }

    #[test]
    fn test_get_link_missing_is_error() {
        let state = State::new(uri(), StateData::Empty, StateFormat::Binary);
        let err = state.get_link("author").unwrap_err();
        assert!(matches!(err, HateoasError::RelationNotFound { ref rel, .. } if rel == "author"));
        assert!(!state.has_link("author"));
    }

    #[test]
    fn test_action_lookup() {
        let mut state = State::new(uri(), StateData::Empty, StateFormat::Hal);
        state.forms.push(form("edit", Method::PUT));
        state.forms.push(form("edit", Method::PATCH));
        state.forms.push(form("create", Method::POST));

        assert_eq!(state.action("create").unwrap().method(), &Method::POST);
        assert!(matches!(
            state.action("edit").unwrap_err(),
            HateoasError::AmbiguousAction { count: 2, .. }
        ));
        assert_eq!(
            state.action_by("edit", Some(&Method::PATCH)).unwrap().method(),
            &Method::PATCH
        );
        assert!(matches!(
            state.action("delete").unwrap_err(),
            HateoasError::ActionNotFound { .. }
        ));
        assert_eq!(state.actions().len(), 3);
        assert!(state.has_action("edit"));
    }

    #[test]
    fn test_serialize_body_hal_reattaches_links() {
        let mut links = Links::new(uri());
        links.add(Link::to_self(&uri()));
        let state = State::new(uri(), StateData::Json(json!({"title": "Hi"})), StateFormat::Hal)
            .with_links(links);

        let body: Value = serde_json::from_slice(&state.serialize_body().unwrap()).unwrap();
        assert_eq!(body["title"], "Hi");
        assert_eq!(body["_links"]["self"]["href"], "https://api.example.org/articles/1");
    }

    #[test]
    fn test_serialize_body_plain_json() {
        let state = State::new(uri(), StateData::Json(json!([1, 2])), StateFormat::JsonApi);
        assert_eq!(&state.serialize_body().unwrap()[..], b"[1,2]");
    }

    #[test]
    fn test_deserialize() {
        #[derive(Deserialize)]
        struct Article {
            title: String,
        }
        let state = State::new(uri(), StateData::Json(json!({"title": "Hi"})), StateFormat::Hal);
        let article: Article = state.deserialize().unwrap();
        assert_eq!(article.title, "Hi");
    }

    #[test]
    fn test_push_embedded_collection() {
        let mut state = State::new(uri(), StateData::Empty, StateFormat::Hal);
        let child = Arc::new(State::new(
            uri().join("/articles/2").unwrap(),
            StateData::Empty,
            StateFormat::Hal,
        ));
        state.push_embedded("item", vec![child.clone()], true, true);
        state.push_embedded("author", vec![child], false, false);
        assert_eq!(state.collection.len(), 1);
        assert_eq!(state.embedded("item").len(), 1);
        assert!(state.embedded("missing").is_empty());
        assert_eq!(state.all_embedded().len(), 2);
        assert!(!state.embedded_group("author").unwrap().many);
    }

    #[test]
    fn test_synthetic_collection() {
        let items: Vec<Arc<State>> = (1..=2)
            .map(|i| {
                Arc::new(State::new(
                    uri().join(&format!("/articles/{}", i)).unwrap(),
                    StateData::Json(json!({"id": i})),
                    StateFormat::Hal,
                ))
            })
            .collect();
        let list = State::synthetic_collection(uri(), items, StateFormat::Hal, WeakClient::new());
        assert_eq!(list.collection.len(), 2);
        assert_eq!(list.links.get_many("item").len(), 2);
        assert_eq!(list.data, StateData::Json(json!([{"id": 1}, {"id": 2}])));
    }
}
