use crate::core::client::Client;
use crate::core::error::Result;
use crate::core::protocol::{self, media_types};
use crate::core::state::{
    BinaryStateFactory, CollectionJsonStateFactory, HalStateFactory, HtmlStateFactory,
    JsonApiStateFactory, SirenStateFactory, State, StateData, StateFormat, StreamStateFactory,
};
use crate::core::types::{HttpResponse, Link, Links};
use serde_json::{Map, Value};
use std::sync::Arc;
use url::Url;

/// Turns a response into a [`State`] for one wire format.
///
/// `link` is the link that was followed; its resolved target is the new
/// state's URI. Absent sections of a payload produce empty links, forms or
/// collections. A body that cannot be parsed is an error.
pub trait StateFactory: Send + Sync {
    fn create(&self, client: &Client, link: &Link, response: &HttpResponse) -> Result<State>;
}

struct Registration {
    media_type: String,
    factory: Arc<dyn StateFactory>,
    q: f32,
}

/// Media type to factory table, with a quality value for `Accept`.
#[derive(Default)]
pub struct ContentTypeRegistry {
    entries: Vec<Registration>,
}

impl ContentTypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every built-in format.
    pub fn with_defaults() -> Self {
        let hal: Arc<dyn StateFactory> = Arc::new(HalStateFactory);
        let mut registry = Self::new();
        registry.register(media_types::HAL_FORMS_JSON, hal.clone(), 1.0);
        registry.register(media_types::HAL_JSON, hal.clone(), 0.9);
        registry.register(media_types::SIREN_JSON, Arc::new(SirenStateFactory), 0.8);
        registry.register(media_types::JSON_API, Arc::new(JsonApiStateFactory), 0.8);
        registry.register(
            media_types::COLLECTION_JSON,
            Arc::new(CollectionJsonStateFactory),
            0.8,
        );
        registry.register(media_types::JSON, hal, 0.7);
        registry.register(media_types::HTML, Arc::new(HtmlStateFactory), 0.6);
        registry.register(media_types::EVENT_STREAM, Arc::new(StreamStateFactory), 0.5);
        registry
    }

    /// Add or replace the factory for `media_type`.
    pub fn register(&mut self, media_type: &str, factory: Arc<dyn StateFactory>, q: f32) {
        let media_type = media_type.trim().to_ascii_lowercase();
        let q = q.clamp(0.0, 1.0);
        match self.entries.iter_mut().find(|e| e.media_type == media_type) {
            Some(entry) => {
                entry.factory = factory;
                entry.q = q;
            }
            None => self.entries.push(Registration {
                media_type,
                factory,
                q,
            }),
        }
    }

    pub fn get(&self, media_type: &str) -> Option<Arc<dyn StateFactory>> {
        self.entries
            .iter()
            .find(|e| e.media_type.eq_ignore_ascii_case(media_type))
            .map(|e| e.factory.clone())
    }

    pub fn media_types(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.media_type.as_str()).collect()
    }

    /// `Accept` value listing every registered type by descending quality.
    pub fn accept_header(&self) -> String {
        let mut sorted: Vec<&Registration> = self.entries.iter().collect();
        sorted.sort_by(|a, b| b.q.total_cmp(&a.q));
        sorted
            .iter()
            .map(|e| {
                if e.q >= 1.0 {
                    e.media_type.clone()
                } else {
                    format!("{};q={}", e.media_type, format_q(e.q))
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Factory for a response: 204 and untyped bodies are binary, registered
    /// types use their factory, other `application/*+json` types are read as
    /// HAL, and everything else falls back to binary.
    pub fn negotiate(&self, response: &HttpResponse) -> Arc<dyn StateFactory> {
        if response.is_no_content() {
            return Arc::new(BinaryStateFactory);
        }
        let Some(media_type) = response.content_type() else {
            return Arc::new(BinaryStateFactory);
        };
        if let Some(factory) = self.get(&media_type) {
            return factory;
        }
        if protocol::is_json_suffix_type(&media_type) {
            tracing::debug!("Reading unregistered {} as HAL", media_type);
            return Arc::new(HalStateFactory);
        }
        tracing::debug!("No factory for {}, keeping body opaque", media_type);
        Arc::new(BinaryStateFactory)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn format_q(q: f32) -> String {
    let s = format!("{:.3}", q);
    s.trim_end_matches('0').trim_end_matches('.').to_string()
}

/// Links from the response's `Link` header, resolved against `uri`.
pub(crate) fn header_links(uri: &Url, response: &HttpResponse) -> Links {
    let mut links = Links::new(uri.clone());
    for header in response.link_header() {
        links.extend(Link::from_header(&header, uri));
    }
    links
}

/// Body parsed as JSON; an empty body reads as an empty object.
pub(crate) fn parse_json(response: &HttpResponse) -> Result<Value> {
    if response.body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Object(Map::new()));
    }
    Ok(serde_json::from_slice(&response.body)?)
}

/// A state skeleton common to every top-level factory.
pub(crate) fn base_state(
    client: &Client,
    link: &Link,
    response: &HttpResponse,
    data: StateData,
    format: StateFormat,
) -> Result<State> {
    let uri = link.resolve()?;
    let links = header_links(&uri, response);
    Ok(State::new(uri, data, format)
        .with_links(links)
        .with_headers(response.headers.clone())
        .with_client(client))
}

/// `value` as a string, or the `href` member of an object.
pub(crate) fn href_of(value: &Value) -> Option<&str> {
    match value {
        Value::String(s) => Some(s),
        Value::Object(map) => map.get("href").and_then(Value::as_str),
        _ => None,
    }
}

/// Single value or array of values, as a slice-like iterator.
pub(crate) fn one_or_many(value: &Value) -> impl Iterator<Item = &Value> {
    let items: &[Value] = match value {
        Value::Array(items) => items,
        other => std::slice::from_ref(other),
    };
    items.iter()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(StateFormat);

    impl StateFactory for Fixed {
        fn create(&self, client: &Client, link: &Link, response: &HttpResponse) -> Result<State> {
            base_state(client, link, response, StateData::Empty, self.0)
        }
    }

    #[test]
    fn test_accept_header_orders_by_quality() {
        let mut registry = ContentTypeRegistry::new();
        registry.register("text/html", Arc::new(HtmlStateFactory), 0.5);
        registry.register("application/hal+json", Arc::new(HalStateFactory), 1.0);
        registry.register("application/json", Arc::new(HalStateFactory), 0.75);
        assert_eq!(
            registry.accept_header(),
            "application/hal+json, application/json;q=0.75, text/html;q=0.5"
        );
    }

    #[test]
    fn test_register_replaces() {
        let mut registry = ContentTypeRegistry::new();
        registry.register("Application/Foo", Arc::new(Fixed(StateFormat::Stream)), 0.2);
        registry.register("application/foo", Arc::new(Fixed(StateFormat::Html)), 0.3);
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.accept_header(), "application/foo;q=0.3");
    }

    #[test]
    fn test_defaults_cover_every_format() {
        let registry = ContentTypeRegistry::with_defaults();
        for media_type in [
            "application/hal+json",
            "application/prs.hal-forms+json",
            "application/json",
            "application/vnd.siren+json",
            "application/vnd.api+json",
            "application/vnd.collection+json",
            "text/html",
            "text/event-stream",
        ] {
            assert!(registry.get(media_type).is_some(), "{}", media_type);
        }
        assert!(registry.accept_header().starts_with("application/prs.hal-forms+json, "));
    }

    #[test]
    fn test_parse_json_empty_body() {
        let response = HttpResponse::new(200, "  ");
        assert_eq!(parse_json(&response).unwrap(), Value::Object(Map::new()));
        assert!(parse_json(&HttpResponse::new(200, "{oops")).is_err());
    }

    #[test]
    fn test_href_of_and_one_or_many() {
        let v = serde_json::json!([{"href": "/a"}, "/b", 3]);
        let hrefs: Vec<&str> = one_or_many(&v).filter_map(href_of).collect();
        assert_eq!(hrefs, vec!["/a", "/b"]);
        let single = serde_json::json!({"href": "/c"});
        assert_eq!(one_or_many(&single).count(), 1);
    }
}
