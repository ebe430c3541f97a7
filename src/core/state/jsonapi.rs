//! JSON:API.
//!
//! Top-level and resource `links` become links. Each member of a `data`
//! array contributes an `item` link through its `links.self` and a partial
//! child state holding that resource object.

use crate::core::client::Client;
use crate::core::error::Result;
use crate::core::protocol::rels;
use crate::core::state::factory::{base_state, href_of, one_or_many, parse_json, StateFactory};
use crate::core::state::{State, StateData, StateFormat};
use crate::core::types::{HttpResponse, Link, Links};
use serde_json::{Map, Value};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default)]
pub struct JsonApiStateFactory;

impl StateFactory for JsonApiStateFactory {
    fn create(&self, client: &Client, link: &Link, response: &HttpResponse) -> Result<State> {
        let mut body = parse_json(response)?;
        let top_links = match &mut body {
            Value::Object(map) => map.remove("links"),
            _ => None,
        };

        let mut state = base_state(
            client,
            link,
            response,
            StateData::Json(body.clone()),
            StateFormat::JsonApi,
        )?;
        if let Some(Value::Object(raw)) = &top_links {
            add_links(&mut state.links, raw);
        }

        match body.get("data") {
            Some(Value::Array(resources)) => {
                let mut children = Vec::new();
                for resource in resources {
                    let Some(href) = resource
                        .get("links")
                        .and_then(|l| l.get(rels::SELF))
                        .and_then(href_of)
                    else {
                        continue;
                    };
                    let Ok(child_uri) = state.uri.join(href) else {
                        continue;
                    };
                    state
                        .links
                        .add(Link::new(rels::ITEM, child_uri.as_str(), state.uri.clone()));
                    children.push(Arc::new(child_state(client, child_uri, resource)));
                }
                state.push_embedded(rels::ITEM, children, true, true);
            }
            Some(Value::Object(resource)) => {
                if let Some(Value::Object(raw)) = resource.get("links") {
                    add_links(&mut state.links, raw);
                }
            }
            _ => {}
        }

        Ok(state)
    }
}

fn child_state(client: &Client, uri: url::Url, resource: &Value) -> State {
    let mut links = Links::new(uri.clone());
    if let Some(Value::Object(raw)) = resource.get("links") {
        add_links(&mut links, raw);
    }
    State::new(uri, StateData::Json(resource.clone()), StateFormat::JsonApi)
        .with_links(links)
        .with_partial(true)
        .with_client(client)
}

/// `links` members are strings, `{href}` objects, or arrays of either.
fn add_links(links: &mut Links, raw: &Map<String, Value>) {
    for (rel, value) in raw {
        for entry in one_or_many(value) {
            let Some(href) = href_of(entry) else {
                continue;
            };
            let mut link = Link::new(rel.clone(), href, links.context().clone());
            if let Some(title) = entry.get("title").and_then(Value::as_str) {
                link.title = Some(title.to_string());
            }
            links.add(link);
        }
    }
}
