//! Collection+JSON.
//!
//! `links` become links and `items` become `item` links with partial child
//! states built from their `data` name/value pairs. Each query is both a
//! link and a GET form; the `template` is a POST form called `create`.

use crate::core::action::{Field, Form};
use crate::core::client::Client;
use crate::core::error::Result;
use crate::core::protocol::{media_types, rels};
use crate::core::state::factory::{base_state, parse_json, StateFactory};
use crate::core::state::{State, StateData, StateFormat};
use crate::core::types::{HttpResponse, Link, Links};
use http::Method;
use serde_json::{Map, Value};
use std::sync::Arc;
use url::Url;

#[derive(Clone, Copy, Debug, Default)]
pub struct CollectionJsonStateFactory;

impl StateFactory for CollectionJsonStateFactory {
    fn create(&self, client: &Client, link: &Link, response: &HttpResponse) -> Result<State> {
        let body = parse_json(response)?;
        let collection = body
            .get("collection")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        let data: Map<String, Value> = collection
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "links" | "items" | "queries" | "template"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        let mut state = base_state(
            client,
            link,
            response,
            StateData::Json(Value::Object(data)),
            StateFormat::CollectionJson,
        )?;
        let uri = state.uri.clone();

        if let Some(Value::Array(raw)) = collection.get("links") {
            add_links(&mut state.links, raw);
        }

        if let Some(Value::Array(items)) = collection.get("items") {
            let mut children = Vec::new();
            for item in items {
                let Some(child_uri) = item
                    .get("href")
                    .and_then(Value::as_str)
                    .and_then(|href| uri.join(href).ok())
                else {
                    continue;
                };
                state
                    .links
                    .add(Link::new(rels::ITEM, child_uri.as_str(), uri.clone()));
                children.push(Arc::new(item_state(client, child_uri, item)));
            }
            state.push_embedded(rels::ITEM, children, true, true);
        }

        if let Some(Value::Array(queries)) = collection.get("queries") {
            for query in queries {
                let (Some(rel), Some(href)) = (
                    query.get("rel").and_then(Value::as_str),
                    query.get("href").and_then(Value::as_str),
                ) else {
                    continue;
                };
                let Ok(target) = uri.join(href) else {
                    continue;
                };
                let mut link = Link::new(rel, href, uri.clone());
                link.title = query.get("prompt").and_then(Value::as_str).map(str::to_string);
                link.name = query.get("name").and_then(Value::as_str).map(str::to_string);
                state.links.add(link);

                let name = query.get("name").and_then(Value::as_str).unwrap_or(rel);
                let mut form = Form::new(target, name, Method::GET)
                    .with_content_type(media_types::FORM_URLENCODED);
                form.title = query.get("prompt").and_then(Value::as_str).map(str::to_string);
                form.fields = data_fields(query.get("data"));
                state.forms.push(form);
            }
        }

        if let Some(template) = collection.get("template") {
            let target = collection
                .get("href")
                .and_then(Value::as_str)
                .and_then(|href| uri.join(href).ok())
                .unwrap_or_else(|| uri.clone());
            let mut form = Form::new(target, "create", Method::POST)
                .with_content_type(media_types::JSON);
            form.fields = data_fields(template.get("data"));
            state.forms.push(form);
        }

        Ok(state)
    }
}

fn item_state(client: &Client, uri: Url, item: &Value) -> State {
    let mut data = Map::new();
    if let Some(Value::Array(pairs)) = item.get("data") {
        for pair in pairs {
            if let Some(name) = pair.get("name").and_then(Value::as_str) {
                data.insert(
                    name.to_string(),
                    pair.get("value").cloned().unwrap_or(Value::Null),
                );
            }
        }
    }
    let mut links = Links::new(uri.clone());
    if let Some(Value::Array(raw)) = item.get("links") {
        add_links(&mut links, raw);
    }
    State::new(uri, StateData::Json(Value::Object(data)), StateFormat::CollectionJson)
        .with_links(links)
        .with_partial(true)
        .with_client(client)
}

fn add_links(links: &mut Links, raw: &[Value]) {
    for entry in raw {
        let (Some(rel), Some(href)) = (
            entry.get("rel").and_then(Value::as_str),
            entry.get("href").and_then(Value::as_str),
        ) else {
            continue;
        };
        let mut link = Link::new(rel, href, links.context().clone());
        link.title = entry.get("prompt").and_then(Value::as_str).map(str::to_string);
        link.name = entry.get("name").and_then(Value::as_str).map(str::to_string);
        links.add(link);
    }
}

/// Text fields from `[{name, value, prompt}]`.
fn data_fields(data: Option<&Value>) -> Vec<Field> {
    let Some(Value::Array(pairs)) = data else {
        return Vec::new();
    };
    pairs
        .iter()
        .filter_map(|pair| {
            let name = pair.get("name")?.as_str()?;
            let mut field = Field::text(name);
            field.label = pair.get("prompt").and_then(Value::as_str).map(str::to_string);
            if let Some(value) = pair.get("value") {
                field = field.with_raw_value(value);
            }
            Some(field)
        })
        .collect()
}
