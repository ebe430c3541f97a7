//! Siren.
//!
//! `properties` is the data. `entities` holding only `href` and `rel` are
//! links; full sub-entities are embedded states, reachable through every
//! relation they declare. `actions` become forms.

use crate::core::action::form::parse_method;
use crate::core::action::{Field, FieldKind, Form};
use crate::core::client::Client;
use crate::core::error::Result;
use crate::core::protocol::{media_types, rels};
use crate::core::state::factory::{header_links, parse_json, StateFactory};
use crate::core::state::{State, StateData, StateFormat};
use crate::core::types::{HttpResponse, Link, Links};
use serde_json::{Map, Value};
use std::sync::Arc;
use url::Url;

#[derive(Clone, Copy, Debug, Default)]
pub struct SirenStateFactory;

impl StateFactory for SirenStateFactory {
    fn create(&self, client: &Client, link: &Link, response: &HttpResponse) -> Result<State> {
        let body = parse_json(response)?;
        let uri = link.resolve()?;
        let mut state = parse_entity(client, &uri, &body);

        let mut links = header_links(&uri, response);
        links.extend(state.links.iter().cloned());
        state.links = links;
        state.headers = response.headers.clone();
        Ok(state)
    }
}

fn parse_entity(client: &Client, uri: &Url, entity: &Value) -> State {
    let data = entity
        .get("properties")
        .cloned()
        .unwrap_or_else(|| Value::Object(Map::new()));
    let mut state = State::new(uri.clone(), StateData::Json(data), StateFormat::Siren)
        .with_client(client);
    let mut links = Links::new(uri.clone());

    if let Some(Value::Array(raw_links)) = entity.get("links") {
        for raw in raw_links {
            add_link_entity(&mut links, raw);
        }
    }

    if let Some(Value::Array(entities)) = entity.get("entities") {
        for sub in entities {
            if sub.get("href").is_some() {
                add_link_entity(&mut links, sub);
                continue;
            }
            let Some(child_uri) = entity_self(sub).and_then(|href| uri.join(href).ok()) else {
                tracing::debug!("Skipping Siren sub-entity without self link");
                continue;
            };
            let child = Arc::new(parse_entity(client, &child_uri, sub));
            for rel in rel_list(sub) {
                links.add(Link::new(rel.clone(), child_uri.as_str(), uri.clone()));
                let is_collection = client.config().is_collection_rel(&rel);
                state.push_embedded(&rel, vec![child.clone()], is_collection, is_collection);
            }
        }
    }

    if let Some(Value::Array(actions)) = entity.get("actions") {
        state.forms = actions
            .iter()
            .filter_map(|a| parse_action(uri, a))
            .collect();
    }

    state.links = links;
    state
}

fn rel_list(value: &Value) -> Vec<String> {
    match value.get("rel") {
        Some(Value::Array(rels)) => rels
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Some(Value::String(rel)) => vec![rel.clone()],
        _ => Vec::new(),
    }
}

fn entity_self(entity: &Value) -> Option<&str> {
    match entity.get("links") {
        Some(Value::Array(links)) => links
            .iter()
            .find(|l| rel_list(l).iter().any(|r| r == rels::SELF))
            .and_then(|l| l.get("href"))
            .and_then(Value::as_str),
        _ => None,
    }
}

/// A link or link sub-entity: one link per declared relation.
fn add_link_entity(links: &mut Links, raw: &Value) {
    let Some(href) = raw.get("href").and_then(Value::as_str) else {
        return;
    };
    let text = |key: &str| raw.get(key).and_then(Value::as_str).map(str::to_string);
    for rel in rel_list(raw) {
        let mut link = Link::new(rel, href, links.context().clone());
        link.title = text("title");
        link.media_type = text("type");
        links.add(link);
    }
}

fn parse_action(base: &Url, action: &Value) -> Option<Form> {
    let name = action.get("name")?.as_str()?;
    let href = action.get("href").and_then(Value::as_str)?;
    let target = base.join(href).ok()?;
    let text = |key: &str| action.get(key).and_then(Value::as_str);

    let mut form = Form::new(target, name, parse_method(text("method")))
        .with_content_type(text("type").unwrap_or(media_types::FORM_URLENCODED));
    form.title = text("title").map(str::to_string);
    if let Some(Value::Array(fields)) = action.get("fields") {
        form.fields = fields.iter().filter_map(parse_field).collect();
    }
    Some(form)
}

fn parse_field(raw: &Value) -> Option<Field> {
    let obj = raw.as_object()?;
    let name = obj.get("name")?.as_str()?;
    let input_type = obj.get("type").and_then(Value::as_str).unwrap_or("text");

    let mut kind = FieldKind::for_input_type(input_type);
    kind.apply_constraints(obj);
    let mut field = Field::new(name, kind)
        .with_required(obj.get("required").and_then(Value::as_bool).unwrap_or(false))
        .with_read_only(obj.get("readOnly").and_then(Value::as_bool).unwrap_or(false));
    field.label = obj.get("title").and_then(Value::as_str).map(str::to_string);
    if let Some(value) = obj.get("value") {
        field = field.with_raw_value(value);
    }
    if let Some(class) = obj.get("class") {
        field.extensions.insert("class".to_string(), class.clone());
    }
    Some(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::action::FieldValue;
    use crate::core::client::testing::offline_client;
    use http::Method;
    use serde_json::json;

    fn create(body: Value) -> State {
        let client = offline_client();
        let link = Link::new("self", "/orders/42", client.bookmark().clone());
        let response = HttpResponse::new(200, body.to_string())
            .with_header("content-type", "application/vnd.siren+json");
        SirenStateFactory.create(&client, &link, &response).unwrap()
    }

    fn order() -> Value {
        json!({
            "class": ["order"],
            "properties": {"orderNumber": 42, "status": "pending"},
            "entities": [
                {"class": ["items"], "rel": ["http://x.io/rels/order-items"], "href": "/orders/42/items"},
                {
                    "class": ["customer"],
                    "rel": ["http://x.io/rels/customer", "item"],
                    "properties": {"name": "Kevin"},
                    "links": [{"rel": ["self"], "href": "/customers/pj123"}]
                },
                {"rel": ["orphan"], "properties": {}}
            ],
            "actions": [{
                "name": "add-item",
                "title": "Add Item",
                "method": "POST",
                "href": "/orders/42/items",
                "fields": [
                    {"name": "orderNumber", "type": "hidden", "value": "42"},
                    {"name": "quantity", "type": "number", "value": "2"},
                    {"name": "gift", "type": "checkbox", "value": true}
                ]
            }],
            "links": [
                {"rel": ["self"], "href": "/orders/42"},
                {"rel": ["previous"], "href": "/orders/41", "title": "Prev"}
            ]
        })
    }

    #[test]
    fn test_properties_become_data() {
        let state = create(order());
        assert_eq!(
            state.data,
            StateData::Json(json!({"orderNumber": 42, "status": "pending"}))
        );
        assert_eq!(state.format(), StateFormat::Siren);
    }

    #[test]
    fn test_links_and_link_entities() {
        let state = create(order());
        assert_eq!(state.get_link("previous").unwrap().title.as_deref(), Some("Prev"));
        assert_eq!(
            state
                .get_link("http://x.io/rels/order-items")
                .unwrap()
                .resolve()
                .unwrap()
                .as_str(),
            "https://api.example.org/orders/42/items"
        );
    }

    #[test]
    fn test_sub_entities_embedded_under_every_rel() {
        let state = create(order());
        let customer = &state.embedded("http://x.io/rels/customer")[0];
        assert_eq!(customer.uri.as_str(), "https://api.example.org/customers/pj123");
        assert_eq!(customer.data, StateData::Json(json!({"name": "Kevin"})));
        assert_eq!(state.embedded("item").len(), 1);
        assert!(state.embedded_group("item").unwrap().many);
        assert!(!state.embedded_group("http://x.io/rels/customer").unwrap().many);
        assert_eq!(state.collection.len(), 1);
        assert!(state.embedded("orphan").is_empty());
        assert!(state.has_link("http://x.io/rels/customer"));
    }

    #[test]
    fn test_actions() {
        let state = create(order());
        let action = state.action("add-item").unwrap();
        assert_eq!(action.method(), &Method::POST);
        assert_eq!(action.content_type(), "application/x-www-form-urlencoded");
        assert_eq!(action.title(), Some("Add Item"));
        assert_eq!(
            action.field("quantity").unwrap().value,
            Some(FieldValue::Number(2.0))
        );
        assert_eq!(action.field("gift").unwrap().value, Some(FieldValue::Bool(true)));
        assert_eq!(action.field("orderNumber").unwrap().input_type(), "hidden");
    }

    #[test]
    fn test_missing_sections_are_empty() {
        let state = create(json!({}));
        assert!(state.links.is_empty());
        assert!(state.forms.is_empty());
        assert!(state.collection.is_empty());
        assert_eq!(state.data, StateData::Json(json!({})));
    }
}
