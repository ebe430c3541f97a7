//! HAL and HAL-FORMS.
//!
//! `_links` become links, `_embedded` becomes embedded states (and the
//! collection, for collection relations), `_templates` become forms. What is
//! left of the document is the state's data.

use crate::core::action::field::{coerce_number, value_to_string};
use crate::core::action::form::parse_method;
use crate::core::action::{Field, FieldKind, Form, SelectOption, SelectOptions};
use crate::core::client::Client;
use crate::core::error::Result;
use crate::core::protocol::{media_types, rels};
use crate::core::state::factory::{header_links, href_of, one_or_many, parse_json, StateFactory};
use crate::core::state::{State, StateData, StateFormat};
use crate::core::types::{HttpResponse, Link, Links};
use serde_json::{Map, Value};
use std::sync::Arc;
use url::Url;

/// Property members with a typed counterpart on [`Field`].
const KNOWN_PROPERTY_MEMBERS: &[&str] = &[
    "name",
    "prompt",
    "readOnly",
    "regex",
    "required",
    "templated",
    "value",
    "cols",
    "rows",
    "maxLength",
    "minLength",
    "placeholder",
    "min",
    "max",
    "step",
    "type",
    "options",
];

#[derive(Clone, Copy, Debug, Default)]
pub struct HalStateFactory;

impl StateFactory for HalStateFactory {
    fn create(&self, client: &Client, link: &Link, response: &HttpResponse) -> Result<State> {
        let body = parse_json(response)?;
        let uri = link.resolve()?;
        let mut state = parse_document(client, &uri, body);

        let mut links = header_links(&uri, response);
        links.extend(state.links.iter().cloned());
        state.links = links;
        state.headers = response.headers.clone();
        Ok(state)
    }
}

/// Build a state from one HAL document, recursing into `_embedded`.
fn parse_document(client: &Client, uri: &Url, body: Value) -> State {
    let Value::Object(mut map) = body else {
        return State::new(uri.clone(), StateData::Json(body), StateFormat::Hal).with_client(client);
    };

    let raw_links = map.remove("_links");
    let raw_embedded = map.remove("_embedded");
    let raw_templates = map.remove("_templates");

    let mut links = Links::new(uri.clone());
    if let Some(Value::Object(raw)) = &raw_links {
        parse_links(&mut links, raw);
    }

    let mut state = State::new(uri.clone(), StateData::Json(Value::Object(map)), StateFormat::Hal)
        .with_client(client);

    if let Some(Value::Object(embedded)) = raw_embedded {
        for (rel, value) in embedded {
            let many = value.is_array();
            let mut children = Vec::new();
            for item in one_or_many(&value) {
                let Some(child_uri) = self_href(item).and_then(|href| uri.join(href).ok()) else {
                    tracing::debug!("Skipping embedded {} without self link", rel);
                    continue;
                };
                let already_linked = links
                    .get_many(&rel)
                    .iter()
                    .any(|l| l.resolve().is_ok_and(|u| u == child_uri));
                if !already_linked {
                    links.add(Link::new(rel.clone(), child_uri.as_str(), uri.clone()));
                }
                children.push(Arc::new(parse_document(client, &child_uri, item.clone())));
            }
            let is_collection = client.config().is_collection_rel(&rel);
            state.push_embedded(&rel, children, many, is_collection);
        }
    }

    if let Some(Value::Object(templates)) = &raw_templates {
        let target = links
            .get(rels::SELF)
            .and_then(|l| l.resolve().ok())
            .unwrap_or_else(|| uri.clone());
        state.forms = parse_templates(&target, templates);
    }

    state.links = links;
    state
}

fn self_href(item: &Value) -> Option<&str> {
    let own = item.get("_links")?.get(rels::SELF)?;
    one_or_many(own).find_map(href_of)
}

fn parse_links(links: &mut Links, raw: &Map<String, Value>) {
    for (rel, value) in raw {
        if rel == "curies" {
            continue;
        }
        for entry in one_or_many(value) {
            let Some(href) = href_of(entry) else {
                continue;
            };
            let mut link = Link::new(rel.clone(), href, links.context().clone());
            if let Value::Object(attrs) = entry {
                let text = |key: &str| attrs.get(key).and_then(Value::as_str).map(str::to_string);
                link.title = text("title");
                link.name = text("name");
                link.media_type = text("type");
                link.hreflang = text("hreflang");
                link.templated = attrs.get("templated").and_then(Value::as_bool).unwrap_or(false);
            }
            links.add(link);
        }
    }
}

/// `_links` object for a set of links: one object per relation, or an array
/// when the relation has several links.
pub(crate) fn serialize_links(links: &Links) -> Value {
    let mut out = Map::new();
    for rel in links.rels() {
        let entries: Vec<Value> = links
            .get_many(rel)
            .iter()
            .map(|link| {
                let mut obj = Map::new();
                obj.insert("href".into(), Value::String(link.href.clone()));
                if let Some(title) = &link.title {
                    obj.insert("title".into(), Value::String(title.clone()));
                }
                if let Some(name) = &link.name {
                    obj.insert("name".into(), Value::String(name.clone()));
                }
                if let Some(media_type) = &link.media_type {
                    obj.insert("type".into(), Value::String(media_type.clone()));
                }
                if let Some(hreflang) = &link.hreflang {
                    obj.insert("hreflang".into(), Value::String(hreflang.clone()));
                }
                if link.templated {
                    obj.insert("templated".into(), Value::Bool(true));
                }
                Value::Object(obj)
            })
            .collect();
        let value = match <[Value; 1]>::try_from(entries) {
            Ok([single]) => single,
            Err(entries) => Value::Array(entries),
        };
        out.insert(rel.clone(), value);
    }
    Value::Object(out)
}

fn parse_templates(default_target: &Url, templates: &Map<String, Value>) -> Vec<Form> {
    templates
        .iter()
        .filter_map(|(name, template)| {
            let template = template.as_object()?;
            let text = |key: &str| template.get(key).and_then(Value::as_str);

            let target = text("target")
                .and_then(|t| default_target.join(t).ok())
                .unwrap_or_else(|| default_target.clone());
            let mut form = Form::new(target, name.clone(), parse_method(text("method")))
                .with_content_type(text("contentType").unwrap_or(media_types::JSON));
            form.title = text("title").map(str::to_string);
            if let Some(Value::Array(properties)) = template.get("properties") {
                form.fields = properties
                    .iter()
                    .filter_map(Value::as_object)
                    .filter_map(parse_property)
                    .collect();
            }
            Some(form)
        })
        .collect()
}

fn parse_property(property: &Map<String, Value>) -> Option<Field> {
    let name = property.get("name")?.as_str()?;
    let input_type = property.get("type").and_then(Value::as_str).unwrap_or("text");

    let mut kind = match property.get("options").and_then(Value::as_object) {
        Some(options) => select_kind(options),
        None => FieldKind::for_input_type(input_type),
    };
    kind.apply_constraints(property);

    let flag = |key: &str| property.get(key).and_then(Value::as_bool).unwrap_or(false);
    let mut field = Field::new(name, kind)
        .with_required(flag("required"))
        .with_read_only(flag("readOnly"));
    field.label = property.get("prompt").and_then(Value::as_str).map(str::to_string);
    if let Some(value) = property.get("value") {
        field = field.with_raw_value(value);
    }
    if let FieldKind::Select {
        selected_values, ..
    } = &mut field.kind
    {
        if selected_values.is_empty() {
            if let Some(value) = property.get("value") {
                selected_values.extend(one_or_many(value).filter_map(value_to_string));
            }
        }
    }

    field.extensions = property
        .iter()
        .filter(|(k, _)| !KNOWN_PROPERTY_MEMBERS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    Some(field)
}

fn select_kind(options: &Map<String, Value>) -> FieldKind {
    let count = |key: &str| options.get(key).and_then(coerce_number).map(|n| n as usize);
    let text = |key: &str, default: &str| {
        options
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or(default)
            .to_string()
    };
    let prompt_field = text("promptField", "prompt");
    let value_field = text("valueField", "value");
    let max_items = count("maxItems");

    let source = if let Some(Value::Array(inline)) = options.get("inline") {
        SelectOptions::Inline(
            inline
                .iter()
                .filter_map(|entry| match entry {
                    Value::Object(obj) => {
                        let value = obj.get(&value_field).and_then(value_to_string)?;
                        let label = obj
                            .get(&prompt_field)
                            .and_then(value_to_string)
                            .unwrap_or_else(|| value.clone());
                        Some(SelectOption::new(label, value))
                    }
                    other => value_to_string(other).map(|v| SelectOption::new(v.clone(), v)),
                })
                .collect(),
        )
    } else if let Some(link) = options.get("link") {
        SelectOptions::Linked {
            href: href_of(link).unwrap_or_default().to_string(),
            templated: link.get("templated").and_then(Value::as_bool).unwrap_or(false),
            prompt_field,
            value_field,
        }
    } else {
        SelectOptions::Inline(Vec::new())
    };

    FieldKind::Select {
        options: source,
        multiple: max_items.map_or(false, |m| m > 1),
        min_items: count("minItems"),
        max_items,
        selected_values: options
            .get("selectedValues")
            .map(|v| one_or_many(v).filter_map(value_to_string).collect())
            .unwrap_or_default(),
    }
}
