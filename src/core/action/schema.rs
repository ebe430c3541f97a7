//! Pluggable form validation.
//!
//! A [`SchemaPlugin`] turns a form's fields into a [`Validator`]. The client
//! uses [`NoopSchemaPlugin`] unless another plugin is installed with
//! `Client::set_schema_plugin`.

use crate::core::action::field::{Field, FieldKind, SelectOptions};
use crate::core::action::json_schema::JsonSchema;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;

/// One validation problem, located by its path inside the submitted value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Issue {
    pub path: Vec<String>,
    pub message: String,
}

impl Issue {
    pub fn new(path: Vec<String>, message: impl Into<String>) -> Self {
        Self {
            path,
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.path.join("."), self.message)
        }
    }
}

pub trait Validator: Send + Sync {
    /// The (possibly normalized) value, or every issue found.
    fn validate(&self, value: &Value) -> Result<Value, Vec<Issue>>;
}

pub trait SchemaPlugin: Send + Sync {
    fn create_schema(&self, fields: &[Field]) -> Arc<dyn Validator>;
}

/// Accepts everything unchanged.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopValidator;

impl Validator for NoopValidator {
    fn validate(&self, value: &Value) -> Result<Value, Vec<Issue>> {
        Ok(value.clone())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSchemaPlugin;

impl SchemaPlugin for NoopSchemaPlugin {
    fn create_schema(&self, _fields: &[Field]) -> Arc<dyn Validator> {
        Arc::new(NoopValidator)
    }
}

/// Object schema derived from field metadata alone.
///
/// `address.city` becomes a nested `address` object holding `city`. A
/// required field makes every ancestor object required too.
#[derive(Clone, Copy, Debug, Default)]
pub struct FieldSchemaPlugin;

impl SchemaPlugin for FieldSchemaPlugin {
    fn create_schema(&self, fields: &[Field]) -> Arc<dyn Validator> {
        Arc::new(JsonSchema::new(object_schema(fields, field_schema)))
    }
}

/// Uses JSON Schema fragments carried in `extensions["schema"]`, falling
/// back to the field metadata for fields without one.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonSchemaPlugin;

impl SchemaPlugin for JsonSchemaPlugin {
    fn create_schema(&self, fields: &[Field]) -> Arc<dyn Validator> {
        let mut root = object_schema(fields, |field| match field.extensions.get("schema") {
            Some(fragment @ (Value::Object(_) | Value::Bool(_))) => strip_defs(fragment),
            _ => field_schema(field),
        });

        let mut defs = Map::new();
        for field in fields {
            if let Some(Value::Object(fragment)) = field.extensions.get("schema") {
                for key in ["$defs", "definitions"] {
                    if let Some(Value::Object(found)) = fragment.get(key) {
                        defs.extend(found.iter().map(|(k, v)| (k.clone(), v.clone())));
                    }
                }
            }
        }
        if !defs.is_empty() {
            if let Value::Object(map) = &mut root {
                map.insert("$defs".to_string(), Value::Object(defs.clone()));
                map.insert("definitions".to_string(), Value::Object(defs));
            }
        }
        Arc::new(JsonSchema::new(root))
    }
}

/// Definitions are hoisted to the document root so `#/$defs/..` still resolves.
fn strip_defs(fragment: &Value) -> Value {
    match fragment {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(k, _)| k.as_str() != "$defs" && k.as_str() != "definitions")
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn object_schema<F>(fields: &[Field], leaf: F) -> Value
where
    F: Fn(&Field) -> Value,
{
    let mut root = empty_object();
    for field in fields {
        let path = field.path();
        if path.is_empty() {
            continue;
        }
        insert_path(&mut root, &path, leaf(field), field.required);
    }
    root
}

fn empty_object() -> Value {
    json!({"type": "object", "properties": {}, "required": []})
}

fn insert_path(node: &mut Value, path: &[&str], leaf: Value, required: bool) {
    let Some((head, rest)) = path.split_first() else {
        return;
    };
    let Value::Object(map) = node else {
        return;
    };

    if required {
        if let Some(Value::Array(list)) = map.get_mut("required") {
            let name = Value::String(head.to_string());
            if !list.contains(&name) {
                list.push(name);
            }
        }
    }

    let Some(Value::Object(properties)) = map.get_mut("properties") else {
        return;
    };
    if rest.is_empty() {
        properties.insert(head.to_string(), leaf);
    } else {
        let child = properties
            .entry(head.to_string())
            .or_insert_with(empty_object);
        if !child.get("properties").is_some_and(Value::is_object) {
            *child = empty_object();
        }
        insert_path(child, rest, leaf, required);
    }
}

fn field_schema(field: &Field) -> Value {
    let mut schema = Map::new();
    let mut set = |key: &str, value: Value| {
        schema.insert(key.to_string(), value);
    };

    match &field.kind {
        FieldKind::Text {
            min_length,
            max_length,
            pattern,
            ..
        }
        | FieldKind::Password {
            min_length,
            max_length,
            pattern,
            ..
        } => {
            set("type", json!("string"));
            if let Some(n) = min_length {
                set("minLength", json!(n));
            }
            if let Some(n) = max_length {
                set("maxLength", json!(n));
            }
            if let Some(p) = pattern {
                set("pattern", json!(anchored(p)));
            }
        }
        FieldKind::TextArea {
            min_length,
            max_length,
            ..
        } => {
            set("type", json!("string"));
            if let Some(n) = min_length {
                set("minLength", json!(n));
            }
            if let Some(n) = max_length {
                set("maxLength", json!(n));
            }
        }
        FieldKind::Hidden => {}
        FieldKind::Date { .. } | FieldKind::DateTimeLocal { .. } => set("type", json!("string")),
        FieldKind::Number { min, max, .. } => {
            set("type", json!("number"));
            if let Some(n) = min {
                set("minimum", json!(n));
            }
            if let Some(n) = max {
                set("maximum", json!(n));
            }
        }
        FieldKind::Color => {
            set("type", json!("string"));
            set("pattern", json!("^#[0-9a-fA-F]{6}$"));
        }
        FieldKind::Boolean { .. } => set("type", json!("boolean")),
        FieldKind::Select {
            options,
            multiple,
            min_items,
            max_items,
            ..
        } => {
            let item = match options {
                SelectOptions::Inline(list) => json!({
                    "enum": list.iter().map(|o| o.value.clone()).collect::<Vec<_>>()
                }),
                SelectOptions::Linked { .. } => json!({"type": "string"}),
            };
            if *multiple {
                set("type", json!("array"));
                set("items", item);
                if let Some(n) = min_items {
                    set("minItems", json!(n));
                } else if field.required {
                    set("minItems", json!(1));
                }
                if let Some(n) = max_items {
                    set("maxItems", json!(n));
                }
            } else if let Value::Object(item) = item {
                schema.extend(item);
            }
        }
    }
    Value::Object(schema)
}

/// Form patterns match the whole value.
fn anchored(pattern: &str) -> String {
    let inner = pattern.strip_prefix('^').unwrap_or(pattern);
    let inner = inner.strip_suffix('$').unwrap_or(inner);
    format!("^(?:{})$", inner)
}
