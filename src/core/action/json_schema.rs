//! JSON Schema validation for form data.
//!
//! Covers the keywords forms actually use: `type`, `enum`, `const`, string
//! length and `pattern`, numeric bounds (inclusive and exclusive) and
//! `multipleOf`, `properties`, `required`, `additionalProperties`,
//! `min/maxProperties`, `items`, `min/maxItems`, `uniqueItems`, the
//! `allOf`/`anyOf`/`oneOf`/`not` combinators and local `$ref` pointers into
//! `$defs` or `definitions`.

use crate::core::action::schema::{Issue, Validator};
use regex::Regex;
use serde_json::{Map, Value};

const MAX_REF_DEPTH: usize = 64;

/// A compiled-on-demand JSON Schema document.
#[derive(Clone, Debug)]
pub struct JsonSchema {
    root: Value,
}

impl JsonSchema {
    pub fn new(root: Value) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Value {
        &self.root
    }

    /// All issues found in `value`; empty when it conforms.
    pub fn issues(&self, value: &Value) -> Vec<Issue> {
        let mut issues = Vec::new();
        let mut path = Vec::new();
        self.check(&self.root, value, &mut path, &mut issues, 0);
        issues
    }

    fn check(
        &self,
        schema: &Value,
        value: &Value,
        path: &mut Vec<String>,
        issues: &mut Vec<Issue>,
        depth: usize,
    ) {
        let schema = match schema {
            Value::Bool(true) => return,
            Value::Bool(false) => {
                issues.push(Issue::new(path.clone(), "No value is allowed here"));
                return;
            }
            Value::Object(map) => map,
            _ => return,
        };

        if let Some(Value::String(reference)) = schema.get("$ref") {
            if depth >= MAX_REF_DEPTH {
                issues.push(Issue::new(path.clone(), format!("$ref {} nests too deeply", reference)));
                return;
            }
            match self.resolve_ref(reference) {
                Some(target) => self.check(target, value, path, issues, depth + 1),
                None => issues.push(Issue::new(
                    path.clone(),
                    format!("Unresolvable $ref {}", reference),
                )),
            }
        }

        if let Some(expected) = schema.get("type") {
            if !type_matches(expected, value) {
                issues.push(Issue::new(
                    path.clone(),
                    format!("Expected {}, got {}", type_label(expected), json_type(value)),
                ));
                return;
            }
        }

        if let Some(Value::Array(allowed)) = schema.get("enum") {
            if !allowed.iter().any(|candidate| json_eq(candidate, value)) {
                issues.push(Issue::new(path.clone(), "Value is not one of the allowed options"));
            }
        }
        if let Some(expected) = schema.get("const") {
            if !json_eq(expected, value) {
                issues.push(Issue::new(path.clone(), format!("Value must be {}", expected)));
            }
        }

        match value {
            Value::String(s) => check_string(schema, s, path, issues),
            Value::Number(n) => {
                if let Some(n) = n.as_f64() {
                    check_number(schema, n, path, issues);
                }
            }
            Value::Object(object) => self.check_object(schema, object, path, issues, depth),
            Value::Array(items) => self.check_array(schema, items, path, issues, depth),
            _ => {}
        }

        if let Some(Value::Array(all)) = schema.get("allOf") {
            for sub in all {
                self.check(sub, value, path, issues, depth + 1);
            }
        }
        if let Some(Value::Array(any)) = schema.get("anyOf") {
            if !any.iter().any(|sub| self.conforms(sub, value, path, depth)) {
                issues.push(Issue::new(path.clone(), "Value does not match any allowed schema"));
            }
        }
        if let Some(Value::Array(one)) = schema.get("oneOf") {
            let matching = one
                .iter()
                .filter(|sub| self.conforms(sub, value, path, depth))
                .count();
            if matching != 1 {
                issues.push(Issue::new(
                    path.clone(),
                    format!("Value must match exactly one schema, matched {}", matching),
                ));
            }
        }
        if let Some(not) = schema.get("not") {
            if self.conforms(not, value, path, depth) {
                issues.push(Issue::new(path.clone(), "Value matches a forbidden schema"));
            }
        }
    }

    fn conforms(&self, schema: &Value, value: &Value, path: &mut Vec<String>, depth: usize) -> bool {
        let mut scratch = Vec::new();
        self.check(schema, value, path, &mut scratch, depth + 1);
        scratch.is_empty()
    }

    fn check_object(
        &self,
        schema: &Map<String, Value>,
        object: &Map<String, Value>,
        path: &mut Vec<String>,
        issues: &mut Vec<Issue>,
        depth: usize,
    ) {
        if let Some(Value::Array(required)) = schema.get("required") {
            for name in required.iter().filter_map(Value::as_str) {
                if !object.contains_key(name) {
                    let mut at = path.clone();
                    at.push(name.to_string());
                    issues.push(Issue::new(at, "Required"));
                }
            }
        }

        let properties = schema.get("properties").and_then(Value::as_object);
        for (key, member) in object {
            let declared = properties.and_then(|p| p.get(key));
            path.push(key.clone());
            match (declared, schema.get("additionalProperties")) {
                (Some(sub), _) => self.check(sub, member, path, issues, depth + 1),
                (None, Some(Value::Bool(false))) => {
                    issues.push(Issue::new(path.clone(), "Unexpected property"));
                }
                (None, Some(extra @ Value::Object(_))) => {
                    self.check(extra, member, path, issues, depth + 1)
                }
                (None, _) => {}
            }
            path.pop();
        }

        if let Some(min) = schema.get("minProperties").and_then(Value::as_u64) {
            if (object.len() as u64) < min {
                issues.push(Issue::new(path.clone(), format!("Expected at least {} properties", min)));
            }
        }
        if let Some(max) = schema.get("maxProperties").and_then(Value::as_u64) {
            if (object.len() as u64) > max {
                issues.push(Issue::new(path.clone(), format!("Expected at most {} properties", max)));
            }
        }
    }

    fn check_array(
        &self,
        schema: &Map<String, Value>,
        items: &[Value],
        path: &mut Vec<String>,
        issues: &mut Vec<Issue>,
        depth: usize,
    ) {
        if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
            if (items.len() as u64) < min {
                issues.push(Issue::new(path.clone(), format!("Expected at least {} items", min)));
            }
        }
        if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
            if (items.len() as u64) > max {
                issues.push(Issue::new(path.clone(), format!("Expected at most {} items", max)));
            }
        }
        if schema.get("uniqueItems") == Some(&Value::Bool(true)) {
            let duplicate = items
                .iter()
                .enumerate()
                .any(|(i, a)| items[i + 1..].iter().any(|b| json_eq(a, b)));
            if duplicate {
                issues.push(Issue::new(path.clone(), "Items must be unique"));
            }
        }
        if let Some(item_schema) = schema.get("items") {
            for (index, item) in items.iter().enumerate() {
                path.push(index.to_string());
                self.check(item_schema, item, path, issues, depth + 1);
                path.pop();
            }
        }
    }

    /// `#`, `#/$defs/name`, `#/definitions/name` or any local JSON pointer.
    fn resolve_ref(&self, reference: &str) -> Option<&Value> {
        let pointer = reference.strip_prefix('#')?;
        if pointer.is_empty() {
            return Some(&self.root);
        }
        self.root.pointer(pointer)
    }
}

impl Validator for JsonSchema {
    fn validate(&self, value: &Value) -> Result<Value, Vec<Issue>> {
        let issues = self.issues(value);
        if issues.is_empty() {
            Ok(value.clone())
        } else {
            Err(issues)
        }
    }
}

fn check_string(schema: &Map<String, Value>, s: &str, path: &[String], issues: &mut Vec<Issue>) {
    let len = s.chars().count() as u64;
    if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
        if len < min {
            issues.push(Issue::new(path.to_vec(), format!("Must be at least {} characters", min)));
        }
    }
    if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
        if len > max {
            issues.push(Issue::new(path.to_vec(), format!("Must be at most {} characters", max)));
        }
    }
    if let Some(Value::String(pattern)) = schema.get("pattern") {
        match Regex::new(pattern) {
            Ok(re) if !re.is_match(s) => {
                issues.push(Issue::new(path.to_vec(), format!("Must match {}", pattern)));
            }
            Ok(_) => {}
            Err(e) => {
                tracing::warn!("Ignoring invalid schema pattern {}: {}", pattern, e);
            }
        }
    }
}

fn check_number(schema: &Map<String, Value>, n: f64, path: &[String], issues: &mut Vec<Issue>) {
    let bound = |key: &str| schema.get(key).and_then(Value::as_f64);
    if let Some(min) = bound("minimum") {
        if n < min {
            issues.push(Issue::new(path.to_vec(), format!("Must be >= {}", min)));
        }
    }
    if let Some(max) = bound("maximum") {
        if n > max {
            issues.push(Issue::new(path.to_vec(), format!("Must be <= {}", max)));
        }
    }
    if let Some(min) = bound("exclusiveMinimum") {
        if n <= min {
            issues.push(Issue::new(path.to_vec(), format!("Must be > {}", min)));
        }
    }
    if let Some(max) = bound("exclusiveMaximum") {
        if n >= max {
            issues.push(Issue::new(path.to_vec(), format!("Must be < {}", max)));
        }
    }
    if let Some(step) = bound("multipleOf") {
        if step > 0.0 {
            let ratio = n / step;
            if (ratio - ratio.round()).abs() > 1e-9 {
                issues.push(Issue::new(path.to_vec(), format!("Must be a multiple of {}", step)));
            }
        }
    }
}

fn type_matches(expected: &Value, value: &Value) -> bool {
    match expected {
        Value::String(name) => is_type(name, value),
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .any(|name| is_type(name, value)),
        _ => true,
    }
}

fn is_type(name: &str, value: &Value) -> bool {
    match name {
        "null" => value.is_null(),
        "boolean" => value.is_boolean(),
        "string" => value.is_string(),
        "number" => value.is_number(),
        "integer" => match value {
            Value::Number(n) => {
                n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
            }
            _ => false,
        },
        "object" => value.is_object(),
        "array" => value.is_array(),
        _ => true,
    }
}

fn type_label(expected: &Value) -> String {
    match expected {
        Value::Array(names) => names
            .iter()
            .filter_map(Value::as_str)
            .collect::<Vec<_>>()
            .join(" or "),
        other => other.as_str().unwrap_or("any").to_string(),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Equality with `1` and `1.0` treated as the same number.
fn json_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| json_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len()
                && x.iter()
                    .all(|(k, v)| y.get(k).is_some_and(|other| json_eq(v, other)))
        }
        _ => a == b,
    }
}
