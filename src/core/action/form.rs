//! Form descriptors and body encoding.

use crate::core::action::field::Field;
use crate::core::error::{HateoasError, Result};
use crate::core::protocol::{self, media_types};
use bytes::Bytes;
use http::Method;
use serde_json::Value;
use url::Url;

/// A state transition advertised by a representation.
#[derive(Clone, Debug, PartialEq)]
pub struct Form {
    /// Absolute target of the submission.
    pub uri: Url,
    pub name: String,
    pub title: Option<String>,
    pub method: Method,
    pub content_type: String,
    pub fields: Vec<Field>,
}

impl Form {
    pub fn new(uri: Url, name: impl Into<String>, method: Method) -> Self {
        Self {
            uri,
            name: name.into(),
            title: None,
            method,
            content_type: media_types::JSON.to_string(),
            fields: Vec::new(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    #[inline]
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }
}

/// Parse an HTTP method name, defaulting to GET when absent or invalid.
pub(crate) fn parse_method(method: Option<&str>) -> Method {
    let Some(raw) = method else {
        return Method::GET;
    };
    match Method::from_bytes(raw.trim().to_ascii_uppercase().as_bytes()) {
        Ok(method) => method,
        Err(_) => {
            tracing::warn!("Invalid form method {:?}, falling back to GET", raw);
            Method::GET
        }
    }
}

/// Serialize `data` as the body of a `content_type` request.
///
/// JSON types (`application/json`, `application/*+json`) and
/// `application/x-www-form-urlencoded` are supported.
pub fn encode_body(content_type: &str, data: &Value) -> Result<Bytes> {
    let media_type = protocol::parse_media_type(content_type)
        .ok_or_else(|| HateoasError::UnsupportedContentType(content_type.to_string()))?;

    if media_type == media_types::JSON || protocol::is_json_suffix_type(&media_type) {
        return Ok(Bytes::from(serde_json::to_vec(data)?));
    }
    if media_type == media_types::FORM_URLENCODED {
        let Value::Object(_) = data else {
            return Err(HateoasError::UnsupportedContentType(format!(
                "{} with a non-object body",
                media_type
            )));
        };
        let encoded = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form_pairs(data))
            .finish();
        return Ok(Bytes::from(encoded));
    }
    Err(HateoasError::UnsupportedContentType(media_type))
}

/// `uri` with `data`'s members merged into its query string.
///
/// Members of `data` replace existing parameters of the same name.
pub fn merge_query(uri: &Url, data: &Value) -> Url {
    let pairs = form_pairs(data);
    if pairs.is_empty() {
        return uri.clone();
    }

    let kept: Vec<(String, String)> = uri
        .query_pairs()
        .filter(|(k, _)| !pairs.iter().any(|(name, _)| name == k))
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    let mut merged = uri.clone();
    merged
        .query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .extend_pairs(pairs);
    merged
}

/// Flatten an object into name/value pairs. Arrays repeat the name, nulls
/// are dropped, nested objects are sent as JSON text.
pub(crate) fn form_pairs(data: &Value) -> Vec<(String, String)> {
    let Value::Object(map) = data else {
        return Vec::new();
    };
    let mut pairs = Vec::new();
    for (name, value) in map {
        match value {
            Value::Null => {}
            Value::Array(items) => {
                for item in items {
                    if let Some(s) = scalar(item) {
                        pairs.push((name.clone(), s));
                    }
                }
            }
            other => {
                if let Some(s) = scalar(other) {
                    pairs.push((name.clone(), s));
                }
            }
        }
    }
    pairs
}

fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}
