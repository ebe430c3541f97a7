use crate::core::error::Result;
use crate::core::protocol::{header_names, media_types};
use crate::core::types::{CacheMode, HttpRequest};
use bytes::Bytes;
use http::Method;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use url::Url;

/// Body of a staged request.
#[derive(Clone, Debug, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON; `Content-Type` defaults to `application/json`.
    Json(Value),
    Raw(Bytes),
}

/// Per-request settings staged on a resource or relation hop.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RequestOptions {
    /// `None` means GET.
    pub method: Option<Method>,
    pub headers: BTreeMap<String, String>,
    pub body: Option<RequestBody>,
    pub content_type: Option<String>,
    /// Variables for templated links.
    pub template_vars: Map<String, Value>,
    pub cache: CacheMode,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.method = Some(method);
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    #[must_use]
    pub fn with_json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Bytes>, content_type: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Raw(body.into()));
        self.content_type = Some(content_type.into());
        self
    }

    /// Merge template variables; a non-object `vars` is ignored.
    #[must_use]
    pub fn with_template_vars(mut self, vars: Value) -> Self {
        if let Value::Object(map) = vars {
            self.template_vars.extend(map);
        }
        self
    }

    #[must_use]
    pub fn with_cache_mode(mut self, cache: CacheMode) -> Self {
        self.cache = cache;
        self
    }

    pub fn method(&self) -> Method {
        self.method.clone().unwrap_or(Method::GET)
    }

    /// GET without body, headers or cache override.
    pub fn is_plain_get(&self) -> bool {
        self.method() == Method::GET
            && self.body.is_none()
            && self.headers.is_empty()
            && self.cache == CacheMode::Default
    }

    pub(crate) fn into_request(self, url: Url) -> Result<HttpRequest> {
        let mut request = HttpRequest::new(self.method(), url)
            .with_headers(self.headers)
            .with_cache_mode(self.cache);

        let content_type = match self.body {
            Some(RequestBody::Json(value)) => {
                request.body = Bytes::from(serde_json::to_vec(&value)?);
                Some(self.content_type.unwrap_or_else(|| media_types::JSON.to_string()))
            }
            Some(RequestBody::Raw(bytes)) => {
                request.body = bytes;
                self.content_type
            }
            None => self.content_type,
        };
        if let Some(content_type) = content_type {
            if !request.has_header(header_names::CONTENT_TYPE) {
                request.set_header(header_names::CONTENT_TYPE, content_type);
            }
        }
        Ok(request)
    }
}
