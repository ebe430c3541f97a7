//! Error types for hypermedia client operations.
//!
//! The [`Result`] type alias is used throughout the crate.
//!
//! # Error Categories
//!
//! | Category | Variants | Retryable |
//! |----------|----------|-----------|
//! | HTTP | `Http`, `Problem` | Depends on status |
//! | Transport | `Network`, `Aborted` | `Network` only |
//! | Navigation | `RelationNotFound`, `ActionNotFound`, `AmbiguousAction` | No |
//! | Encoding | `UnsupportedContentType`, `Json`, `HeaderParse`, `UriTemplate`, `Url` | No |
//! | Lifecycle | `ClientDropped`, `Config` | No |
//!
//! Validation failures are not errors: a schema's `validate()` returns its
//! issues as a value and the caller decides how severe they are.
//!
//! # Examples
//!
//! ```
//! use hateoas_client::HateoasError;
//!
//! let err = HateoasError::RelationNotFound {
//!     rel: "author".into(),
//!     uri: "https://api.example.org/article/1".into(),
//! };
//! assert!(err.to_string().contains("author"));
//! assert!(!err.is_retryable());
//! ```

use crate::core::types::HttpResponse;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for hypermedia client operations.
pub type Result<T> = std::result::Result<T, HateoasError>;

/// Errors that can occur while fetching, parsing or navigating resources.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum HateoasError {
    /// The server answered with a non-2xx status and no structured body.
    #[error("{0}")]
    Http(HttpError),

    /// The server answered with an `application/problem+json` body (RFC 7807).
    #[error("{0}")]
    Problem(Problem),

    /// The request could not be completed (connection, TLS, body read).
    #[error("Network error: {0}")]
    Network(String),

    /// A relation was requested that the current state does not carry.
    #[error("Relation \"{rel}\" not found on {uri}")]
    RelationNotFound { rel: String, uri: String },

    /// No form/action with this name exists on the state.
    #[error("Action \"{name}\" not found on {uri}")]
    ActionNotFound { name: String, uri: String },

    /// Several actions match a name and no method was given to pick one.
    #[error("Action \"{name}\" is ambiguous: {count} candidates, specify a method")]
    AmbiguousAction { name: String, count: usize },

    /// An action body could not be serialized for this content type.
    #[error("Serializing content type {0} is not supported")]
    UnsupportedContentType(String),

    /// A response header was malformed.
    #[error("Header parse error: {0}")]
    HeaderParse(String),

    /// A URI template could not be expanded.
    #[error("URI template error: {0}")]
    UriTemplate(String),

    /// JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A URI could not be parsed or resolved.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// Invalid client configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The owning client was dropped while a handle was still in use.
    #[error("Client has been dropped")]
    ClientDropped,

    /// The request was aborted by the caller.
    #[error("Request aborted")]
    Aborted,

    /// An error observed by several waiters of one de-duplicated request.
    #[error("{0}")]
    Shared(#[from] Arc<HateoasError>),
}

impl HateoasError {
    /// HTTP status carried by this error, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            HateoasError::Http(e) => Some(e.status),
            HateoasError::Problem(p) => Some(p.status),
            HateoasError::Shared(inner) => inner.status(),
            _ => None,
        }
    }

    /// Problem details, looking through a shared de-dup error.
    pub fn as_problem(&self) -> Option<&Problem> {
        match self {
            HateoasError::Problem(p) => Some(p),
            HateoasError::Shared(inner) => inner.as_problem(),
            _ => None,
        }
    }

    /// Plain HTTP error, looking through a shared de-dup error.
    pub fn as_http(&self) -> Option<&HttpError> {
        match self {
            HateoasError::Http(e) => Some(e),
            HateoasError::Shared(inner) => inner.as_http(),
            _ => None,
        }
    }

    /// Check if this error is transient.
    ///
    /// Returns `true` for transport failures and HTTP 408, 425, 429, 502,
    /// 503 and 504. Retrying is left to a middleware; the client never
    /// retries on its own.
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            HateoasError::Network(_) => true,
            HateoasError::Shared(inner) => inner.is_retryable(),
            _ => matches!(self.status(), Some(408 | 425 | 429 | 502 | 503 | 504)),
        }
    }

    /// Returns `true` for HTTP 401 (Unauthorized) or 403 (Forbidden).
    #[inline]
    #[must_use]
    pub fn is_access_denied(&self) -> bool {
        matches!(self.status(), Some(401 | 403))
    }

    #[inline]
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// A non-2xx response without a structured error body.
#[derive(Debug, Clone)]
pub struct HttpError {
    pub status: u16,
    pub response: HttpResponse,
}

impl HttpError {
    pub fn new(response: HttpResponse) -> Self {
        Self {
            status: response.status,
            response,
        }
    }
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match http::StatusCode::from_u16(self.status)
            .ok()
            .and_then(|s| s.canonical_reason())
        {
            Some(reason) => write!(f, "HTTP error {} {}", self.status, reason),
            None => write!(f, "HTTP error {}", self.status),
        }
    }
}

/// RFC 7807 problem details.
#[derive(Debug, Clone)]
pub struct Problem {
    /// `type` member, defaults to `about:blank`.
    pub problem_type: String,
    pub title: Option<String>,
    /// `status` member, falling back to the response status.
    pub status: u16,
    pub detail: Option<String>,
    pub instance: Option<String>,
    /// Any members beyond the ones defined by RFC 7807.
    pub extensions: Map<String, Value>,
    pub response: HttpResponse,
}

impl Problem {
    /// Build a problem from a response whose body is `application/problem+json`.
    ///
    /// A body that is not a JSON object yields a problem with only the
    /// response status filled in.
    pub fn from_response(response: HttpResponse) -> Self {
        let mut body = match serde_json::from_slice::<Value>(&response.body) {
            Ok(Value::Object(map)) => map,
            _ => Map::new(),
        };
        let take_string = |map: &mut Map<String, Value>, key: &str| match map.remove(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        };

        let problem_type =
            take_string(&mut body, "type").unwrap_or_else(|| "about:blank".to_string());
        let title = take_string(&mut body, "title");
        let detail = take_string(&mut body, "detail");
        let instance = take_string(&mut body, "instance");
        let status = body
            .remove("status")
            .and_then(|v| v.as_u64())
            .and_then(|v| u16::try_from(v).ok())
            .unwrap_or(response.status);

        Problem {
            problem_type,
            title,
            status,
            detail,
            instance,
            extensions: body,
            response,
        }
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP error {}", self.status)?;
        if let Some(title) = &self.title {
            write!(f, ": {}", title)?;
        }
        if let Some(detail) = &self.detail {
            write!(f, " ({})", detail)?;
        }
        Ok(())
    }
}
