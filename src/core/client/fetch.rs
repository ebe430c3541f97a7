//! Fetch pipeline: origin-scoped middleware chain in front of a [`Network`].
//!
//! Every request runs through the middlewares whose origin pattern matches
//! the request's origin, in registration order, before reaching the network.
//! [`Fetcher::fetch_or_throw`] additionally turns non-2xx responses into
//! [`HateoasError::Http`] or [`HateoasError::Problem`].

use crate::core::error::{HateoasError, HttpError, Problem, Result};
use crate::core::protocol::media_types;
use crate::core::traits::{Middleware, Network, Next};
use crate::core::types::{HttpRequest, HttpResponse};
use parking_lot::RwLock;
use regex::Regex;
use std::sync::Arc;

/// Compiled origin filter for middleware registration.
///
/// Accepts `*` (every origin), an exact origin such as
/// `https://api.example.org`, or a single-level wildcard subdomain such as
/// `https://*.example.org`. A pattern without scheme matches any scheme.
#[derive(Clone, Debug)]
pub struct OriginMatcher {
    pattern: String,
    regex: Option<Regex>,
}

impl OriginMatcher {
    /// Matches every origin.
    pub fn any() -> Self {
        Self {
            pattern: "*".to_string(),
            regex: None,
        }
    }

    pub fn new(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim().trim_end_matches('/').to_ascii_lowercase();
        if pattern == "*" {
            return Ok(Self::any());
        }
        if pattern.is_empty() {
            return Err(HateoasError::Config("Empty origin pattern".to_string()));
        }

        let escaped = regex::escape(&pattern).replace(r"\*", r"[^./:]+");
        let source = if pattern.contains("://") {
            format!("^{}$", escaped)
        } else {
            format!("^[a-z][a-z0-9+.-]*://{}$", escaped)
        };
        let regex = Regex::new(&source)
            .map_err(|e| HateoasError::Config(format!("Invalid origin pattern '{}': {}", pattern, e)))?;
        Ok(Self {
            pattern,
            regex: Some(regex),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, origin: &str) -> bool {
        match &self.regex {
            None => true,
            Some(regex) => regex.is_match(&origin.to_ascii_lowercase()),
        }
    }
}

struct RegisteredMiddleware {
    matcher: OriginMatcher,
    middleware: Arc<dyn Middleware>,
}

/// Runs requests through the middleware chain and the network.
pub struct Fetcher {
    network: Arc<dyn Network>,
    middlewares: RwLock<Vec<RegisteredMiddleware>>,
    enable_logging: bool,
}

impl Fetcher {
    pub fn new(network: Arc<dyn Network>) -> Self {
        Self {
            network,
            middlewares: RwLock::new(Vec::new()),
            enable_logging: false,
        }
    }

    pub fn with_logging(mut self, enable: bool) -> Self {
        self.enable_logging = enable;
        self
    }

    /// Register a middleware for origins matching `origin` (`*` for all).
    pub fn use_middleware(&self, middleware: Arc<dyn Middleware>, origin: &str) -> Result<()> {
        let matcher = OriginMatcher::new(origin)?;
        self.middlewares.write().push(RegisteredMiddleware {
            matcher,
            middleware,
        });
        Ok(())
    }

    /// Register a middleware for every origin.
    pub fn push(&self, middleware: Arc<dyn Middleware>) {
        self.middlewares.write().push(RegisteredMiddleware {
            matcher: OriginMatcher::any(),
            middleware,
        });
    }

    /// Middlewares that apply to `origin`, in registration order.
    fn chain_for(&self, origin: &str) -> Vec<Arc<dyn Middleware>> {
        self.middlewares
            .read()
            .iter()
            .filter(|m| m.matcher.matches(origin))
            .map(|m| m.middleware.clone())
            .collect()
    }

    /// Execute a request; any status is a successful exchange.
    pub async fn fetch(&self, request: HttpRequest) -> Result<HttpResponse> {
        let chain = self.chain_for(&request.origin());
        if self.enable_logging {
            tracing::debug!(
                "{} {} ({} middlewares)",
                request.method,
                request.url,
                chain.len()
            );
        }
        let response = Next::new(&chain, self.network.as_ref()).run(request).await?;
        if self.enable_logging {
            tracing::debug!("-> {}", response.status);
        }
        Ok(response)
    }

    /// Execute a request and turn non-2xx responses into errors.
    pub async fn fetch_or_throw(&self, request: HttpRequest) -> Result<HttpResponse> {
        let response = self.fetch(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(error_for_response(response))
        }
    }
}

/// Classify a non-2xx response by its content type.
pub fn error_for_response(response: HttpResponse) -> HateoasError {
    match response.content_type().as_deref() {
        Some(media_types::PROBLEM_JSON) => HateoasError::Problem(Problem::from_response(response)),
        _ => HateoasError::Http(HttpError::new(response)),
    }
}
