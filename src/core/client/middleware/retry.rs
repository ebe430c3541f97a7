//! Opt-in retry with backoff.
//!
//! The client never retries on its own. Register [`RetryMiddleware`] to
//! retry idempotent requests on transport failures and transient statuses.

use crate::core::error::{HateoasError, Result};
use crate::core::protocol::header_names;
use crate::core::traits::{Middleware, Next};
use crate::core::types::{HttpRequest, HttpResponse};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use http::Method;
use std::time::Duration;

/// Configuration for retry behavior.
///
/// ```
/// use hateoas_client::client::middleware::RetryConfig;
/// use std::time::Duration;
///
/// let config = RetryConfig::default()
///     .with_max_retries(5)
///     .with_initial_backoff(Duration::from_millis(200));
/// assert!(config.retry_on_status.contains(&503));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: u32,

    /// Wait before the first retry; doubles after each attempt.
    pub initial_backoff: Duration,

    /// Cap on the wait between attempts, including `Retry-After`.
    pub max_backoff: Duration,

    pub retry_on_status: Vec<u16>,

    /// Wait as long as the server's `Retry-After` asks, up to `max_backoff`.
    pub respect_retry_after: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            retry_on_status: vec![408, 425, 429, 502, 503, 504],
            respect_retry_after: true,
        }
    }
}

impl RetryConfig {
    #[must_use]
    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    #[must_use]
    pub fn with_initial_backoff(mut self, duration: Duration) -> Self {
        self.initial_backoff = duration;
        self
    }

    #[must_use]
    pub fn with_max_backoff(mut self, duration: Duration) -> Self {
        self.max_backoff = duration;
        self
    }

    #[must_use]
    pub fn with_retry_on_status(mut self, status: u16) -> Self {
        if !self.retry_on_status.contains(&status) {
            self.retry_on_status.push(status);
        }
        self
    }

    #[must_use]
    pub fn with_respect_retry_after(mut self, respect: bool) -> Self {
        self.respect_retry_after = respect;
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryDecision {
    Retry(Duration),
    DontRetry,
}

/// Attempt counter and backoff for one request.
#[derive(Debug, Clone)]
pub struct RetryState {
    pub attempts: u32,
    pub current_backoff: Duration,
    config: RetryConfig,
}

impl RetryState {
    pub fn new(config: RetryConfig) -> Self {
        Self {
            attempts: 0,
            current_backoff: config.initial_backoff,
            config,
        }
    }

    /// Decision after a failed exchange. Aborts are final.
    pub fn should_retry_error(&mut self, error: &HateoasError) -> RetryDecision {
        match error {
            HateoasError::Aborted => RetryDecision::DontRetry,
            e if e.is_retryable() => self.decide(None),
            _ => RetryDecision::DontRetry,
        }
    }

    /// Decision after a response with `status`.
    pub fn should_retry_status(&mut self, status: u16, retry_after: Option<Duration>) -> RetryDecision {
        if !self.config.retry_on_status.contains(&status) {
            return RetryDecision::DontRetry;
        }
        self.decide(retry_after)
    }

    fn decide(&mut self, retry_after: Option<Duration>) -> RetryDecision {
        self.attempts += 1;
        if self.attempts > self.config.max_retries {
            return RetryDecision::DontRetry;
        }

        let wait = match retry_after {
            Some(after) if self.config.respect_retry_after => after,
            _ => self.current_backoff,
        };
        self.current_backoff = (self.current_backoff * 2).min(self.config.max_backoff);
        RetryDecision::Retry(wait.min(self.config.max_backoff))
    }
}

/// Parse a `Retry-After` value: delay seconds or an HTTP date.
///
/// A date in the past yields a zero delay.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }
    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let delta = date.with_timezone(&Utc) - Utc::now();
    Some(delta.to_std().unwrap_or(Duration::ZERO))
}

/// Retries idempotent requests (GET, HEAD, OPTIONS, PUT, DELETE).
///
/// ```no_run
/// use hateoas_client::client::middleware::{RetryConfig, RetryMiddleware};
/// use std::sync::Arc;
///
/// # fn run(client: hateoas_client::Client) -> hateoas_client::Result<()> {
/// client.use_middleware(Arc::new(RetryMiddleware::new(RetryConfig::default())), "*")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RetryMiddleware {
    config: RetryConfig,
}

impl RetryMiddleware {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }
}

fn is_idempotent(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE
    )
}

#[async_trait]
impl Middleware for RetryMiddleware {
    async fn handle(&self, request: HttpRequest, next: Next<'_>) -> Result<HttpResponse> {
        if !is_idempotent(&request.method) {
            return next.run(request).await;
        }

        let mut state = RetryState::new(self.config.clone());
        loop {
            let decision = match next.run(request.clone()).await {
                Ok(response) => {
                    let retry_after = response
                        .header(header_names::RETRY_AFTER)
                        .and_then(parse_retry_after);
                    match state.should_retry_status(response.status, retry_after) {
                        RetryDecision::Retry(wait) => {
                            tracing::debug!(
                                "{} {} answered {}, retry {} in {:?}",
                                request.method,
                                request.url,
                                response.status,
                                state.attempts,
                                wait
                            );
                            wait
                        }
                        RetryDecision::DontRetry => return Ok(response),
                    }
                }
                Err(e) => match state.should_retry_error(&e) {
                    RetryDecision::Retry(wait) => {
                        tracing::debug!(
                            "{} {} failed ({}), retry {} in {:?}",
                            request.method,
                            request.url,
                            e,
                            state.attempts,
                            wait
                        );
                        wait
                    }
                    RetryDecision::DontRetry => return Err(e),
                },
            };
            tokio::time::sleep(decision).await;
        }
    }
}
