//! Built-in middlewares, registered for every origin on client construction.
//!
//! | Middleware | Effect |
//! |------------|--------|
//! | [`AcceptMiddleware`] | Fills in `Accept` from the content-type registry |
//! | [`CacheMiddleware`] | Invalidates and refreshes the cache after mutations |
//! | [`WarningMiddleware`] | Logs `Deprecation`, `Sunset` and `Warning` headers |
//!
//! [`RetryMiddleware`] is not registered by default.

mod accept;
mod cache;
mod retry;
mod warning;

pub use accept::AcceptMiddleware;
pub use cache::CacheMiddleware;
pub use retry::{parse_retry_after, RetryConfig, RetryDecision, RetryMiddleware, RetryState};
pub use warning::WarningMiddleware;
