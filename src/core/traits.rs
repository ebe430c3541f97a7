use crate::core::error::Result;
use crate::core::types::{HttpRequest, HttpResponse};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::sync::Arc;

/// Abstraction for network operations.
///
/// Implementations buffer the whole response body. Cancellation is done by
/// dropping the returned future.
#[async_trait]
pub trait Network: Send + Sync + 'static {
    /// Perform one HTTP exchange. Non-2xx statuses are not errors here.
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// A step in the fetch pipeline.
///
/// A middleware may rewrite the request, short-circuit with its own
/// response, or call `next.run(request)` and inspect or rewrite what comes
/// back.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    async fn handle(&self, request: HttpRequest, next: Next<'_>) -> Result<HttpResponse>;
}

/// The remainder of a middleware chain, ending at the network.
#[derive(Clone, Copy)]
pub struct Next<'a> {
    chain: &'a [Arc<dyn Middleware>],
    network: &'a dyn Network,
}

impl<'a> Next<'a> {
    pub(crate) fn new(chain: &'a [Arc<dyn Middleware>], network: &'a dyn Network) -> Self {
        Self { chain, network }
    }

    /// Pass the request to the next middleware, or the network if none is left.
    pub fn run(self, request: HttpRequest) -> BoxFuture<'a, Result<HttpResponse>> {
        match self.chain.split_first() {
            Some((head, tail)) => head.handle(
                request,
                Next {
                    chain: tail,
                    network: self.network,
                },
            ),
            None => self.network.send(request),
        }
    }
}

/// Middleware built from a closure.
///
/// ```ignore
/// use futures::FutureExt;
///
/// let auth = middleware_fn(|mut request, next| {
///     async move {
///         request.set_header("authorization", "Bearer token");
///         next.run(request).await
///     }
///     .boxed()
/// });
/// ```
pub fn middleware_fn<F>(f: F) -> FnMiddleware<F>
where
    F: for<'a> Fn(HttpRequest, Next<'a>) -> BoxFuture<'a, Result<HttpResponse>>
        + Send
        + Sync
        + 'static,
{
    FnMiddleware(f)
}

pub struct FnMiddleware<F>(F);

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(HttpRequest, Next<'a>) -> BoxFuture<'a, Result<HttpResponse>>
        + Send
        + Sync
        + 'static,
{
    async fn handle(&self, request: HttpRequest, next: Next<'_>) -> Result<HttpResponse> {
        (self.0)(request, next).await
    }
}
