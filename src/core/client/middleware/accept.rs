use crate::core::client::WeakClient;
use crate::core::error::Result;
use crate::core::protocol::header_names;
use crate::core::traits::{Middleware, Next};
use crate::core::types::{HttpRequest, HttpResponse};
use async_trait::async_trait;

/// Sets `Accept` to every registered media type, ordered by preference,
/// unless the request already carries one.
pub struct AcceptMiddleware {
    client: WeakClient,
}

impl AcceptMiddleware {
    pub fn new(client: WeakClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Middleware for AcceptMiddleware {
    async fn handle(&self, mut request: HttpRequest, next: Next<'_>) -> Result<HttpResponse> {
        if !request.has_header(header_names::ACCEPT) {
            let accept = self.client.upgrade()?.accept_header();
            if !accept.is_empty() {
                request.set_header(header_names::ACCEPT, accept);
            }
        }
        next.run(request).await
    }
}
