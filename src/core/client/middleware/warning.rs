use crate::core::error::Result;
use crate::core::protocol::header_names;
use crate::core::traits::{Middleware, Next};
use crate::core::types::{HttpRequest, HttpResponse};
use async_trait::async_trait;

/// Logs deprecation notices sent by the server.
///
/// A `Deprecation` header is reported together with `Sunset` and any link
/// with relation `deprecation`. Each `Warning` header is reported as is.
#[derive(Clone, Copy, Debug, Default)]
pub struct WarningMiddleware;

#[async_trait]
impl Middleware for WarningMiddleware {
    async fn handle(&self, request: HttpRequest, next: Next<'_>) -> Result<HttpResponse> {
        let url = request.url.clone();
        let response = next.run(request).await?;

        if let Some(deprecation) = response.header(header_names::DEPRECATION) {
            let sunset = response.header(header_names::SUNSET);
            let info = response
                .link_header()
                .into_iter()
                .find(|l| l.rels.iter().any(|r| r == "deprecation"))
                .map(|l| l.href);
            tracing::warn!(
                "Resource {} is deprecated ({}); sunset: {}; see: {}",
                url,
                deprecation,
                sunset.unwrap_or("unspecified"),
                info.as_deref().unwrap_or("-")
            );
        }
        if let Some(warning) = response.header(header_names::WARNING) {
            tracing::warn!("Server warning for {}: {}", url, warning);
        }

        Ok(response)
    }
}
