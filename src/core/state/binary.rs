//! Opaque bodies: anything without a more specific factory.

use crate::core::client::Client;
use crate::core::error::Result;
use crate::core::state::factory::{base_state, StateFactory};
use crate::core::state::{State, StateData, StateFormat};
use crate::core::types::{HttpResponse, Link};

/// Keeps the body as bytes; links come from the `Link` header only.
///
/// Used for 204 responses, untyped responses and unknown media types.
#[derive(Clone, Copy, Debug, Default)]
pub struct BinaryStateFactory;

impl StateFactory for BinaryStateFactory {
    fn create(&self, client: &Client, link: &Link, response: &HttpResponse) -> Result<State> {
        let data = if response.is_no_content() || response.body.is_empty() {
            StateData::Empty
        } else {
            StateData::Bytes(response.body.clone())
        };
        base_state(client, link, response, data, StateFormat::Binary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::testing::offline_client;

    #[test]
    fn test_bytes_pass_through_with_header_links() {
        let client = offline_client();
        let link = Link::new("self", "/logo.png", client.bookmark().clone());
        let response = HttpResponse::new(200, vec![0x89u8, 0x50, 0x4e, 0x47])
            .with_header("content-type", "image/png")
            .with_header("link", "</logo>; rel=\"describedby\"");
        let state = BinaryStateFactory.create(&client, &link, &response).unwrap();

        assert_eq!(state.data.as_bytes().unwrap().len(), 4);
        assert!(state.has_link("describedby"));
        assert_eq!(state.content_type().as_deref(), Some("image/png"));
    }

    #[test]
    fn test_no_content_is_empty() {
        let client = offline_client();
        let link = Link::new("self", "/x", client.bookmark().clone());
        let response = HttpResponse::new(204, "ignored");
        let state = BinaryStateFactory.create(&client, &link, &response).unwrap();
        assert!(state.data.is_empty());
    }
}
