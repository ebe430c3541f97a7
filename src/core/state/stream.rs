//! `text/event-stream` bodies.

use crate::core::client::Client;
use crate::core::error::Result;
use crate::core::state::factory::{base_state, StateFactory};
use crate::core::state::{State, StateData, StateFormat};
use crate::core::types::{HttpResponse, Link};

/// Keeps the (buffered) event stream as text. Links come from the `Link`
/// header only.
#[derive(Clone, Copy, Debug, Default)]
pub struct StreamStateFactory;

impl StateFactory for StreamStateFactory {
    fn create(&self, client: &Client, link: &Link, response: &HttpResponse) -> Result<State> {
        let data = StateData::Text(String::from_utf8_lossy(&response.body).into_owned());
        base_state(client, link, response, data, StateFormat::Stream)
    }
}
