use crate::core::error::Result;
use crate::core::resource::{Resource, ResourceRelation};
use crate::core::state::State;
use std::sync::Arc;

/// A handle bound to a state that is already in hand.
///
/// Returned by [`ResourceRelation::request`]; the state may come from an
/// embedded payload or be a synthetic collection rather than a fetch.
#[derive(Clone, Debug)]
pub struct StateResource {
    state: Arc<State>,
}

impl StateResource {
    pub fn new(state: Arc<State>) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &Arc<State> {
        &self.state
    }

    pub fn into_state(self) -> Arc<State> {
        self.state
    }

    pub fn follow(&self, rel: impl Into<String>) -> ResourceRelation {
        self.state.follow(rel)
    }

    /// The client resource for this state's URI.
    pub fn resource(&self) -> Result<Resource> {
        Ok(self.state.client()?.go_url(self.state.uri.clone()))
    }

    /// Fetch this state's URI again and rebind to the result.
    pub async fn refresh(&mut self) -> Result<Arc<State>> {
        let state = self.resource()?.refresh().await?;
        self.state = state.clone();
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::client::testing::offline_client;
    use crate::core::state::{StateData, StateFormat};

    #[test]
    fn test_resource_is_identity_mapped() {
        let client = offline_client();
        let uri = client.bookmark().join("/x").unwrap();
        let handle = StateResource::new(Arc::new(
            State::new(uri, StateData::Empty, StateFormat::Binary).with_client(&client),
        ));
        assert!(handle.resource().unwrap().ptr_eq(&client.go("/x").unwrap()));
    }
}
