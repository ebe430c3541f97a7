use crate::core::client::Client;
use crate::core::error::Result;
use crate::core::resource::{RequestOptions, Resource, StateResource};
use crate::core::state::State;
use http::Method;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
enum Origin {
    Resource(Resource),
    State(Arc<State>),
}

#[derive(Clone, Debug)]
struct Hop {
    rel: String,
    options: RequestOptions,
}

/// A chain of relations starting at a resource or state.
///
/// Building the chain does no I/O. [`get`](Self::get) resolves it hop by
/// hop: a relation embedded in the current state is taken from the payload,
/// anything else is fetched. Builder methods configure the last hop.
///
/// ```no_run
/// # async fn run(client: hateoas_client::Client) -> hateoas_client::Result<()> {
/// let author = client
///     .go("/articles/1")?
///     .follow("author")
///     .follow("avatar")
///     .get()
///     .await?;
/// # let _ = author;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ResourceRelation {
    origin: Origin,
    hops: Vec<Hop>,
}

impl ResourceRelation {
    pub fn from_resource(resource: Resource, rel: impl Into<String>) -> Self {
        Self::with_origin(Origin::Resource(resource), rel.into())
    }

    pub fn from_state(state: Arc<State>, rel: impl Into<String>) -> Self {
        Self::with_origin(Origin::State(state), rel.into())
    }

    fn with_origin(origin: Origin, rel: String) -> Self {
        Self {
            origin,
            hops: vec![Hop {
                rel,
                options: RequestOptions::default(),
            }],
        }
    }

    /// Append another relation to the chain.
    #[must_use]
    pub fn follow(mut self, rel: impl Into<String>) -> Self {
        self.hops.push(Hop {
            rel: rel.into(),
            options: RequestOptions::default(),
        });
        self
    }

    fn last(&mut self) -> &mut RequestOptions {
        let last = self.hops.len() - 1;
        &mut self.hops[last].options
    }

    #[must_use]
    pub fn with_method(mut self, method: Method) -> Self {
        self.last().method = Some(method);
        self
    }

    /// Variables for expanding a templated link.
    #[must_use]
    pub fn with_template_parameters(mut self, vars: Value) -> Self {
        if let Value::Object(map) = vars {
            self.last().template_vars.extend(map);
        }
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
        self.last()
            .headers
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        *self.last() = options;
        self
    }

    #[must_use]
    pub fn with_get(self) -> Self {
        self.with_method(Method::GET)
    }

    #[must_use]
    pub fn with_post(self, body: Value) -> Self {
        self.with_body(Method::POST, body)
    }

    #[must_use]
    pub fn with_put(self, body: Value) -> Self {
        self.with_body(Method::PUT, body)
    }

    #[must_use]
    pub fn with_patch(self, body: Value) -> Self {
        self.with_body(Method::PATCH, body)
    }

    fn with_body(mut self, method: Method, body: Value) -> Self {
        let options = self.last();
        options.method = Some(method);
        options.body = Some(super::RequestBody::Json(body));
        self
    }

    /// Resolve the whole chain to the final state.
    pub async fn get(&self) -> Result<Arc<State>> {
        let (client, mut current) = self.start().await?;
        for hop in &self.hops {
            current = step(&client, &current, hop).await?;
        }
        Ok(current)
    }

    /// Resolve the chain and wrap the final state.
    pub async fn request(&self) -> Result<StateResource> {
        Ok(StateResource::new(self.get().await?))
    }

    /// The resource the chain points at, without fetching it.
    ///
    /// Every hop but the last is resolved.
    pub async fn resource(&self) -> Result<Resource> {
        let (client, mut current) = self.start().await?;
        let Some((last, init)) = self.hops.split_last() else {
            return Ok(client.go_url(current.uri.clone()));
        };
        for hop in init {
            current = step(&client, &current, hop).await?;
        }
        let uri = current
            .get_link(&last.rel)?
            .expand(&last.options.template_vars)?;
        Ok(client.go_url(uri))
    }

    async fn start(&self) -> Result<(Client, Arc<State>)> {
        match &self.origin {
            Origin::Resource(resource) => {
                let client = resource.client()?;
                Ok((client, resource.get().await?))
            }
            Origin::State(state) => Ok((state.client()?, state.clone())),
        }
    }
}

/// Move from `current` along one relation.
async fn step(client: &Client, current: &Arc<State>, hop: &Hop) -> Result<Arc<State>> {
    let plain = hop.options.is_plain_get();

    if plain && hop.options.template_vars.is_empty() {
        if let Some(group) = current.embedded_group(&hop.rel) {
            let complete = !group.states.is_empty() && group.states.iter().all(|s| !s.is_partial);
            if complete {
                tracing::debug!("Following embedded {} from {}", hop.rel, current.uri);
                if !group.many && group.states.len() == 1 {
                    return Ok(group.states[0].clone());
                }
                return Ok(Arc::new(State::synthetic_collection(
                    current.uri.clone(),
                    group.states.clone(),
                    current.format(),
                    client.downgrade(),
                )));
            }
        }
    }

    let uri = current
        .get_link(&hop.rel)?
        .expand(&hop.options.template_vars)?;
    let resource = client.go_url(uri);
    if plain {
        resource.get().await
    } else {
        resource.request(hop.options.clone()).await
    }
}

impl fmt::Debug for ResourceRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let origin = match &self.origin {
            Origin::Resource(r) => r.uri().as_str(),
            Origin::State(s) => s.uri.as_str(),
        };
        let rels: Vec<&str> = self.hops.iter().map(|h| h.rel.as_str()).collect();
        f.debug_struct("ResourceRelation")
            .field("origin", &origin)
            .field("rels", &rels)
            .finish()
    }
}
