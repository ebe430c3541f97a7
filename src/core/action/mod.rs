//! Executable state transitions.
//!
//! A [`Form`] is the static description parsed from a representation. An
//! [`Action`] binds a form to the client that produced it so it can be
//! submitted.
//!
//! | Method | Submission |
//! |--------|------------|
//! | GET | Data merged into the query string, fetched through the client cache |
//! | other | Body encoded by content type, sent once, response parsed into a state |

pub mod field;
pub mod form;
pub mod json_schema;
pub mod schema;

pub use field::{
    BooleanVariant, DateVariant, Field, FieldKind, FieldValue, NumberVariant, SelectOption,
    SelectOptions, TextVariant,
};
pub use form::{encode_body, merge_query, Form};
pub use json_schema::JsonSchema;
pub use schema::{
    FieldSchemaPlugin, Issue, JsonSchemaPlugin, NoopSchemaPlugin, NoopValidator, SchemaPlugin,
    Validator,
};

use crate::core::client::{Client, WeakClient};
use crate::core::error::{HateoasError, Result};
use crate::core::protocol::header_names;
use crate::core::resource::Resource;
use crate::core::state::State;
use crate::core::types::{HttpRequest, HttpResponse, Link};
use http::Method;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use url::Url;

/// A form bound to a client.
#[derive(Clone)]
pub struct Action {
    form: Form,
    client: WeakClient,
}

impl Action {
    pub(crate) fn new(form: Form, client: WeakClient) -> Self {
        Self { form, client }
    }

    pub fn form(&self) -> &Form {
        &self.form
    }

    pub fn uri(&self) -> &Url {
        &self.form.uri
    }

    pub fn name(&self) -> &str {
        &self.form.name
    }

    pub fn title(&self) -> Option<&str> {
        self.form.title.as_deref()
    }

    pub fn method(&self) -> &Method {
        &self.form.method
    }

    pub fn content_type(&self) -> &str {
        &self.form.content_type
    }

    pub fn fields(&self) -> &[Field] {
        &self.form.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.form.field(name)
    }

    /// Validator built by the client's schema plugin for this form's fields.
    pub fn form_schema(&self) -> Result<Arc<dyn Validator>> {
        let client = self.client.upgrade()?;
        Ok(client.schema_plugin().create_schema(&self.form.fields))
    }

    /// Submit `data` and return the resulting state.
    ///
    /// GET submissions go through the client cache. Other methods are sent
    /// once and their response is not stored.
    pub async fn submit(&self, data: &Value) -> Result<Arc<State>> {
        let client = self.client.upgrade()?;
        if self.form.method == Method::GET {
            let uri = merge_query(&self.form.uri, data);
            return client.go_url(uri).get().await;
        }

        let response = self.send(&client, data).await?;
        let link = Link::to_self(&self.form.uri);
        Ok(Arc::new(client.get_state_for_response(&link, response)?))
    }

    /// Submit `data` and return the resource named by the `Location` header.
    pub async fn submit_follow(&self, data: &Value) -> Result<Resource> {
        let client = self.client.upgrade()?;
        if self.form.method == Method::GET {
            return Ok(client.go_url(merge_query(&self.form.uri, data)));
        }

        let response = self.send(&client, data).await?;
        let location = response.header(header_names::LOCATION).ok_or_else(|| {
            HateoasError::HeaderParse(format!(
                "Response to action \"{}\" has no Location header",
                self.form.name
            ))
        })?;
        let target = self.form.uri.join(location)?;
        Ok(client.go_url(target))
    }

    async fn send(&self, client: &Client, data: &Value) -> Result<HttpResponse> {
        let body = encode_body(&self.form.content_type, data)?;
        let request = HttpRequest::new(self.form.method.clone(), self.form.uri.clone())
            .with_header(header_names::CONTENT_TYPE, self.form.content_type.clone())
            .with_body(body);
        client.fetch_or_throw(request).await
    }
}

impl fmt::Debug for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Action").field("form", &self.form).finish()
    }
}
