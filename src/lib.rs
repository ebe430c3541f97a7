//! hateoas_client: hypermedia API client for Rust.
//!
//! - **client**: resource identity map, content negotiation, middleware
//!   pipeline and a state cache with dependency-driven invalidation.
//! - **state**: HAL, HAL-FORMS, Siren, JSON:API, Collection+JSON, HTML and
//!   binary representations.
//! - **action**: typed form fields and pluggable validation.

pub mod core;

// Top-level re-exports for common usage
pub use crate::core::error::{HateoasError, HttpError, Problem, Result};
pub use crate::core::types;
pub use crate::core::types::{CacheMode, HttpRequest, HttpResponse, Link, Links};

pub use crate::core::client;
pub use crate::core::client::{CachePolicy, Client, ClientConfig, StateCache, WeakClient};
#[cfg(feature = "native")]
pub use crate::core::client::NativeNetwork;

pub use crate::core::action::{Action, Field, FieldKind, FieldValue, Form, Issue, SchemaPlugin, Validator};
pub use crate::core::resource::{
    RequestOptions, Resource, ResourceEvent, ResourceRelation, StateResource,
};
pub use crate::core::state::{State, StateData, StateFactory, StateFormat};
pub use crate::core::traits::{middleware_fn, Middleware, Network, Next};
