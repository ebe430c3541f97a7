//! Hypermedia client runtime.
//!
//! Discovers links and forms in HAL, HAL-FORMS, Siren, JSON:API,
//! Collection+JSON and HTML responses, and keeps fetched representations in
//! a dependency-aware cache.
//!
//! # Modules
//!
//! - [`client`] - the client, its fetch pipeline and cache
//! - [`resource`] - resources, relation chains and request options
//! - [`state`] - parsed representations and per-format factories
//! - [`action`] - forms, fields and validation
//! - [`protocol`] - media types, `Link` header and URI template grammar
//! - [`types`] - links and HTTP exchange records
//!
//! # Quick Start
//!
//! ```no_run
//! use hateoas_client::Client;
//! use serde_json::json;
//!
//! # async fn run() -> hateoas_client::Result<()> {
//! let client = Client::new("https://api.example.org/")?;
//!
//! let home = client.go("")?.get().await?;
//! let articles = home.follow("articles").get().await?;
//! for item in &articles.collection {
//!     println!("{} {:?}", item.uri, item.data);
//! }
//!
//! articles
//!     .action("create")?
//!     .submit(&json!({"title": "Hello"}))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod action;
pub mod client;
pub mod error;
pub mod protocol;
pub mod resource;
pub mod state;
pub mod traits;
pub mod types;

pub use error::{HateoasError, Result};
pub use types::{Link, Links};
