//! Core data types: HTTP exchange records and typed links.

mod link;
mod links;
mod request;
mod response;

pub use bytes::Bytes;
pub use link::Link;
pub use links::Links;
pub use request::{is_safe_method, CacheMode, HttpRequest};
pub use response::HttpResponse;
