//! Media types, header names and link relations with defined meaning.

pub mod media_types {
    pub const HAL_JSON: &str = "application/hal+json";
    pub const HAL_FORMS_JSON: &str = "application/prs.hal-forms+json";
    pub const JSON: &str = "application/json";
    pub const SIREN_JSON: &str = "application/vnd.siren+json";
    pub const JSON_API: &str = "application/vnd.api+json";
    pub const COLLECTION_JSON: &str = "application/vnd.collection+json";
    pub const HTML: &str = "text/html";
    pub const EVENT_STREAM: &str = "text/event-stream";
    pub const PROBLEM_JSON: &str = "application/problem+json";
    pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
    pub const OCTET_STREAM: &str = "application/octet-stream";
}

pub mod header_names {
    pub const ACCEPT: &str = "accept";
    pub const CONTENT_TYPE: &str = "content-type";
    pub const CONTENT_LOCATION: &str = "content-location";
    pub const LINK: &str = "link";
    pub const LOCATION: &str = "location";
    pub const DEPRECATION: &str = "deprecation";
    pub const SUNSET: &str = "sunset";
    pub const WARNING: &str = "warning";
    pub const RETRY_AFTER: &str = "retry-after";
}

pub mod rels {
    pub const SELF: &str = "self";
    pub const ITEM: &str = "item";
    pub const COLLECTION: &str = "collection";
    /// Target's cached state must be dropped when the linked resource changes.
    pub const INV_BY: &str = "inv-by";
    /// Sent by servers after a mutation to name other stale resources.
    pub const INVALIDATES: &str = "invalidates";
}
