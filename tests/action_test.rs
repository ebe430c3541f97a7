mod common;

use common::{client, MockNetwork};
use hateoas_client::core::action::{FieldSchemaPlugin, JsonSchemaPlugin};
use hateoas_client::{HateoasError, HttpResponse, StateData};
use http::Method;
use serde_json::json;
use std::sync::Arc;

fn forms_document() -> serde_json::Value {
    json!({
        "_links": {"self": {"href": "/articles"}},
        "_templates": {
            "default": {
                "method": "POST",
                "contentType": "application/x-www-form-urlencoded",
                "properties": [{"name": "a"}, {"name": "b"}]
            },
            "json": {
                "method": "POST",
                "target": "/articles/json",
                "properties": [{"name": "a"}, {"name": "b"}]
            },
            "search": {
                "method": "GET",
                "target": "/articles/search?page=1",
                "properties": [{"name": "a"}, {"name": "b"}]
            },
            "upload": {
                "method": "POST",
                "contentType": "multipart/form-data",
                "properties": []
            },
            "author": {
                "method": "PUT",
                "target": "/articles/validated",
                "properties": [
                    {"name": "author.name", "required": true},
                    {"name": "author.age", "type": "number", "min": 0},
                    {"name": "tags", "options": {"inline": ["a", "b"], "maxItems": 2}}
                ]
            }
        }
    })
}

async fn setup() -> (Arc<MockNetwork>, hateoas_client::Client, Arc<hateoas_client::State>) {
    let network = MockNetwork::new();
    network.json("/articles", "application/prs.hal-forms+json", forms_document());
    let client = client(&network);
    let state = client.go("/articles").unwrap().get().await.unwrap();
    (network, client, state)
}

#[tokio::test]
async fn test_form_urlencoded_submission() {
    let (network, _client, state) = setup().await;
    network.route(Method::POST, "/articles", HttpResponse::new(204, ""));

    state
        .action("default")
        .unwrap()
        .submit(&json!({"a": 1, "b": "x"}))
        .await
        .unwrap();
    let sent = network.last_request();
    assert_eq!(sent.method, Method::POST);
    assert_eq!(sent.header("content-type"), Some("application/x-www-form-urlencoded"));
    assert_eq!(&sent.body[..], b"a=1&b=x");
}

#[tokio::test]
async fn test_json_submission_returns_state() {
    let (network, _client, state) = setup().await;
    network.route(
        Method::POST,
        "/articles/json",
        HttpResponse::new(201, r#"{"id":7}"#).with_header("content-type", "application/json"),
    );

    let result = state
        .action("json")
        .unwrap()
        .submit(&json!({"a": 1, "b": "x"}))
        .await
        .unwrap();
    let sent = network.last_request();
    assert_eq!(sent.header("content-type"), Some("application/json"));
    assert_eq!(&sent.body[..], br#"{"a":1,"b":"x"}"#);
    assert_eq!(result.data, StateData::Json(json!({"id": 7})));
}

#[tokio::test]
async fn test_get_submission_uses_query_string() {
    let (network, _client, state) = setup().await;
    network.json("/articles/search?page=1&a=1&b=x", "application/json", json!({"hits": 2}));

    let result = state
        .action("search")
        .unwrap()
        .submit(&json!({"a": 1, "b": "x"}))
        .await
        .unwrap();
    let sent = network.last_request();
    assert_eq!(sent.method, Method::GET);
    assert!(sent.body.is_empty());
    assert_eq!(sent.url.query(), Some("page=1&a=1&b=x"));
    assert_eq!(result.data, StateData::Json(json!({"hits": 2})));
}

#[tokio::test]
async fn test_unsupported_content_type() {
    let (network, _client, state) = setup().await;
    let calls = network.calls();
    let err = state
        .action("upload")
        .unwrap()
        .submit(&json!({}))
        .await
        .unwrap_err();
    assert!(matches!(err, HateoasError::UnsupportedContentType(_)));
    assert_eq!(network.calls(), calls);
}

#[tokio::test]
async fn test_unknown_action() {
    let (_network, _client, state) = setup().await;
    assert!(matches!(
        state.action("nope").unwrap_err(),
        HateoasError::ActionNotFound { .. }
    ));
}

#[tokio::test]
async fn test_default_schema_accepts_anything() {
    let (_network, _client, state) = setup().await;
    let schema = state.action("author").unwrap().form_schema().unwrap();
    assert!(schema.validate(&json!({"anything": true})).is_ok());
}

#[tokio::test]
async fn test_field_schema_plugin() {
    let (_network, client, state) = setup().await;
    client.set_schema_plugin(Arc::new(FieldSchemaPlugin));
    let schema = state.action("author").unwrap().form_schema().unwrap();

    assert!(schema
        .validate(&json!({"author": {"name": "Ada", "age": 36}, "tags": ["a"]}))
        .is_ok());

    let issues = schema.validate(&json!({"tags": ["c"]})).unwrap_err();
    let paths: Vec<String> = issues.iter().map(|i| i.path.join(".")).collect();
    assert!(paths.iter().any(|p| p == "author"), "{:?}", paths);
    assert!(paths.iter().any(|p| p.starts_with("tags")), "{:?}", paths);

    let issues = schema
        .validate(&json!({"author": {"name": "Ada", "age": -1}}))
        .unwrap_err();
    assert_eq!(issues[0].path, vec!["author".to_string(), "age".to_string()]);
}

#[tokio::test]
async fn test_json_schema_plugin_falls_back_to_fields() {
    let (_network, client, state) = setup().await;
    client.set_schema_plugin(Arc::new(JsonSchemaPlugin));
    let schema = state.action("author").unwrap().form_schema().unwrap();
    assert!(schema.validate(&json!({"author": {}})).is_err());
}
