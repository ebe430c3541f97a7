mod common;

use common::{client, client_with, init_tracing, MockNetwork};
use futures::FutureExt;
use hateoas_client::{
    middleware_fn, CachePolicy, ClientConfig, HateoasError, HttpResponse, ResourceEvent,
};
use http::Method;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const HAL: &str = "application/hal+json";

#[tokio::test]
async fn test_go_returns_one_resource_per_uri() {
    let network = MockNetwork::new();
    let client = client(&network);

    let a = client.go("/articles/1").unwrap();
    let b = client.go("articles/1").unwrap();
    let c = client
        .go_url(url::Url::parse("https://api.example.org/articles/1").unwrap());
    assert!(a.ptr_eq(&b));
    assert!(a.ptr_eq(&c));
    assert_eq!(network.calls(), 0);
}

#[tokio::test]
async fn test_get_is_cached() {
    init_tracing();
    let network = MockNetwork::new();
    network.json("/a", HAL, json!({"n": 1}));
    let client = client(&network);
    let resource = client.go("/a").unwrap();

    let first = resource.get().await.unwrap();
    let second = resource.get().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(network.calls(), 1);
    assert_eq!(client.cache().get(resource.uri()).unwrap().data, first.data);

    resource.refresh().await.unwrap();
    assert_eq!(network.calls(), 2);
}

#[tokio::test]
async fn test_never_cache_refetches() {
    let network = MockNetwork::new();
    network.json("/a", HAL, json!({}));
    let client = client_with(
        &network,
        ClientConfig::default().with_cache_policy(CachePolicy::Never),
    );
    let resource = client.go("/a").unwrap();
    resource.get().await.unwrap();
    resource.get().await.unwrap();
    assert_eq!(network.calls(), 2);
}

#[tokio::test]
async fn test_concurrent_gets_share_one_request() {
    let network = MockNetwork::new();
    network.json("/slow", HAL, json!({"value": 42}));
    network.set_delay(Duration::from_millis(50));
    let client = client(&network);
    let resource = client.go("/slow").unwrap();

    let (a, b) = tokio::join!(resource.refresh(), resource.refresh());
    let (a, b) = (a.unwrap(), b.unwrap());
    assert_eq!(network.calls(), 1);
    assert_eq!(a.data, b.data);
    assert_eq!(client.pending_requests(), 0);

    // Settled requests are not reused.
    resource.refresh().await.unwrap();
    assert_eq!(network.calls(), 2);
}

#[tokio::test]
async fn test_concurrent_failures_are_shared() {
    let network = MockNetwork::new();
    network.set_delay(Duration::from_millis(20));
    let client = client(&network);
    let resource = client.go("/missing").unwrap();

    let (a, b) = tokio::join!(resource.get(), resource.get());
    let (a, b) = (a.unwrap_err(), b.unwrap_err());
    assert!(a.is_not_found());
    assert!(b.is_not_found());
    assert_eq!(a.as_http().map(|e| e.status), Some(404));
    assert_eq!(network.calls(), 1);
    assert_eq!(client.pending_requests(), 0);
}

#[tokio::test]
async fn test_abandoned_get_still_settles() {
    let network = MockNetwork::new();
    network.json("/slow", HAL, json!({"value": 1}));
    network.set_delay(Duration::from_millis(200));
    let client = client(&network);
    let resource = client.go("/slow").unwrap();

    let first = tokio::time::timeout(Duration::from_millis(20), resource.refresh()).await;
    assert!(first.is_err());

    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(client.pending_requests(), 0);
    assert_eq!(network.calls(), 1);
    assert!(client.cache().has(resource.uri()));

    // A later refresh starts its own request.
    resource.refresh().await.unwrap();
    assert_eq!(network.calls(), 2);
}

#[tokio::test]
async fn test_unsafe_methods_are_not_deduplicated() {
    let network = MockNetwork::new();
    network.route(Method::POST, "/inbox", HttpResponse::new(204, ""));
    network.set_delay(Duration::from_millis(20));
    let client = client(&network);
    let inbox = client.go("/inbox").unwrap();

    let (a, b) = tokio::join!(inbox.post(json!({})), inbox.post(json!({})));
    a.unwrap();
    b.unwrap();
    assert_eq!(network.calls(), 2);
}

#[tokio::test]
async fn test_post_location_marks_target_stale() {
    let network = MockNetwork::new();
    network.json("/foo", HAL, json!({"v": 1}));
    network.route(
        Method::POST,
        "/things",
        HttpResponse::new(201, "").with_header("location", "/foo"),
    );
    let client = client(&network);
    let foo = client.go("/foo").unwrap();
    foo.get().await.unwrap();
    let mut events = foo.subscribe();

    let created = client.go("/things").unwrap().post_follow(json!({"v": 2})).await.unwrap();
    assert!(created.ptr_eq(&foo));
    assert!(matches!(events.recv().await.unwrap(), ResourceEvent::Stale));
    assert!(foo.cached_state().is_none());
}

#[tokio::test]
async fn test_delete_emits_delete() {
    let network = MockNetwork::new();
    network.json("/bar", HAL, json!({}));
    network.route(Method::DELETE, "/bar", HttpResponse::new(204, ""));
    let client = client(&network);
    let bar = client.go("/bar").unwrap();
    bar.get().await.unwrap();
    let mut events = bar.subscribe();

    bar.delete().await.unwrap();
    assert!(matches!(events.recv().await.unwrap(), ResourceEvent::Delete));
    assert!(bar.cached_state().is_none());
}

#[tokio::test]
async fn test_inv_by_links_invalidate_dependents() {
    let network = MockNetwork::new();
    network.json(
        "/articles/1",
        HAL,
        json!({"_links": {"self": {"href": "/articles/1"}, "inv-by": {"href": "/articles"}}}),
    );
    network.json(
        "/articles",
        HAL,
        json!({"_links": {"self": {"href": "/articles"}, "inv-by": {"href": "/articles/1"}}}),
    );
    network.route(Method::PUT, "/articles", HttpResponse::new(204, ""));
    let client = client(&network);

    let article = client.go("/articles/1").unwrap();
    let list = client.go("/articles").unwrap();
    article.get().await.unwrap();
    list.get().await.unwrap();

    // The two URIs depend on each other; invalidation must still terminate.
    list.put(json!({})).await.unwrap();
    assert!(article.cached_state().is_none());
    assert!(list.cached_state().is_none());
}

#[tokio::test]
async fn test_put_state_caches_sent_representation() {
    let network = MockNetwork::new();
    network.json("/me", HAL, json!({"_links": {"self": {"href": "/me"}}, "name": "A"}));
    network.route(Method::PUT, "/me", HttpResponse::new(204, ""));
    let client = client(&network);
    let me = client.go("/me").unwrap();

    let mut state = (*me.get().await.unwrap()).clone();
    state.data = hateoas_client::StateData::Json(json!({"name": "B"}));
    me.put_state(&state).await.unwrap();

    let sent = network.last_request();
    assert_eq!(sent.method, Method::PUT);
    assert_eq!(sent.header("content-type"), Some(HAL));
    let body: serde_json::Value = serde_json::from_slice(&sent.body).unwrap();
    assert_eq!(body["name"], "B");
    assert_eq!(body["_links"]["self"]["href"], "/me");

    assert_eq!(
        me.cached_state().unwrap().data,
        hateoas_client::StateData::Json(json!({"name": "B"}))
    );
    assert_eq!(network.calls(), 2);
}

#[tokio::test]
async fn test_post_follow_requires_location() {
    let network = MockNetwork::new();
    network.route(Method::POST, "/a", HttpResponse::new(200, ""));
    network.route(Method::POST, "/reset", HttpResponse::new(205, ""));
    let client = client(&network);

    let err = client.go("/a").unwrap().post_follow(json!({})).await.unwrap_err();
    assert!(matches!(err, HateoasError::HeaderParse(_)));

    let reset = client.go("/reset").unwrap();
    assert!(reset.post_follow(json!({})).await.unwrap().ptr_eq(&reset));
}

#[tokio::test]
async fn test_problem_json_errors() {
    let network = MockNetwork::new();
    network.route(
        Method::GET,
        "/conflict",
        HttpResponse::new(
            409,
            json!({"type": "https://example.org/conflict", "title": "Conflict", "detail": "Version mismatch", "current": 3})
                .to_string(),
        )
        .with_header("content-type", "application/problem+json"),
    );
    network.route(Method::GET, "/boom", HttpResponse::new(500, "oops"));
    let client = client(&network);

    match client.go("/conflict").unwrap().get().await.unwrap_err() {
        HateoasError::Problem(p) => {
            assert_eq!(p.status, 409);
            assert_eq!(p.detail.as_deref(), Some("Version mismatch"));
        }
        other => panic!("expected problem, got {:?}", other),
    }

    let err = client.go("/boom").unwrap().get().await.unwrap_err();
    assert!(matches!(err, HateoasError::Http(_)));
    assert_eq!(err.status(), Some(500));
    assert!(!err.is_retryable());
}

#[tokio::test]
async fn test_middleware_origin_scoping() {
    let network = MockNetwork::new();
    network.json("/a", HAL, json!({}));
    let client = client(&network);

    let auth = middleware_fn(|mut request, next| {
        async move {
            request.set_header("authorization", "Bearer secret");
            next.run(request).await
        }
        .boxed()
    });
    client
        .use_middleware(Arc::new(auth), "https://*.example.org")
        .unwrap();
    let other = middleware_fn(|mut request, next| {
        async move {
            request.set_header("x-other", "1");
            next.run(request).await
        }
        .boxed()
    });
    client
        .use_middleware(Arc::new(other), "https://other.example")
        .unwrap();

    client.go("/a").unwrap().get().await.unwrap();
    let sent = network.last_request();
    assert_eq!(sent.header("authorization"), Some("Bearer secret"));
    assert!(!sent.has_header("x-other"));
    assert!(sent.header("accept").unwrap().contains("application/hal+json"));
}

#[tokio::test]
async fn test_dropping_client_invalidates_handles() {
    let network = MockNetwork::new();
    let client = client(&network);
    let resource = client.go("/a").unwrap();
    drop(client);
    assert!(matches!(
        resource.get().await.unwrap_err(),
        HateoasError::ClientDropped
    ));
}
