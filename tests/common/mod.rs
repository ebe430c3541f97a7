//! Shared fixtures: a scripted in-memory network.

#![allow(dead_code)]

use async_trait::async_trait;
use hateoas_client::{Client, ClientConfig, HttpRequest, HttpResponse, Network, Result};
use http::Method;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const BOOKMARK: &str = "https://api.example.org/";

/// Answers requests from a route table keyed by method and path (with
/// query). Unknown routes get 404. Every request is logged.
#[derive(Default)]
pub struct MockNetwork {
    routes: Mutex<HashMap<(Method, String), HttpResponse>>,
    log: Mutex<Vec<HttpRequest>>,
    calls: AtomicUsize,
    delay: Mutex<Option<Duration>>,
}

impl MockNetwork {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn route(&self, method: Method, path: &str, response: HttpResponse) {
        self.routes
            .lock()
            .insert((method, path.to_string()), response);
    }

    pub fn json(&self, path: &str, content_type: &str, body: serde_json::Value) {
        self.route(
            Method::GET,
            path,
            HttpResponse::new(200, body.to_string()).with_header("content-type", content_type),
        );
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock() = Some(delay);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<HttpRequest> {
        self.log.lock().clone()
    }

    pub fn last_request(&self) -> HttpRequest {
        self.log.lock().last().cloned().expect("no request was made")
    }
}

fn path_of(request: &HttpRequest) -> String {
    match request.url.query() {
        Some(q) => format!("{}?{}", request.url.path(), q),
        None => request.url.path().to_string(),
    }
}

#[async_trait]
impl Network for MockNetwork {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.log.lock().push(request.clone());

        let delay = *self.delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let key = (request.method.clone(), path_of(&request));
        let response = self.routes.lock().get(&key).cloned();
        Ok(response.unwrap_or_else(|| HttpResponse::new(404, "")))
    }
}

pub fn client(network: &Arc<MockNetwork>) -> Client {
    client_with(network, ClientConfig::default())
}

pub fn client_with(network: &Arc<MockNetwork>, config: ClientConfig) -> Client {
    Client::with_network(BOOKMARK, network.clone(), config).unwrap()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
