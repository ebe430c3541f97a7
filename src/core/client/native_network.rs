use crate::core::client::ClientConfig;
use crate::core::error::{HateoasError, Result};
use crate::core::traits::Network;
use crate::core::types::{HttpRequest, HttpResponse};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// `reqwest`-backed [`Network`].
pub struct NativeNetwork {
    client: Client,
}

impl NativeNetwork {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Build a `reqwest` client from the timeout, pool, proxy and user agent settings.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(config.pool_max_idle_per_host);

        if !config.proxy_url.is_empty() {
            let proxy = reqwest::Proxy::all(&config.proxy_url)
                .map_err(|e| HateoasError::Config(format!("Invalid proxy URL: {}", e)))?;
            builder = builder.proxy(proxy);
        }
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        let client = builder
            .build()
            .map_err(|e| HateoasError::Config(e.to_string()))?;
        Ok(Self::new(client))
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Network for NativeNetwork {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut req_builder = self.client.request(request.method.clone(), request.url.clone());

        for (k, v) in &request.headers {
            req_builder = req_builder.header(k.as_str(), v.as_str());
        }
        if !request.body.is_empty() {
            req_builder = req_builder.body(request.body.clone());
        }

        let response = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                HateoasError::Network(format!("Request to {} timed out", request.url))
            } else {
                HateoasError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let url = response.url().clone();
        let mut result = HttpResponse::new(status, bytes::Bytes::new()).with_url(url);
        for (k, v) in response.headers() {
            if let Ok(val) = v.to_str() {
                result.append_header(k.as_str(), val);
            }
        }

        result.body = response
            .bytes()
            .await
            .map_err(|e| HateoasError::Network(e.to_string()))?;

        Ok(result)
    }
}
