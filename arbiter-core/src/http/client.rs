//! HTTP client implementation using reqwest

use crate::http::error::map_http_error;
use crate::providers::error::ProviderError;
use reqwest::{Client, ClientBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, warn};
use uuid::Uuid;

/// Maximum response size (10MB)
const MAX_RESPONSE_SIZE: usize = 10 * 1024 * 1024;

/// Default user agent
const USER_AGENT: &str = concat!("arbiter/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client with connection pooling
#[derive(Clone)]
pub struct HttpClient {
    /// The underlying reqwest client
    client: Arc<Client>,

    /// Per-request timeout, reported on timeout errors
    request_timeout: Duration,

    /// Maximum response size to prevent OOM
    max_response_size: usize,
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Result<Self, ProviderError> {
        Self::with_config(Duration::from_secs(10), Duration::from_secs(60), 10)
    }

    /// Create a new HTTP client with custom configuration
    pub fn with_config(
        connect_timeout: Duration,
        request_timeout: Duration,
        max_idle_per_host: usize,
    ) -> Result<Self, ProviderError> {
        let client = ClientBuilder::new()
            .pool_max_idle_per_host(max_idle_per_host)
            .pool_idle_timeout(Duration::from_secs(90))
            .connect_timeout(connect_timeout)
            .timeout(request_timeout)
            .user_agent(USER_AGENT)
            .gzip(true)
            .build()
            .map_err(|e| ProviderError::other(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
            request_timeout,
            max_response_size: MAX_RESPONSE_SIZE,
        })
    }

    /// POST a JSON body and decode a JSON answer
    pub async fn post_json<B, T>(
        &self,
        provider_id: &str,
        url: &str,
        headers: &[(&str, String)],
        body: &B,
    ) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request_id = Uuid::new_v4();
        debug!("POST {} for {} [request_id: {}]", url, provider_id, request_id);

        let mut req_builder = self
            .client
            .post(url)
            .json(body)
            .header("X-Request-ID", request_id.to_string());
        for (key, value) in headers {
            req_builder = req_builder.header(*key, value);
        }

        let response = req_builder.send().await.map_err(|e| {
            if e.is_timeout() {
                warn!("Request timeout for {} [request_id: {}]", provider_id, request_id);
                let limit_ms = u64::try_from(self.request_timeout.as_millis()).unwrap_or(u64::MAX);
                ProviderError::Timeout(limit_ms)
            } else if e.is_connect() {
                error!(
                    "Connection error for {} [request_id: {}]: {}",
                    provider_id, request_id, e
                );
                ProviderError::Network(format!("Connection failed: {} [request_id: {}]", e, request_id))
            } else {
                ProviderError::from(e)
            }
        })?;

        let status = response.status();
        debug!("Response status: {} [request_id: {}]", status, request_id);

        if !status.is_success() {
            let body = response.text().await.ok();
            warn!(
                "Request failed with status {} for {} [request_id: {}]",
                status, provider_id, request_id
            );
            return Err(map_http_error(status, body, request_id));
        }

        self.check_content_length(&response)?;

        let text = response.text().await.map_err(|e| {
            ProviderError::Network(format!(
                "Failed to read response body: {} [request_id: {}]",
                e, request_id
            ))
        })?;

        if text.len() > self.max_response_size {
            return Err(ProviderError::coded(
                "RESPONSE_TOO_LARGE",
                format!(
                    "Response size {} exceeds maximum {} [request_id: {}]",
                    text.len(),
                    self.max_response_size,
                    request_id
                ),
            ));
        }

        serde_json::from_str(&text).map_err(|e| {
            error!(
                "Failed to parse response from {} [request_id: {}]: {}",
                provider_id, request_id, e
            );
            ProviderError::InvalidResponse(format!("{} [request_id: {}]", e, request_id))
        })
    }

    /// Check response size to prevent OOM
    fn check_content_length(&self, response: &Response) -> Result<(), ProviderError> {
        if let Some(content_length) = response.content_length() {
            if content_length as usize > self.max_response_size {
                return Err(ProviderError::coded(
                    "RESPONSE_TOO_LARGE",
                    format!(
                        "Response size {} exceeds maximum {}",
                        content_length, self.max_response_size
                    ),
                ));
            }
        }

        Ok(())
    }
}
