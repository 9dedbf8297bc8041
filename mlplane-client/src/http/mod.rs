//! HTTP transport
//!
//! [`PlatformClient`] implements the three platform traits over HTTP:
//!
//! - Control plane: `POST /` with an `X-Amz-Target: SageMaker.<Operation>`
//!   header and a JSON body
//! - Blob storage: path-style `PUT`/`GET /<bucket>/<key>`
//! - Inference runtime: `POST /endpoints/<name>/invocations`
//!
//! Idempotent calls (describe, list, get) are retried with exponential
//! backoff on throttling, server errors and connection failures.

mod control;
mod runtime;
mod storage;

use reqwest::Client;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::polling::RetryConfig;

const JSON_CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// HTTP client for the platform APIs
#[derive(Debug, Clone)]
pub struct PlatformClient {
    /// Control-plane base URL (e.g., "http://localhost:8080")
    endpoint_url: String,
    storage_url: String,
    runtime_url: String,
    /// HTTP client instance
    client: Client,
    retry: RetryConfig,
}

impl PlatformClient {
    /// Create a new platform client
    ///
    /// # Arguments
    /// * `config` - Service URLs, request timeout and retry budget
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.request_timeout).build()?;
        Ok(Self::with_client(config, client))
    }

    /// Create a new platform client with a custom HTTP client
    ///
    /// This allows you to configure proxies, TLS settings, etc.
    pub fn with_client(config: &ClientConfig, client: Client) -> Self {
        Self {
            endpoint_url: trim(&config.endpoint_url),
            storage_url: trim(&config.storage_url),
            runtime_url: trim(&config.runtime_url),
            client,
            retry: RetryConfig::new(config.max_retries),
        }
    }

    /// Replaces the retry policy for idempotent calls
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Get the control-plane base URL
    pub fn base_url(&self) -> &str {
        &self.endpoint_url
    }

    // =============================================================================
    // Control-Plane Calls
    // =============================================================================

    /// Invokes a control-plane operation and deserializes its JSON answer
    ///
    /// Operations whose name starts with `Describe` or `List` are retried.
    async fn call<B, T>(&self, operation: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        self.call_target(&format!("SageMaker.{operation}"), body)
            .await
    }

    /// Invokes a control-plane operation whose answer is ignored
    async fn call_empty<B>(&self, operation: &str, body: &B) -> Result<()>
    where
        B: Serialize + Sync,
    {
        let _: Value = self.call(operation, body).await?;
        Ok(())
    }

    async fn call_target<B, T>(&self, target: &str, body: &B) -> Result<T>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        let operation = target.rsplit('.').next().unwrap_or(target);
        let retry = if is_idempotent(operation) {
            self.retry.clone()
        } else {
            RetryConfig::none()
        };

        let this = self;
        retry
            .run(operation, move || async move {
                debug!(operation = target, "Calling control plane");
                let response = this
                    .client
                    .post(format!("{}/", this.endpoint_url))
                    .header("X-Amz-Target", target)
                    .header(reqwest::header::CONTENT_TYPE, JSON_CONTENT_TYPE)
                    .json(body)
                    .send()
                    .await?;

                this.handle_response(response).await
            })
            .await
    }

    // =============================================================================
    // Response Handlers
    // =============================================================================

    /// Handle an API response and deserialize JSON
    ///
    /// An empty body is read as `{}` so that operations answering with no
    /// content can be deserialized into `Value`.
    async fn handle_response<T: DeserializeOwned>(&self, response: reqwest::Response) -> Result<T> {
        let response = self.check_status(response).await?;
        let bytes = response.bytes().await?;
        let bytes: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };

        serde_json::from_slice(bytes)
            .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
    }

    /// Turns a non-success status into an error
    ///
    /// 404s and platform errors whose type names a missing resource become
    /// `NotFound`; anything else becomes `ApiError`.
    async fn check_status(&self, response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let (error_type, message) = parse_error_body(&error_text);
        if status.as_u16() == 404 || error_type.is_some_and(|t| t.contains("NotFound")) {
            return Err(ClientError::NotFound(message));
        }

        Err(ClientError::api_error(status.as_u16(), message))
    }
}

fn trim(url: &str) -> String {
    url.trim_end_matches('/').to_string()
}

fn is_idempotent(operation: &str) -> bool {
    operation.starts_with("Describe")
        || operation.starts_with("List")
        || operation.starts_with("FilterLogEvents")
}

/// Extracts `__type` and `message` from a JSON error body
fn parse_error_body(text: &str) -> (Option<String>, String) {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => {
            let error_type = map
                .get("__type")
                .and_then(Value::as_str)
                .map(|t| t.rsplit('#').next().unwrap_or(t).to_string());
            let message = map
                .get("message")
                .or_else(|| map.get("Message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| text.to_string());
            (error_type, message)
        }
        _ => (None, text.to_string()),
    }
}
