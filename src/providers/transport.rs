//! HTTP transport seam with 429/5xx retry and Retry-After support
//!
//! The bucket client talks to the network through the [`HttpTransport`]
//! trait so tests can drive it with a scripted mock. [`ReqwestTransport`]
//! is the real implementation and adds:
//! - Exponential backoff with jitter on 429 (Too Many Requests) and 5xx
//! - Retry-After header parsing (numeric seconds)
//! - Transparent passthrough for non-retryable status codes (4xx except 429)
//!
//! Retrying a signed PUT is safe: the upload overwrites the same key, so
//! the operation is idempotent.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

use super::types::MediaError;

/// One outgoing request as produced by the signer: method, final URL,
/// headers and optional body.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
}

/// Status and body of a completed exchange
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Transport abstraction between the bucket client and the wire
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform the exchange. `Err` is a transport-level failure; HTTP
    /// error statuses come back as a normal [`HttpResponse`].
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, MediaError>;
}

/// Configuration for HTTP retry behavior
#[derive(Debug, Clone)]
pub struct HttpRetryConfig {
    /// Maximum number of retry attempts (default: 3)
    pub max_retries: u32,
    /// Base delay in milliseconds for exponential backoff (default: 1000)
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds (default: 30000)
    pub max_delay_ms: u64,
    /// Backoff multiplier (default: 2.0)
    pub backoff_multiplier: f64,
}

impl Default for HttpRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Determine if a status code is retryable
fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

/// Parse a Retry-After value in seconds. HTTP-date values are ignored;
/// numeric seconds covers the overwhelming majority of real responses.
fn parse_retry_after(value: Option<&str>) -> Option<Duration> {
    let secs: u64 = value?.trim().parse().ok()?;
    Some(Duration::from_secs(secs.min(300))) // Cap at 5 minutes
}

/// Calculate delay for a given retry attempt with jitter
fn calculate_delay(attempt: u32, config: &HttpRetryConfig) -> Duration {
    let base = config.base_delay_ms as f64 * config.backoff_multiplier.powi(attempt as i32);
    let capped = base.min(config.max_delay_ms as f64);
    // 10-30% jitter to prevent thundering herd
    let jitter = capped * (0.1 + rand::random::<f64>() * 0.2);
    Duration::from_millis((capped + jitter) as u64)
}

/// reqwest-backed transport with automatic retry on 429/5xx
pub struct ReqwestTransport {
    client: Client,
    retry: HttpRetryConfig,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::with_retry(HttpRetryConfig::default())
    }

    pub fn with_retry(retry: HttpRetryConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("Failed to create HTTP client");
        Self { client, retry }
    }

    async fn send_once(
        &self,
        request: &HttpRequest,
    ) -> Result<(HttpResponse, Option<String>), MediaError> {
        let method: reqwest::Method = request
            .method
            .parse()
            .map_err(|_| MediaError::Network(format!("invalid method: {}", request.method)))?;

        let mut builder = self.client.request(method, &request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        if let Some(ref body) = request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| MediaError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let body = response
            .bytes()
            .await
            .map_err(|e| MediaError::Network(e.to_string()))?
            .to_vec();

        Ok((HttpResponse { status, body }, retry_after))
    }
}

impl Default for ReqwestTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, MediaError> {
        let (mut last, mut retry_after) = self.send_once(&request).await?;

        for attempt in 0..self.retry.max_retries {
            if !is_retryable_status(last.status) {
                return Ok(last);
            }

            // Prefer Retry-After, fall back to exponential backoff
            let delay = parse_retry_after(retry_after.as_deref())
                .unwrap_or_else(|| calculate_delay(attempt, &self.retry));

            tracing::debug!(
                "HTTP {} {} returned {}. Retry {}/{} after {:?}",
                request.method,
                request.url,
                last.status,
                attempt + 1,
                self.retry.max_retries,
                delay
            );

            tokio::time::sleep(delay).await;
            (last, retry_after) = self.send_once(&request).await?;
        }

        Ok(last)
    }
}
