//! Shared HTTP plumbing for recipe sources
//!
//! JSON GETs with a per-client rate limiter and exponential backoff on
//! 429 and 5xx responses.

use reqwest::{header, Client, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use super::recipe_source::SourceError;

const USER_AGENT: &str = concat!("larder-etl/", env!("CARGO_PKG_VERSION"));

/// Minimum spacing between requests from one client
#[derive(Debug, Clone)]
pub struct RateLimiter {
    interval: Duration,
    last_request: Arc<Mutex<Option<Instant>>>,
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_request: Arc::new(Mutex::new(None)),
        }
    }

    /// Sleep until `interval` has passed since the previous request
    pub async fn acquire(&self) {
        let mut last_request = self.last_request.lock().await;

        if let Some(last_time) = *last_request {
            let elapsed = last_time.elapsed();
            if elapsed < self.interval {
                let wait = self.interval - elapsed;
                debug!(sleep_ms = wait.as_millis() as u64, "Rate limiting before request");
                sleep(wait).await;
            }
        }

        *last_request = Some(Instant::now());
    }
}

/// Retry budget for transient upstream failures
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            backoff_base: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (1-based): base, 2x base, 4x base...
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.backoff_base * 2u32.saturating_pow(retry.saturating_sub(1))
    }
}

/// Statuses worth retrying
pub fn is_retryable(status: StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 502 | 503 | 504)
}

/// JSON HTTP client with rate limiting and retries
#[derive(Debug, Clone)]
pub struct JsonClient {
    client: Client,
    rate_limiter: RateLimiter,
    retry: RetryPolicy,
}

impl JsonClient {
    pub fn new(timeout: Duration, min_interval: Duration) -> Result<Self, SourceError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(USER_AGENT),
        );

        let client = Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| SourceError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            rate_limiter: RateLimiter::new(min_interval),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// GET `url` with `query` and decode the JSON body
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let mut retries = 0u32;

        loop {
            self.rate_limiter.acquire().await;

            let error = match self.client.get(url).query(query).send().await {
                Ok(response) if response.status().is_success() => {
                    return response
                        .json::<T>()
                        .await
                        .map_err(|e| SourceError::ParseError(e.to_string()));
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let error = if status == StatusCode::TOO_MANY_REQUESTS {
                        SourceError::RateLimitExceeded(retries + 1)
                    } else {
                        SourceError::ApiError(status.as_u16(), truncate(&body, 200))
                    };
                    if !is_retryable(status) {
                        return Err(error);
                    }
                    error
                }
                Err(e) => SourceError::NetworkError(e.to_string()),
            };

            if retries >= self.retry.max_retries {
                return Err(error);
            }
            retries += 1;

            let delay = self.retry.delay_for(retries);
            warn!(
                url,
                retry = retries,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "Upstream request failed, retrying"
            );
            sleep(delay).await;
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
