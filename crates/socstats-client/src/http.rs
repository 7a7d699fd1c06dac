//! Request execution with a fixed-interval retry policy.
//!
//! Only transport-level failures (timeouts, refused or reset connections)
//! are retried. Every HTTP status is final: 404 and 429 map to their own
//! variants and any other status >= 400 becomes `RequestFailed`.
//!
//! The retry middleware only covers sending the request and receiving the
//! response head. A timeout while reading the body of a successful response
//! re-issues the request under the same fixed-interval policy.

use crate::config::ClientConfig;
use crate::error::{ClientError, Result};
use crate::pagination::PageSource;
use crate::types::DataPage;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::StatusCode;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{
    RetryDecision, RetryPolicy, RetryTransientMiddleware, Retryable, RetryableStrategy,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::{Duration, SystemTime};

/// Issues one logical GET request per call and decodes the JSON body.
#[derive(Clone)]
pub struct RequestExecutor {
    http: ClientWithMiddleware,
    retry_policy: FixedInterval,
    max_attempts: u32,
}

impl std::fmt::Debug for RequestExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestExecutor")
            .field("max_attempts", &self.max_attempts)
            .finish_non_exhaustive()
    }
}

impl RequestExecutor {
    /// Build the executor from the client configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .unwrap_or_else(|_| HeaderValue::from_static("socstats-client")),
        );

        let reqwest_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        let retry_policy = FixedInterval {
            delay: config.retry_delay,
            max_retries: config.max_attempts.saturating_sub(1),
        };

        let http = ClientBuilder::new(reqwest_client)
            .with(RetryTransientMiddleware::new_with_policy_and_strategy(
                retry_policy,
                TransportOnlyStrategy,
            ))
            .build();

        Ok(Self {
            http,
            retry_policy,
            max_attempts: config.max_attempts,
        })
    }

    /// GET `url` with `params` and return the parsed JSON body as-is.
    pub async fn execute(&self, url: &str, params: &[(&str, String)]) -> Result<Value> {
        let first_attempt = SystemTime::now();
        let mut body_retries = 0;

        loop {
            match self.execute_once(url, params).await {
                Err(Failure::BodyTimeout(error))
                    if self.retry_policy.allows(first_attempt, body_retries) =>
                {
                    body_retries += 1;
                    tracing::debug!(url = %url, error = %error, "Timed out reading response body");
                    tokio::time::sleep(self.retry_policy.delay).await;
                }
                Err(Failure::BodyTimeout(error)) => {
                    return Err(self.transport_error(url, error.into()));
                }
                Err(Failure::Client(error)) => return Err(error),
                Ok(body) => return Ok(body),
            }
        }
    }

    async fn execute_once(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> std::result::Result<Value, Failure> {
        let start = std::time::Instant::now();

        tracing::debug!(url = %url, params = ?params, "Sending request");

        let response = self
            .http
            .get(url)
            .query(params)
            .send()
            .await
            .map_err(|e| Failure::Client(self.transport_error(url, e)))?;

        let status = response.status();
        let duration = start.elapsed();

        tracing::debug!(
            url = %url,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            "Received response"
        );

        if status.as_u16() < 400 {
            let body = match response.bytes().await {
                Ok(body) => body,
                Err(e) if e.is_timeout() => return Err(Failure::BodyTimeout(e)),
                Err(e) => return Err(self.transport_error(url, e.into()).into()),
            };
            return serde_json::from_slice(&body).map_err(|e| {
                ClientError::InvalidResponse(format!(
                    "Failed to parse response: {} (body: {})",
                    e,
                    String::from_utf8_lossy(&body)
                ))
                .into()
            });
        }

        let retry_after = Self::parse_retry_after(response.headers());
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| status.to_string());

        tracing::warn!(
            url = %url,
            status = %status.as_u16(),
            duration_ms = %duration.as_millis(),
            error = %message,
            "Request failed"
        );

        Err(Self::status_to_error(status, url, message, retry_after).into())
    }

    /// GET `url` and decode the body into `T`.
    pub async fn execute_as<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let body = self.execute(url, params).await?;
        serde_json::from_value(body).map_err(|e| {
            ClientError::InvalidResponse(format!("Unexpected response shape from {url}: {e}"))
        })
    }

    fn transport_error(&self, url: &str, error: reqwest_middleware::Error) -> ClientError {
        let exhausted = matches!(error, reqwest_middleware::Error::Middleware(_))
            || error.is_timeout()
            || error.is_connect();

        let message = if exhausted {
            format!(
                "exhausted retries after {} attempts: {}",
                self.max_attempts, error
            )
        } else {
            format!("transport error: {}", error)
        };

        tracing::warn!(url = %url, error = %message, "Request failed");

        ClientError::RequestFailed {
            status: None,
            message,
        }
    }

    /// Convert HTTP status to appropriate error type.
    fn status_to_error(
        status: StatusCode,
        url: &str,
        message: String,
        retry_after: Option<Duration>,
    ) -> ClientError {
        match status {
            StatusCode::NOT_FOUND => ClientError::NotFound(url.to_string()),
            StatusCode::TOO_MANY_REQUESTS => ClientError::RateLimited { retry_after },
            _ => ClientError::RequestFailed {
                status: Some(status.as_u16()),
                message,
            },
        }
    }

    /// Parse the Retry-After header value into a Duration.
    ///
    /// Supports both formats per RFC 7231:
    /// - Seconds: "120" -> Duration::from_secs(120)
    /// - HTTP-date: "Fri, 31 Dec 2024 23:59:59 GMT" -> Duration until that time
    fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
        let header_value = headers.get("retry-after")?.to_str().ok()?;

        if let Ok(seconds) = header_value.parse::<u64>() {
            return Some(Duration::from_secs(seconds));
        }

        if let Ok(date) = httpdate::parse_http_date(header_value) {
            return Some(
                date.duration_since(SystemTime::now())
                    .unwrap_or(Duration::ZERO),
            );
        }

        None
    }
}

#[async_trait]
impl PageSource for RequestExecutor {
    async fn fetch_page(&self, url: &str) -> Result<DataPage> {
        self.execute_as(url, &[]).await
    }
}

/// One attempt's failure: a body timeout may be retried, anything else is final.
enum Failure {
    BodyTimeout(reqwest::Error),
    Client(ClientError),
}

impl From<ClientError> for Failure {
    fn from(error: ClientError) -> Self {
        Failure::Client(error)
    }
}

/// Retry after a constant delay, up to `max_retries` times.
#[derive(Debug, Clone, Copy)]
struct FixedInterval {
    delay: Duration,
    max_retries: u32,
}

impl FixedInterval {
    fn allows(&self, request_start_time: SystemTime, n_past_retries: u32) -> bool {
        matches!(
            self.should_retry(request_start_time, n_past_retries),
            RetryDecision::Retry { .. }
        )
    }
}

impl RetryPolicy for FixedInterval {
    fn should_retry(&self, _request_start_time: SystemTime, n_past_retries: u32) -> RetryDecision {
        if n_past_retries < self.max_retries {
            tracing::warn!(
                attempt = n_past_retries + 2,
                max_attempts = self.max_retries + 1,
                delay_ms = %self.delay.as_millis(),
                "Transient request failure, retrying"
            );
            RetryDecision::Retry {
                execute_after: SystemTime::now() + self.delay,
            }
        } else {
            RetryDecision::DoNotRetry
        }
    }
}

/// Retries on timeouts and connection failures only.
///
/// A response with any status is never retried; 429 in particular is
/// surfaced to the caller instead of being replayed blindly. Whether a
/// retry actually follows is up to the policy, which logs it.
struct TransportOnlyStrategy;

impl RetryableStrategy for TransportOnlyStrategy {
    fn handle(&self, res: &reqwest_middleware::Result<reqwest::Response>) -> Option<Retryable> {
        match res {
            Ok(response) if response.status().as_u16() < 400 => None,
            Ok(_) => Some(Retryable::Fatal),
            Err(error) => {
                if error.is_timeout() || error.is_connect() {
                    tracing::debug!(error = %error, "Transient transport failure");
                    Some(Retryable::Transient)
                } else {
                    Some(Retryable::Fatal)
                }
            }
        }
    }
}
