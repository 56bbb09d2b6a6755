//! HTTP transport with rate-limit retry and failure reporting.
//!
//! Every call makes up to [`RetryPolicy::max_attempts`] exchanges. Only
//! HTTP 429 is retried, after a fixed delay. Any other error status, a
//! network failure, or an unparseable JSON body ends the call: the
//! failure is logged with full detail and returned as a
//! [`TransportError`].

use std::time::Duration;

use serde::Serialize;
use serde_json::Value;

use crate::backend::{HttpBackend, HttpRequest, HttpResponse, Method};

/// HTTP 429 Too Many Requests.
pub const STATUS_TOO_MANY_REQUESTS: u16 = 429;

/// Total attempts per call, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Fixed delay before retrying a rate-limited call.
pub const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_secs(30);

/// Retry parameters for rate-limited calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts per call, including the first.
    pub max_attempts: u32,
    /// Delay before each retry.
    pub rate_limit_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            rate_limit_delay: DEFAULT_RATE_LIMIT_DELAY,
        }
    }
}

/// Errors from the transport layer. Each one has already been logged
/// when it is returned.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server could not be reached.
    #[error("Failed to reach the server: {0}")]
    Network(String),

    /// The server answered with an error status.
    #[error("The server returned HTTP {status} {reason}")]
    Http {
        status: u16,
        reason: String,
        /// `message` field of a JSON error body.
        message: Option<String>,
        /// `errors` field of a JSON error body.
        errors: Option<Value>,
        /// Raw body when it was not JSON.
        raw_body: Option<String>,
    },

    /// The response body was expected to be JSON but was not.
    #[error("Failed to parse JSON response: {0}")]
    Decode(String),

    /// The request body could not be encoded.
    #[error("Failed to encode request body: {0}")]
    Encode(String),
}

impl TransportError {
    /// HTTP status for [`TransportError::Http`], `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Retrying, reporting wrapper around an [`HttpBackend`].
pub struct Transport<B> {
    backend: B,
    retry: RetryPolicy,
}

impl<B: HttpBackend> Transport<B> {
    pub fn new(backend: B) -> Self {
        Self::with_policy(backend, RetryPolicy::default())
    }

    pub fn with_policy(backend: B, retry: RetryPolicy) -> Self {
        Self { backend, retry }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// `GET` returning a JSON document.
    pub async fn get_json(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<Value, TransportError> {
        let request = HttpRequest::new(Method::Get, url).headers(headers);
        let response = self.execute(request).await?;
        parse_json_body(url, &response)
    }

    /// `POST` a JSON payload, returning a JSON document.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        headers: &[(String, String)],
        payload: &T,
    ) -> Result<Value, TransportError> {
        let body = serde_json::to_vec(payload).map_err(|e| {
            tracing::error!(url, error = %e, "Failed to encode request body");
            TransportError::Encode(e.to_string())
        })?;
        let request = HttpRequest::new(Method::Post, url)
            .headers(headers)
            .body(body);
        let response = self.execute(request).await?;
        parse_json_body(url, &response)
    }

    /// `PUT` raw bytes (presigned upload URLs take no extra headers).
    pub async fn put_binary(&self, url: &str, data: Vec<u8>) -> Result<(), TransportError> {
        let request = HttpRequest::new(Method::Put, url).body(data);
        self.execute(request).await.map(|_| ())
    }

    /// `DELETE`, discarding any response body.
    pub async fn delete(
        &self,
        url: &str,
        headers: &[(String, String)],
    ) -> Result<(), TransportError> {
        let request = HttpRequest::new(Method::Delete, url).headers(headers);
        self.execute(request).await.map(|_| ())
    }

    /// `GET` returning the raw body, for artifact downloads.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, TransportError> {
        let request = HttpRequest::new(Method::Get, url);
        self.execute(request).await.map(|r| r.body)
    }

    /// Run one logical call, retrying on 429 up to the attempt limit.
    pub async fn execute(&self, request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut attempt = 0u32;

        loop {
            attempt += 1;

            let response = match self.backend.execute(request.clone()).await {
                Ok(response) => response,
                Err(e) => {
                    tracing::error!(
                        method = %request.method,
                        url = %request.url,
                        reason = %e,
                        "Failed to reach the server",
                    );
                    return Err(TransportError::Network(e.0));
                }
            };

            if response.is_success() {
                return Ok(response);
            }

            if response.status == STATUS_TOO_MANY_REQUESTS {
                if attempt < self.retry.max_attempts {
                    tracing::warn!(
                        method = %request.method,
                        url = %request.url,
                        attempt,
                        "Rate limit exceeded. Retrying in {} seconds...",
                        self.retry.rate_limit_delay.as_secs(),
                    );
                    tokio::time::sleep(self.retry.rate_limit_delay).await;
                    continue;
                }
                tracing::warn!(
                    url = %request.url,
                    attempts = attempt,
                    "Rate limit still exceeded, giving up",
                );
            }

            return Err(report_http_error(&request, response));
        }
    }
}

fn parse_json_body(url: &str, response: &HttpResponse) -> Result<Value, TransportError> {
    serde_json::from_slice(&response.body).map_err(|e| {
        tracing::error!(url, error = %e, "Failed to parse JSON response");
        TransportError::Decode(e.to_string())
    })
}

/// Log an error response and turn it into [`TransportError::Http`].
///
/// A JSON body contributes its `message` and `errors` fields; any other
/// body is logged raw.
fn report_http_error(request: &HttpRequest, response: HttpResponse) -> TransportError {
    let HttpResponse {
        status,
        reason,
        body,
    } = response;

    let (message, errors, raw_body) = match serde_json::from_slice::<Value>(&body) {
        Ok(json) => {
            let message = json
                .get("message")
                .and_then(Value::as_str)
                .map(str::to_string);
            let errors = json.get("errors").cloned();
            (message, errors, None)
        }
        Err(_) => (None, None, Some(String::from_utf8_lossy(&body).into_owned())),
    };

    let detailed_errors = errors
        .as_ref()
        .map(|e| serde_json::to_string_pretty(e).unwrap_or_else(|_| e.to_string()));

    tracing::error!(
        method = %request.method,
        url = %request.url,
        status,
        reason = %reason,
        server_message = message.as_deref().unwrap_or("No message provided"),
        detailed_errors = detailed_errors.as_deref(),
        raw_response = raw_body.as_deref(),
        "The server returned HTTP {status}",
    );

    TransportError::Http {
        status,
        reason,
        message,
        errors,
        raw_body,
    }
}
