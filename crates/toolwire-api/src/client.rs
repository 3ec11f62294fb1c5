//! Chat-completions client implementing [`CompletionBackend`].

use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use toolwire_types::{BackendError, BackendFuture, Completion, CompletionBackend, CompletionRequest};

use crate::retry::RetryConfig;
use crate::wire::{ChatRequest, ChatResponse};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4.1";

/// Non-streaming client for an OpenAI-compatible `chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiBackend {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    retry_config: RetryConfig,
}

impl OpenAiBackend {
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            retry_config: RetryConfig::default(),
        })
    }

    /// Set the retry configuration for transient errors (429, 5xx, network).
    pub fn with_retry_config(mut self, config: RetryConfig) -> Self {
        self.retry_config = config;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Submit the conversation and return the first choice.
    pub async fn create_completion(
        &self,
        request: &CompletionRequest,
    ) -> Result<Completion, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|_| {
                BackendError::Auth {
                    message: "Invalid API key format".into(),
                }
            })?,
        );

        let body = serde_json::to_string(&ChatRequest::new(&self.model, request)).map_err(|e| {
            BackendError::BadRequest {
                message: format!("Failed to serialize request: {e}"),
            }
        })?;

        let mut attempt = 0;
        loop {
            tracing::debug!(
                "POST {url} (attempt {}/{})",
                attempt + 1,
                self.retry_config.max_retries + 1
            );

            let result = self
                .http
                .post(&url)
                .headers(headers.clone())
                .body(body.clone())
                .send()
                .await;

            let err = match result {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        let text = response
                            .text()
                            .await
                            .map_err(|e| BackendError::Network(e.to_string()))?;
                        let parsed: ChatResponse = serde_json::from_str(&text)
                            .map_err(|e| BackendError::Decode(e.to_string()))?;
                        return parsed.into_completion();
                    }

                    let retry_after = parse_retry_after(response.headers());
                    let body_text = response.text().await.unwrap_or_default();
                    classify_error(status.as_u16(), &body_text, retry_after)
                }
                Err(e) if e.is_timeout() => BackendError::Timeout,
                Err(e) => BackendError::Network(e.to_string()),
            };

            let Some(delay) = self.retry_config.next_delay(attempt, &err) else {
                return Err(err);
            };
            tracing::warn!(
                "Retryable backend error (attempt {}/{}): {err}. Retrying in {}ms...",
                attempt + 1,
                self.retry_config.max_retries,
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

impl CompletionBackend for OpenAiBackend {
    fn complete<'a>(&'a self, request: &'a CompletionRequest) -> BackendFuture<'a> {
        Box::pin(self.create_completion(request))
    }

    fn name(&self) -> &str {
        "openai"
    }
}

/// Parse the `retry-after` header value as seconds and convert to milliseconds.
fn parse_retry_after(headers: &HeaderMap) -> Option<u64> {
    headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<f64>().ok())
        .map(|secs| (secs * 1000.0) as u64)
}

/// Classify an HTTP error response into a typed [`BackendError`].
fn classify_error(status: u16, body: &str, retry_after: Option<u64>) -> BackendError {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: Option<ErrorDetail>,
    }
    #[derive(serde::Deserialize)]
    struct ErrorDetail {
        message: Option<String>,
    }

    let message = serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|b| b.error)
        .and_then(|e| e.message)
        .unwrap_or_else(|| body.to_string());

    match status {
        401 | 403 => BackendError::Auth { message },
        400 | 404 | 422 => BackendError::BadRequest { message },
        429 => BackendError::RateLimited {
            retry_after_ms: retry_after,
        },
        _ => BackendError::Server { status, message },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_retry_after_seconds_and_fractions() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("5"));
        assert_eq!(parse_retry_after(&headers), Some(5000));
        headers.insert("retry-after", HeaderValue::from_static("1.5"));
        assert_eq!(parse_retry_after(&headers), Some(1500));
    }

    #[test]
    fn parse_retry_after_missing_or_invalid() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);
        headers.insert("retry-after", HeaderValue::from_static("soon"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn classify_rate_limit_keeps_retry_after() {
        match classify_error(429, "{}", Some(3000)) {
            BackendError::RateLimited { retry_after_ms } => assert_eq!(retry_after_ms, Some(3000)),
            other => panic!("Expected RateLimited, got {other:?}"),
        }
    }

    #[test]
    fn classify_auth_and_bad_request() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        match classify_error(401, body, None) {
            BackendError::Auth { message } => assert_eq!(message, "Incorrect API key provided"),
            other => panic!("Expected Auth, got {other:?}"),
        }
        assert!(matches!(
            classify_error(404, r#"{"error":{"message":"model not found"}}"#, None),
            BackendError::BadRequest { .. }
        ));
    }

    #[test]
    fn classify_server_error_falls_back_to_raw_body() {
        match classify_error(502, "Bad Gateway", None) {
            BackendError::Server { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message, "Bad Gateway");
            }
            other => panic!("Expected Server, got {other:?}"),
        }
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let backend = OpenAiBackend::new("k", "http://localhost:8080/v1/", "m").unwrap();
        assert_eq!(backend.base_url, "http://localhost:8080/v1");
        assert_eq!(backend.model(), "m");
        assert_eq!(backend.name(), "openai");
    }
}
