//! Shared HTTP client for the translation backends

use reqwest::{RequestBuilder, StatusCode};
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::errors::{Result, TranslationError};

/// Provider error codes that mean the quota is exhausted
const QUOTA_MARKERS: &[&str] = &["RESOURCE_EXHAUSTED", "insufficient_quota"];

/// Thin wrapper over `reqwest::Client` that maps provider failures into `TranslationError`
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Create a new client with pooled connections
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .pool_idle_timeout(Some(Duration::from_secs(30)))
            .pool_max_idle_per_host(4)
            .user_agent(concat!("clipboard-translator/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client })
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Send a request with a bounded timeout and decode a JSON body
    pub async fn send_json(
        &self,
        request: RequestBuilder,
        timeout: Duration,
    ) -> Result<serde_json::Value> {
        let response = request
            .timeout(timeout)
            .send()
            .await
            .map_err(map_send_error)?;

        let status = response.status();
        let body = response.text().await.map_err(map_send_error)?;

        if !status.is_success() {
            return Err(map_status_error(status, body));
        }

        debug!("Received {} bytes from provider", body.len());
        serde_json::from_str(&body).map_err(|e| TranslationError::InvalidResponseError {
            message: format!("{}: {}", e, truncate(&body, 200)),
        })
    }
}

fn map_send_error(err: reqwest::Error) -> TranslationError {
    if err.is_timeout() {
        TranslationError::TimeoutError
    } else {
        TranslationError::NetworkError {
            message: err.to_string(),
        }
    }
}

/// Non-2xx responses: 429 and quota bodies get their own error
pub(crate) fn map_status_error(status: StatusCode, body: String) -> TranslationError {
    let status_code = status.as_u16();

    if status == StatusCode::TOO_MANY_REQUESTS || QUOTA_MARKERS.iter().any(|m| body.contains(m)) {
        warn!("Provider quota exceeded (HTTP {})", status_code);
        return TranslationError::QuotaExceededError { message: body };
    }

    TranslationError::ApiError {
        status: status_code,
        message: body,
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let mut cut: String = text.chars().take(max_chars).collect();
        cut.push('…');
        cut
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_status_mapping() {
        let err = map_status_error(StatusCode::TOO_MANY_REQUESTS, "slow down".to_string());
        assert!(matches!(err, TranslationError::QuotaExceededError { .. }));

        let err = map_status_error(
            StatusCode::FORBIDDEN,
            r#"{"error":{"status":"RESOURCE_EXHAUSTED"}}"#.to_string(),
        );
        assert!(matches!(err, TranslationError::QuotaExceededError { .. }));

        let err = map_status_error(
            StatusCode::UNAUTHORIZED,
            r#"{"error":{"code":"insufficient_quota"}}"#.to_string(),
        );
        assert!(matches!(err, TranslationError::QuotaExceededError { .. }));

        let err = map_status_error(
            StatusCode::BAD_REQUEST,
            "Invalid request: check your quota settings in the console".to_string(),
        );
        assert!(matches!(err, TranslationError::ApiError { status: 400, .. }));

        let err = map_status_error(StatusCode::BAD_REQUEST, "bad".to_string());
        match err {
            TranslationError::ApiError { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "bad");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_send_json_success_and_garbage() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ok"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"a": 1})))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/garbage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let value = client
            .send_json(client.get(&format!("{}/ok", server.uri())), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(value["a"], 1);

        let err = client
            .send_json(client.get(&format!("{}/garbage", server.uri())), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, TranslationError::InvalidResponseError { .. }));
    }

    #[tokio::test]
    async fn test_send_json_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = HttpClient::new().unwrap();
        let err = client
            .send_json(client.get(&server.uri()), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, TranslationError::TimeoutError));
    }
}
