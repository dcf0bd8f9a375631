//! Keyless translation through the public web endpoint

use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

use crate::core::client::HttpClient;
use crate::core::errors::{Result, TranslationError};
use crate::core::language::{language_name, AUTO_DETECTED};
use crate::core::models::{AiParameters, TranslationRequest, TranslationResult};
use crate::providers::{ProviderKind, TranslationProvider};

const TIMEOUT: Duration = Duration::from_secs(15);

/// Translator without API key, model or tone support
#[derive(Debug, Clone)]
pub struct FreeTranslator {
    http: HttpClient,
    base_url: String,
}

impl FreeTranslator {
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub(crate) async fn translate_inner(
        &self,
        request: &TranslationRequest,
    ) -> Result<TranslationResult> {
        if request.text.trim().is_empty() {
            return Err(TranslationError::EmptyText);
        }

        let url = format!("{}/translate_a/single", self.base_url);
        let query = [
            ("client", "gtx"),
            ("sl", request.source_lang.as_str()),
            ("tl", request.target_lang.as_str()),
            ("dt", "t"),
            ("q", request.text.as_str()),
        ];

        let json = self
            .http
            .send_json(self.http.get(&url).query(&query), TIMEOUT)
            .await?;

        let translated = parse_segments(&json);
        if translated.trim().is_empty() {
            return Err(TranslationError::InvalidResponseError {
                message: "No translated segments in response".to_string(),
            });
        }

        let detected = if request.is_auto_source() {
            json.get(2)
                .and_then(Value::as_str)
                .map(language_name)
                .unwrap_or_else(|| AUTO_DETECTED.to_string())
        } else {
            language_name(&request.source_lang)
        };

        debug!("Free endpoint returned {} chars", translated.chars().count());
        Ok(TranslationResult::success(translated, Some(detected)))
    }
}

/// Concatenate `json[0][i][0]`
fn parse_segments(json: &Value) -> String {
    json.get(0)
        .and_then(Value::as_array)
        .map(|segments| {
            segments
                .iter()
                .filter_map(|segment| segment.get(0).and_then(Value::as_str))
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl TranslationProvider for FreeTranslator {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Free
    }

    async fn set_api_key(&self, _api_key: Option<String>) {}

    async fn set_ai_parameters(&self, _params: AiParameters) {}

    async fn translate(&self, request: &TranslationRequest) -> TranslationResult {
        match self.translate_inner(request).await {
            Ok(result) => result,
            Err(e) => {
                warn!("Free translation failed: {}", e);
                TranslationResult::from_error(&e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::language::Tone;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn translator(server: &MockServer) -> FreeTranslator {
        FreeTranslator::new(HttpClient::new().unwrap(), &server.uri())
    }

    #[test]
    fn test_parse_segments() {
        let json = json!([[["Olá, ", "Hello, ", null], ["mundo", "world", null]], null, "en"]);
        assert_eq!(parse_segments(&json), "Olá, mundo");
        assert_eq!(parse_segments(&json!({})), "");
    }

    #[tokio::test]
    async fn test_translate_with_detection() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .and(query_param("client", "gtx"))
            .and(query_param("sl", "auto"))
            .and(query_param("tl", "pt"))
            .and(query_param("q", "Hello world"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!([[["Olá mundo", "Hello world", null]], null, "en"])),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = TranslationRequest::new("Hello world", "auto", "pt", Tone::Formal);
        let result = translator(&server).await.translate(&request).await;

        assert_eq!(result.translated_text(), Some("Olá mundo"));
        assert_eq!(result.detected_language(), Some("English"));
    }

    #[tokio::test]
    async fn test_empty_segments_are_invalid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([[], null, "en"])))
            .mount(&server)
            .await;

        let request = TranslationRequest::new("Hello", "en", "pt", Tone::Neutral);
        let result = translator(&server).await.translate(&request).await;
        assert_eq!(result.error_message(), Some("Unable to parse translation from response"));
    }

    #[tokio::test]
    async fn test_rate_limit_is_quota() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).set_body_string("Too Many Requests"))
            .mount(&server)
            .await;

        let request = TranslationRequest::new("Hello", "en", "pt", Tone::Neutral);
        let result = translator(&server).await.translate(&request).await;
        assert!(result.error_message().unwrap().contains("quota"));
    }
}
