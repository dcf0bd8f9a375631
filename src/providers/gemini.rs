//! Gemini `generateContent` backend

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::core::client::HttpClient;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::AiParameters;
use crate::providers::llm::{Completion, CompletionBackend};
use crate::providers::prompt::Prompt;
use crate::providers::ProviderKind;

pub const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash";

const TIMEOUT: Duration = Duration::from_secs(15);
const MAX_OUTPUT_TOKENS: u32 = 2048;

#[derive(Debug, Clone)]
pub struct GeminiBackend {
    http: HttpClient,
    base_url: String,
}

impl GeminiBackend {
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request_body(prompt: &Prompt, params: &AiParameters) -> Value {
        let mut generation = json!({
            "temperature": params.temperature,
            "topP": params.top_p,
            "maxOutputTokens": MAX_OUTPUT_TOKENS,
        });
        if params.frequency_penalty != 0.0 {
            generation["frequencyPenalty"] = json!(params.frequency_penalty);
        }
        if params.presence_penalty != 0.0 {
            generation["presencePenalty"] = json!(params.presence_penalty);
        }

        json!({
            "systemInstruction": { "parts": [{ "text": prompt.system }] },
            "contents": [{ "role": "user", "parts": [{ "text": prompt.user }] }],
            "generationConfig": generation,
        })
    }
}

fn parse_response(json: &Value) -> Result<String> {
    if let Some(error) = json.get("error") {
        return Err(TranslationError::InvalidResponseError {
            message: error.to_string(),
        });
    }

    if let Some(reason) = json.pointer("/promptFeedback/blockReason").and_then(Value::as_str) {
        return Err(TranslationError::InvalidResponseError {
            message: format!("prompt blocked: {}", reason),
        });
    }

    let parts = json
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or_else(|| TranslationError::InvalidResponseError {
            message: "missing candidates[0].content.parts".to_string(),
        })?;

    Ok(parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect())
}

#[async_trait]
impl CompletionBackend for GeminiBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Gemini
    }

    async fn complete(
        &self,
        prompt: &Prompt,
        api_key: &str,
        params: &AiParameters,
    ) -> Result<Completion> {
        let model = params.model_override().unwrap_or(DEFAULT_GEMINI_MODEL);
        let url = format!("{}/v1beta/models/{}:generateContent", self.base_url, model);
        debug!("Calling Gemini model {}", model);

        let request = self
            .http
            .post(&url)
            .query(&[("key", api_key)])
            .json(&Self::request_body(prompt, params));

        let json = self.http.send_json(request, TIMEOUT).await?;
        parse_response(&json).map(Completion::text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::language::Tone;
    use crate::core::models::TranslationRequest;
    use crate::providers::free::FreeTranslator;
    use crate::providers::llm::LlmTranslator;
    use crate::providers::TranslationProvider;
    use assert_json_diff::assert_json_include;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(text: &str) -> Value {
        json!({ "candidates": [{ "content": { "parts": [{ "text": text }] } }] })
    }

    async fn keyed(server: &MockServer) -> LlmTranslator<GeminiBackend> {
        let backend = GeminiBackend::new(HttpClient::new().unwrap(), &server.uri());
        let translator = LlmTranslator::new(backend);
        translator.set_api_key(Some("test-key".to_string())).await;
        translator
    }

    #[test]
    fn test_request_body_shape() {
        let prompt = Prompt {
            system: "sys".to_string(),
            user: "usr".to_string(),
        };
        let params = AiParameters {
            presence_penalty: 0.5,
            ..AiParameters::default()
        };
        let body = GeminiBackend::request_body(&prompt, &params);

        assert_json_include!(
            actual: body.clone(),
            expected: json!({
                "systemInstruction": { "parts": [{ "text": "sys" }] },
                "contents": [{ "role": "user", "parts": [{ "text": "usr" }] }],
                "generationConfig": { "topP": 0.95, "maxOutputTokens": 2048, "presencePenalty": 0.5 }
            })
        );
        assert!(body["generationConfig"].get("frequencyPenalty").is_none());
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let json = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(matches!(
            parse_response(&json),
            Err(TranslationError::InvalidResponseError { .. })
        ));
    }

    #[tokio::test]
    async fn test_translate_uses_default_model() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-flash:generateContent"))
            .and(query_param("key", "test-key"))
            .and(body_partial_json(json!({ "generationConfig": { "temperature": 0.7 } })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(reply("Translation: Olá mundo\n(Detected language: English)")),
            )
            .expect(1)
            .mount(&server)
            .await;

        let request = TranslationRequest::new("Hello world", "auto", "pt", Tone::Neutral);
        let result = keyed(&server).await.translate(&request).await;

        assert_eq!(result.translated_text(), Some("Olá mundo"));
        assert_eq!(result.detected_language(), Some("English"));
    }

    #[tokio::test]
    async fn test_model_override() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1beta/models/gemini-1.5-pro:generateContent"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("Hallo")))
            .expect(1)
            .mount(&server)
            .await;

        let translator = keyed(&server).await;
        translator
            .set_ai_parameters(AiParameters {
                model_version: "gemini-1.5-pro".to_string(),
                ..AiParameters::default()
            })
            .await;

        let request = TranslationRequest::new("Hello", "en", "de", Tone::Casual);
        let result = translator.translate(&request).await;
        assert_eq!(result.translated_text(), Some("Hallo"));
    }

    #[tokio::test]
    async fn test_implausible_answer_retried_twice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(reply("The book is on the kitchen table today")),
            )
            .expect(3)
            .mount(&server)
            .await;

        let request = TranslationRequest::new(
            "The book is on the kitchen table today",
            "en",
            "pt",
            Tone::Neutral,
        );
        let result = keyed(&server).await.translate(&request).await;
        assert_eq!(result.translated_text(), Some("The book is on the kitchen table today"));
    }

    #[tokio::test]
    async fn test_quota_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": { "code": 429, "status": "RESOURCE_EXHAUSTED" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = TranslationRequest::new("Hello", "en", "pt", Tone::Neutral);
        let result = keyed(&server).await.translate(&request).await;
        assert!(result.error_message().unwrap().starts_with("API quota exceeded"));
    }

    #[tokio::test]
    async fn test_falls_back_to_free_without_key() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/translate_a/single"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!([[["Olá", "Hello", null]], null, "en"])),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("unused")))
            .expect(0)
            .mount(&server)
            .await;

        let http = HttpClient::new().unwrap();
        let translator = LlmTranslator::new(GeminiBackend::new(http.clone(), &server.uri()))
            .with_fallback(FreeTranslator::new(http, &server.uri()));

        let request = TranslationRequest::new("Hello", "auto", "pt", Tone::Neutral);
        let result = translator.translate(&request).await;
        assert_eq!(result.translated_text(), Some("Olá"));
        assert_eq!(result.detected_language(), Some("English"));
    }
}
