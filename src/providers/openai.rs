//! OpenAI chat completions backend

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::core::client::HttpClient;
use crate::core::errors::{Result, TranslationError};
use crate::core::models::AiParameters;
use crate::providers::llm::{Completion, CompletionBackend};
use crate::providers::prompt::Prompt;
use crate::providers::ProviderKind;

pub const DEFAULT_OPENAI_MODEL: &str = "gpt-3.5-turbo";

const TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TOKENS: u32 = 2048;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct Message {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Clone)]
pub struct OpenAiBackend {
    http: HttpClient,
    base_url: String,
}

impl OpenAiBackend {
    pub fn new(http: HttpClient, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn request_body(prompt: &Prompt, params: &AiParameters) -> Value {
        json!({
            "model": params.model_override().unwrap_or(DEFAULT_OPENAI_MODEL),
            "messages": [
                { "role": "system", "content": prompt.system },
                { "role": "user", "content": prompt.user },
            ],
            "temperature": params.temperature,
            "top_p": params.top_p,
            "frequency_penalty": params.frequency_penalty,
            "presence_penalty": params.presence_penalty,
            "max_tokens": MAX_TOKENS,
        })
    }
}

fn parse_response(json: Value) -> Result<String> {
    let response: ChatResponse =
        serde_json::from_value(json).map_err(|e| TranslationError::InvalidResponseError {
            message: e.to_string(),
        })?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| TranslationError::InvalidResponseError {
            message: "missing choices[0].message.content".to_string(),
        })
}

#[async_trait]
impl CompletionBackend for OpenAiBackend {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn complete(
        &self,
        prompt: &Prompt,
        api_key: &str,
        params: &AiParameters,
    ) -> Result<Completion> {
        let url = format!("{}/v1/chat/completions", self.base_url);
        let body = Self::request_body(prompt, params);
        debug!("Calling OpenAI model {}", body["model"]);

        let request = self.http.post(&url).bearer_auth(api_key).json(&body);
        let json = self.http.send_json(request, TIMEOUT).await?;
        parse_response(json).map(Completion::text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::language::Tone;
    use crate::core::models::TranslationRequest;
    use crate::providers::llm::LlmTranslator;
    use crate::providers::TranslationProvider;
    use assert_json_diff::assert_json_eq;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reply(text: &str) -> Value {
        json!({ "choices": [{ "message": { "role": "assistant", "content": text } }] })
    }

    #[test]
    fn test_request_body() {
        let prompt = Prompt {
            system: "sys".to_string(),
            user: "usr".to_string(),
        };
        let body = OpenAiBackend::request_body(&prompt, &AiParameters::default());

        assert_json_eq!(
            body,
            json!({
                "model": "gpt-3.5-turbo",
                "messages": [
                    { "role": "system", "content": "sys" },
                    { "role": "user", "content": "usr" }
                ],
                "temperature": 0.7,
                "top_p": 0.95,
                "frequency_penalty": 0.0,
                "presence_penalty": 0.0,
                "max_tokens": 2048
            })
        );
    }

    #[test]
    fn test_parse_missing_content() {
        let json = json!({ "choices": [] });
        assert!(parse_response(json).is_err());
    }

    #[tokio::test]
    async fn test_translate_with_bearer_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({ "model": "gpt-3.5-turbo" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("\"Bonjour\"")))
            .expect(1)
            .mount(&server)
            .await;

        let translator =
            LlmTranslator::new(OpenAiBackend::new(HttpClient::new().unwrap(), &server.uri()));
        translator.set_api_key(Some("sk-test".to_string())).await;

        let request = TranslationRequest::new("Hello", "en", "fr", Tone::Formal);
        let result = translator.translate(&request).await;

        assert_eq!(result.translated_text(), Some("Bonjour"));
        assert_eq!(result.detected_language(), Some("English"));
    }

    #[tokio::test]
    async fn test_missing_key_never_calls_api() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(reply("unused")))
            .expect(0)
            .mount(&server)
            .await;

        let translator =
            LlmTranslator::new(OpenAiBackend::new(HttpClient::new().unwrap(), &server.uri()));
        translator.set_api_key(Some("   ".to_string())).await;

        let request = TranslationRequest::new("Hello", "en", "fr", Tone::Neutral);
        let result = translator.translate(&request).await;
        assert_eq!(
            result.error_message(),
            Some("OpenAI API key is not configured. Add one with `--api-key` or in the settings file.")
        );
    }

    #[tokio::test]
    async fn test_server_error_detail() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let translator =
            LlmTranslator::new(OpenAiBackend::new(HttpClient::new().unwrap(), &server.uri()));
        translator.set_api_key(Some("sk-test".to_string())).await;

        let request = TranslationRequest::new("Hello", "en", "fr", Tone::Neutral);
        let result = translator.translate(&request).await;
        assert_eq!(result.error_message(), Some("API error: HTTP 500"));
        assert_eq!(result.error_detail(), Some("HTTP 500: boom"));
    }
}
