//! Shared translate algorithm for prompt-driven backends

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::core::errors::{Result, TranslationError};
use crate::core::language::{language_name, AUTO_DETECTED};
use crate::core::models::{AiParameters, TranslationRequest, TranslationResult};
use crate::providers::cleaning::{clean_response, extract_detected_language};
use crate::providers::free::FreeTranslator;
use crate::providers::plausibility::{is_plausible, MAX_PLAUSIBILITY_RETRIES};
use crate::providers::prompt::{build_prompt, Prompt};
use crate::providers::{ProviderKind, TranslationProvider};

/// Raw generated text plus any language the provider detected itself
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub text: String,
    pub detected_language: Option<String>,
}

impl Completion {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            detected_language: None,
        }
    }
}

/// Provider-specific request/response shape behind one call
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn complete(
        &self,
        prompt: &Prompt,
        api_key: &str,
        params: &AiParameters,
    ) -> Result<Completion>;
}

#[derive(Debug, Clone, Default)]
struct Credentials {
    api_key: Option<String>,
    params: AiParameters,
}

/// Translator for LLM backends with the plausibility retry loop
pub struct LlmTranslator<B> {
    backend: B,
    credentials: RwLock<Credentials>,
    fallback: Option<FreeTranslator>,
    max_retries: u32,
}

impl<B: CompletionBackend> LlmTranslator<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            credentials: RwLock::new(Credentials::default()),
            fallback: None,
            max_retries: MAX_PLAUSIBILITY_RETRIES,
        }
    }

    /// Delegate to the free endpoint when no key is configured
    pub fn with_fallback(mut self, fallback: FreeTranslator) -> Self {
        self.fallback = Some(fallback);
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    async fn translate_inner(&self, request: &TranslationRequest) -> Result<TranslationResult> {
        if request.text.trim().is_empty() {
            return Err(TranslationError::EmptyText);
        }

        let Credentials { api_key, params } = self.credentials.read().await.clone();
        let api_key = match api_key {
            Some(key) => key,
            None => match &self.fallback {
                Some(fallback) => {
                    info!("No {} key configured, using free endpoint", self.backend.kind());
                    return fallback.translate_inner(request).await;
                }
                None => {
                    return Err(TranslationError::MissingApiKey {
                        provider: self.backend.kind().to_string(),
                    })
                }
            },
        };

        let mut attempt = 0;
        let mut last_obtained: Option<(String, Option<String>)> = None;

        let (text, detected) = loop {
            let prompt = build_prompt(request, attempt);
            let completion = match self.backend.complete(&prompt, &api_key, &params).await {
                Ok(completion) => completion,
                Err(e) => match last_obtained.take() {
                    Some(obtained) => {
                        warn!("Retry attempt {} failed: {}, keeping previous result", attempt, e);
                        break obtained;
                    }
                    None => return Err(e),
                },
            };

            // annotations are only readable before cleaning
            let detected = if request.is_auto_source() {
                completion
                    .detected_language
                    .clone()
                    .or_else(|| extract_detected_language(&completion.text))
            } else {
                Some(language_name(&request.source_lang))
            };

            let cleaned = clean_response(&completion.text);
            if cleaned.is_empty() {
                return Err(TranslationError::InvalidResponseError {
                    message: "Empty translation in response".to_string(),
                });
            }

            if is_plausible(&cleaned, &request.target_lang) {
                if attempt > 0 {
                    info!("Translation accepted after {} retries", attempt);
                }
                break (cleaned, detected);
            }

            if attempt >= self.max_retries {
                warn!(
                    "Result still does not look like {} after {} retries, accepting it",
                    request.target_lang, attempt
                );
                break (cleaned, detected);
            }

            attempt += 1;
            debug!("Implausible result for {}, retry {}", request.target_lang, attempt);
            last_obtained = Some((cleaned, detected));
        };

        Ok(TranslationResult::success(
            text,
            Some(detected.unwrap_or_else(|| AUTO_DETECTED.to_string())),
        ))
    }
}

#[async_trait]
impl<B: CompletionBackend> TranslationProvider for LlmTranslator<B> {
    fn kind(&self) -> ProviderKind {
        self.backend.kind()
    }

    async fn set_api_key(&self, api_key: Option<String>) {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        self.credentials.write().await.api_key = api_key;
    }

    async fn set_ai_parameters(&self, params: AiParameters) {
        self.credentials.write().await.params = params;
    }

    async fn translate(&self, request: &TranslationRequest) -> TranslationResult {
        match self.translate_inner(request).await {
            Ok(result) => result,
            Err(e) => {
                warn!("{} translation failed: {}", self.backend.kind(), e);
                TranslationResult::from_error(&e)
            }
        }
    }
}
