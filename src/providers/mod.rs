//! Translation backends

pub mod cleaning;
pub mod free;
pub mod gemini;
pub mod llm;
pub mod openai;
pub mod plausibility;
pub mod prompt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use crate::core::client::HttpClient;
use crate::core::config::Endpoints;
use crate::core::errors::Result;
use crate::core::models::{AiParameters, TranslationRequest, TranslationResult};

pub use free::FreeTranslator;
pub use gemini::GeminiBackend;
pub use llm::{Completion, CompletionBackend, LlmTranslator};
pub use openai::OpenAiBackend;

/// Which backend the orchestrator talks to
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    #[serde(alias = "open_ai")]
    OpenAi,
    Free,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "Gemini",
            ProviderKind::OpenAi => "OpenAI",
            ProviderKind::Free => "Free",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "openai" | "open_ai" | "gpt" | "chatgpt" => Ok(ProviderKind::OpenAi),
            "free" => Ok(ProviderKind::Free),
            other => Err(format!("unknown translation service: {}", other)),
        }
    }
}

/// A translation backend as seen by the orchestrator.
///
/// `translate` never fails outright; provider errors come back as
/// [`TranslationResult::Failure`].
#[async_trait]
pub trait TranslationProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    async fn set_api_key(&self, api_key: Option<String>);

    async fn set_ai_parameters(&self, params: AiParameters);

    async fn translate(&self, request: &TranslationRequest) -> TranslationResult;
}

/// Build the provider for `kind` against the given endpoints
pub fn create_provider(
    kind: ProviderKind,
    endpoints: &Endpoints,
) -> Result<Arc<dyn TranslationProvider>> {
    let http = HttpClient::new()?;

    let provider: Arc<dyn TranslationProvider> = match kind {
        ProviderKind::Gemini => {
            let fallback = FreeTranslator::new(http.clone(), &endpoints.free);
            Arc::new(
                LlmTranslator::new(GeminiBackend::new(http, &endpoints.gemini))
                    .with_fallback(fallback),
            )
        }
        ProviderKind::OpenAi => {
            Arc::new(LlmTranslator::new(OpenAiBackend::new(http, &endpoints.openai)))
        }
        ProviderKind::Free => Arc::new(FreeTranslator::new(http, &endpoints.free)),
    };

    Ok(provider)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("Gemini".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!("google".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("free".parse::<ProviderKind>().unwrap(), ProviderKind::Free);
        assert!("deepl".parse::<ProviderKind>().is_err());
    }

    #[test]
    fn test_provider_kind_serde() {
        assert_eq!(serde_json::to_string(&ProviderKind::OpenAi).unwrap(), "\"openai\"");
        let kind: ProviderKind = serde_json::from_str("\"gemini\"").unwrap();
        assert_eq!(kind, ProviderKind::Gemini);
    }

    #[test]
    fn test_create_provider_kinds() {
        let endpoints = Endpoints::default();
        for kind in [ProviderKind::Gemini, ProviderKind::OpenAi, ProviderKind::Free] {
            let provider = create_provider(kind, &endpoints).unwrap();
            assert_eq!(provider.kind(), kind);
        }
    }
}
