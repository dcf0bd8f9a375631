//! Core data models for translation

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::core::errors::TranslationError;
use crate::core::language::Tone;

/// Minimum number of characters worth sending to a backend
pub const MIN_TEXT_CHARS: usize = 2;

/// Translation request, built once per orchestration cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    pub text: String,
    /// `"auto"` or a canonical 2-letter code
    pub source_lang: String,
    /// Always a canonical 2-letter code
    pub target_lang: String,
    pub tone: Tone,
}

impl TranslationRequest {
    pub fn new(
        text: impl Into<String>,
        source_lang: impl Into<String>,
        target_lang: impl Into<String>,
        tone: Tone,
    ) -> Self {
        Self {
            text: text.into(),
            source_lang: source_lang.into(),
            target_lang: target_lang.into(),
            tone,
        }
    }

    pub fn is_auto_source(&self) -> bool {
        self.source_lang == crate::core::language::AUTO
    }
}

/// Outcome of one translation attempt.
///
/// A result carries either a translated text or an error message, never both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TranslationResult {
    Success {
        translated_text: String,
        detected_language: Option<String>,
    },
    Failure {
        error_message: String,
        error_detail: Option<String>,
        /// Needs user action (missing key, quota, API error)
        #[serde(default)]
        significant: bool,
    },
}

impl TranslationResult {
    pub fn success(translated_text: impl Into<String>, detected_language: Option<String>) -> Self {
        TranslationResult::Success {
            translated_text: translated_text.into(),
            detected_language,
        }
    }

    pub fn failure(error_message: impl Into<String>, error_detail: Option<String>) -> Self {
        TranslationResult::Failure {
            error_message: error_message.into(),
            error_detail,
            significant: false,
        }
    }

    pub fn from_error(err: &TranslationError) -> Self {
        let detail = match err {
            TranslationError::ApiError { status, message } => format!("HTTP {}: {}", status, message),
            other => other.to_string(),
        };
        TranslationResult::Failure {
            error_message: err.user_message(),
            error_detail: Some(detail),
            significant: err.is_significant(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TranslationResult::Success { .. })
    }

    pub fn translated_text(&self) -> Option<&str> {
        match self {
            TranslationResult::Success { translated_text, .. } => Some(translated_text),
            TranslationResult::Failure { .. } => None,
        }
    }

    pub fn detected_language(&self) -> Option<&str> {
        match self {
            TranslationResult::Success { detected_language, .. } => detected_language.as_deref(),
            TranslationResult::Failure { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            TranslationResult::Failure { error_message, .. } => Some(error_message),
            TranslationResult::Success { .. } => None,
        }
    }

    pub fn is_significant(&self) -> bool {
        matches!(self, TranslationResult::Failure { significant: true, .. })
    }

    pub fn error_detail(&self) -> Option<&str> {
        match self {
            TranslationResult::Failure { error_detail, .. } => error_detail.as_deref(),
            TranslationResult::Success { .. } => None,
        }
    }
}

/// Sampling parameters handed to the active backend before every call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiParameters {
    /// 0.0 ..= 2.0
    pub temperature: f64,
    /// 0.0 ..= 1.0
    pub top_p: f64,
    pub frequency_penalty: f64,
    pub presence_penalty: f64,
    /// `"Default"` lets the provider pick its default model
    pub model_version: String,
}

impl Default for AiParameters {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            top_p: 0.95,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            model_version: DEFAULT_MODEL_VERSION.to_string(),
        }
    }
}

/// Sentinel model version meaning "provider default"
pub const DEFAULT_MODEL_VERSION: &str = "Default";

impl AiParameters {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(anyhow::anyhow!("temperature must be within 0.0..=2.0"));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(anyhow::anyhow!("top_p must be within 0.0..=1.0"));
        }
        Ok(())
    }

    /// Model id to send, if the user picked one explicitly
    pub fn model_override(&self) -> Option<&str> {
        let model = self.model_version.trim();
        if model.is_empty() || model.eq_ignore_ascii_case(DEFAULT_MODEL_VERSION) {
            None
        } else {
            Some(model)
        }
    }
}

/// Daily translation counter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Statistics {
    pub translations_today: u32,
    pub last_translation_date: Option<NaiveDate>,
}

impl Statistics {
    pub fn reset_if_needed(&mut self, today: NaiveDate) {
        if self.last_translation_date != Some(today) {
            self.translations_today = 0;
        }
    }

    pub fn record(&mut self, today: NaiveDate) {
        self.reset_if_needed(today);
        self.translations_today += 1;
        self.last_translation_date = Some(today);
    }
}

/// Shared on/off switch for clipboard monitoring
#[derive(Debug, Clone, Default)]
pub struct MonitoringState {
    enabled: Arc<AtomicBool>,
}

impl MonitoringState {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled: Arc::new(AtomicBool::new(enabled)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Returns `true` when the value actually changed
    pub fn set(&self, enabled: bool) -> bool {
        self.enabled.swap(enabled, Ordering::SeqCst) != enabled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_result_carries_exactly_one_side() {
        let ok = TranslationResult::success("Olá", Some("English".to_string()));
        assert!(ok.is_success());
        assert_eq!(ok.translated_text(), Some("Olá"));
        assert_eq!(ok.error_message(), None);

        let err = TranslationResult::from_error(&TranslationError::ApiError {
            status: 503,
            message: "unavailable".to_string(),
        });
        assert!(!err.is_success());
        assert_eq!(err.translated_text(), None);
        assert_eq!(err.error_message(), Some("API error: HTTP 503"));
        assert_eq!(err.error_detail(), Some("HTTP 503: unavailable"));
        assert!(err.is_significant());
        assert!(!TranslationResult::from_error(&TranslationError::TimeoutError).is_significant());
    }

    #[test]
    fn test_statistics_reset_on_new_day() {
        let monday = NaiveDate::from_ymd_opt(2024, 5, 6).unwrap();
        let tuesday = NaiveDate::from_ymd_opt(2024, 5, 7).unwrap();

        let mut stats = Statistics::default();
        stats.record(monday);
        stats.record(monday);
        assert_eq!(stats.translations_today, 2);

        stats.record(tuesday);
        assert_eq!(stats.translations_today, 1);
        assert_eq!(stats.last_translation_date, Some(tuesday));
    }

    #[test]
    fn test_ai_parameter_ranges() {
        let mut params = AiParameters::default();
        assert!(params.validate().is_ok());
        assert_eq!(params.model_override(), None);

        params.temperature = 2.5;
        assert!(params.validate().is_err());

        params.temperature = 1.0;
        params.model_version = "gpt-4o-mini".to_string();
        assert_eq!(params.model_override(), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_monitoring_state_idempotent() {
        let state = MonitoringState::new(false);
        let shared = state.clone();
        assert!(state.set(true));
        assert!(!state.set(true));
        assert!(shared.is_enabled());
    }
}
