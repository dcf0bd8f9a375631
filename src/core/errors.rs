//! Custom error types for translation operations

use thiserror::Error;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// API request failed with a non-success status
    #[error("API error: {status} - {message}")]
    ApiError {
        status: u16,
        message: String,
    },

    /// Provider quota or rate limit exhausted
    #[error("Quota exceeded: {message}")]
    QuotaExceededError {
        message: String,
    },

    /// No API key configured for a provider that requires one
    #[error("Missing API key for {provider}")]
    MissingApiKey {
        provider: String,
    },

    /// Nothing to translate
    #[error("Text is empty")]
    EmptyText,

    /// Network error
    #[error("Network error: {message}")]
    NetworkError {
        message: String,
    },

    /// Invalid response from API
    #[error("Invalid response: {message}")]
    InvalidResponseError {
        message: String,
    },

    /// Request timeout
    #[error("Request timeout")]
    TimeoutError,

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        message: String,
    },

    /// Wrapper for anyhow errors
    #[error("Internal error: {0}")]
    InternalError(String),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl TranslationError {
    /// Short, user-facing text for status bars and dialogs.
    pub fn user_message(&self) -> String {
        match self {
            TranslationError::MissingApiKey { provider } => format!(
                "{} API key is not configured. Add one with `--api-key` or in the settings file.",
                provider
            ),
            TranslationError::QuotaExceededError { .. } => {
                "API quota exceeded. Wait a moment or check your plan and try again.".to_string()
            }
            TranslationError::ApiError { status, .. } => format!("API error: HTTP {}", status),
            TranslationError::TimeoutError => "The translation request timed out".to_string(),
            TranslationError::NetworkError { .. } | TranslationError::HttpError(_) => {
                "Network error while contacting the translation service".to_string()
            }
            TranslationError::InvalidResponseError { .. } | TranslationError::JsonError(_) => {
                "Unable to parse translation from response".to_string()
            }
            TranslationError::EmptyText => "Text is empty".to_string(),
            TranslationError::ConfigError { message } => message.clone(),
            TranslationError::InternalError(message) => format!("Translation error: {}", message),
        }
    }

    /// Failures the user has to act on get a blocking dialog, the rest only a status line.
    pub fn is_significant(&self) -> bool {
        matches!(
            self,
            TranslationError::MissingApiKey { .. }
                | TranslationError::QuotaExceededError { .. }
                | TranslationError::ApiError { .. }
        )
    }
}

impl From<anyhow::Error> for TranslationError {
    fn from(err: anyhow::Error) -> Self {
        TranslationError::InternalError(err.to_string())
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_message_is_distinct() {
        let quota = TranslationError::QuotaExceededError {
            message: "RESOURCE_EXHAUSTED".to_string(),
        };
        let api = TranslationError::ApiError {
            status: 500,
            message: "boom".to_string(),
        };

        assert_ne!(quota.user_message(), api.user_message());
        assert!(quota.user_message().contains("quota"));
        assert!(quota.is_significant());
    }

    #[test]
    fn test_missing_key_names_provider() {
        let err = TranslationError::MissingApiKey {
            provider: "OpenAI".to_string(),
        };
        assert!(err.user_message().starts_with("OpenAI API key is not configured"));
        assert!(!TranslationError::TimeoutError.is_significant());
    }
}
