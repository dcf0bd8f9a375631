//! Cycle states, outcomes and outbound events

use std::fmt;

use crate::core::models::TranslationResult;

/// Orchestration cycle state; every cycle ends back in `Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Idle,
    Gating,
    CacheCheck,
    Translating,
    Applying,
    ErrorReported,
}

impl fmt::Display for CycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CycleState::Idle => "Idle",
            CycleState::Gating => "Gating",
            CycleState::CacheCheck => "CacheCheck",
            CycleState::Translating => "Translating",
            CycleState::Applying => "Applying",
            CycleState::ErrorReported => "ErrorReported",
        };
        f.write_str(name)
    }
}

/// Why a cycle stopped at the gates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Empty,
    TooShort,
    Unchanged,
    SameLanguage,
}

impl SkipReason {
    pub fn status(&self) -> &'static str {
        match self {
            SkipReason::Empty => "Clipboard has no text",
            SkipReason::TooShort => "Text too short to translate",
            SkipReason::Unchanged => "Clipboard text unchanged",
            SkipReason::SameLanguage => "Source and target language are the same",
        }
    }
}

/// How a cycle ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// Monitoring is paused
    Disabled,
    Skipped(SkipReason),
    /// Oversize text the user chose not to send
    Declined,
    /// Another translation holds the guard
    Busy,
    Cached(TranslationResult),
    Translated(TranslationResult),
    Failed(TranslationResult),
    /// Clipboard could not be read or written
    ClipboardUnavailable,
}

impl CycleOutcome {
    /// Result of a cycle that reached the backend or the cache
    pub fn result(&self) -> Option<&TranslationResult> {
        match self {
            CycleOutcome::Cached(result)
            | CycleOutcome::Translated(result)
            | CycleOutcome::Failed(result) => Some(result),
            _ => None,
        }
    }

    pub fn translated_text(&self) -> Option<&str> {
        self.result().and_then(TranslationResult::translated_text)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, CycleOutcome::Cached(_) | CycleOutcome::Translated(_))
    }
}

/// Broadcast to UI-side observers
#[derive(Debug, Clone, PartialEq)]
pub enum OrchestratorEvent {
    StatusChanged(String),
    TranslationApplied(TranslationResult),
    ErrorReported { message: String, significant: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        let ok = CycleOutcome::Cached(TranslationResult::success("Olá", None));
        assert!(ok.is_success());
        assert_eq!(ok.translated_text(), Some("Olá"));

        let failed = CycleOutcome::Failed(TranslationResult::failure("boom", None));
        assert!(!failed.is_success());
        assert_eq!(failed.translated_text(), None);

        assert_eq!(CycleOutcome::Busy.result(), None);
    }
}
