//! Collaborators the orchestrator calls back into

use async_trait::async_trait;

use crate::core::models::TranslationResult;

/// Blocking "send it anyway?" confirmation for oversize text
#[async_trait]
pub trait OversizePrompt: Send + Sync {
    async fn confirm_oversize(&self, estimated_tokens: usize, limit: usize) -> bool;
}

/// Never sends oversize text
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclineOversize;

#[async_trait]
impl OversizePrompt for DeclineOversize {
    async fn confirm_oversize(&self, _estimated_tokens: usize, _limit: usize) -> bool {
        false
    }
}

/// Always sends oversize text
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptOversize;

#[async_trait]
impl OversizePrompt for AcceptOversize {
    async fn confirm_oversize(&self, _estimated_tokens: usize, _limit: usize) -> bool {
        true
    }
}

/// Best-effort side effects after a cycle. Implementations swallow their own failures.
pub trait Notifier: Send + Sync {
    fn translation_completed(&self, result: &TranslationResult);

    fn error(&self, message: &str);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopNotifier;

impl Notifier for NoopNotifier {
    fn translation_completed(&self, _result: &TranslationResult) {}

    fn error(&self, _message: &str) {}
}
