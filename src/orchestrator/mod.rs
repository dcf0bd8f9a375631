//! Translation orchestration pipeline.
//!
//! One cycle runs `Idle → Gating → CacheCheck → Translating → Applying → Idle`.
//! Failures end in `ErrorReported` and the cycle is over. A single-permit
//! semaphore keeps at most one backend call in flight; a cycle that cannot
//! get the permit quickly is dropped instead of queued.

pub mod events;
pub mod hooks;

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Mutex, RwLock, Semaphore};
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::clipboard::{ClipboardAccess, ClipboardChanged, ClipboardError};
use crate::core::cache::{CacheKey, TranslationCache, DEFAULT_CACHE_CAPACITY};
use crate::core::config::Endpoints;
use crate::core::errors::{Result, TranslationError};
use crate::core::language::{normalize_source, normalize_target, Tone, AUTO};
use crate::core::models::{
    AiParameters, MonitoringState, Statistics, TranslationRequest, TranslationResult,
    MIN_TEXT_CHARS,
};
use crate::core::stats::StatisticsTracker;
use crate::core::tokens::{estimate_tokens, exceeds_limit};
use crate::providers::{create_provider, ProviderKind, TranslationProvider};

pub use events::{CycleOutcome, CycleState, OrchestratorEvent, SkipReason};
pub use hooks::{AcceptOversize, DeclineOversize, NoopNotifier, Notifier, OversizePrompt};

/// How long a cycle waits for the translation guard
pub const GUARD_TIMEOUT: Duration = Duration::from_millis(100);

const EVENT_CAPACITY: usize = 64;

/// Everything `configure` can change, applied as one unit
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    pub backend: ProviderKind,
    pub api_key: Option<String>,
    pub ai_parameters: AiParameters,
    /// `"auto"` or a 2-letter code
    pub source_lang: String,
    pub target_lang: String,
    pub tone: Tone,
    pub token_limit_enabled: bool,
    pub max_tokens: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            backend: ProviderKind::default(),
            api_key: None,
            ai_parameters: AiParameters::default(),
            source_lang: AUTO.to_string(),
            target_lang: "en".to_string(),
            tone: Tone::Neutral,
            token_limit_enabled: true,
            max_tokens: 200,
        }
    }
}

impl OrchestratorConfig {
    fn normalized(mut self) -> Self {
        self.source_lang = normalize_source(&self.source_lang);
        self.target_lang = normalize_target(&self.target_lang);
        self.api_key = self.api_key.filter(|k| !k.trim().is_empty());
        self
    }

    /// Cached answers are not comparable across these
    fn invalidates_cache(&self, other: &Self) -> bool {
        self.backend != other.backend
            || self.api_key != other.api_key
            || self.ai_parameters != other.ai_parameters
            || self.source_lang != other.source_lang
            || self.target_lang != other.target_lang
            || self.tone != other.tone
    }
}

/// Builds the provider for a backend choice
pub type ProviderFactory =
    Arc<dyn Fn(ProviderKind) -> Result<Arc<dyn TranslationProvider>> + Send + Sync>;

/// Factory over the real HTTP backends
pub fn http_provider_factory(endpoints: Endpoints) -> ProviderFactory {
    Arc::new(move |kind| create_provider(kind, &endpoints))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleKind {
    /// Triggered by the bridge: unchanged gate, applied
    Clipboard,
    /// Explicit request: applied
    Manual,
    /// Result only: no clipboard write, no statistics
    Preview,
}

impl CycleKind {
    fn applies(self) -> bool {
        !matches!(self, CycleKind::Preview)
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    config: Arc<RwLock<OrchestratorConfig>>,
    provider: Arc<RwLock<Arc<dyn TranslationProvider>>>,
    factory: ProviderFactory,
    cache: Arc<Mutex<TranslationCache>>,
    last_text: Arc<Mutex<Option<String>>>,
    stats: StatisticsTracker,
    guard: Arc<Semaphore>,
    guard_timeout: Duration,
    monitoring: MonitoringState,
    clipboard: Arc<dyn ClipboardAccess>,
    prompt: Arc<dyn OversizePrompt>,
    notifier: Arc<dyn Notifier>,
    events: broadcast::Sender<OrchestratorEvent>,
}

impl Orchestrator {
    /// Create an orchestrator with monitoring paused and an empty cache
    pub async fn new(
        config: OrchestratorConfig,
        clipboard: Arc<dyn ClipboardAccess>,
        factory: ProviderFactory,
    ) -> Result<Self> {
        let config = config.normalized();
        let provider = factory(config.backend)?;
        provider.set_api_key(config.api_key.clone()).await;
        provider.set_ai_parameters(config.ai_parameters.clone()).await;

        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        info!(
            "Orchestrator ready: {} {} -> {} ({})",
            config.backend, config.source_lang, config.target_lang, config.tone
        );

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            provider: Arc::new(RwLock::new(provider)),
            factory,
            cache: Arc::new(Mutex::new(TranslationCache::new(DEFAULT_CACHE_CAPACITY))),
            last_text: Arc::new(Mutex::new(None)),
            stats: StatisticsTracker::default(),
            guard: Arc::new(Semaphore::new(1)),
            guard_timeout: GUARD_TIMEOUT,
            monitoring: MonitoringState::default(),
            clipboard,
            prompt: Arc::new(DeclineOversize),
            notifier: Arc::new(NoopNotifier),
            events,
        })
    }

    pub fn with_statistics(mut self, stats: Statistics) -> Self {
        self.stats = StatisticsTracker::new(stats);
        self
    }

    /// Share the switch with the clipboard bridge
    pub fn with_monitoring(mut self, monitoring: MonitoringState) -> Self {
        self.monitoring = monitoring;
        self
    }

    pub fn with_prompt(mut self, prompt: Arc<dyn OversizePrompt>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_guard_timeout(mut self, guard_timeout: Duration) -> Self {
        self.guard_timeout = guard_timeout;
        self
    }

    pub fn with_cache_capacity(mut self, capacity: usize) -> Self {
        self.cache = Arc::new(Mutex::new(TranslationCache::new(capacity)));
        self
    }

    /// Handle one debounced clipboard change
    pub async fn on_clipboard_changed(&self) -> CycleOutcome {
        if !self.monitoring.is_enabled() {
            debug!("Monitoring paused, ignoring clipboard change");
            return CycleOutcome::Disabled;
        }

        self.enter(CycleState::Gating);
        let text = match self.read_clipboard().await {
            Ok(Some(text)) => text,
            Ok(None) => return self.skip(SkipReason::Empty),
            Err(e) => {
                warn!("Failed to read clipboard: {}", e);
                self.report_error(&e.to_string(), false);
                self.enter(CycleState::Idle);
                return CycleOutcome::ClipboardUnavailable;
            }
        };

        self.run_cycle(text, CycleKind::Clipboard, None).await
    }

    /// Run `text` through the whole pipeline and apply the result
    pub async fn request_translate_now(&self, text: &str) -> CycleOutcome {
        self.enter(CycleState::Gating);
        self.run_cycle(text.to_string(), CycleKind::Manual, None).await
    }

    /// Translate without touching the clipboard or the statistics
    pub async fn preview(&self, text: &str) -> CycleOutcome {
        self.enter(CycleState::Gating);
        self.run_cycle(text.to_string(), CycleKind::Preview, None).await
    }

    /// Preview `text` once per tone, one after another
    pub async fn translate_all_tones(&self, text: &str) -> Vec<(Tone, CycleOutcome)> {
        let mut outcomes = Vec::with_capacity(Tone::ALL.len());
        for tone in Tone::ALL {
            self.enter(CycleState::Gating);
            let outcome = self
                .run_cycle(text.to_string(), CycleKind::Preview, Some(tone))
                .await;
            outcomes.push((tone, outcome));
        }
        outcomes
    }

    async fn run_cycle(&self, text: String, kind: CycleKind, tone: Option<Tone>) -> CycleOutcome {
        let config = self.config.read().await.clone();
        let tone = tone.unwrap_or(config.tone);

        if text.trim().is_empty() {
            return self.skip(SkipReason::Empty);
        }
        if text.trim().chars().count() < MIN_TEXT_CHARS {
            return self.skip(SkipReason::TooShort);
        }

        if kind == CycleKind::Clipboard {
            let mut last = self.last_text.lock().await;
            if last.as_deref() == Some(text.as_str()) {
                drop(last);
                return self.skip(SkipReason::Unchanged);
            }
            *last = Some(text.clone());
        }

        if exceeds_limit(&text, config.token_limit_enabled, config.max_tokens) {
            let estimated = estimate_tokens(&text);
            self.status(format!(
                "Text too long ({} tokens > {} limit)",
                estimated, config.max_tokens
            ));
            if !self.prompt.confirm_oversize(estimated, config.max_tokens).await {
                self.status("Translation cancelled");
                self.enter(CycleState::Idle);
                return CycleOutcome::Declined;
            }
        }

        if config.source_lang != AUTO && config.source_lang == config.target_lang {
            return self.skip(SkipReason::SameLanguage);
        }

        let request = TranslationRequest::new(
            text,
            config.source_lang.clone(),
            config.target_lang.clone(),
            tone,
        );
        let key = CacheKey::from(&request);

        self.enter(CycleState::CacheCheck);
        let cached = self.cache.lock().await.get(&key).cloned();
        if let Some(result) = cached {
            debug!("Cache hit for {}", key);
            return if kind.applies() {
                self.apply(result, false).await
            } else {
                self.enter(CycleState::Idle);
                CycleOutcome::Cached(result)
            };
        }

        let permit = match timeout(self.guard_timeout, Arc::clone(&self.guard).acquire_owned()).await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                debug!("Orchestrator disposed, dropping cycle");
                self.enter(CycleState::Idle);
                return CycleOutcome::Busy;
            }
            Err(_) => {
                self.status("Translation already in progress");
                self.enter(CycleState::Idle);
                return CycleOutcome::Busy;
            }
        };

        self.enter(CycleState::Translating);
        self.status("Translating...");
        let result = self.call_provider(&request, &config).await;
        drop(permit);

        if !result.is_success() {
            self.enter(CycleState::ErrorReported);
            let message = result.error_message().unwrap_or_default().to_string();
            self.report_error(&message, result.is_significant());
            self.notifier.error(&message);
            self.enter(CycleState::Idle);
            return CycleOutcome::Failed(result);
        }

        // a configure() during the call makes the answer stale
        if *self.config.read().await == config {
            self.cache.lock().await.insert(key, result.clone());
        } else {
            debug!("Configuration changed during translation, not caching");
        }

        if kind.applies() {
            self.apply(result, true).await
        } else {
            self.enter(CycleState::Idle);
            CycleOutcome::Translated(result)
        }
    }

    /// Call the active backend on its own task so a panic cannot unwind the cycle
    async fn call_provider(
        &self,
        request: &TranslationRequest,
        config: &OrchestratorConfig,
    ) -> TranslationResult {
        let provider = Arc::clone(&*self.provider.read().await);
        provider.set_ai_parameters(config.ai_parameters.clone()).await;

        let request = request.clone();
        match tokio::spawn(async move { provider.translate(&request).await }).await {
            Ok(result) => result,
            Err(e) => {
                error!("Translation task failed: {}", e);
                TranslationResult::from_error(&TranslationError::InternalError(e.to_string()))
            }
        }
    }

    async fn apply(&self, result: TranslationResult, counted: bool) -> CycleOutcome {
        self.enter(CycleState::Applying);

        let Some(text) = result.translated_text().map(str::to_string) else {
            self.enter(CycleState::Idle);
            return CycleOutcome::Failed(result);
        };

        if let Err(e) = self.write_clipboard(&text).await {
            warn!("Failed to write clipboard: {}", e);
            self.report_error(&e.to_string(), false);
            self.enter(CycleState::Idle);
            return CycleOutcome::ClipboardUnavailable;
        }

        // our own write comes back as a clipboard change
        *self.last_text.lock().await = Some(text);

        if counted {
            let today = self.stats.record_translation().await;
            info!("Translation applied ({} today)", today);
        }

        self.emit(OrchestratorEvent::TranslationApplied(result.clone()));
        self.status(if counted {
            "Translation completed"
        } else {
            "Translation applied from cache"
        });
        self.notifier.translation_completed(&result);
        self.enter(CycleState::Idle);

        if counted {
            CycleOutcome::Translated(result)
        } else {
            CycleOutcome::Cached(result)
        }
    }

    /// Apply a new configuration atomically.
    ///
    /// Changing backend, key, parameters, languages or tone clears the cache.
    pub async fn configure(&self, new: OrchestratorConfig) -> Result<()> {
        let new = new.normalized();
        let mut config = self.config.write().await;
        if *config == new {
            return Ok(());
        }

        if new.backend != config.backend {
            let provider = (self.factory)(new.backend)?;
            provider.set_api_key(new.api_key.clone()).await;
            provider.set_ai_parameters(new.ai_parameters.clone()).await;
            *self.provider.write().await = provider;
            info!("Switched backend to {}", new.backend);
        } else {
            let provider = Arc::clone(&*self.provider.read().await);
            if new.api_key != config.api_key {
                provider.set_api_key(new.api_key.clone()).await;
            }
            if new.ai_parameters != config.ai_parameters {
                provider.set_ai_parameters(new.ai_parameters.clone()).await;
            }
        }

        if config.invalidates_cache(&new) {
            self.cache.lock().await.clear();
            debug!("Translation cache cleared");
        }

        *config = new;
        Ok(())
    }

    pub fn set_monitoring_enabled(&self, enabled: bool) {
        if self.monitoring.set(enabled) {
            self.status(if enabled {
                "Monitoring enabled"
            } else {
                "Monitoring paused"
            });
        }
    }

    pub fn is_monitoring_enabled(&self) -> bool {
        self.monitoring.is_enabled()
    }

    pub fn monitoring(&self) -> MonitoringState {
        self.monitoring.clone()
    }

    pub async fn config(&self) -> OrchestratorConfig {
        self.config.read().await.clone()
    }

    pub async fn statistics(&self) -> Statistics {
        self.stats.snapshot().await
    }

    pub async fn cache_len(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub async fn is_cached(&self, key: &CacheKey) -> bool {
        self.cache.lock().await.contains(key)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrchestratorEvent> {
        self.events.subscribe()
    }

    /// Process bridge events until the sender side closes or `dispose` is called
    pub async fn run(&self, mut changes: mpsc::Receiver<ClipboardChanged>) {
        while let Some(change) = changes.recv().await {
            if self.guard.is_closed() {
                break;
            }
            let outcome = self.on_clipboard_changed().await;
            debug!(
                "Cycle for change observed {:?} ago ended: {:?}",
                change.observed_at.elapsed(),
                outcome
            );
            // releases the delivery slot
            drop(change);
        }
        debug!("Orchestrator loop finished");
    }

    /// Stop taking work; queued cycles end immediately
    pub fn dispose(&self) {
        self.monitoring.set(false);
        self.guard.close();
        info!("Orchestrator disposed");
    }

    async fn read_clipboard(&self) -> std::result::Result<Option<String>, ClipboardError> {
        let clipboard = Arc::clone(&self.clipboard);
        tokio::task::spawn_blocking(move || clipboard.get_text())
            .await
            .map_err(|e| ClipboardError::Access(e.to_string()))?
    }

    async fn write_clipboard(&self, text: &str) -> std::result::Result<(), ClipboardError> {
        let clipboard = Arc::clone(&self.clipboard);
        let text = text.to_string();
        tokio::task::spawn_blocking(move || clipboard.set_text(&text))
            .await
            .map_err(|e| ClipboardError::Access(e.to_string()))?
    }

    fn skip(&self, reason: SkipReason) -> CycleOutcome {
        debug!("Cycle skipped: {:?}", reason);
        self.status(reason.status());
        self.enter(CycleState::Idle);
        CycleOutcome::Skipped(reason)
    }

    fn enter(&self, state: CycleState) {
        debug!("Cycle state -> {}", state);
    }

    fn status(&self, message: impl Into<String>) {
        let message = message.into();
        debug!("Status: {}", message);
        self.emit(OrchestratorEvent::StatusChanged(message));
    }

    fn report_error(&self, message: &str, significant: bool) {
        warn!("Translation error: {}", message);
        self.emit(OrchestratorEvent::ErrorReported {
            message: message.to_string(),
            significant,
        });
        self.status(format!("Translation error: {}", message));
    }

    fn emit(&self, event: OrchestratorEvent) {
        // no subscribers is fine
        let _ = self.events.send(event);
    }
}
