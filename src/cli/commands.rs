//! CLI command definitions and handlers

use async_trait::async_trait;
use clap::Subcommand;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::clipboard::{ClipboardListener, SystemClipboard};
use crate::core::config::Settings;
use crate::core::models::MonitoringState;
use crate::notification::DesktopNotifier;
use crate::orchestrator::{
    http_provider_factory, CycleOutcome, Orchestrator, OrchestratorEvent, OversizePrompt,
};
use crate::providers::ProviderKind;

/// Sentence used by `check`
const CHECK_SAMPLE: &str = "Hello, this is a connection test.";

/// Pending clipboard changes; more than this are dropped
const CHANGE_QUEUE: usize = 4;

/// Commands for Clipboard Translator
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Watch the clipboard and replace copied text with its translation
    Watch {
        /// Start with monitoring enabled
        #[arg(long)]
        enabled: bool,

        /// Source language (name or code, "auto" to detect)
        #[arg(long)]
        source: Option<String>,

        /// Target language (name or code)
        #[arg(long)]
        target: Option<String>,

        /// Tone: neutral, formal, casual, technical or professional
        #[arg(long)]
        tone: Option<String>,

        /// Translation service: gemini, openai or free
        #[arg(long)]
        service: Option<ProviderKind>,
    },

    /// Translate text and put the result on the clipboard
    Translate {
        /// Text to translate
        text: String,
    },

    /// Translate text in every tone
    Tones {
        /// Text to translate
        text: String,
    },

    /// Test the connection to the configured service
    Check,

    /// Inspect settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Print the effective settings with keys masked
    Show,
    /// Print the settings file location
    Path,
}

/// Asks on the terminal before sending oversize text
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalPrompt;

#[async_trait]
impl OversizePrompt for TerminalPrompt {
    async fn confirm_oversize(&self, estimated_tokens: usize, limit: usize) -> bool {
        let question = format!(
            "Text is about {} tokens (limit {}). Translate anyway? [y/N] ",
            estimated_tokens, limit
        );

        tokio::task::spawn_blocking(move || {
            print!("{}", question);
            let _ = io::stdout().flush();

            let mut answer = String::new();
            if io::stdin().read_line(&mut answer).is_err() {
                return false;
            }
            matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
        })
        .await
        .unwrap_or(false)
    }
}

/// What a line typed while watching asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Pause,
    Resume,
    Toggle,
    Status,
    Help,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_lowercase().as_str() {
            "p" | "pause" => Some(ConsoleCommand::Pause),
            "r" | "resume" => Some(ConsoleCommand::Resume),
            "t" | "toggle" => Some(ConsoleCommand::Toggle),
            "s" | "status" => Some(ConsoleCommand::Status),
            "h" | "help" | "?" => Some(ConsoleCommand::Help),
            _ => None,
        }
    }
}

const CONSOLE_HELP: &str = "   Type p to pause, r to resume, t to toggle, s for status.";

#[derive(Debug, Default)]
struct PromptSlot {
    waiting: Option<oneshot::Sender<String>>,
    /// Console input ended; nobody can answer any more
    closed: bool,
}

/// Oversize confirmation answered through the watch console.
///
/// The console task hands the next typed line to a waiting question.
#[derive(Debug, Clone, Default)]
pub struct ConsolePrompt {
    slot: Arc<StdMutex<PromptSlot>>,
}

impl ConsolePrompt {
    fn slot(&self) -> std::sync::MutexGuard<'_, PromptSlot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Give `line` to a waiting question; returns it back if nobody asked
    fn answer(&self, line: String) -> Option<String> {
        let waiting = self.slot().waiting.take();
        match waiting {
            Some(sender) => sender.send(line).err(),
            None => Some(line),
        }
    }

    /// Decline the waiting question and every later one
    fn close(&self) {
        let mut slot = self.slot();
        slot.closed = true;
        slot.waiting = None;
    }
}

#[async_trait]
impl OversizePrompt for ConsolePrompt {
    async fn confirm_oversize(&self, estimated_tokens: usize, limit: usize) -> bool {
        let rx = {
            let mut slot = self.slot();
            if slot.closed {
                return false;
            }
            let (tx, rx) = oneshot::channel();
            slot.waiting = Some(tx);
            rx
        };

        print!(
            "Text is about {} tokens (limit {}). Translate anyway? [y/N] ",
            estimated_tokens, limit
        );
        let _ = io::stdout().flush();

        match rx.await {
            Ok(answer) => matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"),
            Err(_) => false,
        }
    }
}

/// Read stdin lines on a detached thread; the thread ends with the process
fn spawn_console_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        warn!("Console input unavailable: {}", e);
    }
    rx
}

fn apply_console_command(orchestrator: &Orchestrator, command: ConsoleCommand) {
    match command {
        ConsoleCommand::Pause => orchestrator.set_monitoring_enabled(false),
        ConsoleCommand::Resume => orchestrator.set_monitoring_enabled(true),
        ConsoleCommand::Toggle => {
            orchestrator.set_monitoring_enabled(!orchestrator.is_monitoring_enabled())
        }
        ConsoleCommand::Status | ConsoleCommand::Help => {}
    }

    match command {
        ConsoleCommand::Help => println!("{}", CONSOLE_HELP),
        _ if orchestrator.is_monitoring_enabled() => println!("▶️  Monitoring enabled"),
        _ => println!("⏸️  Monitoring paused"),
    }
}

/// Route typed lines to a pending question first, commands otherwise
async fn run_console(
    orchestrator: Orchestrator,
    mut lines: mpsc::UnboundedReceiver<String>,
    prompt: ConsolePrompt,
) {
    while let Some(line) = lines.recv().await {
        let Some(line) = prompt.answer(line) else {
            continue;
        };
        match ConsoleCommand::parse(&line) {
            Some(command) => apply_console_command(&orchestrator, command),
            None if line.trim().is_empty() => {}
            None => println!("Unknown command `{}`.{}", line.trim(), CONSOLE_HELP),
        }
    }
    debug!("Console input closed");
    prompt.close();
}

async fn build_orchestrator(
    settings: &Settings,
    prompt: Arc<dyn OversizePrompt>,
) -> anyhow::Result<Orchestrator> {
    let orchestrator = Orchestrator::new(
        settings.orchestrator_config(),
        Arc::new(SystemClipboard::new()),
        http_provider_factory(settings.endpoints.clone()),
    )
    .await?
    .with_statistics(settings.statistics.clone())
    .with_notifier(Arc::new(DesktopNotifier::from_settings(settings)))
    .with_prompt(prompt);

    Ok(orchestrator)
}

async fn save_statistics(orchestrator: &Orchestrator, settings_path: &Path) {
    let statistics = orchestrator.statistics().await;
    if let Err(e) = Settings::persist_statistics(settings_path, &statistics) {
        warn!("Failed to save statistics: {}", e);
    }
}

/// Print a finished cycle; failures become the command's error
fn report_outcome(outcome: &CycleOutcome) -> anyhow::Result<()> {
    match outcome {
        CycleOutcome::Translated(result) | CycleOutcome::Cached(result) => {
            println!("{}", result.translated_text().unwrap_or_default());
            if let Some(language) = result.detected_language() {
                println!("   Source: {}", language);
            }
            if matches!(outcome, CycleOutcome::Cached(_)) {
                println!("   (from cache)");
            }
            Ok(())
        }
        CycleOutcome::Failed(result) => {
            let message = result.error_message().unwrap_or("Translation failed");
            match result.error_detail() {
                Some(detail) => anyhow::bail!("{} ({})", message, detail),
                None => anyhow::bail!("{}", message),
            }
        }
        CycleOutcome::Skipped(reason) => {
            println!("⏭️  {}", reason.status());
            Ok(())
        }
        CycleOutcome::Declined => {
            println!("Translation cancelled");
            Ok(())
        }
        CycleOutcome::Busy => anyhow::bail!("Translation already in progress"),
        CycleOutcome::Disabled => {
            println!("Monitoring is paused");
            Ok(())
        }
        CycleOutcome::ClipboardUnavailable => anyhow::bail!("Clipboard is unavailable"),
    }
}

/// Handle watch command
pub async fn handle_watch(
    mut settings: Settings,
    settings_path: PathBuf,
    enabled: bool,
    source: Option<String>,
    target: Option<String>,
    tone: Option<String>,
    service: Option<ProviderKind>,
) -> anyhow::Result<()> {
    if let Some(source) = source {
        settings.default_source_language = source;
    }
    if let Some(target) = target {
        settings.default_target_language = target;
    }
    if let Some(tone) = tone {
        settings.default_tone = tone;
    }
    if let Some(service) = service {
        settings.preferred_service = service;
    }

    let monitoring = MonitoringState::new(enabled || settings.monitoring_enabled_on_start);
    let prompt = ConsolePrompt::default();
    let orchestrator = build_orchestrator(&settings, Arc::new(prompt.clone()))
        .await?
        .with_monitoring(monitoring.clone());

    let (changes_tx, changes_rx) = mpsc::channel(CHANGE_QUEUE);
    let mut listener = match ClipboardListener::spawn(monitoring.clone(), changes_tx) {
        Ok(listener) => listener,
        Err(e) => {
            warn!("Clipboard monitoring unavailable: {}", e);
            eprintln!("⚠️  Clipboard monitoring unavailable: {}", e);
            println!("   Use `translate <TEXT>` to translate text directly.");
            return Ok(());
        }
    };

    let config = orchestrator.config().await;
    info!(
        "Watching clipboard with {} ({} -> {}, {})",
        config.backend, config.source_lang, config.target_lang, config.tone
    );
    println!("📋 Watching clipboard. Press Ctrl-C to stop.");
    if !monitoring.is_enabled() {
        println!("   Monitoring is paused. Type r to start translating copied text.");
    }
    println!("{}", CONSOLE_HELP);

    let console = tokio::spawn(run_console(
        orchestrator.clone(),
        spawn_console_reader(),
        prompt,
    ));

    let reporter = {
        let orchestrator = orchestrator.clone();
        let settings_path = settings_path.clone();
        let mut events = orchestrator.subscribe();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(OrchestratorEvent::StatusChanged(status)) => info!("{}", status),
                    Ok(OrchestratorEvent::TranslationApplied(result)) => {
                        println!("✅ {}", result.translated_text().unwrap_or_default());
                        save_statistics(&orchestrator, &settings_path).await;
                    }
                    Ok(OrchestratorEvent::ErrorReported { message, significant }) => {
                        if significant {
                            eprintln!("❌ {}", message);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Missed {} orchestrator events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    };

    let runner = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.run(changes_rx).await })
    };

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    orchestrator.dispose();
    listener.shutdown();
    if let Err(e) = runner.await {
        warn!("Orchestrator loop ended abnormally: {}", e);
    }
    reporter.abort();
    console.abort();

    let statistics = orchestrator.statistics().await;
    println!("\n👋 Stopped. Translations today: {}", statistics.translations_today);

    Ok(())
}

/// Handle translate command
pub async fn handle_translate(
    settings: Settings,
    settings_path: PathBuf,
    text: String,
) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(&settings, Arc::new(TerminalPrompt)).await?;
    let outcome = orchestrator.request_translate_now(&text).await;

    if matches!(outcome, CycleOutcome::Translated(_)) {
        save_statistics(&orchestrator, &settings_path).await;
    }
    report_outcome(&outcome)
}

/// Handle tones command
pub async fn handle_tones(settings: Settings, text: String) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(&settings, Arc::new(TerminalPrompt)).await?;

    for (tone, outcome) in orchestrator.translate_all_tones(&text).await {
        match &outcome {
            CycleOutcome::Translated(result) | CycleOutcome::Cached(result) => {
                println!("{:>12}: {}", tone.as_str(), result.translated_text().unwrap_or_default());
            }
            CycleOutcome::Failed(result) => {
                println!("{:>12}: ❌ {}", tone.as_str(), result.error_message().unwrap_or_default());
            }
            CycleOutcome::Skipped(reason) => {
                println!("{}", reason.status());
                break;
            }
            other => println!("{:>12}: {:?}", tone.as_str(), other),
        }
    }

    Ok(())
}

/// Handle check command
pub async fn handle_check(settings: Settings) -> anyhow::Result<()> {
    let orchestrator = build_orchestrator(&settings, Arc::new(TerminalPrompt)).await?;
    let config = orchestrator.config().await;

    println!("🔌 Testing {} ({} -> {})", config.backend, config.source_lang, config.target_lang);

    match orchestrator.preview(CHECK_SAMPLE).await {
        CycleOutcome::Translated(result) | CycleOutcome::Cached(result) => {
            println!("✅ Connection OK");
            println!("   {}", result.translated_text().unwrap_or_default());
            Ok(())
        }
        CycleOutcome::Skipped(reason) => {
            println!("⏭️  {}", reason.status());
            Ok(())
        }
        other => report_outcome(&other),
    }
}

/// Handle config show command
pub fn handle_config_show(settings: &Settings) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(&settings.redacted())?);
    Ok(())
}

/// Handle config path command
pub fn handle_config_path(settings_path: &Path) -> anyhow::Result<()> {
    println!("{}", settings_path.display());
    Ok(())
}
