//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::core::language::{normalize_source, normalize_target, Tone};
use crate::core::models::{AiParameters, Statistics};
use crate::orchestrator::OrchestratorConfig;
use crate::providers::ProviderKind;

/// Folder name under the platform config directory
const CONFIG_FOLDER: &str = "ClipboardTranslator";
const CONFIG_FILE: &str = "settings.json";

/// Prefix for environment overrides, e.g. `CLIPTRANS_MAX_TOKENS_LIMIT=500`
const ENV_PREFIX: &str = "CLIPTRANS";

/// Base URLs of the translation backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub gemini: String,
    pub openai: String,
    pub free: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            gemini: "https://generativelanguage.googleapis.com".to_string(),
            openai: "https://api.openai.com".to_string(),
            free: "https://translate.googleapis.com".to_string(),
        }
    }
}

/// Persisted application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub preferred_service: ProviderKind,
    #[serde(alias = "google_api_key")]
    pub gemini_api_key: String,
    pub openai_api_key: String,
    pub default_source_language: String,
    pub default_target_language: String,
    pub default_tone: String,
    pub enable_token_limit: bool,
    pub max_tokens_limit: usize,
    pub play_sound_on_translation: bool,
    pub show_notification_popup: bool,
    pub monitoring_enabled_on_start: bool,
    pub ai_parameters: AiParameters,
    pub statistics: Statistics,
    pub endpoints: Endpoints,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            preferred_service: ProviderKind::Gemini,
            gemini_api_key: String::new(),
            openai_api_key: String::new(),
            default_source_language: "Auto Detect".to_string(),
            default_target_language: "English".to_string(),
            default_tone: "Neutral".to_string(),
            enable_token_limit: true,
            max_tokens_limit: 200,
            play_sound_on_translation: false,
            show_notification_popup: true,
            monitoring_enabled_on_start: false,
            ai_parameters: AiParameters::default(),
            statistics: Statistics::default(),
            endpoints: Endpoints::default(),
        }
    }
}

impl Settings {
    /// Default settings file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(CONFIG_FOLDER)
            .join(CONFIG_FILE)
    }

    /// Load from the settings file layered with `CLIPTRANS_*` environment overrides
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let layered = config::Config::builder()
            .add_source(
                config::File::from(path)
                    .format(config::FileFormat::Json)
                    .required(false),
            )
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut settings: Self = layered.try_deserialize()?;
        settings.apply_env_keys();
        settings.validate()?;

        info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Load settings, creating the file with defaults when it does not exist.
    ///
    /// A broken file is reported and replaced by defaults in memory only.
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            let mut settings = Self::default();
            if let Err(e) = settings.to_file(path) {
                warn!("Failed to write default settings to {}: {}", path.display(), e);
            }
            settings.apply_env_keys();
            return settings;
        }

        match Self::load(path) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Failed to load settings from {}: {}, using defaults", path.display(), e);
                let mut settings = Self::default();
                settings.apply_env_keys();
                settings
            }
        }
    }

    /// Load from JSON file without environment layering
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let settings: Self = serde_json::from_str(&content)?;
        Ok(settings)
    }

    /// Save settings to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Write only the statistics back, leaving the rest of the stored file alone
    pub fn persist_statistics(path: &Path, statistics: &Statistics) -> anyhow::Result<()> {
        let mut stored = if path.exists() {
            Self::from_file(path)?
        } else {
            Self::default()
        };
        stored.statistics = statistics.clone();
        stored.to_file(path)
    }

    /// Fill empty keys from `GEMINI_API_KEY` / `OPENAI_API_KEY`
    fn apply_env_keys(&mut self) {
        if self.gemini_api_key.is_empty() {
            self.gemini_api_key = std::env::var("GEMINI_API_KEY").unwrap_or_default();
        }
        if self.openai_api_key.is_empty() {
            self.openai_api_key = std::env::var("OPENAI_API_KEY").unwrap_or_default();
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        self.ai_parameters.validate()?;

        if self.enable_token_limit && self.max_tokens_limit == 0 {
            return Err(anyhow::anyhow!("max_tokens_limit must be greater than 0"));
        }

        for (name, url) in [
            ("gemini", &self.endpoints.gemini),
            ("openai", &self.endpoints.openai),
            ("free", &self.endpoints.free),
        ] {
            if url.is_empty() {
                return Err(anyhow::anyhow!("{} endpoint is required", name));
            }
        }

        Ok(())
    }

    /// API key of the preferred service, if one is set
    pub fn active_api_key(&self) -> Option<String> {
        let key = match self.preferred_service {
            ProviderKind::Gemini => &self.gemini_api_key,
            ProviderKind::OpenAi => &self.openai_api_key,
            ProviderKind::Free => return None,
        };
        let key = key.trim();
        (!key.is_empty()).then(|| key.to_string())
    }

    /// Store a key for the preferred service
    pub fn set_active_api_key(&mut self, key: impl Into<String>) {
        match self.preferred_service {
            ProviderKind::Gemini => self.gemini_api_key = key.into(),
            ProviderKind::OpenAi => self.openai_api_key = key.into(),
            ProviderKind::Free => warn!("The free service does not use an API key"),
        }
    }

    /// Snapshot consumed by `Orchestrator::configure`
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            backend: self.preferred_service,
            api_key: self.active_api_key(),
            ai_parameters: self.ai_parameters.clone(),
            source_lang: normalize_source(&self.default_source_language),
            target_lang: normalize_target(&self.default_target_language),
            tone: Tone::normalize(&self.default_tone),
            token_limit_enabled: self.enable_token_limit,
            max_tokens: self.max_tokens_limit,
        }
    }

    /// Copy with API keys masked, for display
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        copy.gemini_api_key = mask(&copy.gemini_api_key);
        copy.openai_api_key = mask(&copy.openai_api_key);
        copy
    }
}

fn mask(key: &str) -> String {
    let count = key.chars().count();
    if count == 0 {
        return String::new();
    }
    if count <= 8 {
        return "*".repeat(count);
    }
    let head: String = key.chars().take(4).collect();
    let tail: String = key.chars().skip(count - 4).collect();
    format!("{}…{}", head, tail)
}
