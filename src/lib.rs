//! Clipboard Translator - translate copied text in place
//!
//! This library watches the system clipboard, translates newly copied text
//! through an AI backend (Gemini, OpenAI) or a keyless fallback, and writes
//! the result back to the clipboard.

#![cfg_attr(not(windows), forbid(unsafe_code))]

pub mod cli;
pub mod clipboard;
pub mod core;
pub mod notification;
pub mod orchestrator;
pub mod providers;

// Re-export key types for convenience
pub use crate::core::{
    config::Settings,
    errors::TranslationError,
    language::Tone,
    models::{TranslationRequest, TranslationResult},
};

pub use orchestrator::{CycleOutcome, Orchestrator, OrchestratorConfig};
pub use providers::ProviderKind;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
