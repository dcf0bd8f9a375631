//! Clipboard access and change notifications

pub mod bridge;
pub mod debounce;
pub mod listener;
#[cfg(windows)]
mod win32;

use thiserror::Error;

pub use bridge::{ClipboardBridge, ClipboardChanged, RawMessage, ViewerChain, WindowHandle};
pub use debounce::{Debouncer, DeliveryGate, DeliveryTicket};
pub use listener::ClipboardListener;

/// Clipboard read/write failures
#[derive(Error, Debug)]
pub enum ClipboardError {
    #[error("Clipboard is unavailable: {0}")]
    Unavailable(String),

    #[error("Clipboard access failed: {0}")]
    Access(String),
}

impl From<arboard::Error> for ClipboardError {
    fn from(err: arboard::Error) -> Self {
        match err {
            arboard::Error::ClipboardNotSupported => ClipboardError::Unavailable(err.to_string()),
            other => ClipboardError::Access(other.to_string()),
        }
    }
}

/// Viewer-chain registration failures. Never fatal to the host.
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Failed to join the clipboard viewer chain: {0}")]
    Registration(String),

    #[error("Clipboard monitoring is not supported on this platform")]
    Unsupported,

    #[error("Clipboard bridge is already initialized")]
    AlreadyInitialized,

    #[error("Clipboard listener thread failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Text clipboard as seen by the orchestrator
pub trait ClipboardAccess: Send + Sync {
    /// `Ok(None)` when the clipboard holds no text
    fn get_text(&self) -> Result<Option<String>, ClipboardError>;

    fn set_text(&self, text: &str) -> Result<(), ClipboardError>;
}

/// OS clipboard through `arboard`.
///
/// A handle is opened per call; holding one open blocks other applications
/// on some platforms.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl ClipboardAccess for SystemClipboard {
    fn get_text(&self) -> Result<Option<String>, ClipboardError> {
        let mut clipboard = arboard::Clipboard::new()?;
        match clipboard.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut clipboard = arboard::Clipboard::new()?;
        clipboard.set_text(text.to_string())?;
        Ok(())
    }
}
