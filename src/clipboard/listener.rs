//! Process-level clipboard listener

use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tracing::info;

use crate::clipboard::bridge::{ClipboardChanged, WindowHandle};
use crate::clipboard::BridgeError;
use crate::core::models::MonitoringState;

/// Owns the viewer-chain thread.
///
/// Dropping the listener leaves the chain.
pub struct ClipboardListener {
    window: Option<WindowHandle>,
    thread: Option<JoinHandle<()>>,
}

impl ClipboardListener {
    /// Start listening; events go to `sender` while `monitoring` is enabled
    #[cfg(windows)]
    pub fn spawn(
        monitoring: MonitoringState,
        sender: mpsc::Sender<ClipboardChanged>,
    ) -> Result<Self, BridgeError> {
        let (ready_tx, ready_rx) = std::sync::mpsc::channel();

        let thread = std::thread::Builder::new()
            .name("clipboard-listener".to_string())
            .spawn(move || crate::clipboard::win32::run_listener(monitoring, sender, ready_tx))?;

        let window = match ready_rx.recv() {
            Ok(Ok(window)) => window,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(e);
            }
            Err(_) => {
                let _ = thread.join();
                return Err(BridgeError::Registration(
                    "listener thread exited during startup".to_string(),
                ));
            }
        };

        info!("Clipboard listener started");
        Ok(Self {
            window: Some(window),
            thread: Some(thread),
        })
    }

    #[cfg(not(windows))]
    pub fn spawn(
        _monitoring: MonitoringState,
        _sender: mpsc::Sender<ClipboardChanged>,
    ) -> Result<Self, BridgeError> {
        Err(BridgeError::Unsupported)
    }

    pub fn shutdown(&mut self) {
        if let Some(window) = self.window.take() {
            #[cfg(windows)]
            crate::clipboard::win32::post_close(window);
            #[cfg(not(windows))]
            let _ = window;
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
            info!("Clipboard listener stopped");
        }
    }
}

impl Drop for ClipboardListener {
    fn drop(&mut self) {
        self.shutdown();
    }
}
