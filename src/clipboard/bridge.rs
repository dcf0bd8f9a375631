//! Clipboard viewer-chain bridge.
//!
//! A participant in the viewer chain has two duties: relay every chain
//! message to the next viewer so other applications keep working, and turn
//! raw "clipboard changed" messages into debounced [`ClipboardChanged`]
//! events for the orchestrator. The OS side sits behind [`ViewerChain`] so
//! the message handling can be driven without a real window.

use std::time::Instant;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::clipboard::debounce::{Debouncer, DeliveryGate, DeliveryTicket, DELIVERY_TIMEOUT};
use crate::clipboard::BridgeError;
use crate::core::models::MonitoringState;

pub const WM_DRAWCLIPBOARD: u32 = 0x0308;
pub const WM_CHANGECBCHAIN: u32 = 0x030D;

/// Raw window handle value
pub type WindowHandle = isize;

/// Window message as delivered by the OS
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMessage {
    pub id: u32,
    pub wparam: usize,
    pub lparam: isize,
}

impl RawMessage {
    pub fn draw_clipboard() -> Self {
        Self {
            id: WM_DRAWCLIPBOARD,
            wparam: 0,
            lparam: 0,
        }
    }

    pub fn change_chain(removed: WindowHandle, replacement: WindowHandle) -> Self {
        Self {
            id: WM_CHANGECBCHAIN,
            wparam: removed as usize,
            lparam: replacement,
        }
    }
}

/// OS operations on the viewer chain
pub trait ViewerChain {
    /// Join the chain; returns the viewer that was first before us
    fn register(&mut self, window: WindowHandle) -> Result<Option<WindowHandle>, BridgeError>;

    fn unregister(&mut self, window: WindowHandle, next: Option<WindowHandle>);

    fn forward(&self, target: WindowHandle, message: &RawMessage);
}

/// One debounced clipboard change.
///
/// The event occupies the delivery slot until it is dropped.
#[derive(Debug)]
pub struct ClipboardChanged {
    pub observed_at: Instant,
    _ticket: DeliveryTicket,
}

pub struct ClipboardBridge<C: ViewerChain> {
    chain: C,
    window: Option<WindowHandle>,
    next_viewer: Option<WindowHandle>,
    monitoring: MonitoringState,
    debouncer: Debouncer,
    gate: DeliveryGate,
    sender: mpsc::Sender<ClipboardChanged>,
}

impl<C: ViewerChain> ClipboardBridge<C> {
    pub fn new(chain: C, monitoring: MonitoringState, sender: mpsc::Sender<ClipboardChanged>) -> Self {
        Self {
            chain,
            window: None,
            next_viewer: None,
            monitoring,
            debouncer: Debouncer::default(),
            gate: DeliveryGate::new(),
            sender,
        }
    }

    pub fn with_debouncer(mut self, debouncer: Debouncer) -> Self {
        self.debouncer = debouncer;
        self
    }

    /// Join the viewer chain with `window`.
    ///
    /// On error the bridge stays unlinked and the caller carries on without
    /// monitoring.
    pub fn initialize(&mut self, window: WindowHandle) -> Result<(), BridgeError> {
        if self.window.is_some() {
            return Err(BridgeError::AlreadyInitialized);
        }

        match self.chain.register(window) {
            Ok(next) => {
                self.window = Some(window);
                self.next_viewer = next;
                info!("Joined clipboard viewer chain (next viewer: {:?})", next);
                Ok(())
            }
            Err(e) => {
                warn!("Clipboard monitoring unavailable: {}", e);
                Err(e)
            }
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.window.is_some()
    }

    pub fn next_viewer(&self) -> Option<WindowHandle> {
        self.next_viewer
    }

    pub fn handle_message(&mut self, message: &RawMessage) -> bool {
        self.handle_message_at(message, Instant::now())
    }

    /// Returns `true` when the message belongs to the viewer chain
    pub fn handle_message_at(&mut self, message: &RawMessage, now: Instant) -> bool {
        match message.id {
            WM_DRAWCLIPBOARD => {
                if let Some(next) = self.next_viewer {
                    self.chain.forward(next, message);
                }
                self.notify(now);
                true
            }
            WM_CHANGECBCHAIN => {
                let removed = message.wparam as WindowHandle;
                if self.next_viewer == Some(removed) {
                    let replacement = message.lparam;
                    self.next_viewer = (replacement != 0).then_some(replacement);
                    debug!("Next clipboard viewer replaced by {:?}", self.next_viewer);
                } else if let Some(next) = self.next_viewer {
                    self.chain.forward(next, message);
                }
                true
            }
            _ => false,
        }
    }

    fn notify(&mut self, now: Instant) -> bool {
        if !self.monitoring.is_enabled() {
            return false;
        }

        if !self.debouncer.would_accept(now) {
            debug!("Clipboard change debounced");
            return false;
        }

        let Some(ticket) = self.gate.try_enter(DELIVERY_TIMEOUT) else {
            warn!("Previous clipboard change still in progress, dropping notification");
            return false;
        };

        let event = ClipboardChanged {
            observed_at: now,
            _ticket: ticket,
        };
        match self.sender.try_send(event) {
            Ok(()) => {
                self.debouncer.mark_delivered(now);
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!("Clipboard event channel full, dropping notification");
                false
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Clipboard event receiver gone");
                false
            }
        }
    }

    /// Idempotent; the bridge stays in the chain while paused
    pub fn set_monitoring_enabled(&mut self, enabled: bool) {
        if self.monitoring.set(enabled) {
            info!(
                "Clipboard monitoring {}",
                if enabled { "enabled" } else { "paused" }
            );
        }
    }

    /// Leave the viewer chain. Safe to call more than once or before `initialize`.
    pub fn dispose(&mut self) {
        if let Some(window) = self.window.take() {
            let next = self.next_viewer.take();
            self.chain.unregister(window, next);
            info!("Left clipboard viewer chain");
        }
    }
}

impl<C: ViewerChain> Drop for ClipboardBridge<C> {
    fn drop(&mut self) {
        self.dispose();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Default)]
    struct ChainLog {
        forwarded: Vec<(WindowHandle, RawMessage)>,
        unregistered: Vec<(WindowHandle, Option<WindowHandle>)>,
    }

    #[derive(Clone)]
    struct MockChain {
        next: Option<WindowHandle>,
        fail: bool,
        log: Arc<Mutex<ChainLog>>,
    }

    impl MockChain {
        fn new(next: Option<WindowHandle>) -> Self {
            Self {
                next,
                fail: false,
                log: Arc::default(),
            }
        }
    }

    impl ViewerChain for MockChain {
        fn register(&mut self, _window: WindowHandle) -> Result<Option<WindowHandle>, BridgeError> {
            if self.fail {
                return Err(BridgeError::Registration("access denied".to_string()));
            }
            Ok(self.next)
        }

        fn unregister(&mut self, window: WindowHandle, next: Option<WindowHandle>) {
            self.log.lock().unwrap().unregistered.push((window, next));
        }

        fn forward(&self, target: WindowHandle, message: &RawMessage) {
            self.log.lock().unwrap().forwarded.push((target, *message));
        }
    }

    fn bridge(
        chain: MockChain,
        enabled: bool,
    ) -> (ClipboardBridge<MockChain>, mpsc::Receiver<ClipboardChanged>) {
        let (tx, rx) = mpsc::channel(8);
        let mut bridge = ClipboardBridge::new(chain, MonitoringState::new(enabled), tx);
        bridge.initialize(100).unwrap();
        (bridge, rx)
    }

    fn drain(rx: &mut mpsc::Receiver<ClipboardChanged>) -> usize {
        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        count
    }

    #[test]
    fn test_burst_within_window_delivers_once() {
        let (mut bridge, mut rx) = bridge(MockChain::new(None), true);
        let start = Instant::now();

        assert!(bridge.handle_message_at(&RawMessage::draw_clipboard(), start));
        bridge.handle_message_at(&RawMessage::draw_clipboard(), start + Duration::from_millis(50));

        assert_eq!(drain(&mut rx), 1);
    }

    #[test]
    fn test_spaced_notifications_deliver_twice() {
        let (mut bridge, mut rx) = bridge(MockChain::new(None), true);
        let start = Instant::now();

        bridge.handle_message_at(&RawMessage::draw_clipboard(), start);
        let first = drain(&mut rx);
        bridge.handle_message_at(&RawMessage::draw_clipboard(), start + Duration::from_millis(500));

        assert_eq!(first + drain(&mut rx), 2);
    }

    #[test]
    fn test_in_flight_delivery_drops_new_notification() {
        let (mut bridge, mut rx) = bridge(MockChain::new(None), true);
        let start = Instant::now();

        bridge.handle_message_at(&RawMessage::draw_clipboard(), start);
        let in_flight = rx.try_recv().unwrap();

        bridge.handle_message_at(&RawMessage::draw_clipboard(), start + Duration::from_millis(500));
        assert_eq!(drain(&mut rx), 0);

        drop(in_flight);
        bridge.handle_message_at(&RawMessage::draw_clipboard(), start + Duration::from_millis(900));
        assert_eq!(drain(&mut rx), 1);
    }

    #[test]
    fn test_relays_even_when_paused() {
        let chain = MockChain::new(Some(200));
        let log = Arc::clone(&chain.log);
        let (mut bridge, mut rx) = bridge(chain, false);

        bridge.handle_message_at(&RawMessage::draw_clipboard(), Instant::now());

        assert_eq!(drain(&mut rx), 0);
        assert_eq!(log.lock().unwrap().forwarded, vec![(200, RawMessage::draw_clipboard())]);
    }

    #[test]
    fn test_monitoring_toggle_is_idempotent() {
        let (mut bridge, mut rx) = bridge(MockChain::new(None), false);
        bridge.set_monitoring_enabled(true);
        bridge.set_monitoring_enabled(true);

        bridge.handle_message_at(&RawMessage::draw_clipboard(), Instant::now());
        assert_eq!(drain(&mut rx), 1);

        bridge.set_monitoring_enabled(false);
        bridge.set_monitoring_enabled(false);
        bridge.handle_message_at(&RawMessage::draw_clipboard(), Instant::now() + Duration::from_secs(1));
        assert_eq!(drain(&mut rx), 0);
    }

    #[test]
    fn test_removed_next_viewer_is_replaced() {
        let chain = MockChain::new(Some(200));
        let log = Arc::clone(&chain.log);
        let (mut bridge, _rx) = bridge(chain, true);

        assert!(bridge.handle_message(&RawMessage::change_chain(200, 300)));
        assert_eq!(bridge.next_viewer(), Some(300));
        assert!(log.lock().unwrap().forwarded.is_empty());

        bridge.handle_message(&RawMessage::change_chain(200, 0));
        assert_eq!(
            log.lock().unwrap().forwarded,
            vec![(300, RawMessage::change_chain(200, 0))]
        );

        bridge.handle_message(&RawMessage::change_chain(300, 0));
        assert_eq!(bridge.next_viewer(), None);
    }

    #[test]
    fn test_other_messages_are_not_handled() {
        let (mut bridge, _rx) = bridge(MockChain::new(None), true);
        let other = RawMessage {
            id: 0x0010,
            wparam: 0,
            lparam: 0,
        };
        assert!(!bridge.handle_message(&other));
    }

    #[test]
    fn test_dispose_unlinks_once() {
        let chain = MockChain::new(Some(200));
        let log = Arc::clone(&chain.log);
        let (mut bridge, _rx) = bridge(chain, true);

        bridge.dispose();
        bridge.dispose();
        drop(bridge);

        assert_eq!(log.lock().unwrap().unregistered, vec![(100, Some(200))]);
    }

    #[test]
    fn test_dispose_without_initialize() {
        let chain = MockChain::new(None);
        let log = Arc::clone(&chain.log);
        let (tx, _rx) = mpsc::channel(1);
        let mut bridge = ClipboardBridge::new(chain, MonitoringState::new(true), tx);

        bridge.dispose();
        assert!(log.lock().unwrap().unregistered.is_empty());
    }

    #[test]
    fn test_failed_registration_is_reported() {
        let mut chain = MockChain::new(None);
        chain.fail = true;
        let (tx, _rx) = mpsc::channel(1);
        let mut bridge = ClipboardBridge::new(chain, MonitoringState::new(true), tx);

        assert!(matches!(bridge.initialize(1), Err(BridgeError::Registration(_))));
        assert!(!bridge.is_initialized());
    }
}
