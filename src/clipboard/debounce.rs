//! Debounce and re-entrancy primitives for clipboard notifications

use std::sync::{Arc, Condvar, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Minimum spacing between two delivered notifications
pub const DEBOUNCE_INTERVAL: Duration = Duration::from_millis(300);

/// How long a raw notification waits for an in-flight delivery to finish
pub const DELIVERY_TIMEOUT: Duration = Duration::from_millis(100);

/// Drops notifications that follow the last delivered one too closely
#[derive(Debug, Clone)]
pub struct Debouncer {
    min_interval: Duration,
    last_delivered: Option<Instant>,
}

impl Default for Debouncer {
    fn default() -> Self {
        Self::new(DEBOUNCE_INTERVAL)
    }
}

impl Debouncer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_delivered: None,
        }
    }

    pub fn would_accept(&self, now: Instant) -> bool {
        match self.last_delivered {
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
            None => true,
        }
    }

    /// Only deliveries move the window; suppressed notifications do not
    pub fn mark_delivered(&mut self, now: Instant) {
        self.last_delivered = Some(now);
    }
}

#[derive(Debug, Default)]
struct GateInner {
    busy: Mutex<bool>,
    released: Condvar,
}

/// Single in-flight delivery slot
#[derive(Debug, Clone, Default)]
pub struct DeliveryGate {
    inner: Arc<GateInner>,
}

/// Held for as long as a delivery is being processed
#[derive(Debug)]
pub struct DeliveryTicket {
    inner: Arc<GateInner>,
}

impl DeliveryGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait up to `timeout` for the slot; `None` means drop the notification
    pub fn try_enter(&self, timeout: Duration) -> Option<DeliveryTicket> {
        let busy = self.inner.busy.lock().unwrap_or_else(PoisonError::into_inner);
        let (mut busy, _) = self
            .inner
            .released
            .wait_timeout_while(busy, timeout, |busy| *busy)
            .unwrap_or_else(PoisonError::into_inner);

        if *busy {
            return None;
        }
        *busy = true;

        Some(DeliveryTicket {
            inner: Arc::clone(&self.inner),
        })
    }

    pub fn is_busy(&self) -> bool {
        *self.inner.busy.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for DeliveryTicket {
    fn drop(&mut self) {
        let mut busy = self.inner.busy.lock().unwrap_or_else(PoisonError::into_inner);
        *busy = false;
        self.inner.released.notify_one();
    }
}
