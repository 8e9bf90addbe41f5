use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

#[derive(Debug, Default)]
struct Counters {
    online: AtomicUsize,
    accepted: AtomicUsize,
    evicted: AtomicUsize,
    failed_deliveries: AtomicUsize,
}

/// Shared view of the reactor's counters, readable from any thread.
///
/// Only the reactor thread writes them.
#[derive(Clone, Debug, Default)]
pub struct ServerStats {
    counters: Arc<Counters>,
}

impl ServerStats {
    /// Peers currently in the registry.
    pub fn online(&self) -> usize {
        self.counters.online.load(Ordering::SeqCst)
    }

    pub fn accepted(&self) -> usize {
        self.counters.accepted.load(Ordering::SeqCst)
    }

    pub fn evicted(&self) -> usize {
        self.counters.evicted.load(Ordering::SeqCst)
    }

    /// Sends that failed during a fan-out or an outbound flush.
    pub fn failed_deliveries(&self) -> usize {
        self.counters.failed_deliveries.load(Ordering::SeqCst)
    }

    pub(crate) fn record_accepted(&self, online: usize) {
        self.counters.accepted.fetch_add(1, Ordering::SeqCst);
        self.counters.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn record_evicted(&self, online: usize) {
        self.counters.evicted.fetch_add(1, Ordering::SeqCst);
        self.counters.online.store(online, Ordering::SeqCst);
    }

    pub(crate) fn record_failed_deliveries(&self, count: usize) {
        self.counters.failed_deliveries.fetch_add(count, Ordering::SeqCst);
    }
}
