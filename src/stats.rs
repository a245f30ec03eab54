//! Re-injection statistics.
//!
//! Each counter has exactly one incrementing context (the capture handler
//! for the first three, the drain engine for `reinjected`), so increments
//! are a plain load + store: no read-modify-write atomics, which the target
//! core does not have. Resets come from the command handler, which the
//! capture handler may preempt but never the other way round.

use core::sync::atomic::{AtomicU32, Ordering};

/// Monotonic (until reset) 32-bit event counter.
#[derive(Debug, Default)]
pub struct Counter(AtomicU32);

impl Counter {
    pub const fn new() -> Self {
        Self(AtomicU32::new(0))
    }

    /// Add one, saturating. Must only be called from the counter's owning context.
    #[inline]
    pub fn bump(&self) {
        let v = self.0.load(Ordering::Relaxed);
        self.0.store(v.saturating_add(1), Ordering::Relaxed);
    }

    #[inline]
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::Relaxed)
    }

    #[inline]
    pub fn reset(&self) {
        self.0.store(0, Ordering::Relaxed);
    }
}

#[derive(Debug, Default)]
pub struct Statistics {
    /// Dumped packets of an enabled class seen by the capture handler.
    pub dropped: Counter,
    /// Packets the router lost before they could be captured.
    pub missed_dropped: Counter,
    /// Captured packets discarded because the queue was full.
    pub queue_overflows: Counter,
    /// Packets written back to the transmitter.
    pub reinjected: Counter,
}

/// Point-in-time copy of [`Statistics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    pub dropped: u32,
    pub missed_dropped: u32,
    pub queue_overflows: u32,
    pub reinjected: u32,
}

impl Statistics {
    pub const fn new() -> Self {
        Self {
            dropped: Counter::new(),
            missed_dropped: Counter::new(),
            queue_overflows: Counter::new(),
            reinjected: Counter::new(),
        }
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            dropped: self.dropped.get(),
            missed_dropped: self.missed_dropped.get(),
            queue_overflows: self.queue_overflows.get(),
            reinjected: self.reinjected.get(),
        }
    }

    pub fn reset(&self) {
        self.dropped.reset();
        self.missed_dropped.reset();
        self.queue_overflows.reset();
        self.reinjected.reset();
    }
}
