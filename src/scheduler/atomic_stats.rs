/*!
 * Lock-Free Scheduler Statistics
 * Uses atomic counters so monitoring never enters the critical section
 */

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of the scheduler counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Threads selected by the dispatch loop
    pub dispatches: u64,
    /// Dispatches that transferred the processor to a different thread
    pub context_switches: u64,
    /// Times the processor halted waiting for an interrupt
    pub idle_waits: u64,
    /// Threads that went to sleep on a wait queue
    pub sleeps: u64,
    /// Threads moved from a wait queue to the run queue by wakeup/broadcast
    pub wakeups: u64,
    /// Cancel requests
    pub cancellations: u64,
    /// Cancel requests that forced a cancellable sleeper awake
    pub forced_wakeups: u64,
}

/// Atomic scheduler statistics for lock-free updates
///
/// # Performance
/// - Cache-line aligned to prevent false sharing
/// - All operations use relaxed ordering
#[repr(C, align(64))]
pub(super) struct AtomicSchedulerStats {
    dispatches: AtomicU64,
    context_switches: AtomicU64,
    idle_waits: AtomicU64,
    sleeps: AtomicU64,
    wakeups: AtomicU64,
    cancellations: AtomicU64,
    forced_wakeups: AtomicU64,
}

impl AtomicSchedulerStats {
    #[inline]
    pub fn new() -> Self {
        Self {
            dispatches: AtomicU64::new(0),
            context_switches: AtomicU64::new(0),
            idle_waits: AtomicU64::new(0),
            sleeps: AtomicU64::new(0),
            wakeups: AtomicU64::new(0),
            cancellations: AtomicU64::new(0),
            forced_wakeups: AtomicU64::new(0),
        }
    }

    /// # Performance
    /// Hot path - called on every dispatch
    #[inline(always)]
    pub fn inc_dispatches(&self) {
        self.dispatches.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_context_switches(&self) {
        self.context_switches.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_idle_waits(&self) {
        self.idle_waits.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_sleeps(&self) {
        self.sleeps.fetch_add(1, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn add_wakeups(&self, count: u64) {
        self.wakeups.fetch_add(count, Ordering::Relaxed);
    }

    #[inline(always)]
    pub fn inc_cancellations(&self, forced: bool) {
        self.cancellations.fetch_add(1, Ordering::Relaxed);
        if forced {
            self.forced_wakeups.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Get snapshot of current stats
    ///
    /// # Note
    /// Counters are read independently and may be mutually inconsistent by
    /// one in-flight operation. Acceptable for monitoring.
    #[inline]
    pub fn snapshot(&self) -> SchedulerStats {
        SchedulerStats {
            dispatches: self.dispatches.load(Ordering::Relaxed),
            context_switches: self.context_switches.load(Ordering::Relaxed),
            idle_waits: self.idle_waits.load(Ordering::Relaxed),
            sleeps: self.sleeps.load(Ordering::Relaxed),
            wakeups: self.wakeups.load(Ordering::Relaxed),
            cancellations: self.cancellations.load(Ordering::Relaxed),
            forced_wakeups: self.forced_wakeups.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters() {
        let stats = AtomicSchedulerStats::new();
        stats.inc_dispatches();
        stats.inc_dispatches();
        stats.add_wakeups(3);
        stats.inc_cancellations(false);
        stats.inc_cancellations(true);

        let snap = stats.snapshot();
        assert_eq!(snap.dispatches, 2);
        assert_eq!(snap.wakeups, 3);
        assert_eq!(snap.cancellations, 2);
        assert_eq!(snap.forced_wakeups, 1);
        assert_eq!(snap.context_switches, 0);
    }
}
