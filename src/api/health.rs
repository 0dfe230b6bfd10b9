//! Shared health state for the /healthz endpoint. Updated by the scheduler
//! after every poll cycle, read by the webhook router.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// True once the scheduler has completed at least one cycle.
    pub ready: AtomicBool,
    /// Unix-millis timestamp of the last completed poll cycle (0 = none yet).
    pub last_cycle_at_ms: AtomicU64,
    /// Duration of the last completed poll cycle, in milliseconds.
    pub last_cycle_duration_ms: AtomicU64,
    /// Tasks processed (successfully or not) in the last cycle.
    pub last_cycle_tasks_processed: AtomicU64,
    /// Tasks abandoned due to a per-task failure in the last cycle.
    pub last_cycle_tasks_failed: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&self, at_ms: u64, duration_ms: u64, tasks_processed: u64, tasks_failed: u64) {
        self.ready.store(true, Ordering::Relaxed);
        self.last_cycle_at_ms.store(at_ms, Ordering::Relaxed);
        self.last_cycle_duration_ms.store(duration_ms, Ordering::Relaxed);
        self.last_cycle_tasks_processed.store(tasks_processed, Ordering::Relaxed);
        self.last_cycle_tasks_failed.store(tasks_failed, Ordering::Relaxed);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Relaxed)
    }

    pub fn last_cycle_at_ms(&self) -> u64 {
        self.last_cycle_at_ms.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_not_ready() {
        let health = HealthState::new();
        assert!(!health.is_ready());
    }

    #[test]
    fn record_cycle_marks_ready() {
        let health = HealthState::new();
        health.record_cycle(1000, 250, 4, 1);
        assert!(health.is_ready());
        assert_eq!(health.last_cycle_at_ms(), 1000);
    }
}
