use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::config::StopCondition;

/// Decides whether a worker may start another unit of work.
///
/// Duration mode relies on an external timer calling [`IterationGate::stop`]. Count mode
/// reserves a unit index before the unit runs, so concurrent workers can never start more
/// than `total` units between them.
#[derive(Debug)]
pub struct IterationGate {
    reserved: AtomicU64,
    total: Option<u64>,
    stopped: AtomicBool,
}

impl IterationGate {
    pub fn new(stop: StopCondition) -> Self {
        let total = match stop {
            StopCondition::Total(n) => Some(n),
            StopCondition::Duration(_) => None,
        };

        Self {
            reserved: AtomicU64::new(0),
            total,
            stopped: AtomicBool::new(false),
        }
    }

    /// Claim the next unit. `false` means the caller must leave its loop.
    pub fn next(&self) -> bool {
        if self.is_stopped() {
            return false;
        }

        if let Some(total) = self.total {
            let idx = self.reserved.fetch_add(1, Ordering::Relaxed);
            if idx >= total {
                self.stop();
                return false;
            }
        }

        true
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }
}
