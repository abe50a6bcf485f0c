use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::Instant;

use crate::config::StopCondition;
use crate::sample::SampleRecord;

use super::gate::IterationGate;
use super::signal::StartSignal;

/// State shared by every worker of one run.
#[derive(Debug)]
pub struct RunContext {
    gate: IterationGate,
    start: StartSignal,
    epoch: OnceLock<Instant>,
    samples: Mutex<Vec<SampleRecord>>,
    units_completed: AtomicU64,
    samples_total: AtomicU64,
    samples_failed: AtomicU64,
}

impl RunContext {
    pub fn new(stop: StopCondition) -> Self {
        Self {
            gate: IterationGate::new(stop),
            start: StartSignal::new(),
            epoch: OnceLock::new(),
            samples: Mutex::new(Vec::new()),
            units_completed: AtomicU64::new(0),
            samples_total: AtomicU64::new(0),
            samples_failed: AtomicU64::new(0),
        }
    }

    /// Pin the run's time origin and release the workers.
    pub(crate) fn start_at(&self, epoch: Instant) {
        let _ = self.epoch.set(epoch);
        self.start.start();
    }

    pub(crate) async fn wait_for_start(&self) {
        self.start.wait().await;
    }

    /// Time origin for sample offsets.
    pub fn epoch(&self) -> Instant {
        self.epoch.get().copied().unwrap_or_else(Instant::now)
    }

    /// Claim the next unit of work; `false` once the stop condition holds.
    pub fn next_unit(&self) -> bool {
        self.gate.next()
    }

    /// Stop handing out new units. In-flight units still complete and get recorded.
    pub fn stop(&self) {
        self.gate.stop();
    }

    /// Append the records of one finished unit.
    pub fn record(&self, records: Vec<SampleRecord>) {
        let failed = records.iter().filter(|r| !r.ok).count() as u64;
        let total = records.len() as u64;

        self.samples
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(records);

        self.samples_total.fetch_add(total, Ordering::Relaxed);
        self.samples_failed.fetch_add(failed, Ordering::Relaxed);
        self.units_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn units_completed(&self) -> u64 {
        self.units_completed.load(Ordering::Relaxed)
    }

    pub fn samples_total(&self) -> u64 {
        self.samples_total.load(Ordering::Relaxed)
    }

    pub fn samples_failed(&self) -> u64 {
        self.samples_failed.load(Ordering::Relaxed)
    }

    /// Move the collected samples out. Call only after every worker has exited.
    pub fn take_samples(&self) -> Vec<SampleRecord> {
        std::mem::take(
            &mut *self
                .samples
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sample::StepKind;
    use std::time::Duration;

    fn record(ok: bool) -> SampleRecord {
        SampleRecord {
            kind: StepKind::Request,
            started: Duration::ZERO,
            finished: Duration::from_millis(1),
            ok,
            status: Some(if ok { 200 } else { 500 }),
            error: None,
            response_size: None,
        }
    }

    #[test]
    fn record_updates_counters_and_collection() {
        let ctx = RunContext::new(StopCondition::Total(10));
        ctx.record(vec![record(true), record(false)]);
        ctx.record(vec![record(true)]);

        assert_eq!(ctx.units_completed(), 2);
        assert_eq!(ctx.samples_total(), 3);
        assert_eq!(ctx.samples_failed(), 1);

        let samples = ctx.take_samples();
        assert_eq!(samples.len(), 3);
        assert!(ctx.take_samples().is_empty());
    }
}
