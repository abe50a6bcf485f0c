use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::StopCondition;

use super::context::RunContext;

pub const PROGRESS_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    /// Monotonic tick counter (1-based) for progress emissions.
    pub tick: u64,
    pub elapsed: Duration,
    pub stop: StopCondition,
    /// Units (requests, or whole conversations) finished so far.
    pub units_completed: u64,
    pub samples_total: u64,
    pub failed_total: u64,
    /// Samples/sec observed during the last progress interval.
    pub samples_per_sec_now: f64,
}

impl ProgressUpdate {
    /// Completed fraction of the run in `[0, 1]`.
    pub fn fraction(&self) -> f64 {
        let f = match self.stop {
            StopCondition::Duration(d) if !d.is_zero() => {
                self.elapsed.as_secs_f64() / d.as_secs_f64()
            }
            StopCondition::Total(n) if n > 0 => self.units_completed as f64 / n as f64,
            _ => 0.0,
        };
        f.clamp(0.0, 1.0)
    }
}

pub type ProgressFn = Arc<dyn Fn(ProgressUpdate) + Send + Sync + 'static>;

pub(crate) fn spawn_ticker(
    ctx: Arc<RunContext>,
    stop: StopCondition,
    started: Instant,
    progress: ProgressFn,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval_at(
            tokio::time::Instant::from_std(started) + PROGRESS_INTERVAL,
            PROGRESS_INTERVAL,
        );
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut tick: u64 = 0;
        let mut last_at = started;
        let mut last_samples = 0u64;

        loop {
            interval.tick().await;

            tick = tick.saturating_add(1);
            let now = Instant::now();
            let dt = now.duration_since(last_at).as_secs_f64();
            last_at = now;

            let samples_total = ctx.samples_total();
            let delta = samples_total.saturating_sub(last_samples);
            last_samples = samples_total;

            progress(ProgressUpdate {
                tick,
                elapsed: now.duration_since(started),
                stop,
                units_completed: ctx.units_completed(),
                samples_total,
                failed_total: ctx.samples_failed(),
                samples_per_sec_now: if dt > 0.0 { delta as f64 / dt } else { 0.0 },
            });
        }
    })
}
