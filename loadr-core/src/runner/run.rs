use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use loadr_http::HttpClient;

use crate::config::{HttpMethod, RunConfig, RunMode, StopCondition};
use crate::error::{Error, Result};
use crate::executor::{PreparedRequest, execute};
use crate::sample::{SampleRecord, StepKind};
use crate::scenario::{ConversationPlan, run_conversation};
use crate::stats::{ResultSummary, summarize_by_kind};

use super::context::RunContext;
use super::progress::{ProgressFn, spawn_ticker};

/// Everything a finished run produced.
#[derive(Debug, Clone)]
pub struct RunOutput {
    /// Samples in completion order (per worker, interleaved across workers).
    pub samples: Vec<SampleRecord>,
    /// Wall time from the start signal until the last worker exited.
    pub elapsed: Duration,
    pub units_completed: u64,
}

impl RunOutput {
    pub fn summary(&self) -> ResultSummary {
        ResultSummary::from_samples(&self.samples)
    }

    pub fn summary_for(&self, kind: StepKind) -> ResultSummary {
        ResultSummary::for_kind(&self.samples, kind)
    }

    pub fn summaries_by_kind(&self) -> std::collections::BTreeMap<StepKind, ResultSummary> {
        summarize_by_kind(&self.samples)
    }
}

/// Run the configured load against the target(s).
///
/// Configuration problems are reported before any request is sent. Once the run is under way
/// nothing a request does can fail it; only a panicking worker surfaces as an error.
pub async fn run(cfg: &RunConfig, progress: Option<ProgressFn>) -> Result<RunOutput> {
    cfg.validate()?;

    let client = HttpClient::default();
    let timeout = cfg.timeout;

    tracing::info!(
        mode = cfg.mode.name(),
        concurrency = cfg.concurrency,
        stop = %cfg.stop,
        timeout = ?cfg.timeout,
        "starting run"
    );

    let out = match &cfg.mode {
        RunMode::Single(target) => {
            if target.method == HttpMethod::Get && target.body.is_some() {
                tracing::warn!(url = %target.url, "GET request has a body; sending it anyway");
            }

            let req = Arc::new(PreparedRequest::new(
                target.method,
                &target.url,
                &cfg.headers,
                target.body.as_ref(),
            )?);

            run_units(cfg.concurrency, cfg.stop, progress, move |ctx| {
                let client = client.clone();
                let req = req.clone();
                async move {
                    let outcome = execute(&client, &req, timeout).await;
                    vec![outcome.to_sample(StepKind::Request, ctx.epoch())]
                }
            })
            .await?
        }
        RunMode::Conversation(target) => {
            let plan = Arc::new(ConversationPlan::new(cfg, target)?);

            run_units(cfg.concurrency, cfg.stop, progress, move |ctx| {
                let client = client.clone();
                let plan = plan.clone();
                async move { run_conversation(&client, &plan, timeout, ctx.epoch()).await }
            })
            .await?
        }
    };

    tracing::info!(
        units = out.units_completed,
        samples = out.samples.len(),
        elapsed = ?out.elapsed,
        "run finished"
    );

    Ok(out)
}

/// Drive `concurrency` workers that repeatedly call `work` until `stop` holds.
///
/// Each call to `work` is one unit; its records are appended to the run as a batch. In count
/// mode exactly `total` units are started. In duration mode no unit starts after the deadline,
/// and units already in flight are allowed to finish.
pub async fn run_units<F, Fut>(
    concurrency: u64,
    stop: StopCondition,
    progress: Option<ProgressFn>,
    work: F,
) -> Result<RunOutput>
where
    F: Fn(Arc<RunContext>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Vec<SampleRecord>> + Send + 'static,
{
    if concurrency == 0 {
        return Err(Error::InvalidConcurrency);
    }

    let ctx = Arc::new(RunContext::new(stop));
    let work = Arc::new(work);

    let mut handles = Vec::new();
    for worker in 0..concurrency {
        let ctx = ctx.clone();
        let work = work.clone();
        handles.push(tokio::spawn(async move {
            ctx.wait_for_start().await;

            let mut units: u64 = 0;
            while ctx.next_unit() {
                let records = work(ctx.clone()).await;
                ctx.record(records);
                units += 1;
            }

            tracing::debug!(worker, units, "worker finished");
        }));
    }

    let started = Instant::now();
    ctx.start_at(started);

    let timer = match stop {
        StopCondition::Duration(d) => {
            let ctx = ctx.clone();
            Some(tokio::spawn(async move {
                tokio::time::sleep(d).await;
                tracing::debug!("duration elapsed; no new units will start");
                ctx.stop();
            }))
        }
        StopCondition::Total(_) => None,
    };

    let ticker = progress.map(|progress| spawn_ticker(ctx.clone(), stop, started, progress));

    let mut join_err = None;
    for h in handles {
        if let Err(err) = h.await {
            ctx.stop();
            join_err.get_or_insert(err);
        }
    }
    let elapsed = started.elapsed();

    for h in [timer, ticker].into_iter().flatten() {
        h.abort();
        let _ = h.await;
    }

    if let Some(err) = join_err {
        return Err(Error::Join(err));
    }

    Ok(RunOutput {
        samples: ctx.take_samples(),
        elapsed,
        units_completed: ctx.units_completed(),
    })
}
