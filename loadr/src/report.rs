use std::path::Path;
use std::time::SystemTime;

use anyhow::Context as _;
use loadr_core::runner::RunOutput;
use loadr_core::{ResultSummary, RunConfig, RunMode, SampleRecord, StepKind};
use serde::Serialize;

/// Per-mode results: one summary for single requests, one per step for conversations.
/// Flattened into its parent as `result` or `results`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum ModeResults {
    Result(ResultSummary),
    Results {
        create: ResultSummary,
        message: ResultSummary,
    },
}

impl ModeResults {
    pub(crate) fn from_run(cfg: &RunConfig, out: &RunOutput) -> Self {
        match cfg.mode {
            RunMode::Single(_) => Self::Result(out.summary()),
            RunMode::Conversation(_) => Self::Results {
                create: out.summary_for(StepKind::Create),
                message: out.summary_for(StepKind::Message),
            },
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Report<'a> {
    config: &'a RunConfig,
    #[serde(flatten)]
    results: ModeResults,
    /// Raw samples are kept for conversation runs only.
    #[serde(skip_serializing_if = "Option::is_none")]
    samples: Option<&'a [SampleRecord]>,
    elapsed_seconds: f64,
    units_completed: u64,
    timestamp: String,
}

impl<'a> Report<'a> {
    pub(crate) fn new(cfg: &'a RunConfig, out: &'a RunOutput, generated_at: SystemTime) -> Self {
        let samples = match cfg.mode {
            RunMode::Single(_) => None,
            RunMode::Conversation(_) => Some(out.samples.as_slice()),
        };

        Self {
            config: cfg,
            results: ModeResults::from_run(cfg, out),
            samples,
            elapsed_seconds: out.elapsed.as_secs_f64(),
            units_completed: out.units_completed,
            timestamp: humantime::format_rfc3339_millis(generated_at).to_string(),
        }
    }
}

/// Write `report` as pretty JSON, creating missing parent directories.
pub(crate) async fn write(path: &Path, report: &Report<'_>) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create report dir: {}", parent.display()))?;
    }

    let json = serde_json::to_vec_pretty(report).context("failed to encode report")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("failed to write report: {}", path.display()))
}
