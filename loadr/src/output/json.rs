use serde::Serialize;
use std::io::Write as _;
use std::path::Path;
use std::sync::Arc;

use loadr_core::RunConfig;
use loadr_core::runner::{ProgressFn, ProgressUpdate, RunOutput};

use super::OutputFormatter;
use crate::report::ModeResults;

pub(crate) struct JsonOutput;

impl OutputFormatter for JsonOutput {
    fn print_header(&self, _cfg: &RunConfig) {}

    fn progress(&self) -> Option<ProgressFn> {
        Some(Arc::new(move |u| {
            let line = build_progress_line(&u);
            emit_json_line(&line);
        }))
    }

    fn print_summary(&self, cfg: &RunConfig, out: &RunOutput) -> anyhow::Result<()> {
        let line = build_summary_line(cfg, out);
        emit_json_line(&line);
        Ok(())
    }

    fn print_report_saved(&self, _path: &Path) {}
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonProgressLine {
    pub kind: &'static str,
    pub tick: u64,
    pub elapsed_seconds: f64,
    /// Completed share of the run in `[0, 1]`.
    pub progress: f64,
    pub units_completed: u64,
    pub samples_total: u64,
    pub failed_total: u64,
    pub samples_per_sec: f64,
}

fn build_progress_line(u: &ProgressUpdate) -> JsonProgressLine {
    JsonProgressLine {
        kind: "progress",
        tick: u.tick,
        elapsed_seconds: u.elapsed.as_secs_f64(),
        progress: u.fraction(),
        units_completed: u.units_completed,
        samples_total: u.samples_total,
        failed_total: u.failed_total,
        samples_per_sec: u.samples_per_sec_now,
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct JsonSummaryLine {
    pub kind: &'static str,
    pub mode: &'static str,
    pub elapsed_seconds: f64,
    pub units_completed: u64,
    #[serde(flatten)]
    pub results: ModeResults,
}

fn build_summary_line(cfg: &RunConfig, out: &RunOutput) -> JsonSummaryLine {
    JsonSummaryLine {
        kind: "summary",
        mode: cfg.mode.name(),
        elapsed_seconds: out.elapsed.as_secs_f64(),
        units_completed: out.units_completed,
        results: ModeResults::from_run(cfg, out),
    }
}

fn emit_json_line<T: Serialize>(line: &T) {
    let mut out = std::io::stdout().lock();
    if serde_json::to_writer(&mut out, line).is_ok() {
        let _ = writeln!(out);
    }
}
