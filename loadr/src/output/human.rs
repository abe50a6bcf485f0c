use std::path::Path;
use std::sync::Arc;

mod format;
mod progress;
mod summary;

use format::{format_duration_single, format_rate};
use loadr_core::runner::{ProgressFn, RunOutput};
use loadr_core::{RunConfig, RunMode};
use progress::HumanProgress;
use summary::render;

use super::OutputFormatter;

pub(crate) struct HumanReadableOutput {
    progress: Arc<HumanProgress>,
}

impl HumanReadableOutput {
    pub(crate) fn new() -> Self {
        Self {
            progress: Arc::new(HumanProgress::new()),
        }
    }
}

impl OutputFormatter for HumanReadableOutput {
    fn print_header(&self, cfg: &RunConfig) {
        match &cfg.mode {
            RunMode::Single(t) => println!("target: {} {}", t.method, t.url),
            RunMode::Conversation(t) => {
                println!("create: POST {}", t.create_url);
                println!(
                    "message: POST {} x{} per conversation",
                    t.message_url, t.messages_per_conversation
                );
            }
        }
        println!(
            "mode: {} concurrency={} {} timeout={}",
            cfg.mode.name(),
            cfg.concurrency,
            cfg.stop,
            format_duration_single(cfg.timeout)
        );
        println!();
    }

    fn progress(&self) -> Option<ProgressFn> {
        let progress = self.progress.clone();

        Some(Arc::new(move |u| {
            let message = format!(
                "elapsed={} done={} samples/s={} failed={}/{}",
                format_duration_single(u.elapsed),
                u.units_completed,
                format_rate(u.samples_per_sec_now),
                u.failed_total,
                u.samples_total
            );
            progress.update(u.fraction(), message);
        }))
    }

    fn print_summary(&self, cfg: &RunConfig, out: &RunOutput) -> anyhow::Result<()> {
        self.progress.finish();
        print!("{}", render(cfg, out));
        Ok(())
    }

    fn print_report_saved(&self, path: &Path) {
        println!();
        println!("report saved: {}", path.display());
    }
}
