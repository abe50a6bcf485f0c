use std::path::Path;

use loadr_core::RunConfig;
use loadr_core::runner::{ProgressFn, RunOutput};

use crate::cli::OutputFormat;

mod human;
mod json;

pub(crate) trait OutputFormatter: Send + Sync {
    fn print_header(&self, cfg: &RunConfig);
    fn progress(&self) -> Option<ProgressFn>;
    fn print_summary(&self, cfg: &RunConfig, out: &RunOutput) -> anyhow::Result<()>;
    fn print_report_saved(&self, path: &Path);
}

pub(crate) fn formatter(format: OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        OutputFormat::HumanReadable => Box::new(human::HumanReadableOutput::new()),
        OutputFormat::Json => Box::new(json::JsonOutput),
    }
}
