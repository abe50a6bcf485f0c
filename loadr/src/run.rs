use std::time::SystemTime;

use crate::cli::{ConversationArgs, OutputFormat, RunArgs};
use crate::config_file::{self, Settings};
use crate::exit_codes::ExitCode;
use crate::output;
use crate::report::{self, Report};
use crate::run_error::RunError;

pub async fn run(args: RunArgs) -> Result<ExitCode, RunError> {
    let file = config_file::load(args.common.config.as_deref())
        .await
        .map_err(RunError::InvalidInput)?;
    let settings = config_file::single(&args, file).map_err(RunError::InvalidInput)?;

    execute(settings, args.common.format).await
}

pub async fn conversation(args: ConversationArgs) -> Result<ExitCode, RunError> {
    let file = config_file::load(args.common.config.as_deref())
        .await
        .map_err(RunError::InvalidInput)?;
    let settings = config_file::conversation(&args, file).map_err(RunError::InvalidInput)?;

    execute(settings, args.common.format).await
}

async fn execute(settings: Settings, format: OutputFormat) -> Result<ExitCode, RunError> {
    let Settings { cfg, output: report_path } = settings;
    cfg.validate()?;

    let out = output::formatter(format);
    out.print_header(&cfg);

    let result = loadr_core::runner::run(&cfg, out.progress()).await?;

    out.print_summary(&cfg, &result)
        .map_err(RunError::RuntimeError)?;

    if let Some(path) = report_path {
        let report = Report::new(&cfg, &result, SystemTime::now());
        report::write(&path, &report)
            .await
            .map_err(RunError::RuntimeError)?;
        tracing::debug!(path = %path.display(), "report written");
        out.print_report_saved(&path);
    }

    Ok(ExitCode::Success)
}
