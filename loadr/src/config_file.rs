//! JSON config file support and the merge of file values with command-line flags.
//!
//! Precedence is flags, then file, then built-in defaults. A stop condition given on the
//! command line replaces the file's stop condition entirely, whichever kind it is.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use loadr_core::{
    ConversationTarget, HttpMethod, RequestBody, RequestTarget, RunConfig, RunMode, StopCondition,
};
use serde::Deserialize;

use crate::cli::{CommonArgs, ConversationArgs, RunArgs};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct FileConfig {
    url: Option<String>,
    method: Option<String>,
    headers: Option<BTreeMap<String, serde_json::Value>>,
    body: Option<serde_json::Value>,
    concurrency: Option<u64>,
    duration_sec: Option<f64>,
    total_requests: Option<u64>,
    timeout_ms: Option<u64>,
    output: Option<PathBuf>,

    create_url: Option<String>,
    message_url: Option<String>,
    create_body: Option<serde_json::Value>,
    message_body_template: Option<String>,
    messages_per_conversation: Option<u64>,
    total_conversations: Option<u64>,
    placeholder: Option<String>,
}

/// A fully merged run: engine config plus where to write the report.
#[derive(Debug, Clone)]
pub(crate) struct Settings {
    pub cfg: RunConfig,
    pub output: Option<PathBuf>,
}

pub(crate) async fn load(path: Option<&Path>) -> anyhow::Result<FileConfig> {
    let Some(path) = path else {
        return Ok(FileConfig::default());
    };

    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config file: {}", path.display()))
}

pub(crate) fn single(args: &RunArgs, file: FileConfig) -> anyhow::Result<Settings> {
    let method = match args.method.as_deref().or(file.method.as_deref()) {
        Some(m) => HttpMethod::parse(m)?,
        None => HttpMethod::default(),
    };

    let body = match &args.body {
        Some(raw) => Some(RequestBody::from_input(raw)),
        None => file.body.map(|v| match v {
            serde_json::Value::String(s) => RequestBody::Text(s),
            v => RequestBody::Json(v),
        }),
    };

    let stop = stop_condition(
        &args.common,
        args.total_requests,
        file.duration_sec,
        file.total_requests,
    )?;

    let target = RequestTarget {
        url: args.url.clone().or(file.url).unwrap_or_default(),
        method,
        body,
    };
    let mut cfg = RunConfig::new(RunMode::Single(target), stop);
    apply_common(
        &mut cfg,
        &args.common,
        file.headers,
        file.concurrency,
        file.timeout_ms,
    )?;

    Ok(Settings {
        cfg,
        output: args.common.output.clone().or(file.output),
    })
}

pub(crate) fn conversation(args: &ConversationArgs, file: FileConfig) -> anyhow::Result<Settings> {
    let mut target = ConversationTarget::new(
        args.create_url.clone().or(file.create_url).unwrap_or_default(),
        args.message_url.clone().or(file.message_url).unwrap_or_default(),
    );

    if let Some(body) = args
        .create_body
        .clone()
        .or(file.create_body.map(json_as_text))
    {
        target.create_body = body;
    }
    if let Some(template) = args
        .message_body_template
        .clone()
        .or(file.message_body_template)
    {
        target.message_body_template = template;
    }
    if let Some(k) = args
        .messages_per_conversation
        .or(file.messages_per_conversation)
    {
        target.messages_per_conversation = k;
    }
    if let Some(placeholder) = args.placeholder.clone().or(file.placeholder) {
        target.placeholder = placeholder;
    }

    let stop = stop_condition(
        &args.common,
        args.total_conversations,
        file.duration_sec,
        file.total_conversations,
    )?;

    let mut cfg = RunConfig::new(RunMode::Conversation(target), stop);
    apply_common(
        &mut cfg,
        &args.common,
        file.headers,
        file.concurrency,
        file.timeout_ms,
    )?;

    Ok(Settings {
        cfg,
        output: args.common.output.clone().or(file.output),
    })
}

fn stop_condition(
    common: &CommonArgs,
    cli_total: Option<u64>,
    file_duration_sec: Option<f64>,
    file_total: Option<u64>,
) -> anyhow::Result<StopCondition> {
    if common.duration.is_some() || cli_total.is_some() {
        return Ok(StopCondition::from_parts(common.duration, cli_total)?);
    }

    let duration = file_duration_sec
        .map(|secs| {
            Duration::try_from_secs_f64(secs)
                .ok()
                .filter(|d| !d.is_zero())
                .ok_or(loadr_core::Error::InvalidDuration)
        })
        .transpose()?;

    Ok(StopCondition::from_parts(duration, file_total)?)
}

fn apply_common(
    cfg: &mut RunConfig,
    common: &CommonArgs,
    file_headers: Option<BTreeMap<String, serde_json::Value>>,
    file_concurrency: Option<u64>,
    file_timeout_ms: Option<u64>,
) -> anyhow::Result<()> {
    if let Some(raw) = &common.headers {
        let parsed: BTreeMap<String, serde_json::Value> = serde_json::from_str(raw)
            .context("--headers must be a JSON object, e.g. '{\"x-api-key\":\"secret\"}'")?;
        cfg.headers = header_values(parsed)?;
    } else if let Some(headers) = file_headers {
        cfg.headers = header_values(headers)?;
    }

    if let Some(c) = common.concurrency.or(file_concurrency) {
        cfg.concurrency = c;
    }
    if let Some(t) = common
        .timeout
        .or(file_timeout_ms.map(Duration::from_millis))
    {
        cfg.timeout = t;
    }

    Ok(())
}

fn header_values(
    raw: BTreeMap<String, serde_json::Value>,
) -> anyhow::Result<BTreeMap<String, String>> {
    raw.into_iter()
        .map(|(name, value)| match value {
            serde_json::Value::String(s) => Ok((name, s)),
            serde_json::Value::Number(_) | serde_json::Value::Bool(_) => {
                Ok((name, value.to_string()))
            }
            _ => anyhow::bail!("header `{name}` must be a string, number or boolean"),
        })
        .collect()
}

fn json_as_text(v: serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s,
        v => v.to_string(),
    }
}
