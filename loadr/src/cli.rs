use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }

    let number_end = s
        .char_indices()
        .find(|(_, ch)| !ch.is_ascii_digit())
        .map_or(s.len(), |(idx, _)| idx);

    if number_end == 0 {
        return Err(format!(
            "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
        ));
    }

    let (number_str, unit_str) = s.split_at(number_end);
    let value: u64 = number_str
        .parse()
        .map_err(|_| format!("invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"))?;

    let d = match unit_str.trim() {
        "" | "s" | "sec" | "secs" | "second" | "seconds" => Duration::from_secs(value),
        "ms" | "msec" | "msecs" | "millisecond" | "milliseconds" => Duration::from_millis(value),
        "m" | "min" | "mins" | "minute" | "minutes" => Duration::from_secs(
            value
                .checked_mul(60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?,
        ),
        "h" | "hr" | "hrs" | "hour" | "hours" => Duration::from_secs(
            value
                .checked_mul(60 * 60)
                .ok_or_else(|| format!("duration '{s}' is too large"))?,
        ),
        _ => {
            return Err(format!(
                "invalid duration '{s}' (expected e.g. 10s, 250ms, 1m)"
            ));
        }
    };

    if d.is_zero() {
        return Err(format!("duration '{s}' must be greater than zero"));
    }
    Ok(d)
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable progress and summary.
    HumanReadable,
    /// Emit JSON progress and summary lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "loadr",
    author,
    version,
    about = "Concurrent HTTP load generator",
    long_about = "loadr drives a fixed pool of concurrent workers against an HTTP endpoint (or a create-then-message conversation flow) for a duration or a fixed number of units, and reports latency percentiles, throughput, status codes and errors.\n\nSettings can come from a JSON config file (`--config`); flags override file values.",
    after_help = "Examples:\n  loadr run --url http://localhost:8080/health --concurrency 20 --duration 30s\n  loadr run --url http://localhost:8080/users --method POST --body '{\"name\":\"a\"}' --total-requests 500\n  loadr run --config load.json --format json\n  loadr conversation --create-url http://localhost:8080/conversations --message-url http://localhost:8080/messages --total-conversations 50"
)]
pub struct Cli {
    /// Log filter for loadr's own diagnostics (e.g. debug, trace). Overrides RUST_LOG.
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Load test a single endpoint; every unit of work is one request
    Run(RunArgs),

    /// Load test a create-then-message flow; every unit of work is one conversation
    #[command(
        long_about = "Each unit of work creates a conversation, reads its `id` from the JSON response and posts the configured number of messages, substituting the id into the message template."
    )]
    Conversation(ConversationArgs),
}

/// Flags shared by both modes.
#[derive(Debug, Args)]
pub struct CommonArgs {
    /// JSON config file; flags override its values
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Request headers as a JSON object, e.g. '{"Authorization":"Bearer x"}'
    #[arg(long, value_name = "JSON")]
    pub headers: Option<String>,

    /// Number of concurrent workers [default: 10]
    #[arg(long)]
    pub concurrency: Option<u64>,

    /// Run for this long (e.g. 10s, 250ms, 1m; a bare number is seconds)
    #[arg(long, value_parser = parse_duration)]
    pub duration: Option<Duration>,

    /// Per-request timeout [default: 10s]
    #[arg(long, value_parser = parse_duration)]
    pub timeout: Option<Duration>,

    /// Write a JSON report to this path
    #[arg(long, value_name = "PATH")]
    pub output: Option<PathBuf>,

    /// Console output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub format: OutputFormat,
}

#[derive(Debug, Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Target URL
    #[arg(long)]
    pub url: Option<String>,

    /// HTTP method: GET, POST, PUT, PATCH or DELETE [default: GET]
    #[arg(long)]
    pub method: Option<String>,

    /// Request body; valid JSON is sent as JSON, anything else verbatim
    #[arg(long)]
    pub body: Option<String>,

    /// Send exactly this many requests
    #[arg(long, conflicts_with = "duration")]
    pub total_requests: Option<u64>,
}

#[derive(Debug, Args)]
pub struct ConversationArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// URL that creates a conversation (POST)
    #[arg(long)]
    pub create_url: Option<String>,

    /// URL that accepts messages (POST)
    #[arg(long)]
    pub message_url: Option<String>,

    /// Body of the create request, sent verbatim
    #[arg(long)]
    pub create_body: Option<String>,

    /// Body of each message; every placeholder occurrence is replaced with the id
    #[arg(long)]
    pub message_body_template: Option<String>,

    /// Messages posted after each successful create [default: 3]
    #[arg(long)]
    pub messages_per_conversation: Option<u64>,

    /// Placeholder substituted in the message template [default: {{conversationId}}]
    #[arg(long)]
    pub placeholder: Option<String>,

    /// Run exactly this many conversations
    #[arg(long, conflicts_with = "duration")]
    pub total_conversations: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_accepts_common_units() {
        assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
        assert_eq!(parse_duration("10s"), Ok(Duration::from_secs(10)));
        assert_eq!(parse_duration("1m"), Ok(Duration::from_secs(60)));
        assert_eq!(parse_duration("2h"), Ok(Duration::from_secs(2 * 60 * 60)));
    }

    #[test]
    fn parse_duration_treats_bare_numbers_as_seconds() {
        assert_eq!(parse_duration("30"), Ok(Duration::from_secs(30)));
        assert_eq!(parse_duration(" 5 "), Ok(Duration::from_secs(5)));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("").is_err());
        assert!(parse_duration("abc").is_err());
        assert!(parse_duration("10x").is_err());
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("-5").is_err());
    }

    #[test]
    fn cli_parses_run() {
        let parsed = Cli::try_parse_from([
            "loadr",
            "run",
            "--url",
            "http://localhost:8080/",
            "--method",
            "post",
            "--concurrency",
            "4",
            "--total-requests",
            "100",
            "--timeout",
            "500ms",
            "--headers",
            r#"{"x-test":"1"}"#,
            "--format",
            "json",
        ]);

        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Run(args) => {
                assert_eq!(args.url.as_deref(), Some("http://localhost:8080/"));
                assert_eq!(args.method.as_deref(), Some("post"));
                assert_eq!(args.common.concurrency, Some(4));
                assert_eq!(args.total_requests, Some(100));
                assert_eq!(args.common.timeout, Some(Duration::from_millis(500)));
                assert_eq!(args.common.duration, None);
                assert!(matches!(args.common.format, OutputFormat::Json));
            }
            Command::Conversation(_) => panic!("expected run command"),
        }
    }

    #[test]
    fn cli_rejects_both_stop_conditions() {
        let parsed = Cli::try_parse_from([
            "loadr",
            "run",
            "--url",
            "http://localhost/",
            "--duration",
            "5s",
            "--total-requests",
            "10",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn cli_parses_conversation_defaults() {
        let parsed = Cli::try_parse_from([
            "loadr",
            "conversation",
            "--create-url",
            "http://h/c",
            "--message-url",
            "http://h/m",
        ]);
        let cli = match parsed {
            Ok(v) => v,
            Err(err) => panic!("failed to parse args: {err}"),
        };

        match cli.command {
            Command::Conversation(args) => {
                assert_eq!(args.create_url.as_deref(), Some("http://h/c"));
                assert_eq!(args.messages_per_conversation, None);
                assert_eq!(args.total_conversations, None);
                assert!(matches!(args.common.format, OutputFormat::HumanReadable));
            }
            Command::Run(_) => panic!("expected conversation command"),
        }
    }
}
