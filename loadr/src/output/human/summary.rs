use std::fmt::Write as _;

use loadr_core::runner::RunOutput;
use loadr_core::{ResultSummary, RunConfig, RunMode, StepKind};

use super::format::*;

pub(crate) fn render(cfg: &RunConfig, out: &RunOutput) -> String {
    let mut s = String::new();

    s.push_str("summary\n");
    writeln!(s, "  elapsed: {:.2}s", out.elapsed.as_secs_f64()).ok();

    match &cfg.mode {
        RunMode::Single(_) => {
            s.push('\n');
            render_result(&mut s, "requests", &out.summary());
        }
        RunMode::Conversation(_) => {
            writeln!(s, "  conversations: {}", out.units_completed).ok();
            s.push('\n');
            render_result(&mut s, "create", &out.summary_for(StepKind::Create));
            s.push('\n');
            render_result(&mut s, "message", &out.summary_for(StepKind::Message));
        }
    }

    s
}

fn render_result(out: &mut String, title: &str, r: &ResultSummary) {
    writeln!(out, "{title}").ok();
    writeln!(out, "  total: {}", r.total_requests).ok();

    if r.total_requests == 0 {
        out.push_str("  latency: n/a\n");
        return;
    }

    let ok_pct = r.success_rate_pct();
    writeln!(
        out,
        "  ok: {} ({})  failed: {} ({})",
        r.successful_requests,
        format_pct(ok_pct),
        r.failed_requests,
        format_pct(100.0 - ok_pct)
    )
    .ok();
    writeln!(
        out,
        "  duration: {:.2}s  rps: {:.2}  received: {}",
        r.total_duration,
        r.requests_per_second,
        format_bytes(r.bytes_received)
    )
    .ok();
    writeln!(
        out,
        "  latency = avg={} p50={} p90={} p99={} min={} max={}",
        format_ms(r.average_latency),
        format_ms(r.p50_latency),
        format_ms(r.p90_latency),
        format_ms(r.p99_latency),
        format_ms(r.min_latency),
        format_ms(r.max_latency)
    )
    .ok();

    if !r.status_codes.is_empty() {
        out.push_str("  status codes:\n");
        for (code, count) in &r.status_codes {
            writeln!(out, "    {code}: {count}").ok();
        }
    }

    if !r.errors.is_empty() {
        out.push_str("  errors:\n");

        let mut errors: Vec<_> = r.errors.iter().collect();
        errors.sort_by(|(a_name, a_count), (b_name, b_count)| {
            b_count.cmp(a_count).then_with(|| a_name.cmp(b_name))
        });

        for (error, count) in errors {
            writeln!(out, "    {error}: {count}").ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadr_core::{ConversationTarget, HttpMethod, RequestTarget, SampleRecord, StopCondition};
    use std::time::Duration;

    fn sample(
        kind: StepKind,
        latency_ms: u64,
        status: Option<u16>,
        error: Option<&str>,
    ) -> SampleRecord {
        SampleRecord {
            kind,
            started: Duration::ZERO,
            finished: Duration::from_millis(latency_ms),
            ok: status.is_some_and(|s| s < 400),
            status,
            error: error.map(str::to_string),
            response_size: status.map(|_| 100),
        }
    }

    #[test]
    fn single_mode_lists_statuses_and_errors() {
        let cfg = RunConfig::new(
            RunMode::Single(RequestTarget {
                url: "http://h/".to_string(),
                method: HttpMethod::Get,
                body: None,
            }),
            StopCondition::Total(4),
        );
        let out = RunOutput {
            samples: vec![
                sample(StepKind::Request, 10, Some(200), None),
                sample(StepKind::Request, 20, Some(200), None),
                sample(StepKind::Request, 30, Some(503), None),
                sample(StepKind::Request, 40, None, Some("timeout")),
            ],
            elapsed: Duration::from_secs(1),
            units_completed: 4,
        };

        let text = render(&cfg, &out);
        assert!(text.starts_with("summary\n"));
        assert!(text.contains("requests\n  total: 4\n"));
        assert!(text.contains("ok: 2 (50.0%)  failed: 2 (50.0%)"));
        assert!(text.contains("min=10.00ms max=40.00ms"));
        assert!(text.contains("    200: 2\n    503: 1\n"));
        assert!(text.contains("  errors:\n    timeout: 1\n"));
    }

    #[test]
    fn conversation_mode_renders_one_block_per_step() {
        let cfg = RunConfig::new(
            RunMode::Conversation(ConversationTarget::new("http://h/c", "http://h/m")),
            StopCondition::Total(1),
        );
        let out = RunOutput {
            samples: vec![sample(StepKind::Create, 5, Some(500), None)],
            elapsed: Duration::from_millis(10),
            units_completed: 1,
        };

        let text = render(&cfg, &out);
        assert!(text.contains("  conversations: 1\n"));
        assert!(text.contains("create\n  total: 1\n"));
        assert!(text.contains("message\n  total: 0\n  latency: n/a\n"));
        assert!(!text.contains("  errors:"));
    }
}
