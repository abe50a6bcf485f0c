use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Context as _;
use loadr_core::runner::run;
use loadr_core::{
    Error, HttpMethod, RequestBody, RequestTarget, RunConfig, RunMode, StepKind, StopCondition,
    TIMEOUT_ERROR,
};
use loadr_testserver::{SLOW_DELAY, TestServer};

fn single(url: &str, method: HttpMethod, stop: StopCondition) -> RunConfig {
    RunConfig::new(
        RunMode::Single(RequestTarget {
            url: url.to_string(),
            method,
            body: None,
        }),
        stop,
    )
}

#[tokio::test]
async fn count_mode_sends_exactly_total_requests() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let mut cfg = single(
        &server.urls().hello,
        HttpMethod::Get,
        StopCondition::Total(50),
    );
    cfg.concurrency = 7;

    let out = run(&cfg, None).await?;
    let summary = out.summary();

    assert_eq!(out.samples.len(), 50);
    assert_eq!(out.units_completed, 50);
    assert_eq!(server.stats().requests_total(), 50);
    assert_eq!(summary.total_requests, 50);
    assert_eq!(summary.successful_requests, 50);
    assert_eq!(summary.status_codes.get(&200), Some(&50));
    assert!(summary.errors.is_empty());
    assert!(out.samples.iter().all(|s| s.kind == StepKind::Request));
    assert_eq!(summary.bytes_received, 50 * "Hello World!".len() as u64);

    Ok(())
}

#[tokio::test]
async fn single_worker_reports_consistent_percentiles() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let mut cfg = single(&server.urls().hello, HttpMethod::Get, StopCondition::Total(3));
    cfg.concurrency = 1;

    let out = run(&cfg, None).await?;
    let summary = out.summary();

    assert_eq!(summary.total_requests, 3);
    assert_eq!(summary.successful_requests, 3);
    assert_eq!(summary.failed_requests, 0);

    let mut observed: Vec<f64> = out.samples.iter().map(|s| s.latency_ms()).collect();
    observed.sort_by(f64::total_cmp);
    assert_eq!(summary.min_latency, observed[0]);
    assert_eq!(summary.max_latency, observed[2]);
    // With three samples the median is the middle observation.
    assert_eq!(summary.p50_latency, observed[1]);
    for p in [summary.p90_latency, summary.p99_latency] {
        assert!(p >= observed[1] - 1e-9 && p <= observed[2] + 1e-9, "p={p} observed={observed:?}");
    }
    assert!(summary.min_latency <= summary.p50_latency);
    assert!(summary.p50_latency <= summary.p90_latency);
    assert!(summary.p90_latency <= summary.p99_latency);
    assert!(summary.p99_latency <= summary.max_latency);
    assert!(summary.total_duration > 0.0);
    assert!(summary.requests_per_second > 0.0);

    Ok(())
}

#[tokio::test]
async fn duration_mode_runs_for_about_the_requested_time() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let deadline = Duration::from_millis(500);
    let mut cfg = single(
        &server.urls().slow,
        HttpMethod::Get,
        StopCondition::Duration(deadline),
    );
    cfg.concurrency = 4;

    let out = run(&cfg, None).await?;

    assert!(out.elapsed >= deadline);
    assert!(out.elapsed < deadline + Duration::from_secs(2));
    assert!(!out.samples.is_empty());
    for s in &out.samples {
        assert!(s.latency() >= SLOW_DELAY);
        assert!(s.started <= deadline + SLOW_DELAY);
    }

    Ok(())
}

#[tokio::test]
async fn duration_shorter_than_timeout_waits_for_in_flight_requests() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let deadline = Duration::from_millis(300);
    let timeout = Duration::from_secs(1);
    let mut cfg = single(
        &server.urls().hang,
        HttpMethod::Get,
        StopCondition::Duration(deadline),
    );
    cfg.concurrency = 3;
    cfg.timeout = timeout;

    let out = run(&cfg, None).await?;
    let summary = out.summary();

    assert!(out.elapsed >= timeout);
    assert!(out.elapsed < deadline + timeout + Duration::from_secs(1));
    assert_eq!(summary.total_requests, 3);
    assert_eq!(summary.errors.get(TIMEOUT_ERROR), Some(&summary.total_requests));
    for s in &out.samples {
        assert!(s.started <= deadline, "sample started after the deadline: {s:?}");
    }

    drop(server);
    Ok(())
}

#[tokio::test]
async fn stalled_connection_counts_as_timeout() -> anyhow::Result<()> {
    // Bound but never accepted: the handshake completes from the backlog and nothing answers.
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    let addr = listener.local_addr()?;

    let mut cfg = single(
        &format!("http://{addr}/"),
        HttpMethod::Get,
        StopCondition::Total(2),
    );
    cfg.concurrency = 2;
    cfg.timeout = Duration::from_millis(200);

    let summary = run(&cfg, None).await?.summary();

    assert_eq!(summary.failed_requests, 2);
    assert_eq!(summary.errors.get(TIMEOUT_ERROR), Some(&2));

    drop(listener);
    Ok(())
}

#[tokio::test]
async fn timeouts_are_classified() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let mut cfg = single(&server.urls().hang, HttpMethod::Get, StopCondition::Total(2));
    cfg.concurrency = 2;
    cfg.timeout = Duration::from_millis(50);

    let out = run(&cfg, None).await?;
    let summary = out.summary();

    assert_eq!(summary.total_requests, 2);
    assert_eq!(summary.failed_requests, 2);
    assert_eq!(summary.errors.get(TIMEOUT_ERROR), Some(&2));
    assert!(summary.status_codes.is_empty());
    for s in &out.samples {
        assert!(!s.ok);
        assert_eq!(s.status, None);
        assert!(s.latency() < Duration::from_secs(5));
    }

    // `/hang` keeps requests open; let drop abort the server instead of draining it.
    drop(server);
    Ok(())
}

#[tokio::test]
async fn non_success_statuses_are_failures_not_errors() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let cfg = single(
        &server.urls().status(503),
        HttpMethod::Delete,
        StopCondition::Total(4),
    );
    let summary = run(&cfg, None).await?.summary();

    assert_eq!(summary.failed_requests, 4);
    assert_eq!(summary.status_codes.get(&503), Some(&4));
    assert!(summary.errors.is_empty());

    Ok(())
}

#[tokio::test]
async fn unreachable_target_records_transport_errors() -> anyhow::Result<()> {
    // Bind then release a port so nothing is listening on it.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
        listener.local_addr()?
    };

    let cfg = single(
        &format!("http://{addr}/"),
        HttpMethod::Get,
        StopCondition::Total(3),
    );
    let summary = run(&cfg, None).await?.summary();

    assert_eq!(summary.total_requests, 3);
    assert_eq!(summary.failed_requests, 3);
    assert!(summary.status_codes.is_empty());
    assert_eq!(summary.errors.values().sum::<u64>(), 3);
    assert!(summary.errors.keys().all(|k| !k.is_empty()));

    Ok(())
}

#[tokio::test]
async fn headers_and_json_bodies_reach_the_server() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let mut cfg = RunConfig::new(
        RunMode::Single(RequestTarget {
            url: server.urls().echo.clone(),
            method: HttpMethod::Post,
            body: Some(RequestBody::Json(serde_json::json!({"hello": "world"}))),
        }),
        StopCondition::Total(5),
    );
    cfg.headers = BTreeMap::from([("X-Test".to_string(), "1".to_string())]);

    let out = run(&cfg, None).await?;
    let summary = out.summary();

    assert_eq!(summary.successful_requests, 5);
    assert_eq!(server.stats().saw_custom_header(), 5);
    assert_eq!(server.stats().saw_json_content_type(), 5);
    // `/echo` answers with the request body.
    let encoded = br#"{"hello":"world"}"#.len() as u64;
    assert_eq!(summary.bytes_received, 5 * encoded);

    Ok(())
}

#[tokio::test]
async fn config_errors_surface_before_any_request() -> anyhow::Result<()> {
    let server = TestServer::start().await.context("start test server")?;

    let mut cfg = single(&server.urls().hello, HttpMethod::Get, StopCondition::Total(5));
    cfg.headers = BTreeMap::from([("bad header".to_string(), "x".to_string())]);

    let res = run(&cfg, None).await;
    assert!(matches!(res, Err(Error::InvalidHeader(_))));
    assert_eq!(server.stats().requests_total(), 0);

    Ok(())
}
