use std::process::Command;

use anyhow::Context as _;

fn status_code(status: std::process::ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

fn run_loadr(args: &[&str]) -> anyhow::Result<std::process::Output> {
    let exe = env!("CARGO_BIN_EXE_loadr");
    Command::new(exe)
        .args(args)
        .output()
        .context("run loadr binary")
}

fn expect_code(out: &std::process::Output, code: i32) -> anyhow::Result<()> {
    anyhow::ensure!(
        status_code(out.status) == code,
        "expected exit code {code}, got {}\nstdout:\n{}\nstderr:\n{}",
        status_code(out.status),
        String::from_utf8_lossy(&out.stdout),
        String::from_utf8_lossy(&out.stderr)
    );
    Ok(())
}

#[test]
fn help_exits_0() -> anyhow::Result<()> {
    let out = run_loadr(&["--help"])?;
    expect_code(&out, 0)
}

#[test]
fn invalid_duration_flag_exits_30() -> anyhow::Result<()> {
    let out = run_loadr(&["run", "--url", "http://127.0.0.1:1/", "--duration", "10x"])?;
    expect_code(&out, 30)
}

#[test]
fn both_stop_conditions_exit_30() -> anyhow::Result<()> {
    let out = run_loadr(&[
        "run",
        "--url",
        "http://127.0.0.1:1/",
        "--duration",
        "1s",
        "--total-requests",
        "5",
    ])?;
    expect_code(&out, 30)
}

#[test]
fn missing_url_exits_30() -> anyhow::Result<()> {
    let out = run_loadr(&["run", "--total-requests", "1"])?;
    expect_code(&out, 30)?;

    let stderr = String::from_utf8_lossy(&out.stderr);
    anyhow::ensure!(
        stderr.contains("`url` is required"),
        "unexpected stderr: {stderr}"
    );
    Ok(())
}

#[test]
fn invalid_method_exits_30() -> anyhow::Result<()> {
    let out = run_loadr(&["run", "--url", "http://127.0.0.1:1/", "--method", "TRACE"])?;
    expect_code(&out, 30)
}

#[test]
fn unreadable_config_exits_30() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("missing.json");
    let missing = missing.to_string_lossy().to_string();

    let out = run_loadr(&["run", "--config", &missing])?;
    expect_code(&out, 30)
}

#[test]
fn malformed_config_exits_30() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("bad.json");
    std::fs::write(&path, "{ not json")?;
    let path = path.to_string_lossy().to_string();

    let out = run_loadr(&["run", "--config", &path])?;
    expect_code(&out, 30)
}
