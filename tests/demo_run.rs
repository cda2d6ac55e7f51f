mod common;
use crate::common::{init_tracing, with_timeout, TestResult};

use clap::Parser;
use cmdflight::cli::CliArgs;

fn args(extra: &[&str]) -> CliArgs {
    let mut argv = vec!["cmdflight", "--input", "r,ru,rus", "--interval", "10ms", "--work", "100ms"];
    argv.extend_from_slice(extra);
    CliArgs::parse_from(argv)
}

#[tokio::test(start_paused = true)]
async fn replay_returns_once_every_superseded_run_has_unwound() -> TestResult {
    init_tracing();

    with_timeout(cmdflight::run(args(&["--cancel-previous"]))).await?;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn replay_with_debounce_and_cancel_returns() -> TestResult {
    init_tracing();

    let run = cmdflight::run(args(&["--delay", "30ms", "--cancel-after", "20ms"]));
    with_timeout(run).await?;
    Ok(())
}
