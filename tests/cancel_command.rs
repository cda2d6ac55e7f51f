mod common;
use crate::common::{init_tracing, settle, stubborn_action, timed_action, ActionLog, TestResult};

use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use cmdflight::command::ActionFuture;
use cmdflight::{AsyncCommand, CancellationSignal, CommandError, Property};
use cmdflight_test_utils::sinks::RecordingSink;

fn command_with_cancel_sink(
    action: impl Fn(String, CancellationSignal) -> ActionFuture + Send + Sync + 'static,
) -> (AsyncCommand<String>, Arc<RecordingSink>) {
    let cancel_sink = RecordingSink::new();
    let command = AsyncCommand::builder(action)
        .name("search")
        .cancel_sink(cancel_sink.clone())
        .build();
    (command, cancel_sink)
}

#[tokio::test(start_paused = true)]
async fn cancel_is_only_admissible_while_the_owner_runs() -> TestResult {
    init_tracing();

    let log = ActionLog::new();
    let (command, cancel_sink) = command_with_cancel_sink(timed_action(log.clone(), Duration::from_secs(1)));
    let cancel = command.cancel_command();

    assert!(!cancel.can_execute());
    cancel.execute_async().await?;
    assert!(!cancel.is_running());
    assert!(cancel_sink.events().is_empty(), "inadmissible cancel is silent");

    let completion = command.execute_async("a".into())?;
    assert!(cancel.can_execute());
    assert_eq!(cancel_sink.events(), vec![Property::CanExecute]);

    completion.await?;
    assert!(!cancel.can_execute());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancel_completes_when_the_owner_stops_running() -> TestResult {
    init_tracing();

    let log = ActionLog::new();
    let (command, cancel_sink) = command_with_cancel_sink(timed_action(log.clone(), Duration::from_secs(1)));
    let cancel = command.cancel_command();

    let completion = command.execute_async("a".into())?;
    settle().await;
    cancel_sink.clear();

    let cancelled = cancel.execute_async();
    assert!(cancel.is_running());
    assert!(!cancel.can_execute(), "a second cancel is not admissible");
    assert_eq!(cancel_sink.events(), vec![Property::IsRunning, Property::CanExecute]);

    cancelled.await?;
    assert!(!cancel.is_running());
    assert!(!command.is_running());
    assert!(cancel.error().is_none());

    assert!(completion.await.unwrap_err().is_cancelled());
    assert_eq!(log.entries(), vec!["start:a", "cancelled:a"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancel_stays_active_until_an_uncooperative_owner_finishes() -> TestResult {
    init_tracing();

    let log = ActionLog::new();
    let (command, _cancel_sink) = command_with_cancel_sink(stubborn_action(log.clone(), Duration::from_millis(50)));
    let cancel = command.cancel_command();

    let completion = command.execute_async("a".into())?;
    settle().await;

    cancel.execute();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(cancel.is_running(), "owner still running");
    assert!(command.is_running());

    completion.await?;
    assert!(!cancel.is_running(), "owner idle forces the cancel command idle");
    assert_eq!(log.entries(), vec!["start:a", "finish:a"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancel_failure_is_recorded_on_the_cancel_command_only() -> TestResult {
    init_tracing();

    let (command, cancel_sink) = command_with_cancel_sink(|_: String, signal: CancellationSignal| -> ActionFuture {
        let registered = signal.subscribe(|| Err(anyhow!("cleanup refused")));
        Box::pin(async move {
            let outcome: anyhow::Result<()> = match registered {
                Ok(()) => {
                    signal.cancelled().await;
                    Ok(())
                }
                Err(err) => Err(err),
            };
            outcome
        })
    });
    let cancel = command.cancel_command();

    let completion = command.execute_async("a".into())?;
    settle().await;
    cancel_sink.clear();

    let err = cancel.execute_async().await.unwrap_err();
    assert!(matches!(err, CommandError::CancelFailed(_)));
    assert_eq!(err.to_string(), "cancel request failed: cleanup refused");

    assert!(!cancel.is_running());
    assert_eq!(
        cancel.error().map(|e| e.to_string()).as_deref(),
        Some("cleanup refused")
    );
    assert_eq!(cancel_sink.count(Property::Error), 1);

    // The owner's action still observed the trigger and finished cleanly.
    completion.await?;
    assert!(command.error().is_none());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn next_cancel_clears_the_previous_cancel_error() -> TestResult {
    init_tracing();

    let (command, _cancel_sink) = command_with_cancel_sink(|param: String, signal: CancellationSignal| -> ActionFuture {
        let registered = if param == "refuse" {
            signal.subscribe(|| Err(anyhow!("cleanup refused")))
        } else {
            Ok(())
        };
        Box::pin(async move {
            let outcome: anyhow::Result<()> = match registered {
                Ok(()) => {
                    signal.cancelled().await;
                    Ok(())
                }
                Err(err) => Err(err),
            };
            outcome
        })
    });
    let cancel = command.cancel_command();

    let first = command.execute_async("refuse".into())?;
    settle().await;
    let _ = cancel.execute_async().await;
    assert!(cancel.error().is_some());
    first.await?;

    let second = command.execute_async("accept".into())?;
    settle().await;
    cancel.execute_async().await?;
    assert!(cancel.error().is_none());
    second.await?;
    Ok(())
}

#[tokio::test]
async fn cancel_command_is_shared_between_clones() {
    let command: AsyncCommand<()> =
        AsyncCommand::new(|_: (), _: CancellationSignal| async { anyhow::Ok(()) });
    let clone = command.clone();

    let a = command.cancel_command();
    let b = clone.cancel_command();
    assert!(!a.can_execute());
    assert!(!b.can_execute());
    assert!(format!("{a:?}").contains("CancelCommand"));
}
