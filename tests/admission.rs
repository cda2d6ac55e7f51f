mod common;
use crate::common::{init_tracing, settle, timed_action, ActionLog, TestResult};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cmdflight::{AsyncCommand, CancellationSignal, Property};
use cmdflight_test_utils::sinks::RecordingSink;

#[tokio::test]
async fn execute_while_inadmissible_never_runs_the_action() -> TestResult {
    init_tracing();

    let log = ActionLog::new();
    let sink = RecordingSink::new();
    let command = AsyncCommand::builder(timed_action(log.clone(), Duration::from_millis(5)))
        .can_execute(|query: &String| !query.is_empty())
        .sink(sink.clone())
        .build();

    assert!(!command.can_execute(&String::new()));

    command.execute(String::new())?;
    assert!(!command.is_running());

    let completion = command.execute_async(String::new())?;
    assert!(!command.is_running());
    completion.await?;

    settle().await;
    assert!(log.entries().is_empty());
    assert!(sink.events().is_empty(), "denied admission must not notify");
    assert_eq!(command.running_count(), 0);
    Ok(())
}

#[tokio::test]
async fn admission_follows_external_state() -> TestResult {
    init_tracing();

    let enabled = Arc::new(AtomicBool::new(false));
    let gate = Arc::clone(&enabled);
    let log = ActionLog::new();
    let command = AsyncCommand::builder(timed_action(log.clone(), Duration::from_millis(1)))
        .can_execute(move |_: &String| gate.load(Ordering::SeqCst))
        .build();

    let param = "q".to_string();
    assert!(!command.can_execute(&param));

    enabled.store(true, Ordering::SeqCst);
    assert!(command.can_execute(&param));

    command.execute_async(param)?.await?;
    assert_eq!(log.entries(), vec!["start:q", "finish:q"]);
    Ok(())
}

#[tokio::test]
async fn command_without_predicate_is_always_admissible() {
    let command: AsyncCommand<u32> =
        AsyncCommand::new(|_: u32, _: CancellationSignal| async { anyhow::Ok(()) });

    assert!(command.can_execute(&0));
    assert!(command.can_execute(&u32::MAX));
}

#[tokio::test]
async fn can_execute_has_no_side_effects() {
    let sink = RecordingSink::new();
    let command = AsyncCommand::builder(|_: (), _: CancellationSignal| async { anyhow::Ok(()) })
        .can_execute(|_: &()| false)
        .sink(sink.clone())
        .build();

    for _ in 0..3 {
        assert!(!command.can_execute(&()));
    }
    assert!(!command.is_running());
    assert!(command.error().is_none());
    assert!(!command.has_cancellation_signal());
    assert!(sink.events().is_empty());
}

#[tokio::test]
#[should_panic(expected = "predicate exploded")]
async fn panicking_predicate_propagates_to_the_caller() {
    let command = AsyncCommand::builder(|_: (), _: CancellationSignal| async { anyhow::Ok(()) })
        .can_execute(|_: &()| panic!("predicate exploded"))
        .build();

    let _ = command.can_execute(&());
}

#[tokio::test]
async fn raise_can_execute_changed_publishes_only_that_property() {
    let sink = RecordingSink::new();
    let command = AsyncCommand::builder(|_: (), _: CancellationSignal| async { anyhow::Ok(()) })
        .sink(sink.clone())
        .build();

    command.raise_can_execute_changed();
    assert_eq!(sink.events(), vec![Property::CanExecute]);
}

#[test]
fn dispatch_outside_a_runtime_is_rejected_without_state_change() {
    let command = AsyncCommand::new(|_: (), _: CancellationSignal| async { anyhow::Ok(()) });

    let err = command.execute(()).unwrap_err();
    assert!(matches!(err, cmdflight::CommandError::NoRuntime(_)));
    assert!(!command.is_running());
}
