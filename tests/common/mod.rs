#![allow(dead_code, unused_imports)]

use std::sync::Arc;

use cmdflight::AsyncCommand;
use cmdflight_test_utils::sinks::RecordingSink;

pub use cmdflight_test_utils::actions::{failing_action, stubborn_action, timed_action, ActionLog};
pub use cmdflight_test_utils::{init_tracing, wait_until, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

/// Let spawned executions make progress without advancing time.
pub async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

/// A `String` command wired to a fresh recording sink.
pub fn recorded_command<F>(
    action: F,
) -> (AsyncCommand<String>, Arc<RecordingSink>)
where
    F: Fn(String, cmdflight::CancellationSignal) -> cmdflight::command::ActionFuture
        + Send
        + Sync
        + 'static,
{
    let sink = RecordingSink::new();
    let command = AsyncCommand::builder(action)
        .name("test")
        .sink(sink.clone())
        .build();
    (command, sink)
}
