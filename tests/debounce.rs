mod common;
use crate::common::{init_tracing, settle, TestResult};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use cmdflight::command::ActionFuture;
use cmdflight::{AsyncCommand, CancellationSignal};
use tokio::time::Instant;

const DELAY: Duration = Duration::from_millis(100);

/// Records `(param, elapsed since base)` for each action start.
#[derive(Clone)]
struct StartLog {
    base: Instant,
    starts: Arc<Mutex<Vec<(String, Duration)>>>,
}

impl StartLog {
    fn new() -> Self {
        Self {
            base: Instant::now(),
            starts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    fn starts(&self) -> Vec<(String, Duration)> {
        self.starts.lock().unwrap().clone()
    }

    fn action(self) -> impl Fn(String, CancellationSignal) -> ActionFuture + Send + Sync + 'static {
        let log = self;
        move |param: String, _signal: CancellationSignal| -> ActionFuture {
            let log = log.clone();
            Box::pin(async move {
                log.starts
                    .lock()
                    .unwrap()
                    .push((param, log.base.elapsed()));
                anyhow::Ok(())
            })
        }
    }
}

#[tokio::test(start_paused = true)]
async fn only_the_last_call_in_a_burst_runs() -> TestResult {
    init_tracing();

    let log = StartLog::new();
    let command = AsyncCommand::builder(log.clone().action()).delay(DELAY).build();
    assert_eq!(command.delay(), DELAY);

    let a = command.execute_async("a".into())?;
    assert!(command.is_running(), "running covers the debounce window");

    tokio::time::sleep(Duration::from_millis(50)).await;
    let b = command.execute_async("b".into())?;

    // The superseded call resolves without running its action.
    a.await?;
    assert!(log.starts().is_empty());
    assert!(command.is_running());

    b.await?;
    let starts = log.starts();
    assert_eq!(starts.len(), 1);
    assert_eq!(starts[0].0, "b");
    assert!(starts[0].1 >= Duration::from_millis(150), "started at {:?}", starts[0].1);
    assert!(!command.is_running());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn spaced_calls_each_run_after_the_delay() -> TestResult {
    init_tracing();

    let log = StartLog::new();
    let command = AsyncCommand::builder(log.clone().action()).delay(DELAY).build();

    command.execute_async("a".into())?.await?;
    command.execute_async("b".into())?.await?;

    let names: Vec<_> = log.starts().into_iter().map(|(name, _)| name).collect();
    assert_eq!(names, vec!["a", "b"]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn admission_is_reevaluated_after_the_delay() -> TestResult {
    init_tracing();

    let allowed = Arc::new(AtomicBool::new(true));
    let gate = Arc::clone(&allowed);
    let log = StartLog::new();
    let command = AsyncCommand::builder(log.clone().action())
        .delay(DELAY)
        .can_execute(move |_: &String| gate.load(Ordering::SeqCst))
        .build();

    let pending = command.execute_async("a".into())?;
    allowed.store(false, Ordering::SeqCst);

    pending.await?;
    assert!(log.starts().is_empty());
    assert!(!command.is_running());
    assert!(command.error().is_none());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancel_during_the_delay_drops_the_pending_call() -> TestResult {
    init_tracing();

    let log = StartLog::new();
    let command = AsyncCommand::builder(log.clone().action()).delay(DELAY).build();

    let pending = command.execute_async("a".into())?;
    settle().await;
    command.cancel()?;

    pending.await?;
    assert!(log.starts().is_empty());
    assert!(!command.is_running());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn zero_delay_runs_immediately() -> TestResult {
    init_tracing();

    let log = StartLog::new();
    let command = AsyncCommand::builder(log.clone().action()).build();
    assert_eq!(command.delay(), Duration::ZERO);

    command.execute_async("a".into())?.await?;
    assert_eq!(log.starts(), vec![("a".to_string(), Duration::ZERO)]);
    Ok(())
}
