use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::anyhow;
use cmdflight::command::ActionFuture;
use cmdflight::{CancellationSignal, Cancelled};

/// Shared, ordered log of what actions did, e.g. `"start:a"`,
/// `"cancelled:a"`, `"finish:b"`.
#[derive(Debug, Clone, Default)]
pub struct ActionLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl ActionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }

    pub fn count_prefix(&self, prefix: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.starts_with(prefix))
            .count()
    }

    pub fn contains(&self, entry: &str) -> bool {
        self.entries.lock().unwrap().iter().any(|e| e == entry)
    }
}

/// Action that works for `work`, unwinding early with `Cancelled` if its
/// signal fires.
pub fn timed_action(
    log: ActionLog,
    work: Duration,
) -> impl Fn(String, CancellationSignal) -> ActionFuture + Send + Sync + 'static {
    move |param: String, signal: CancellationSignal| -> ActionFuture {
        let log = log.clone();
        Box::pin(async move {
            log.push(format!("start:{param}"));
            tokio::select! {
                _ = signal.cancelled() => {
                    log.push(format!("cancelled:{param}"));
                    Err(anyhow::Error::new(Cancelled))
                }
                _ = tokio::time::sleep(work) => {
                    log.push(format!("finish:{param}"));
                    Ok(())
                }
            }
        })
    }
}

/// Action that ignores cancellation and always runs for `work`.
pub fn stubborn_action(
    log: ActionLog,
    work: Duration,
) -> impl Fn(String, CancellationSignal) -> ActionFuture + Send + Sync + 'static {
    move |param: String, _signal: CancellationSignal| -> ActionFuture {
        let log = log.clone();
        Box::pin(async move {
            log.push(format!("start:{param}"));
            tokio::time::sleep(work).await;
            log.push(format!("finish:{param}"));
            Ok(())
        })
    }
}

/// Action that fails with `message` after `work`, or unwinds with
/// `Cancelled` if its signal fires first.
pub fn failing_action(
    log: ActionLog,
    work: Duration,
    message: &'static str,
) -> impl Fn(String, CancellationSignal) -> ActionFuture + Send + Sync + 'static {
    move |param: String, signal: CancellationSignal| -> ActionFuture {
        let log = log.clone();
        Box::pin(async move {
            log.push(format!("start:{param}"));
            let err = tokio::select! {
                _ = signal.cancelled() => {
                    log.push(format!("cancelled:{param}"));
                    anyhow::Error::new(Cancelled)
                }
                _ = tokio::time::sleep(work) => {
                    log.push(format!("failed:{param}"));
                    anyhow!(message)
                }
            };
            Err(err)
        })
    }
}
