// src/command/tracker.rs

//! Running counter, error slot and their notifications.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{trace, warn};

use crate::notify::{NotificationSink, Observer, Publisher};
use crate::types::{Property, RunOutcome};

#[derive(Debug, Default)]
struct TrackerState {
    running: usize,
    last_error: Option<Arc<anyhow::Error>>,
}

/// Tracks how many executions are in flight and the last failure.
///
/// State is always updated before the matching notification is published,
/// and notifications are published with no lock held, so observers may
/// query the tracker freely.
#[derive(Debug)]
pub struct ExecutionTracker {
    state: Mutex<TrackerState>,
    publisher: Publisher,
}

impl ExecutionTracker {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            state: Mutex::new(TrackerState::default()),
            publisher: Publisher::new(sink),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_running(&self) -> bool {
        self.lock().running > 0
    }

    pub fn running_count(&self) -> usize {
        self.lock().running
    }

    pub fn last_error(&self) -> Option<Arc<anyhow::Error>> {
        self.lock().last_error.clone()
    }

    pub fn subscribe(&self, observer: Observer) {
        self.publisher.subscribe(observer);
    }

    pub fn publish(&self, property: Property) {
        self.publisher.publish(property);
    }

    /// Count a new execution and clear the previous error.
    ///
    /// Publishes `IsRunning` (and `CanExecute`) on the 0 → 1 transition,
    /// then `Error` if an error was cleared.
    pub fn start(&self) {
        let (became_running, cleared_error) = {
            let mut state = self.lock();
            state.running += 1;
            (state.running == 1, state.last_error.take().is_some())
        };

        trace!(became_running, "execution started");

        if became_running {
            self.publisher.publish(Property::IsRunning);
            self.publisher.publish(Property::CanExecute);
        }
        if cleared_error {
            self.publisher.publish(Property::Error);
        }
    }

    /// Uncount an execution and record its failure, if any.
    ///
    /// `on_idle` runs under the tracker lock when the count reaches zero,
    /// so per-run resources can be torn down before a new execution can
    /// start. Publishes `IsRunning` (and `CanExecute`) on the 1 → 0
    /// transition, then `Error` if the outcome carries one.
    pub fn finish(&self, outcome: &RunOutcome, on_idle: impl FnOnce()) {
        let (became_idle, failed) = {
            let mut state = self.lock();
            let counted = state.running > 0;
            if counted {
                state.running -= 1;
            } else {
                warn!("execution finished while no execution was counted");
            }

            let failed = match outcome.error() {
                Some(err) => {
                    state.last_error = Some(Arc::clone(err));
                    true
                }
                None => false,
            };

            let became_idle = counted && state.running == 0;
            if became_idle {
                on_idle();
            }
            (became_idle, failed)
        };

        trace!(became_idle, failed, "execution finished");

        if became_idle {
            self.publisher.publish(Property::IsRunning);
            self.publisher.publish(Property::CanExecute);
        }
        if failed {
            self.publisher.publish(Property::Error);
        }
    }
}
