// src/schedule/supersede.rs

//! "Cancel previous, then run" admission.
//!
//! Every invocation is registered at dispatch time, before any suspension
//! point, so a newer invocation always supersedes the one dispatched right
//! before it. That holds whether the older one is still waiting for its
//! own turn or is already running its action.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tracing::{debug, trace};

use crate::cancel::{CancellationCoordinator, CancellationSignal};
use crate::types::RunOutcome;

/// One registered invocation.
#[derive(Debug)]
struct Entry {
    /// Triggered by the next invocation.
    superseded: CancellationSignal,
    /// Signal the invocation's action observes, once it has been invoked.
    action: Mutex<Option<CancellationSignal>>,
    done: watch::Receiver<Option<RunOutcome>>,
}

impl Entry {
    fn action_slot(&self) -> MutexGuard<'_, Option<CancellationSignal>> {
        self.action.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn in_flight(&self) -> bool {
        let sender_alive = self.done.has_changed().is_ok();
        let settled = self.done.borrow().is_some();
        sender_alive && !settled
    }

    /// Stop the invocation: before its action starts if it hasn't yet,
    /// through the action's signal if it has.
    fn cancel(&self, coordinator: &CancellationCoordinator) {
        if let Err(err) = self.superseded.trigger() {
            debug!(error = %err, "error while superseding pending execution (ignored)");
        }

        let action = self.action_slot().clone();
        if let Some(signal) = action {
            // The new invocation must not inherit the signal it is about to trigger.
            coordinator.clear_if(&signal);
            if let Err(err) = signal.trigger() {
                debug!(error = %err, "error while cancelling previous execution (ignored)");
            }
        }
    }
}

/// Result of [`SupersedeTicket::wait`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupersedeOutcome {
    /// Nothing was in flight.
    Clear,
    /// A previous invocation was cancelled and has unwound.
    Waited,
    /// A newer invocation superseded this one; its action must not run.
    Superseded,
}

/// Registration of one invocation with the [`SupersedePolicy`].
///
/// Dropping it without [`settle`](Self::settle) counts as "ended".
#[derive(Debug)]
pub struct SupersedeTicket {
    entry: Arc<Entry>,
    tx: watch::Sender<Option<RunOutcome>>,
    previous: Option<Arc<Entry>>,
}

impl SupersedeTicket {
    /// Whether an older invocation has to be cancelled before this one runs.
    pub fn must_wait(&self) -> bool {
        self.previous.is_some()
    }

    /// Cancel the previous invocation, if any, and wait for it to unwind.
    ///
    /// The previous invocation's outcome is swallowed: the caller of the new
    /// invocation is not responsible for it. The wait always runs to the
    /// end, even if this invocation is superseded meanwhile, so at most one
    /// action is ever unwinding when the next one starts.
    pub async fn wait(&mut self, coordinator: &CancellationCoordinator) -> SupersedeOutcome {
        let waited = match self.previous.take() {
            Some(previous) => {
                debug!("cancelling previous execution before running the new one");
                previous.cancel(coordinator);

                let mut done = previous.done.clone();
                let outcome = done
                    .wait_for(|slot| slot.is_some())
                    .await
                    .ok()
                    .and_then(|slot| slot.clone());
                log_swallowed(outcome);

                let action = previous.action_slot().clone();
                if let Some(signal) = action {
                    coordinator.clear_if(&signal);
                }
                true
            }
            None => false,
        };

        if self.entry.superseded.is_cancelled() {
            SupersedeOutcome::Superseded
        } else if waited {
            SupersedeOutcome::Waited
        } else {
            SupersedeOutcome::Clear
        }
    }

    /// Record the signal handed to this invocation's action.
    ///
    /// Returns false if a newer invocation superseded this one first, in
    /// which case the action must not be invoked.
    pub fn begin_action(&self, signal: &CancellationSignal) -> bool {
        let mut slot = self.entry.action_slot();
        if self.entry.superseded.is_cancelled() {
            return false;
        }
        *slot = Some(signal.clone());
        true
    }

    pub fn settle(self, outcome: &RunOutcome) {
        self.tx.send_replace(Some(outcome.clone()));
    }
}

fn log_swallowed(outcome: Option<RunOutcome>) {
    match outcome {
        Some(RunOutcome::Completed) => {
            trace!("previous execution completed before observing cancellation")
        }
        Some(RunOutcome::Cancelled) => debug!("previous execution unwound after cancellation"),
        Some(RunOutcome::Failed(err)) => {
            debug!(error = %err, "previous execution failed while superseded (ignored)")
        }
        None => debug!("previous execution ended without reporting an outcome"),
    }
}

/// Remembers the most recently dispatched invocation so a newer one can
/// cancel it and wait for it to unwind.
#[derive(Debug)]
pub struct SupersedePolicy {
    enabled: bool,
    latest: Mutex<Option<Arc<Entry>>>,
}

impl SupersedePolicy {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            latest: Mutex::new(None),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Register a new invocation. Must be called synchronously at dispatch
    /// time so that supersession follows call order.
    pub fn enter(&self) -> SupersedeTicket {
        let (tx, done) = watch::channel(None);
        let entry = Arc::new(Entry {
            superseded: CancellationSignal::new(),
            action: Mutex::new(None),
            done,
        });

        let previous = self
            .latest
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(Arc::clone(&entry))
            .filter(|previous| previous.in_flight());

        SupersedeTicket {
            entry,
            tx,
            previous,
        }
    }
}
