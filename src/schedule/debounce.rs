// src/schedule/debounce.rs

//! Delay-then-run admission where each new invocation supersedes the
//! previous pending delay, so only the last call in a burst proceeds.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tracing::debug;

use crate::cancel::CancellationSignal;

/// Result of waiting out a debounce delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebounceOutcome {
    /// The delay elapsed with no newer invocation.
    Elapsed,
    /// A newer invocation cancelled this delay.
    Superseded,
}

#[derive(Debug)]
pub struct DebounceScheduler {
    delay: Duration,
    pending: Mutex<Option<CancellationSignal>>,
}

impl DebounceScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Mutex::new(None),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn is_enabled(&self) -> bool {
        !self.delay.is_zero()
    }

    /// Cancel any pending delay and register a fresh one.
    ///
    /// Called synchronously at dispatch time so that "last call wins"
    /// follows call order, not task scheduling order.
    pub fn arm(&self) -> CancellationSignal {
        let ticket = CancellationSignal::new();
        let previous = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(ticket.clone());

        if let Some(previous) = previous {
            debug!("superseding pending debounce delay");
            if let Err(err) = previous.trigger() {
                debug!(error = %err, "error while superseding debounce delay");
            }
        }

        ticket
    }

    /// Cancel the pending delay, if any, without arming a new one.
    pub fn cancel_pending(&self) -> bool {
        let pending = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        match pending {
            Some(ticket) => {
                if let Err(err) = ticket.trigger() {
                    debug!(error = %err, "error while cancelling debounce delay");
                }
                true
            }
            None => false,
        }
    }

    /// Wait out the delay for `ticket`, unless a newer invocation cancels it.
    pub async fn wait(&self, ticket: CancellationSignal) -> DebounceOutcome {
        let outcome = tokio::select! {
            biased;
            _ = ticket.cancelled() => DebounceOutcome::Superseded,
            _ = tokio::time::sleep(self.delay) => DebounceOutcome::Elapsed,
        };

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if pending.as_ref().is_some_and(|current| current.same_as(&ticket)) {
            *pending = None;
        }

        outcome
    }
}
