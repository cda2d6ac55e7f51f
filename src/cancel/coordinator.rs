// src/cancel/coordinator.rs

//! Lifecycle of the cancellation signal shared by in-flight executions.

use std::sync::{Mutex, PoisonError};

use tracing::{debug, trace};

use super::signal::CancellationSignal;

/// Owns at most one live [`CancellationSignal`].
///
/// - [`signal`](Self::signal) creates a fresh signal on first access after
///   the previous one was cleared.
/// - [`cancel`](Self::cancel) triggers the live signal and clears the slot,
///   so the next execution gets a brand-new one.
/// - The owning command calls [`take`](Self::take) when its running count
///   returns to zero.
#[derive(Debug, Default)]
pub struct CancellationCoordinator {
    slot: Mutex<Option<CancellationSignal>>,
}

impl CancellationCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The live signal, created on demand.
    pub fn signal(&self) -> CancellationSignal {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        slot.get_or_insert_with(|| {
            trace!("creating fresh cancellation signal");
            CancellationSignal::new()
        })
        .clone()
    }

    pub fn has_signal(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Atomically return and clear the live signal.
    pub fn take(&self) -> Option<CancellationSignal> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// Clear the slot only if it still holds `signal`.
    pub fn clear_if(&self, signal: &CancellationSignal) -> bool {
        let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(current) if current.same_as(signal) => {
                *slot = None;
                true
            }
            _ => false,
        }
    }

    /// Request cancellation of the live signal.
    ///
    /// No-op when the owner is not running, when no signal exists, or when
    /// the signal was already triggered. Otherwise the signal leaves the
    /// slot and is triggered; calling this twice has the effect of once.
    pub fn cancel(&self, owner_running: bool) -> anyhow::Result<()> {
        if !owner_running {
            debug!("cancel ignored: owner is not running");
            return Ok(());
        }

        let signal = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                None => {
                    debug!("cancel ignored: no cancellation signal");
                    return Ok(());
                }
                Some(signal) if signal.is_cancelled() => {
                    debug!("cancel ignored: signal already triggered");
                    *slot = None;
                    return Ok(());
                }
                Some(_) => slot.take(),
            }
        };

        match signal {
            Some(signal) => {
                debug!("triggering cancellation signal");
                signal.trigger()
            }
            None => Ok(()),
        }
    }
}
