// src/cancel/signal.rs

//! Cooperative cancellation signal handed to actions.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::debug;

use crate::errors::{is_cancellation, Cancelled};

type Callback = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;

/// A triggerable, shareable cancellation signal.
///
/// Clones observe the same underlying state. Cooperating code either polls
/// ([`is_cancelled`](Self::is_cancelled), [`check`](Self::check)), awaits
/// ([`cancelled`](Self::cancelled)) or subscribes a callback.
#[derive(Clone)]
pub struct CancellationSignal {
    token: CancellationToken,
    callbacks: Arc<Mutex<Vec<Callback>>>,
}

impl fmt::Debug for CancellationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationSignal")
            .field("cancelled", &self.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Default for CancellationSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CancellationSignal {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            callbacks: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once the signal has been triggered.
    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    /// `Err(Cancelled)` once triggered, for use with `?` inside actions.
    pub fn check(&self) -> Result<(), Cancelled> {
        if self.is_cancelled() {
            Err(Cancelled)
        } else {
            Ok(())
        }
    }

    /// Whether two handles refer to the same underlying signal.
    pub fn same_as(&self, other: &CancellationSignal) -> bool {
        Arc::ptr_eq(&self.callbacks, &other.callbacks)
    }

    /// Run `callback` when the signal is triggered.
    ///
    /// If the signal has already been triggered the callback runs
    /// immediately and its result is returned.
    pub fn subscribe<F>(&self, callback: F) -> anyhow::Result<()>
    where
        F: FnOnce() -> anyhow::Result<()> + Send + 'static,
    {
        {
            let mut callbacks = self
                .callbacks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if !self.token.is_cancelled() {
                callbacks.push(Box::new(callback));
                return Ok(());
            }
        }
        callback()
    }

    /// Trigger the signal and run subscribed callbacks.
    ///
    /// Idempotent: triggering an already-triggered signal does nothing and
    /// never reports an error. Callback failures other than cancellation
    /// acknowledgements are reported; the first one is returned.
    pub fn trigger(&self) -> anyhow::Result<()> {
        let callbacks = {
            let mut guard = self
                .callbacks
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            if self.token.is_cancelled() {
                return Ok(());
            }
            self.token.cancel();
            std::mem::take(&mut *guard)
        };

        let mut first_error = None;
        let mut failed = 0usize;
        for callback in callbacks {
            match callback() {
                Ok(()) => {}
                Err(err) if is_cancellation(&err) => {
                    debug!("cancellation callback acknowledged cancellation");
                }
                Err(err) => {
                    failed += 1;
                    if first_error.is_none() {
                        first_error = Some(err);
                    }
                }
            }
        }

        match first_error {
            None => Ok(()),
            Some(err) if failed > 1 => {
                Err(err.context(format!("{failed} cancellation callbacks failed")))
            }
            Some(err) => Err(err),
        }
    }
}
