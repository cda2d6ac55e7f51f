// src/command/completion.rs

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::errors::CommandError;

type BoxedOutcome = Pin<Box<dyn Future<Output = Result<(), CommandError>> + Send>>;

/// Handle to the eventual outcome of a dispatched execution.
///
/// Awaiting it yields `Ok(())`, `Err(CommandError::Cancelled)` or the
/// action's failure. Dropping it detaches: the execution keeps running and
/// still updates the command's state when it ends.
#[must_use = "dropping a Completion detaches the execution; use `execute` for fire-and-forget"]
pub struct Completion {
    inner: BoxedOutcome,
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion").finish_non_exhaustive()
    }
}

impl Completion {
    /// Already-resolved completion.
    pub fn ready(result: Result<(), CommandError>) -> Self {
        Self {
            inner: Box::pin(std::future::ready(result)),
        }
    }

    /// Completion backed by a spawned execution task.
    pub(crate) fn from_task(handle: JoinHandle<Result<(), CommandError>>) -> Self {
        Self {
            inner: Box::pin(async move {
                match handle.await {
                    Ok(result) => result,
                    Err(err) => Err(CommandError::Aborted(err.to_string())),
                }
            }),
        }
    }

    /// Completion resolved when a watch slot is filled. A dropped sender
    /// counts as success.
    pub(crate) fn from_watch(mut rx: watch::Receiver<Option<Result<(), CommandError>>>) -> Self {
        Self {
            inner: Box::pin(async move {
                let value = rx
                    .wait_for(|slot| slot.is_some())
                    .await
                    .ok()
                    .and_then(|slot| slot.clone());
                value.unwrap_or(Ok(()))
            }),
        }
    }
}

impl Future for Completion {
    type Output = Result<(), CommandError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.as_mut().poll(cx)
    }
}
