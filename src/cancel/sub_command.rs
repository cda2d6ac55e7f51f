// src/cancel/sub_command.rs

//! The companion "cancel" command owned by every [`AsyncCommand`].
//!
//! State machine:
//!
//! - **Idle → Active** on [`CancelCommand::execute`], admitted only when the
//!   owner is running and no cancel is already active. The completion slot
//!   is created first, then the owner's cancellation is triggered.
//! - **Active → Idle** when the owner reports it is no longer running, or
//!   immediately when triggering cancellation fails. In the failure case the
//!   error is recorded here, never on the owner.
//!
//! [`AsyncCommand`]: crate::command::AsyncCommand

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::command::Completion;
use crate::errors::{is_cancellation, CommandError};
use crate::notify::{NotificationSink, Observer, Publisher};
use crate::types::Property;

/// Back-reference the cancel sub-command holds to its owner.
pub trait CancelTarget: Send + Sync {
    fn is_running(&self) -> bool;

    /// Trigger the owner's live cancellation signal.
    fn request_cancel(&self) -> anyhow::Result<()>;

    /// Observe the owner's property notifications.
    fn subscribe(&self, observer: Observer);
}

type Slot = watch::Sender<Option<Result<(), CommandError>>>;

#[derive(Default)]
struct CancelState {
    active: Option<Slot>,
    last_error: Option<Arc<anyhow::Error>>,
}

struct CancelInner {
    owner: Weak<dyn CancelTarget>,
    state: Mutex<CancelState>,
    publisher: Publisher,
}

/// Subordinate command that cancels its owner's in-flight execution.
#[derive(Clone)]
pub struct CancelCommand {
    inner: Arc<CancelInner>,
}

impl fmt::Debug for CancelCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelCommand")
            .field("is_running", &self.is_running())
            .field("can_execute", &self.can_execute())
            .finish_non_exhaustive()
    }
}

impl CancelCommand {
    /// Create the sub-command and subscribe it to `owner`'s notifications.
    pub fn attach(owner: Weak<dyn CancelTarget>, sink: Arc<dyn NotificationSink>) -> Self {
        let inner = Arc::new(CancelInner {
            owner,
            state: Mutex::new(CancelState::default()),
            publisher: Publisher::new(sink),
        });

        if let Some(owner) = inner.owner.upgrade() {
            let weak = Arc::downgrade(&inner);
            owner.subscribe(Box::new(move |property: Property| {
                if let Some(inner) = weak.upgrade() {
                    inner.on_owner_changed(property);
                }
            }));
        }

        Self { inner }
    }

    /// Admissible only while the owner runs and no cancel is active.
    pub fn can_execute(&self) -> bool {
        let state = self.inner.lock();
        state.active.is_none() && self.inner.owner_running()
    }

    /// True from the cancel request until the owner stops running.
    pub fn is_running(&self) -> bool {
        self.inner.lock().active.is_some()
    }

    /// Error raised while processing the most recent cancel request.
    pub fn error(&self) -> Option<Arc<anyhow::Error>> {
        self.inner.lock().last_error.clone()
    }

    /// Fire-and-forget cancel request.
    pub fn execute(&self) {
        // The completion is only an observer of the state slot.
        let _ = self.execute_async();
    }

    /// Request cancellation and return a completion that resolves once the
    /// owner has stopped running, or with [`CommandError::CancelFailed`].
    ///
    /// A request that is not admissible resolves immediately with `Ok(())`.
    pub fn execute_async(&self) -> Completion {
        match self.inner.begin() {
            Some(rx) => Completion::from_watch(rx),
            None => Completion::ready(Ok(())),
        }
    }
}

impl CancelInner {
    fn lock(&self) -> std::sync::MutexGuard<'_, CancelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn owner_running(&self) -> bool {
        self.owner
            .upgrade()
            .map(|owner| owner.is_running())
            .unwrap_or(false)
    }

    fn begin(&self) -> Option<watch::Receiver<Option<Result<(), CommandError>>>> {
        let Some(owner) = self.owner.upgrade() else {
            debug!("cancel ignored: owner dropped");
            return None;
        };

        let (rx, cleared_error) = {
            let mut state = self.lock();
            if state.active.is_some() {
                debug!("cancel ignored: a cancel request is already active");
                return None;
            }
            if !owner.is_running() {
                debug!("cancel ignored: owner is not running");
                return None;
            }
            let (tx, rx) = watch::channel(None);
            state.active = Some(tx);
            (rx, state.last_error.take().is_some())
        };

        self.publisher.publish(Property::IsRunning);
        self.publisher.publish(Property::CanExecute);
        if cleared_error {
            self.publisher.publish(Property::Error);
        }

        match owner.request_cancel() {
            Ok(()) => {}
            Err(err) if is_cancellation(&err) => {
                debug!("cancel request acknowledged by action");
            }
            Err(err) => {
                warn!(error = %err, "cancel request failed");
                self.settle(Err(Arc::new(err)));
                return Some(rx);
            }
        }

        // The owner may have stopped before our subscription saw us Active.
        if !owner.is_running() {
            self.settle(Ok(()));
        }

        Some(rx)
    }

    fn on_owner_changed(&self, property: Property) {
        if property != Property::IsRunning {
            return;
        }
        if self.owner_running() {
            self.publisher.publish(Property::CanExecute);
        } else if !self.settle(Ok(())) {
            self.publisher.publish(Property::CanExecute);
        }
    }

    /// Return to Idle, resolving awaiters. Returns false if already Idle.
    fn settle(&self, result: Result<(), Arc<anyhow::Error>>) -> bool {
        let (slot, failed) = {
            let mut state = self.lock();
            let Some(slot) = state.active.take() else {
                return false;
            };
            let failed = match &result {
                Err(err) => {
                    state.last_error = Some(Arc::clone(err));
                    true
                }
                Ok(()) => false,
            };
            (slot, failed)
        };

        slot.send_replace(Some(result.map_err(CommandError::CancelFailed)));
        debug!(failed, "cancel command returned to idle");

        self.publisher.publish(Property::IsRunning);
        self.publisher.publish(Property::CanExecute);
        if failed {
            self.publisher.publish(Property::Error);
        }
        true
    }
}
