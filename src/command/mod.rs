// src/command/mod.rs

//! The asynchronous command.
//!
//! An [`AsyncCommand`] presents a synchronous "can I run / run it" contract
//! to the view layer while driving a long-running, cancellable action:
//!
//! - [`gate`] holds the action and its admission predicate.
//! - [`tracker`] owns the running counter and the error slot.
//! - [`completion`] is the awaitable outcome handed back to callers.
//!
//! Dispatch flow: admission check → `start` → debounce (optional) →
//! supersede (optional) → action → `finish` → notifications.
//!
//! Executions are spawned on the current tokio runtime, so bookkeeping
//! always completes even when nobody awaits the [`Completion`].

pub mod completion;
pub mod gate;
pub mod tracker;

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use tokio::runtime::Handle;
use tracing::{debug, error, trace, warn};

use crate::cancel::{CancelCommand, CancelTarget, CancellationCoordinator, CancellationSignal};
use crate::errors::{is_cancellation, CommandError};
use crate::notify::{NotificationSink, NullSink, Observer};
use crate::schedule::{
    DebounceOutcome, DebounceScheduler, SupersedeOutcome, SupersedePolicy, SupersedeTicket,
};
use crate::types::{CommandOptions, Property, RunOutcome};

pub use completion::Completion;
pub use gate::{ActionFuture, CommandGate};
pub use tracker::ExecutionTracker;

/// Parameter-independent execution state shared with the cancel
/// sub-command and with running executions.
struct ExecutionCore {
    name: String,
    tracker: ExecutionTracker,
    coordinator: CancellationCoordinator,
    debounce: DebounceScheduler,
    supersede: SupersedePolicy,
    dispatching: AtomicBool,
}

impl CancelTarget for ExecutionCore {
    fn is_running(&self) -> bool {
        self.tracker.is_running()
    }

    fn request_cancel(&self) -> anyhow::Result<()> {
        if self.debounce.cancel_pending() {
            debug!(command = %self.name, "pending debounce delay cancelled");
        }
        self.coordinator.cancel(self.tracker.is_running())
    }

    fn subscribe(&self, observer: Observer) {
        self.tracker.subscribe(observer);
    }
}

impl ExecutionCore {
    /// Enter the synchronous dispatch section from a spawned execution,
    /// waiting out a dispatch in progress on another thread.
    async fn acquire_dispatch(&self) -> DispatchGuard<'_> {
        loop {
            if let Some(guard) = DispatchGuard::enter(&self.dispatching) {
                return guard;
            }
            tokio::task::yield_now().await;
        }
    }

    fn finish(&self, outcome: RunOutcome) -> Result<(), CommandError> {
        match &outcome {
            RunOutcome::Completed => trace!(command = %self.name, "execution completed"),
            RunOutcome::Cancelled => debug!(command = %self.name, "execution cancelled"),
            RunOutcome::Failed(err) => {
                warn!(command = %self.name, error = %err, "execution failed")
            }
        }

        self.tracker.finish(&outcome, || {
            if self.coordinator.take().is_some() {
                trace!(command = %self.name, "cancellation signal torn down");
            }
        });

        match outcome {
            RunOutcome::Completed => Ok(()),
            RunOutcome::Cancelled => Err(CommandError::Cancelled),
            RunOutcome::Failed(err) => Err(CommandError::Action(err)),
        }
    }
}

/// Finishes a counted execution exactly once, even if the execution task
/// panics or the action factory unwinds mid-dispatch.
struct RunningGuard {
    core: Option<Arc<ExecutionCore>>,
}

impl RunningGuard {
    fn new(core: Arc<ExecutionCore>) -> Self {
        Self { core: Some(core) }
    }

    fn finish(mut self, outcome: RunOutcome) -> Result<(), CommandError> {
        match self.core.take() {
            Some(core) => core.finish(outcome),
            None => Ok(()),
        }
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        if let Some(core) = self.core.take() {
            let err = anyhow::anyhow!("execution of '{}' panicked", core.name);
            error!(command = %core.name, "execution unwound without an outcome");
            let _ = core.finish(RunOutcome::Failed(Arc::new(err)));
        }
    }
}

/// Rejects a second synchronous dispatch while one is being constructed.
struct DispatchGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> DispatchGuard<'a> {
    fn enter(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag })
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

fn classify(result: anyhow::Result<()>) -> RunOutcome {
    match result {
        Ok(()) => RunOutcome::Completed,
        Err(err) if is_cancellation(&err) => RunOutcome::Cancelled,
        Err(err) => RunOutcome::Failed(Arc::new(err)),
    }
}

async fn run_action(action: ActionFuture, ticket: Option<SupersedeTicket>) -> RunOutcome {
    let outcome = classify(action.await);
    if let Some(ticket) = ticket {
        ticket.settle(&outcome);
    }
    outcome
}

struct CommandInner<P> {
    core: Arc<ExecutionCore>,
    gate: CommandGate<P>,
    cancel_command: OnceLock<CancelCommand>,
    cancel_sink: Arc<dyn NotificationSink>,
}

impl<P> CommandInner<P> {
    /// The part of an execution that runs after at least one suspension
    /// point: debounce wait, then supersede wait, then the action.
    async fn run_deferred(
        &self,
        param: P,
        debounce: Option<CancellationSignal>,
        mut supersede: Option<SupersedeTicket>,
    ) -> RunOutcome {
        let outcome = self.run_stages(param, debounce, supersede.as_mut()).await;
        if let Some(ticket) = supersede {
            ticket.settle(&outcome);
        }
        outcome
    }

    async fn run_stages(
        &self,
        param: P,
        debounce: Option<CancellationSignal>,
        mut supersede: Option<&mut SupersedeTicket>,
    ) -> RunOutcome {
        let core = &self.core;

        if let Some(ticket) = debounce {
            match core.debounce.wait(ticket).await {
                DebounceOutcome::Superseded => {
                    debug!(command = %core.name, "debounce delay superseded; action skipped");
                    return RunOutcome::Completed;
                }
                DebounceOutcome::Elapsed => {
                    if !self.gate.can_execute(&param) {
                        debug!(command = %core.name, "no longer admissible after debounce delay");
                        return RunOutcome::Completed;
                    }
                }
            }
        }

        if let Some(ticket) = supersede.as_deref_mut() {
            match ticket.wait(&core.coordinator).await {
                SupersedeOutcome::Superseded => {
                    debug!(command = %core.name, "superseded by a newer execution; action skipped");
                    return RunOutcome::Completed;
                }
                SupersedeOutcome::Waited if !self.gate.can_execute(&param) => {
                    debug!(command = %core.name, "no longer admissible after superseding previous execution");
                    return RunOutcome::Completed;
                }
                SupersedeOutcome::Waited | SupersedeOutcome::Clear => {}
            }
        }

        let action = {
            let _dispatch = core.acquire_dispatch().await;
            let signal = core.coordinator.signal();
            if let Some(ticket) = supersede.as_deref() {
                if !ticket.begin_action(&signal) {
                    debug!(command = %core.name, "superseded before its action started; action skipped");
                    return RunOutcome::Completed;
                }
            }
            self.gate.invoke(param, signal)
        };
        classify(action.await)
    }
}

/// An asynchronous, cancellable command.
///
/// Cheap to clone; clones share all state.
pub struct AsyncCommand<P = ()> {
    inner: Arc<CommandInner<P>>,
}

impl<P> Clone for AsyncCommand<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P> fmt::Debug for AsyncCommand<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let core = &self.inner.core;
        f.debug_struct("AsyncCommand")
            .field("name", &core.name)
            .field("running", &core.tracker.running_count())
            .field("delay", &core.debounce.delay())
            .field("cancel_previous", &core.supersede.is_enabled())
            .finish_non_exhaustive()
    }
}

impl<P: Send + 'static> AsyncCommand<P> {
    /// Command with default options and no notification sinks.
    pub fn new<F, Fut>(action: F) -> Self
    where
        F: Fn(P, CancellationSignal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self::builder(action).build()
    }

    pub fn builder<F, Fut>(action: F) -> CommandBuilder<P>
    where
        F: Fn(P, CancellationSignal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        CommandBuilder {
            name: "command".to_string(),
            gate: CommandGate::new(action),
            sink: Arc::new(NullSink),
            cancel_sink: Arc::new(NullSink),
            options: CommandOptions::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.core.name
    }

    /// Evaluate the admission predicate. Never suspends, never mutates.
    pub fn can_execute(&self, param: &P) -> bool {
        self.inner.gate.can_execute(param)
    }

    pub fn is_running(&self) -> bool {
        self.inner.core.tracker.is_running()
    }

    pub fn running_count(&self) -> usize {
        self.inner.core.tracker.running_count()
    }

    /// Failure of the most recent execution that failed, cleared when the
    /// next execution starts.
    pub fn error(&self) -> Option<Arc<anyhow::Error>> {
        self.inner.core.tracker.last_error()
    }

    pub fn delay(&self) -> Duration {
        self.inner.core.debounce.delay()
    }

    pub fn cancel_previous(&self) -> bool {
        self.inner.core.supersede.is_enabled()
    }

    /// The live cancellation signal, created on demand.
    pub fn cancellation_signal(&self) -> CancellationSignal {
        self.inner.core.coordinator.signal()
    }

    pub fn has_cancellation_signal(&self) -> bool {
        self.inner.core.coordinator.has_signal()
    }

    /// Trigger the live cancellation signal, if the command is running.
    pub fn cancel(&self) -> anyhow::Result<()> {
        self.inner.core.request_cancel()
    }

    /// Ask bound views to re-query [`can_execute`](Self::can_execute).
    pub fn raise_can_execute_changed(&self) {
        self.inner.core.tracker.publish(Property::CanExecute);
    }

    /// The companion cancel command, created on first access.
    pub fn cancel_command(&self) -> CancelCommand {
        self.inner
            .cancel_command
            .get_or_init(|| {
                let core: Arc<dyn CancelTarget> = self.inner.core.clone();
                let owner: Weak<dyn CancelTarget> = Arc::downgrade(&core);
                CancelCommand::attach(owner, Arc::clone(&self.inner.cancel_sink))
            })
            .clone()
    }

    /// Fire-and-forget dispatch.
    ///
    /// Only dispatch preconditions are reported: [`CommandError::Reentrancy`]
    /// and [`CommandError::NoRuntime`]. Action failures land in
    /// [`error`](Self::error); cancellation is only logged.
    pub fn execute(&self, param: P) -> Result<(), CommandError> {
        let _detached = self.execute_async(param)?;
        trace!(command = %self.name(), "execution detached");
        Ok(())
    }

    /// Dispatch and return a handle to the outcome.
    ///
    /// The returned `Err` is synchronous and leaves the command untouched.
    /// An inadmissible parameter yields an already-completed `Ok(())`.
    /// Awaiting the completion rethrows cancellation and action failures
    /// after the command has published its transitions.
    pub fn execute_async(&self, param: P) -> Result<Completion, CommandError> {
        let inner = &self.inner;
        let core = &inner.core;

        let Ok(runtime) = Handle::try_current() else {
            error!(command = %core.name, "dispatch attempted outside a tokio runtime");
            return Err(CommandError::NoRuntime(core.name.clone()));
        };

        let Some(_dispatch) = DispatchGuard::enter(&core.dispatching) else {
            error!(command = %core.name, "re-entrant dispatch rejected");
            return Err(CommandError::Reentrancy(core.name.clone()));
        };

        if !inner.gate.can_execute(&param) {
            debug!(command = %core.name, "admission denied; not executing");
            return Ok(Completion::ready(Ok(())));
        }

        core.tracker.start();
        let running = RunningGuard::new(Arc::clone(core));

        let debounce = core.debounce.is_enabled().then(|| core.debounce.arm());
        let supersede = core.supersede.is_enabled().then(|| core.supersede.enter());
        let must_wait = supersede.as_ref().is_some_and(SupersedeTicket::must_wait);

        let handle = if debounce.is_none() && !must_wait {
            // Nothing to wait for: construct the action inside this dispatch.
            let signal = core.coordinator.signal();
            // Nothing can supersede a ticket entered under this dispatch guard.
            if let Some(ticket) = &supersede {
                ticket.begin_action(&signal);
            }
            let action = inner.gate.invoke(param, signal);
            runtime.spawn(async move {
                let outcome = run_action(action, supersede).await;
                running.finish(outcome)
            })
        } else {
            let inner = Arc::clone(inner);
            runtime.spawn(async move {
                let outcome = inner.run_deferred(param, debounce, supersede).await;
                running.finish(outcome)
            })
        };

        Ok(Completion::from_task(handle))
    }
}

/// Builder for [`AsyncCommand`].
pub struct CommandBuilder<P> {
    name: String,
    gate: CommandGate<P>,
    sink: Arc<dyn NotificationSink>,
    cancel_sink: Arc<dyn NotificationSink>,
    options: CommandOptions,
}

impl<P> fmt::Debug for CommandBuilder<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandBuilder")
            .field("name", &self.name)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl<P: Send + 'static> CommandBuilder<P> {
    /// Name used in log fields.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn can_execute<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&P) -> bool + Send + Sync + 'static,
    {
        self.gate = self.gate.with_predicate(predicate);
        self
    }

    /// Sink for the command's own notifications.
    pub fn sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Sink for the cancel sub-command's notifications.
    pub fn cancel_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.cancel_sink = sink;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.options.delay = delay;
        self
    }

    pub fn cancel_previous(mut self, enabled: bool) -> Self {
        self.options.cancel_previous = enabled;
        self
    }

    pub fn options(mut self, options: CommandOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> AsyncCommand<P> {
        let core = Arc::new(ExecutionCore {
            name: self.name,
            tracker: ExecutionTracker::new(self.sink),
            coordinator: CancellationCoordinator::new(),
            debounce: DebounceScheduler::new(self.options.delay),
            supersede: SupersedePolicy::new(self.options.cancel_previous),
            dispatching: AtomicBool::new(false),
        });

        AsyncCommand {
            inner: Arc::new(CommandInner {
                core,
                gate: self.gate,
                cancel_command: OnceLock::new(),
                cancel_sink: self.cancel_sink,
            }),
        }
    }
}
