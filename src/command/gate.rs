// src/command/gate.rs

//! Side-effect-free admission check around the action delegate.

use std::fmt;
use std::future::Future;
use std::pin::Pin;

use crate::cancel::CancellationSignal;

/// Future returned by an action.
pub type ActionFuture = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;

type Action<P> = Box<dyn Fn(P, CancellationSignal) -> ActionFuture + Send + Sync>;
type Predicate<P> = Box<dyn Fn(&P) -> bool + Send + Sync>;

/// Holds the action delegate and the optional admission predicate.
pub struct CommandGate<P> {
    action: Action<P>,
    predicate: Option<Predicate<P>>,
}

impl<P> fmt::Debug for CommandGate<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandGate")
            .field("has_predicate", &self.predicate.is_some())
            .finish_non_exhaustive()
    }
}

impl<P> CommandGate<P> {
    pub fn new<F, Fut>(action: F) -> Self
    where
        P: 'static,
        F: Fn(P, CancellationSignal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            action: Box::new(move |param: P, signal: CancellationSignal| -> ActionFuture {
                Box::pin(action(param, signal))
            }),
            predicate: None,
        }
    }

    pub fn with_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&P) -> bool + Send + Sync + 'static,
    {
        self.predicate = Some(Box::new(predicate));
        self
    }

    /// Whether `param` may run. Without a predicate every parameter is
    /// admissible. A panicking predicate propagates to the caller.
    pub fn can_execute(&self, param: &P) -> bool {
        match &self.predicate {
            Some(predicate) => predicate(param),
            None => true,
        }
    }

    /// Call the action factory. Whatever the factory does before returning
    /// its future happens synchronously, inside the caller's dispatch.
    pub fn invoke(&self, param: P, signal: CancellationSignal) -> ActionFuture {
        (self.action)(param, signal)
    }
}
