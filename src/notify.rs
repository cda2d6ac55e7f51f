// src/notify.rs

//! Change-notification plumbing.
//!
//! The engine does not know how views observe it. It publishes
//! [`Property`] names into an injected [`NotificationSink`], and keeps a
//! small internal [`Observers`] list so the cancel sub-command can follow
//! its owner without reaching into private fields.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use crate::types::Property;

/// Fire-and-forget sink for property-changed notifications.
///
/// Implementations must not block; they are called inline from the
/// command's state transitions, after the state itself has been updated.
pub trait NotificationSink: Send + Sync {
    fn publish(&self, property: Property);
}

/// Sink that drops every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl NotificationSink for NullSink {
    fn publish(&self, _property: Property) {}
}

impl<F> NotificationSink for F
where
    F: Fn(Property) + Send + Sync,
{
    fn publish(&self, property: Property) {
        self(property)
    }
}

pub type Observer = Box<dyn Fn(Property) + Send + Sync>;

/// Internal subscriber list, notified after the external sink.
#[derive(Default)]
pub struct Observers {
    inner: Mutex<Vec<Arc<Observer>>>,
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("len", &self.len())
            .finish()
    }
}

impl Observers {
    pub fn subscribe(&self, observer: Observer) {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(observer));
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Call every observer. The list is snapshotted first so observers may
    /// subscribe or query the command without deadlocking.
    pub fn notify(&self, property: Property) {
        let snapshot: Vec<Arc<Observer>> = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for observer in snapshot {
            observer(property);
        }
    }
}

/// External sink plus internal observers, published in that order.
pub struct Publisher {
    sink: Arc<dyn NotificationSink>,
    observers: Observers,
}

impl fmt::Debug for Publisher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Publisher")
            .field("observers", &self.observers)
            .finish_non_exhaustive()
    }
}

impl Publisher {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            observers: Observers::default(),
        }
    }

    pub fn publish(&self, property: Property) {
        self.sink.publish(property);
        self.observers.notify(property);
    }

    pub fn subscribe(&self, observer: Observer) {
        self.observers.subscribe(observer);
    }
}
