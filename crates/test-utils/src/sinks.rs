use std::sync::{Arc, Mutex, OnceLock};

use cmdflight::{AsyncCommand, NotificationSink, Property};

/// A sink that records every notification it receives, in order.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<Property>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Property> {
        self.events.lock().unwrap().clone()
    }

    pub fn count(&self, property: Property) -> usize {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|p| **p == property)
            .count()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap().clear();
    }
}

impl NotificationSink for RecordingSink {
    fn publish(&self, property: Property) {
        self.events.lock().unwrap().push(property);
    }
}

/// Command state captured at the moment a notification was published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub property: Property,
    pub running: bool,
    pub error: Option<String>,
}

/// A sink that snapshots its command's observable state on every
/// notification.
///
/// The command is attached after it is built, since it is constructed with
/// this sink.
pub struct SnapshotSink<P> {
    command: OnceLock<AsyncCommand<P>>,
    snapshots: Mutex<Vec<Snapshot>>,
}

impl<P: Send + 'static> SnapshotSink<P> {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            command: OnceLock::new(),
            snapshots: Mutex::new(Vec::new()),
        })
    }

    pub fn attach(&self, command: &AsyncCommand<P>) {
        let _ = self.command.set(command.clone());
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.lock().unwrap().clone()
    }
}

impl<P: Send + 'static> NotificationSink for SnapshotSink<P> {
    fn publish(&self, property: Property) {
        let Some(command) = self.command.get() else {
            return;
        };
        let snapshot = Snapshot {
            property,
            running: command.is_running(),
            error: command.error().map(|e| e.to_string()),
        };
        self.snapshots.lock().unwrap().push(snapshot);
    }
}
