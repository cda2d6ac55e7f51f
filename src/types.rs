// src/types.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Observable properties a command publishes through its notification sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    /// `is_running()` may have changed.
    IsRunning,
    /// `error()` may have changed.
    Error,
    /// `can_execute()` should be re-queried.
    CanExecute,
}

impl Property {
    pub fn name(self) -> &'static str {
        match self {
            Property::IsRunning => "IsRunning",
            Property::Error => "Error",
            Property::CanExecute => "CanExecute",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a single execution ended, as seen by the tracker and by anyone
/// waiting on a previous run.
#[derive(Debug, Clone)]
pub enum RunOutcome {
    /// The action ran to completion, or the invocation returned early
    /// because it was superseded or no longer admissible.
    Completed,
    /// The action acknowledged a cancellation request.
    Cancelled,
    /// The action failed.
    Failed(Arc<anyhow::Error>),
}

impl RunOutcome {
    pub fn error(&self) -> Option<&Arc<anyhow::Error>> {
        match self {
            RunOutcome::Failed(err) => Some(err),
            _ => None,
        }
    }
}

/// Scheduling knobs of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CommandOptions {
    /// Debounce window; zero disables debouncing.
    pub delay: Duration,
    /// Cancel and await the running execution before starting a new one.
    pub cancel_previous: bool,
}
