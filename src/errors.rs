// src/errors.rs

//! Crate-wide error types.
//!
//! Two families live here:
//! - [`CommandError`], the outcome taxonomy of command executions. It is
//!   `Clone` so one outcome can be stored on the command and handed to
//!   every awaiter.
//! - [`CmdflightError`], used by configuration loading and the demo driver.

use std::fmt;
use std::sync::Arc;

use thiserror::Error;

/// Errors surfaced by command dispatch and by awaited completions.
#[derive(Error, Debug, Clone)]
pub enum CommandError {
    /// A second synchronous dispatch was attempted while the command was
    /// still constructing the previous one.
    #[error("command '{0}' is already dispatching; re-entrant execute rejected")]
    Reentrancy(String),

    /// The action observed its cancellation signal and unwound.
    #[error("command execution was cancelled")]
    Cancelled,

    /// The action failed for a reason other than cancellation.
    #[error("command action failed: {0}")]
    Action(Arc<anyhow::Error>),

    /// Triggering cancellation on the owner failed.
    #[error("cancel request failed: {0}")]
    CancelFailed(Arc<anyhow::Error>),

    /// No tokio runtime is available to drive the execution.
    #[error("no async runtime available to drive command '{0}'")]
    NoRuntime(String),

    /// The execution task panicked or was aborted.
    #[error("command execution aborted: {0}")]
    Aborted(String),
}

impl CommandError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, CommandError::Cancelled)
    }
}

/// Marker error an action returns to acknowledge a cancellation request.
///
/// Actions usually produce it through [`CancellationSignal::check`] and `?`;
/// the engine recognises it by downcasting the action's `anyhow::Error`.
///
/// [`CancellationSignal::check`]: crate::cancel::CancellationSignal::check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cancelled;

impl fmt::Display for Cancelled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("operation cancelled")
    }
}

impl std::error::Error for Cancelled {}

/// True when `err` (or anything in its chain) is a cancellation
/// acknowledgement rather than a genuine failure.
pub fn is_cancellation(err: &anyhow::Error) -> bool {
    err.chain().any(|cause| cause.is::<Cancelled>())
}

/// Errors from configuration loading and the demo driver.
#[derive(Error, Debug)]
pub enum CmdflightError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, CmdflightError>;
