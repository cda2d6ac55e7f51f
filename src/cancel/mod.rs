// src/cancel/mod.rs

//! Cooperative cancellation.
//!
//! - [`signal`] is the shareable signal actions observe.
//! - [`coordinator`] owns the live signal of one command.
//! - [`sub_command`] is the companion cancel command whose running state is
//!   slaved to its owner.

pub mod coordinator;
pub mod signal;
pub mod sub_command;

pub use coordinator::CancellationCoordinator;
pub use signal::CancellationSignal;
pub use sub_command::{CancelCommand, CancelTarget};
