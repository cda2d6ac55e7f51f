// src/schedule/mod.rs

//! Optional admission stages that run between `start` and the action.
//!
//! Debounce is evaluated first; the supersede step runs only once the
//! debounce window has elapsed, immediately before the action.

pub mod debounce;
pub mod supersede;

pub use debounce::{DebounceOutcome, DebounceScheduler};
pub use supersede::{SupersedeOutcome, SupersedePolicy, SupersedeTicket};
