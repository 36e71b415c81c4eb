// src/process/mod.rs

//! Supervision of one OS process inside a pseudo-terminal.
//!
//! - [`task`] owns [`ProcessTask`]: spawn, output capture, the liveness
//!   monitor, stop/restart.
//! - [`exit`] classifies exit statuses into buffer messages and implements
//!   the graceful-then-forceful termination escalation.

pub mod exit;
pub mod task;

pub use task::{ProcessTask, ProcessTaskBuilder};
