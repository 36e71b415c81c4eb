// src/watch/mod.rs

//! Watch-triggered task execution.
//!
//! This module is responsible for:
//! - Wiring up a cross-platform filesystem watcher (`notify`).
//! - Debouncing bursts of change notifications into one handler invocation.
//! - Driving the handler task serially: at most one instance in flight,
//!   with notifications queued (never dropped) while it runs.
//!
//! It does **not** know how the handler does its work; it only turns
//! filesystem changes into handler-task runs and relays the handler's
//! output into its own buffer.

pub mod handler;
pub mod task;

pub use handler::{ChangeEvent, WatchHandler};
pub use task::{WatchTask, WatchTaskBuilder};
