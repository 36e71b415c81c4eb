// src/errors.rs

//! Crate-wide error types.
//!
//! Application-level wiring (config loading, startup) uses `anyhow`; the
//! supervision engine itself reports caller-visible failures through the
//! structured [`TaskError`] enum so that callers (e.g. an action-invocation
//! endpoint) can distinguish a rejected request from an internal fault.

use std::path::PathBuf;

pub use anyhow::{Error, Result};

use crate::task::TaskId;

/// Errors surfaced by the task supervision engine.
///
/// None of these are fatal to the supervising process: each one is either a
/// rejected caller request (`UnsupportedAction`, `UnknownTask`) or a failure
/// local to a single task (`Spawn`, `Watch`).
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    /// An action name was requested that the task does not expose.
    #[error("unsupported action '{action}' for task '{task}'")]
    UnsupportedAction { task: String, action: String },

    /// No task with the given id is registered.
    #[error("no task with id {0}")]
    UnknownTask(TaskId),

    /// The task has not been bound to a scheduler yet.
    #[error("task '{task}' has not been started")]
    NotStarted { task: String },

    /// `start()` was called while the task's process is still alive.
    #[error("task '{task}' is already active")]
    AlreadyActive { task: String },

    /// Spawning the OS process (or its pseudo-terminal) failed.
    #[error("failed to spawn process for task '{task}': {message}")]
    Spawn { task: String, message: String },

    /// Setting up filesystem observation failed.
    #[error("failed to watch path {path:?}")]
    Watch {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
}
