// src/task/mod.rs

//! The task abstraction: identity, status, actions, and subtask ownership.
//!
//! A task is a unit of supervised asynchronous work. Concrete tasks
//! ([`ProcessTask`](crate::process::ProcessTask),
//! [`WatchTask`](crate::watch::WatchTask)) are composed from the reusable
//! capabilities in [`core`]: a [`TaskCore`] carrying identity and the event
//! bus, and an [`OutputBuffer`] accumulating append-only output.

pub mod core;

use std::sync::Arc;

use serde::Serialize;
use tokio::runtime::Handle;

use crate::errors::TaskError;
use crate::events::{EventBus, TaskEvent};

pub use self::core::{OutputBuffer, TaskCore};

/// Process-wide unique task identifier. Ids are assigned at construction
/// from a single atomic counter and are never reused.
pub type TaskId = u64;

/// Lifecycle state of a task.
///
/// `Active` is the initial and only non-terminal state; `Finished` and
/// `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Active,
    Finished,
    Failed,
}

impl TaskStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Active => "active",
            TaskStatus::Finished => "finished",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Active)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A named operation a task exposes to external callers.
pub struct TaskAction {
    name: String,
    handler: Arc<dyn Fn() + Send + Sync>,
}

impl TaskAction {
    pub fn new(name: impl Into<String>, handler: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            name: name.into(),
            handler: Arc::new(handler),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke(&self) {
        (self.handler)();
    }
}

impl std::fmt::Debug for TaskAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskAction").field("name", &self.name).finish()
    }
}

/// Contract implemented by every supervised unit of work.
///
/// Status is always recomputed from live sub-state (process liveness,
/// handler liveness) when queried; implementations must not serve a stale
/// cached value.
pub trait Task: Send + Sync {
    fn id(&self) -> TaskId;

    fn name(&self) -> &str;

    /// The bus on which this task publishes [`TaskEvent`]s.
    fn bus(&self) -> &EventBus<TaskEvent>;

    /// Current full output text.
    fn output(&self) -> String;

    /// Current status, recomputed on demand.
    fn status(&self) -> TaskStatus;

    /// The actions currently available on this task. The list is dynamic;
    /// callers should not cache it.
    fn actions(&self) -> Vec<TaskAction>;

    /// Bind the task to `scheduler` and begin its asynchronous work.
    ///
    /// Calling `start` while the task is already active is an error.
    fn start(&self, scheduler: &Handle) -> Result<(), TaskError>;

    /// Request termination. May return before termination has completed.
    fn stop(&self);

    /// The scheduler this task was started against, if any.
    fn scheduler(&self) -> Option<Handle>;

    fn is_active(&self) -> bool {
        self.status() == TaskStatus::Active
    }

    /// Look up `action_name` in [`actions`](Self::actions) by linear scan
    /// and invoke it. Unknown names are an error, never a silent no-op.
    fn perform_action(&self, action_name: &str) -> Result<(), TaskError> {
        for action in self.actions() {
            if action.name() == action_name {
                action.invoke();
                return Ok(());
            }
        }
        Err(TaskError::UnsupportedAction {
            task: self.name().to_string(),
            action: action_name.to_string(),
        })
    }

    /// Start `task` as a subtask owned by `self`: it shares this task's
    /// scheduler instead of being registered with the session.
    fn start_subtask(&self, task: &Arc<dyn Task>) -> Result<(), TaskError> {
        let scheduler = self.scheduler().ok_or_else(|| TaskError::NotStarted {
            task: self.name().to_string(),
        })?;
        task.start(&scheduler)
    }
}
