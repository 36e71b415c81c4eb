// src/session.rs

//! The top-level task registry and consolidated status feed.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::runtime::Handle;
use tracing::info;

use crate::errors::TaskError;
use crate::events::{EventBus, TaskEvent};
use crate::task::{Task, TaskId, TaskStatus};

/// One entry on the session's consolidated feed: a task whose status (may
/// have) changed.
#[derive(Debug, Clone)]
pub struct StatusUpdate {
    pub task_id: TaskId,
    pub status: TaskStatus,
}

/// Serializable task summary for the status/output feed boundary. Output is
/// deliberately absent: it is exposed only through incremental
/// [`OutputStreamReader`](crate::stream::OutputStreamReader) reads.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot {
    pub id: TaskId,
    pub name: String,
    pub status: TaskStatus,
    pub actions: Vec<String>,
}

/// Manages the execution and monitoring of a collection of tasks.
///
/// The session subscribes to every registered task's bus and re-publishes
/// status changes on one consolidated [`feed`](Self::feed) for external
/// consumers (e.g. a dashboard layer).
pub struct Session {
    tasks: BTreeMap<TaskId, Arc<dyn Task>>,
    feed: EventBus<StatusUpdate>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            tasks: BTreeMap::new(),
            feed: EventBus::new(),
        }
    }

    pub fn add_task(&mut self, task: Arc<dyn Task>) {
        self.tasks.insert(task.id(), task);
    }

    pub fn get_task(&self, id: TaskId) -> Option<&Arc<dyn Task>> {
        self.tasks.get(&id)
    }

    /// Tasks in registration order (ids are assigned monotonically).
    pub fn tasks(&self) -> impl Iterator<Item = &Arc<dyn Task>> {
        self.tasks.values()
    }

    /// The consolidated status feed across all registered tasks.
    pub fn feed(&self) -> &EventBus<StatusUpdate> {
        &self.feed
    }

    /// Start every registered task against `scheduler` and begin
    /// republishing its status changes on the session feed.
    pub fn start_tasks(&self, scheduler: &Handle) -> Result<(), TaskError> {
        for task in self.tasks.values() {
            task.start(scheduler)?;
            self.monitor_task(task);
            info!(task = %task.name(), id = task.id(), "started task");
        }
        Ok(())
    }

    fn monitor_task(&self, task: &Arc<dyn Task>) {
        let feed = self.feed.clone();
        // Weak reference: the task's bus must not keep the task alive.
        let weak = Arc::downgrade(task);
        task.bus().subscribe(move |event| {
            if *event == TaskEvent::StatusChanged {
                if let Some(task) = weak.upgrade() {
                    feed.publish(&StatusUpdate {
                        task_id: task.id(),
                        status: task.status(),
                    });
                }
            }
        });
    }

    /// Invoke a named action on a task, as requested by an external caller.
    /// Unknown ids and unsupported actions are caller-visible errors.
    pub fn perform_action(&self, id: TaskId, action_name: &str) -> Result<(), TaskError> {
        let task = self.get_task(id).ok_or(TaskError::UnknownTask(id))?;
        task.perform_action(action_name)
    }

    /// Request termination of every registered task.
    pub fn stop_all(&self) {
        for task in self.tasks.values() {
            task.stop();
        }
    }

    /// Snapshot of all tasks for the feed boundary.
    pub fn snapshot(&self) -> Vec<TaskSnapshot> {
        self.tasks
            .values()
            .map(|task| TaskSnapshot {
                id: task.id(),
                name: task.name().to_string(),
                status: task.status(),
                actions: task
                    .actions()
                    .iter()
                    .map(|action| action.name().to_string())
                    .collect(),
            })
            .collect()
    }
}
