// src/task/core.rs

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use tokio::runtime::Handle;

use crate::events::{EventBus, TaskEvent};
use crate::task::TaskId;

/// Source of process-wide unique, strictly increasing task ids.
static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(0);

/// Identity and wiring shared by every concrete task: id, display name, the
/// task's event bus, and the scheduler handle bound at start.
pub struct TaskCore {
    id: TaskId,
    name: String,
    bus: EventBus<TaskEvent>,
    scheduler: Mutex<Option<Handle>>,
}

impl TaskCore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed),
            name: name.into(),
            bus: EventBus::new(),
            scheduler: Mutex::new(None),
        }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bus(&self) -> &EventBus<TaskEvent> {
        &self.bus
    }

    /// Bind the task to a scheduler. The first bind wins; later calls (e.g.
    /// a fixed watch handler re-started for another batch) are no-ops.
    pub fn bind(&self, scheduler: &Handle) {
        let mut slot = self.scheduler.lock().unwrap();
        if slot.is_none() {
            *slot = Some(scheduler.clone());
        }
    }

    pub fn scheduler(&self) -> Option<Handle> {
        self.scheduler.lock().unwrap().clone()
    }
}

/// Append-only output buffer that notifies the task's bus on every append.
///
/// The buffer only grows; there are no in-place edits or truncation, which
/// is what lets [`OutputStreamReader`](crate::stream::OutputStreamReader)
/// hand out suffixes by offset.
pub struct OutputBuffer {
    bus: EventBus<TaskEvent>,
    text: Mutex<String>,
}

impl OutputBuffer {
    /// Create a buffer publishing `OutputUpdated` on `bus` (normally the
    /// owning task's bus) after each append.
    pub fn new(bus: EventBus<TaskEvent>) -> Self {
        Self {
            bus,
            text: Mutex::new(String::new()),
        }
    }

    pub fn append(&self, text: &str) {
        {
            let mut buf = self.text.lock().unwrap();
            buf.push_str(text);
        }
        self.bus.publish(&TaskEvent::OutputUpdated);
    }

    pub fn append_line(&self, line: &str) {
        self.append(&format!("{line}\n"));
    }

    pub fn contents(&self) -> String {
        self.text.lock().unwrap().clone()
    }
}
