// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use tokio::runtime::Handle;

use taskpen::errors::TaskError;
use taskpen::events::{EventBus, TaskEvent};
use taskpen::task::{OutputBuffer, Task, TaskAction, TaskCore, TaskId, TaskStatus};

/// A task whose lifecycle is driven by the test: it does nothing on start
/// and stays `Active` until the test calls [`finish`](ScriptedTask::finish)
/// or [`fail`](ScriptedTask::fail).
pub struct ScriptedTask {
    core: TaskCore,
    buffer: OutputBuffer,
    status: Mutex<TaskStatus>,
    starts: AtomicUsize,
}

impl ScriptedTask {
    pub fn new(name: &str) -> Arc<Self> {
        let core = TaskCore::new(name);
        let buffer = OutputBuffer::new(core.bus().clone());
        Arc::new(Self {
            core,
            buffer,
            status: Mutex::new(TaskStatus::Active),
            starts: AtomicUsize::new(0),
        })
    }

    pub fn emit_output(&self, text: &str) {
        self.buffer.append(text);
    }

    pub fn finish(&self) {
        *self.status.lock().unwrap() = TaskStatus::Finished;
        self.core.bus().publish(&TaskEvent::StatusChanged);
    }

    pub fn fail(&self) {
        *self.status.lock().unwrap() = TaskStatus::Failed;
        self.core.bus().publish(&TaskEvent::StatusChanged);
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }
}

impl Task for ScriptedTask {
    fn id(&self) -> TaskId {
        self.core.id()
    }

    fn name(&self) -> &str {
        self.core.name()
    }

    fn bus(&self) -> &EventBus<TaskEvent> {
        self.core.bus()
    }

    fn output(&self) -> String {
        self.buffer.contents()
    }

    fn status(&self) -> TaskStatus {
        *self.status.lock().unwrap()
    }

    fn actions(&self) -> Vec<TaskAction> {
        Vec::new()
    }

    fn start(&self, scheduler: &Handle) -> Result<(), TaskError> {
        self.core.bind(scheduler);
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&self) {}

    fn scheduler(&self) -> Option<Handle> {
        self.core.scheduler()
    }
}
