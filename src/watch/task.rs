// src/watch/task.rs

use std::path::PathBuf;
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::TaskError;
use crate::events::{EventBus, SubscriberId, TaskEvent};
use crate::stream::OutputStreamReader;
use crate::style;
use crate::task::{OutputBuffer, Task, TaskAction, TaskCore, TaskId, TaskStatus};
use crate::watch::handler::{ChangeEvent, WatchHandler};

const DEFAULT_DEBOUNCE_DELAY: Duration = Duration::from_secs(1);

struct ActiveHandler {
    task: Arc<dyn Task>,
    stream: OutputStreamReader,
    subscription: SubscriberId,
}

struct WatchState {
    /// Change notifications accumulated since the last drain. Never dropped:
    /// events arriving while a handler runs wait here for the next cycle.
    queue: Vec<ChangeEvent>,
    /// True while a debounced consume is scheduled. At most one timer is
    /// outstanding; further dispatches rely on it seeing the updated queue.
    pending_consume: bool,
    active: Option<ActiveHandler>,
    /// Keeps the underlying watcher alive; dropping it stops observation.
    observer: Option<RecommendedWatcher>,
}

/// Watches a path and runs a handler task whenever changes settle.
///
/// Raw notifications from the watcher's own thread are handed into the
/// scheduler through a channel, queued, and debounced: one consume cycle is
/// scheduled `delay` after the first notification of a burst. At most one
/// handler subtask is active at a time; the handler's output is relayed into
/// this task's buffer so all runs accumulate into one continuous log.
pub struct WatchTask {
    core: TaskCore,
    buffer: OutputBuffer,
    path: PathBuf,
    recursive: bool,
    delay: Duration,
    force_once: bool,
    handler: WatchHandler,
    state: Mutex<WatchState>,
    this: Weak<WatchTask>,
}

/// Builder for [`WatchTask`].
pub struct WatchTaskBuilder {
    name: String,
    path: PathBuf,
    handler: WatchHandler,
    recursive: bool,
    delay: Duration,
    force_once: bool,
}

impl WatchTaskBuilder {
    /// Watch the path recursively (default: false).
    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Debounce interval for accumulating changes (default: 1s).
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Invoke the handler once unconditionally when the watch starts.
    pub fn force_once(mut self, force_once: bool) -> Self {
        self.force_once = force_once;
        self
    }

    pub fn build(self) -> Arc<WatchTask> {
        let core = TaskCore::new(self.name);
        let buffer = OutputBuffer::new(core.bus().clone());
        Arc::new_cyclic(|this| WatchTask {
            core,
            buffer,
            path: self.path,
            recursive: self.recursive,
            delay: self.delay,
            force_once: self.force_once,
            handler: self.handler,
            state: Mutex::new(WatchState {
                queue: Vec::new(),
                pending_consume: false,
                active: None,
                observer: None,
            }),
            this: this.clone(),
        })
    }
}

impl WatchTask {
    pub fn builder(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        handler: impl Into<WatchHandler>,
    ) -> WatchTaskBuilder {
        WatchTaskBuilder {
            name: name.into(),
            path: path.into(),
            handler: handler.into(),
            recursive: false,
            delay: DEFAULT_DEBOUNCE_DELAY,
            force_once: false,
        }
    }

    /// Record a raw change notification and make sure a consume cycle is
    /// scheduled. Safe to call from any thread once the task is started.
    pub fn dispatch(&self, event: ChangeEvent) {
        self.state.lock().unwrap().queue.push(event);
        self.initiate_consume(None);
    }

    /// Schedule a consume after `delay` (or the configured debounce delay).
    ///
    /// If one is already pending this is a no-op: the pending cycle will see
    /// everything queued up to the moment it fires.
    fn initiate_consume(&self, delay: Option<Duration>) {
        let Some(scheduler) = self.core.scheduler() else {
            return;
        };
        {
            let mut st = self.state.lock().unwrap();
            if st.pending_consume {
                return;
            }
            st.pending_consume = true;
        }

        let delay = delay.unwrap_or(self.delay);
        let this = self.this.clone();
        scheduler.spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if let Some(task) = this.upgrade() {
                task.consume();
            }
        });
    }

    /// Drain the queue and start the handler, unless one is still running,
    /// in which case check back after another delay while events keep
    /// accumulating.
    fn consume(&self) {
        let Some(scheduler) = self.core.scheduler() else {
            return;
        };

        let handler_task = {
            let mut st = self.state.lock().unwrap();
            if st.active.is_some() {
                let this = self.this.clone();
                let delay = self.delay;
                scheduler.spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(task) = this.upgrade() {
                        task.consume();
                    }
                });
                return;
            }

            let events = std::mem::take(&mut st.queue);
            let task = self.handler.build(events);
            let stream = OutputStreamReader::from_task(&task);
            let subscription = {
                let this = self.this.clone();
                task.bus().subscribe(move |event| {
                    if let Some(watch) = this.upgrade() {
                        watch.on_handler_event(*event);
                    }
                })
            };
            st.active = Some(ActiveHandler {
                task: Arc::clone(&task),
                stream,
                subscription,
            });
            st.pending_consume = false;
            task
        };

        debug!(task = %self.core.name(), handler = %handler_task.name(), "starting handler");
        if let Err(err) = self.start_subtask(&handler_task) {
            warn!(task = %self.core.name(), error = %err, "handler failed to start");
            let mut st = self.state.lock().unwrap();
            if let Some(active) = st.active.take() {
                active.task.bus().unsubscribe(active.subscription);
            }
            drop(st);
            self.buffer
                .append_line(&style::red(&format!("[Handler failed to start: {err}]")));
        }
    }

    /// Relay for the active handler's bus: copy new output into our buffer;
    /// on a terminal status change, detach from the handler.
    fn on_handler_event(&self, event: TaskEvent) {
        match event {
            TaskEvent::OutputUpdated => {
                // Read and append under one lock: relays can run on several
                // threads at once (PTY reader, exit monitor), and releasing
                // the lock between the two steps would let fragments land in
                // the buffer out of stream order. Publishing from inside the
                // lock is safe; nothing downstream of our bus takes this
                // lock.
                let mut st = self.state.lock().unwrap();
                if let Some(fragment) = st.active.as_mut().and_then(|active| active.stream.read())
                {
                    self.buffer.append(&fragment);
                }
            }
            TaskEvent::StatusChanged => {
                let mut st = self.state.lock().unwrap();
                let terminated = st
                    .active
                    .as_ref()
                    .is_some_and(|active| !active.task.is_active());
                if terminated {
                    if let Some(active) = st.active.take() {
                        active.task.bus().unsubscribe(active.subscription);
                    }
                }
            }
        }
    }
}

impl Task for WatchTask {
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

    /// A watch has no terminal state of its own; only its handler subtasks
    /// terminate.
    fn status(&self) -> TaskStatus {
        TaskStatus::Active
    }

    fn actions(&self) -> Vec<TaskAction> {
        let this = self.this.clone();
        vec![TaskAction::new("Trigger", move || {
            if let Some(task) = this.upgrade() {
                task.initiate_consume(Some(Duration::ZERO));
            }
        })]
    }

    fn start(&self, scheduler: &Handle) -> Result<(), TaskError> {
        self.core.bind(scheduler);
        self.buffer.append_line(&format!(
            "{} {}",
            style::green("Watching:"),
            self.path.display()
        ));

        // Channel from the blocking notify callback into the async world;
        // this is the one cross-thread handoff in the watch path.
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<ChangeEvent>();

        let mut observer = RecommendedWatcher::new(
            move |res: notify::Result<ChangeEvent>| match res {
                Ok(event) => {
                    let _ = event_tx.send(event);
                }
                Err(err) => {
                    warn!(error = %err, "file watch error");
                }
            },
            notify::Config::default(),
        )
        .map_err(|source| TaskError::Watch {
            path: self.path.clone(),
            source,
        })?;

        let mode = if self.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        observer
            .watch(&self.path, mode)
            .map_err(|source| TaskError::Watch {
                path: self.path.clone(),
                source,
            })?;
        self.state.lock().unwrap().observer = Some(observer);

        let this = self.this.clone();
        scheduler.spawn(async move {
            while let Some(event) = event_rx.recv().await {
                match this.upgrade() {
                    Some(task) => task.dispatch(event),
                    None => return,
                }
            }
            debug!("watch event loop ended");
        });

        if self.force_once {
            self.buffer.append_line("Invoking handler once unconditionally");
            self.initiate_consume(Some(Duration::ZERO));
        }

        Ok(())
    }

    /// Forward `stop()` to the active handler, then halt observation. An
    /// in-flight debounce timer is left alone; it becomes a no-op once
    /// observation stops producing events.
    fn stop(&self) {
        let active = {
            let st = self.state.lock().unwrap();
            st.active.as_ref().map(|active| Arc::clone(&active.task))
        };
        if let Some(task) = active {
            task.stop();
        }
        let observer = self.state.lock().unwrap().observer.take();
        drop(observer);
    }

    fn scheduler(&self) -> Option<Handle> {
        self.core.scheduler()
    }
}
