// src/process/task.rs

use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use portable_pty::{
    native_pty_system, Child, ChildKiller, CommandBuilder, ExitStatus, MasterPty, PtySize,
};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::TaskError;
use crate::events::{EventBus, TaskEvent};
use crate::process::exit;
use crate::task::{OutputBuffer, Task, TaskAction, TaskCore, TaskId, TaskStatus};

/// Bytes read from the pseudo-terminal per wakeup.
const OUTPUT_BLOCK_SIZE: usize = 1024;

/// How often the liveness monitor polls the child.
const LIVENESS_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// How long `stop()` waits after SIGTERM before force-killing.
const TERM_GRACE_PERIOD: Duration = Duration::from_secs(2);

struct ProcessState {
    child: Option<Box<dyn Child + Send + Sync>>,
    killer: Option<Box<dyn ChildKiller + Send + Sync>>,
    /// Keeps the PTY master (and thus the reader's fd) alive; dropped during
    /// termination cleanup to unhook the reader.
    master: Option<Box<dyn MasterPty + Send>>,
    /// Incremented on every spawn. Reader and monitor hooks capture the
    /// generation they were created for and go inert when it moves on, so a
    /// stale hook can never touch a newer process.
    generation: u64,
    /// Exit status collected by the liveness monitor.
    last_exit: Option<ExitStatus>,
    exit_monitor: Option<JoinHandle<()>>,
}

/// A task that executes a process within a pseudo-terminal.
///
/// The process's interleaved stdout/stderr is drained from the PTY into the
/// task's output buffer. A background monitor polls liveness; on exit it
/// appends a colored termination message and publishes `StatusChanged`.
pub struct ProcessTask {
    core: TaskCore,
    buffer: OutputBuffer,
    argv: Vec<String>,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
    state: Mutex<ProcessState>,
    restart_pending: AtomicBool,
    this: Weak<ProcessTask>,
}

/// Builder for [`ProcessTask`]. If no name is given, the joined command
/// string is used as the task name.
pub struct ProcessTaskBuilder {
    argv: Vec<String>,
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
    name: Option<String>,
}

impl ProcessTaskBuilder {
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env.extend(vars);
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn build(self) -> Arc<ProcessTask> {
        let name = self.name.unwrap_or_else(|| self.argv.join(" "));
        let core = TaskCore::new(name);
        let buffer = OutputBuffer::new(core.bus().clone());
        Arc::new_cyclic(|this| ProcessTask {
            core,
            buffer,
            argv: self.argv,
            cwd: self.cwd,
            env: self.env,
            state: Mutex::new(ProcessState {
                child: None,
                killer: None,
                master: None,
                generation: 0,
                last_exit: None,
                exit_monitor: None,
            }),
            restart_pending: AtomicBool::new(false),
            this: this.clone(),
        })
    }
}

impl ProcessTask {
    pub fn builder(argv: impl IntoIterator<Item = impl Into<String>>) -> ProcessTaskBuilder {
        ProcessTaskBuilder {
            argv: argv.into_iter().map(Into::into).collect(),
            cwd: None,
            env: BTreeMap::new(),
            name: None,
        }
    }

    pub fn new(argv: impl IntoIterator<Item = impl Into<String>>) -> Arc<Self> {
        Self::builder(argv).build()
    }

    /// Spawn the process and register the output reader and liveness
    /// monitor with the bound scheduler.
    fn spawn_process(&self) -> Result<(), TaskError> {
        let scheduler = self.core.scheduler().ok_or_else(|| TaskError::NotStarted {
            task: self.core.name().to_string(),
        })?;
        let this = self
            .this
            .upgrade()
            .expect("spawn_process called on a dropped task");

        if self.argv.is_empty() {
            return Err(TaskError::Spawn {
                task: self.core.name().to_string(),
                message: "empty argument vector".to_string(),
            });
        }

        let mut st = self.state.lock().unwrap();

        if let Some(child) = st.child.as_mut() {
            if matches!(child.try_wait(), Ok(None)) {
                return Err(TaskError::AlreadyActive {
                    task: self.core.name().to_string(),
                });
            }
        }

        // A new generation turns any previous reader/monitor hooks inert, so
        // they cannot deliver stale data for the new process.
        st.generation += 1;
        let generation = st.generation;

        let pty = native_pty_system()
            .openpty(PtySize {
                rows: 24,
                cols: 80,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|err| self.spawn_error(&err))?;

        let mut cmd = CommandBuilder::new(&self.argv[0]);
        cmd.args(&self.argv[1..]);
        if let Some(cwd) = &self.cwd {
            cmd.cwd(cwd);
        }
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        let child = pty
            .slave
            .spawn_command(cmd)
            .map_err(|err| self.spawn_error(&err))?;
        // The child holds its own copy of the slave end.
        drop(pty.slave);

        let mut reader = pty
            .master
            .try_clone_reader()
            .map_err(|err| self.spawn_error(&err))?;

        st.killer = Some(child.clone_killer());
        st.child = Some(child);
        st.master = Some(pty.master);
        st.last_exit = None;

        // Drain PTY output into the buffer in fixed-size blocks. EOF (the
        // PTY closing once the process is gone) is a clean end-of-stream,
        // not an error.
        let reader_task = Arc::clone(&this);
        scheduler.spawn_blocking(move || {
            let mut block = [0u8; OUTPUT_BLOCK_SIZE];
            loop {
                match reader.read(&mut block) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if !reader_task.generation_is_current(generation) {
                            break;
                        }
                        reader_task
                            .buffer
                            .append(&String::from_utf8_lossy(&block[..n]));
                    }
                }
            }
            debug!(task = %reader_task.core.name(), "pty reader ended");
        });

        // Poll liveness on a fixed interval; on exit, run termination
        // cleanup.
        let monitor_task = Arc::clone(&this);
        let monitor = scheduler.spawn(async move {
            loop {
                tokio::time::sleep(LIVENESS_POLL_INTERVAL).await;
                let exited = {
                    let mut st = monitor_task.state.lock().unwrap();
                    if st.generation != generation {
                        return;
                    }
                    match st.child.as_mut().map(|c| c.try_wait()) {
                        Some(Ok(None)) => false,
                        Some(Ok(Some(status))) => {
                            st.last_exit = Some(status);
                            true
                        }
                        // A wait error leaves us without a status; treat the
                        // process as exited for unknown reasons.
                        Some(Err(_)) | None => true,
                    }
                };
                if exited {
                    break;
                }
            }
            monitor_task.on_process_exit(generation);
        });
        st.exit_monitor = Some(monitor);

        drop(st);
        self.core.bus().publish(&TaskEvent::StatusChanged);
        Ok(())
    }

    /// Termination cleanup: unhook the reader, write the termination
    /// message, publish the status change.
    fn on_process_exit(&self, generation: u64) {
        let last_exit = {
            let mut st = self.state.lock().unwrap();
            if st.generation != generation {
                warn!(
                    task = %self.core.name(),
                    "internal inconsistency: process changed before termination callback"
                );
                return;
            }
            st.exit_monitor = None;
            // Dropping the master closes the PTY and ends the reader loop.
            st.master = None;
            st.killer = None;
            st.last_exit.clone()
        };

        self.buffer.append(&exit::termination_message(last_exit.as_ref()));
        self.core.bus().publish(&TaskEvent::StatusChanged);
    }

    fn generation_is_current(&self, generation: u64) -> bool {
        self.state.lock().unwrap().generation == generation
    }

    fn spawn_error(&self, err: &dyn std::fmt::Display) -> TaskError {
        TaskError::Spawn {
            task: self.core.name().to_string(),
            message: err.to_string(),
        }
    }

    /// Stop the current process and start a new one.
    ///
    /// Concurrent restart requests coalesce into a single in-flight
    /// sequence: while one is pending, further calls are no-ops. The
    /// sequence waits for the current termination monitor before starting
    /// the replacement.
    pub fn restart(&self) {
        if self.restart_pending.swap(true, Ordering::SeqCst) {
            debug!(task = %self.core.name(), "restart already pending; ignoring");
            return;
        }

        let Some(scheduler) = self.core.scheduler() else {
            self.restart_pending.store(false, Ordering::SeqCst);
            return;
        };
        let Some(this) = self.this.upgrade() else {
            return;
        };

        scheduler.spawn(async move {
            let monitor = this.state.lock().unwrap().exit_monitor.take();
            if let Some(monitor) = monitor {
                this.stop();
                let _ = monitor.await;
            }
            if let Err(err) = this.spawn_process() {
                warn!(task = %this.core.name(), error = %err, "restart failed");
            }
            this.restart_pending.store(false, Ordering::SeqCst);
        });
    }
}

impl Task for ProcessTask {
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

    /// Recomputed from process liveness on every call.
    fn status(&self) -> TaskStatus {
        let mut st = self.state.lock().unwrap();
        if let Some(status) = &st.last_exit {
            return if status.success() {
                TaskStatus::Finished
            } else {
                TaskStatus::Failed
            };
        }
        match st.child.as_mut() {
            // Created but not yet started.
            None => TaskStatus::Active,
            Some(child) => match child.try_wait() {
                Ok(None) => TaskStatus::Active,
                Ok(Some(status)) => {
                    let finished = status.success();
                    st.last_exit = Some(status);
                    if finished {
                        TaskStatus::Finished
                    } else {
                        TaskStatus::Failed
                    }
                }
                // Exited for unknown reasons.
                Err(_) => TaskStatus::Failed,
            },
        }
    }

    fn actions(&self) -> Vec<TaskAction> {
        let stop = {
            let this = self.this.clone();
            TaskAction::new("Stop", move || {
                if let Some(task) = this.upgrade() {
                    task.stop();
                }
            })
        };
        let restart = {
            let this = self.this.clone();
            TaskAction::new("Restart", move || {
                if let Some(task) = this.upgrade() {
                    task.restart();
                }
            })
        };
        vec![stop, restart]
    }

    fn start(&self, scheduler: &Handle) -> Result<(), TaskError> {
        self.core.bind(scheduler);
        self.spawn_process()
    }

    /// Graceful-then-forceful termination: SIGTERM first, then a PTY kill
    /// if the process is still alive after the grace period.
    fn stop(&self) {
        let Some(scheduler) = self.core.scheduler() else {
            return;
        };
        let Some(this) = self.this.upgrade() else {
            return;
        };

        scheduler.spawn(async move {
            let (pid, generation) = {
                let st = this.state.lock().unwrap();
                (
                    st.child.as_ref().and_then(|c| c.process_id()),
                    st.generation,
                )
            };
            let Some(pid) = pid else {
                return;
            };

            if let Err(err) = exit::send_term_signal(pid) {
                debug!(task = %this.core.name(), error = %err, "SIGTERM failed; will force kill");
            }
            tokio::time::sleep(TERM_GRACE_PERIOD).await;

            let mut st = this.state.lock().unwrap();
            // A restart may have swapped in a new process during the grace
            // period; never kill across generations.
            if st.generation != generation {
                return;
            }
            let alive = st
                .child
                .as_mut()
                .map(|c| matches!(c.try_wait(), Ok(None)))
                .unwrap_or(false);
            if alive {
                warn!(task = %this.core.name(), pid, "process survived SIGTERM; killing");
                if let Some(killer) = st.killer.as_mut() {
                    let _ = killer.kill();
                }
            }
        });
    }

    fn scheduler(&self) -> Option<Handle> {
        self.core.scheduler()
    }
}
