// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [session]
/// name = "dev"
///
/// [task.server]
/// argv = ["python3", "-m", "http.server"]
/// cwd = "web"
///
/// [task.rebuild]
/// watch = "src"
/// recursive = true
/// delay = 0.5
/// force_once = true
/// argv = ["make", "all"]
/// ```
///
/// A `[task.<name>]` entry with a `watch` key declares a watch task whose
/// handler runs `argv` on every settled batch of changes; without `watch`
/// it declares a plain supervised process.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    /// Optional `[session]` section.
    #[serde(default)]
    pub session: SessionSection,

    /// All tasks from `[task.<name>]`. Keys are the task display names.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// `[session]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct SessionSection {
    /// Display name for the session.
    #[serde(default)]
    pub name: Option<String>,
}

/// `[task.<name>]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Argument vector for the process (or the watch handler's process).
    pub argv: Vec<String>,

    /// Optional working directory.
    #[serde(default)]
    pub cwd: Option<String>,

    /// Extra environment variables for the process.
    #[serde(default)]
    pub env: BTreeMap<String, String>,

    /// Path to observe. Present means this is a watch task.
    #[serde(default)]
    pub watch: Option<String>,

    /// Observe the watched path recursively.
    #[serde(default)]
    pub recursive: bool,

    /// Debounce delay in seconds (watch tasks only). Default 1.0.
    #[serde(default)]
    pub delay: Option<f64>,

    /// Invoke the handler once unconditionally at startup (watch tasks
    /// only).
    #[serde(default)]
    pub force_once: bool,
}

impl TaskConfig {
    /// True if this entry declares a watch task rather than a plain
    /// process.
    pub fn is_watch(&self) -> bool {
        self.watch.is_some()
    }
}
