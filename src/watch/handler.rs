// src/watch/handler.rs

use std::sync::Arc;

use crate::task::Task;

/// A raw filesystem change notification, as delivered by `notify`.
pub type ChangeEvent = notify::Event;

/// What a [`WatchTask`](crate::watch::WatchTask) runs when changes settle.
///
/// Either a fixed task instance that is re-started for every drained batch
/// (the batch contents don't influence it), or a factory mapping the batch
/// to a fresh task.
pub enum WatchHandler {
    Fixed(Arc<dyn Task>),
    Factory(Box<dyn Fn(Vec<ChangeEvent>) -> Arc<dyn Task> + Send + Sync>),
}

impl WatchHandler {
    pub fn fixed(task: Arc<dyn Task>) -> Self {
        WatchHandler::Fixed(task)
    }

    pub fn factory(
        f: impl Fn(Vec<ChangeEvent>) -> Arc<dyn Task> + Send + Sync + 'static,
    ) -> Self {
        WatchHandler::Factory(Box::new(f))
    }

    /// Produce the task to run for a drained batch of change events.
    pub fn build(&self, events: Vec<ChangeEvent>) -> Arc<dyn Task> {
        match self {
            WatchHandler::Fixed(task) => Arc::clone(task),
            WatchHandler::Factory(f) => f(events),
        }
    }
}

impl From<Arc<dyn Task>> for WatchHandler {
    fn from(task: Arc<dyn Task>) -> Self {
        WatchHandler::Fixed(task)
    }
}
