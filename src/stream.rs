// src/stream.rs

//! Incremental reads over a monotonically growing text source.

use std::sync::Arc;

use crate::task::Task;

/// Progressively reads from a string whose length only ever grows.
///
/// Each call to [`read`](Self::read) returns the text appended since the
/// previous call, or `None` if nothing new has arrived. The concatenation of
/// all returned fragments reproduces the full source text; already-read data
/// is never resent.
pub struct OutputStreamReader {
    source: Box<dyn Fn() -> String + Send>,
    offset: usize,
}

impl OutputStreamReader {
    /// Wrap a nullary accessor returning the current full text.
    pub fn new(source: impl Fn() -> String + Send + 'static) -> Self {
        Self {
            source: Box::new(source),
            offset: 0,
        }
    }

    /// Read a task's accumulated output incrementally.
    pub fn from_task(task: &Arc<dyn Task>) -> Self {
        let task = Arc::clone(task);
        Self::new(move || task.output())
    }

    /// Return the fragment appended since the last read, advancing the
    /// offset by exactly the returned length. `None` means no growth.
    ///
    /// The source shrinking between reads is a programming error, not a
    /// recoverable condition.
    pub fn read(&mut self) -> Option<String> {
        let text = (self.source)();
        let next_offset = text.len();

        if next_offset == self.offset {
            // No new data.
            return None;
        }

        debug_assert!(
            next_offset > self.offset,
            "output source shrank from {} to {} bytes",
            self.offset,
            next_offset
        );

        let fragment = text[self.offset..].to_string();
        self.offset = next_offset;
        Some(fragment)
    }
}
