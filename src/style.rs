// src/style.rs

//! Minimal ANSI coloring for text written into task output buffers.
//!
//! Task buffers hold raw terminal text (they are fed from pseudo-terminals),
//! so supervisor-generated lines like termination messages use the same ANSI
//! escapes rather than a separate formatting layer.

const RESET: &str = "\x1b[0m";

pub(crate) fn green(text: &str) -> String {
    format!("\x1b[32m{text}{RESET}")
}

pub(crate) fn red(text: &str) -> String {
    format!("\x1b[31m{text}{RESET}")
}
