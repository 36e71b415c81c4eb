// src/process/exit.rs

use portable_pty::ExitStatus;

use crate::style;

/// Human-readable termination message for the task's output buffer,
/// classified as success (green) or failure (red).
///
/// `None` means the process exited but no status could be collected; that is
/// treated as a failure of unknown cause.
pub fn termination_message(exit: Option<&ExitStatus>) -> String {
    let (reason, ok) = match exit {
        Some(status) => match status.signal() {
            Some(signal) => (format!("due to signal {signal}"), false),
            None => (
                format!("with code {}", status.exit_code()),
                status.success(),
            ),
        },
        None => ("due to unknown reasons".to_string(), false),
    };

    let message = format!("[Process exited {reason}]");
    let colored = if ok {
        style::green(&message)
    } else {
        style::red(&message)
    };
    format!("\n{colored}\n\n")
}

/// Ask the process to terminate gracefully with SIGTERM.
///
/// Escalation to a forceful kill is handled by the caller after a grace
/// period; this only covers the polite first attempt.
#[cfg(unix)]
pub fn send_term_signal(pid: u32) -> std::io::Result<()> {
    let status = std::process::Command::new("kill")
        .args(["-TERM", &pid.to_string()])
        .status()?;
    if status.success() {
        Ok(())
    } else {
        Err(std::io::Error::other(format!(
            "kill -TERM {pid} exited with {status}"
        )))
    }
}

#[cfg(not(unix))]
pub fn send_term_signal(_pid: u32) -> std::io::Result<()> {
    Err(std::io::Error::other(
        "graceful termination is not supported on this platform",
    ))
}
