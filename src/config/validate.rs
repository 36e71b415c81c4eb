// src/config/validate.rs

use anyhow::{anyhow, Result};

use crate::config::model::ConfigFile;

/// Run basic semantic validation against a loaded configuration.
///
/// This checks:
/// - there is at least one task
/// - every task has a non-empty `argv`
/// - `delay` (when given) is positive and finite
/// - `delay`, `recursive` and `force_once` only appear on watch tasks
pub fn validate_config(cfg: &ConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    for (name, task) in cfg.task.iter() {
        validate_task(name, task)?;
    }
    Ok(())
}

fn ensure_has_tasks(cfg: &ConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(anyhow!(
            "config must contain at least one [task.<name>] section"
        ));
    }
    Ok(())
}

fn validate_task(name: &str, task: &crate::config::model::TaskConfig) -> Result<()> {
    if task.argv.is_empty() {
        return Err(anyhow!("task '{}' has an empty `argv`", name));
    }
    if task.argv.iter().any(|arg| arg.is_empty()) {
        return Err(anyhow!("task '{}' has an empty string in `argv`", name));
    }

    if let Some(delay) = task.delay {
        if !delay.is_finite() || delay <= 0.0 {
            return Err(anyhow!(
                "task '{}' has invalid `delay` {} (must be a positive number of seconds)",
                name,
                delay
            ));
        }
    }

    if !task.is_watch() {
        if task.delay.is_some() {
            return Err(anyhow!(
                "task '{}' sets `delay` but has no `watch` path",
                name
            ));
        }
        if task.recursive {
            return Err(anyhow!(
                "task '{}' sets `recursive` but has no `watch` path",
                name
            ));
        }
        if task.force_once {
            return Err(anyhow!(
                "task '{}' sets `force_once` but has no `watch` path",
                name
            ));
        }
    }

    Ok(())
}
