// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod events;
pub mod logging;
pub mod process;
pub mod session;
pub mod stream;
mod style;
pub mod task;
pub mod watch;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::info;

use crate::cli::CliArgs;
use crate::config::loader::load_and_validate;
use crate::config::model::{ConfigFile, TaskConfig};
use crate::process::ProcessTask;
use crate::session::Session;
use crate::task::Task;
use crate::watch::{WatchHandler, WatchTask};

pub use crate::errors::TaskError;
pub use crate::events::{EventBus, TaskEvent};
pub use crate::session::{StatusUpdate, TaskSnapshot};
pub use crate::stream::OutputStreamReader;
pub use crate::task::{TaskAction, TaskId, TaskStatus};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading
/// - session construction (process tasks + watch tasks)
/// - the consolidated status feed
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let cfg = load_and_validate(&args.config)?;

    if args.dry_run {
        print_dry_run(&cfg);
        return Ok(());
    }

    if let Some(name) = &cfg.session.name {
        info!(session = %name, "starting session");
    }

    let session = build_session(&cfg);

    // Log the consolidated feed; a dashboard layer would subscribe here
    // instead.
    session.feed().subscribe(|update| {
        info!(task_id = update.task_id, status = %update.status, "status changed");
    });

    let scheduler = tokio::runtime::Handle::current();
    session.start_tasks(&scheduler)?;

    tokio::signal::ctrl_c().await?;
    info!("shutdown requested, stopping tasks");
    session.stop_all();

    Ok(())
}

/// Build a [`Session`] holding one task per `[task.<name>]` entry.
pub fn build_session(cfg: &ConfigFile) -> Session {
    let mut session = Session::new();
    for (name, task_cfg) in cfg.task.iter() {
        session.add_task(build_task(name, task_cfg));
    }
    session
}

fn build_task(name: &str, cfg: &TaskConfig) -> Arc<dyn Task> {
    match &cfg.watch {
        Some(watch_path) => {
            // Each settled batch of changes runs a fresh handler process.
            let argv = cfg.argv.clone();
            let cwd = cfg.cwd.clone();
            let env = cfg.env.clone();
            let handler = WatchHandler::factory(move |_events| {
                let mut builder = ProcessTask::builder(argv.clone()).envs(env.clone());
                if let Some(cwd) = &cwd {
                    builder = builder.cwd(cwd);
                }
                let task: Arc<dyn Task> = builder.build();
                task
            });

            let mut builder = WatchTask::builder(name, watch_path, handler)
                .recursive(cfg.recursive)
                .force_once(cfg.force_once);
            if let Some(delay) = cfg.delay {
                builder = builder.delay(Duration::from_secs_f64(delay));
            }
            builder.build()
        }
        None => {
            let mut builder = ProcessTask::builder(cfg.argv.clone())
                .name(name)
                .envs(cfg.env.clone());
            if let Some(cwd) = &cfg.cwd {
                builder = builder.cwd(cwd);
            }
            builder.build()
        }
    }
}

/// Simple dry-run output: print tasks and their shapes.
fn print_dry_run(cfg: &ConfigFile) {
    println!("taskpen dry-run");
    if let Some(name) = &cfg.session.name {
        println!("  session: {name}");
    }
    println!();

    println!("tasks ({}):", cfg.task.len());
    for (name, task) in cfg.task.iter() {
        println!("  - {name}");
        println!("      argv: {:?}", task.argv);
        if let Some(ref cwd) = task.cwd {
            println!("      cwd: {cwd}");
        }
        if !task.env.is_empty() {
            println!("      env: {:?}", task.env);
        }
        if let Some(ref watch) = task.watch {
            println!("      watch: {watch}");
            println!("      recursive: {}", task.recursive);
            if let Some(delay) = task.delay {
                println!("      delay: {delay}s");
            }
            if task.force_once {
                println!("      force_once: true");
            }
        }
    }
}
