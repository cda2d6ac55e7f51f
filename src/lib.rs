// src/lib.rs

//! Asynchronous command execution engine for UI data binding.
//!
//! A view binds a gesture to an [`AsyncCommand`] and only ever sees a
//! synchronous contract: `can_execute`, `execute`, `is_running`, `error`.
//! Behind it the engine provides single-flight dispatch with re-entrancy
//! rejection, cooperative cancellation through a companion
//! [`CancelCommand`], debounced dispatch and "cancel previous, then run".

pub mod cancel;
pub mod cli;
pub mod command;
pub mod config;
pub mod errors;
pub mod logging;
pub mod notify;
pub mod schedule;
pub mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{debug, info};

pub use cancel::{CancelCommand, CancellationSignal};
pub use command::{AsyncCommand, CommandBuilder, Completion};
pub use errors::{Cancelled, CommandError};
pub use notify::{NotificationSink, NullSink};
pub use types::{CommandOptions, Property};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, parse_duration};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - option resolution (config file, then CLI overrides)
/// - a search command with a notification printer
/// - the simulated keystroke burst
/// - an optional press of the cancel command
pub async fn run(args: CliArgs) -> Result<()> {
    let options = resolve_options(&args)?;
    let interval = duration_arg("--interval", &args.interval)?;
    let work = duration_arg("--work", &args.work)?;
    let cancel_after = args
        .cancel_after
        .as_deref()
        .map(|s| duration_arg("--cancel-after", s))
        .transpose()?;

    if args.dry_run {
        print_dry_run(&args.command, &options, &args.keystrokes());
        return Ok(());
    }

    // `None` marks the end of the replay; everything before it has been
    // published synchronously, so the printer drains it all.
    let (note_tx, mut note_rx) = mpsc::unbounded_channel::<Option<Note>>();
    let done_tx = note_tx.clone();
    let command = build_search_command(&args.command, options, work, note_tx);

    // Print notifications with the state observed when they arrive.
    let printer = {
        let command = command.clone();
        tokio::spawn(async move {
            while let Some(Some((source, property))) = note_rx.recv().await {
                match (source, property) {
                    ("command", Property::IsRunning) => {
                        println!("[{}] running = {}", command.name(), command.is_running())
                    }
                    ("command", Property::Error) => match command.error() {
                        Some(err) => println!("[{}] error = {err}", command.name()),
                        None => println!("[{}] error cleared", command.name()),
                    },
                    ("cancel", Property::IsRunning) => println!(
                        "[{}.cancel] running = {}",
                        command.name(),
                        command.cancel_command().is_running()
                    ),
                    _ => debug!(source, %property, "notification"),
                }
            }
        })
    };

    info!(command = %command.name(), ?options, "replaying keystrokes");

    let mut completions = Vec::new();
    let keystrokes = args.keystrokes();
    let count = keystrokes.len();
    for (i, query) in keystrokes.into_iter().enumerate() {
        println!("> {query:?}");
        completions.push(command.execute_async(query)?);
        if i + 1 < count {
            tokio::time::sleep(interval).await;
        }
    }

    if let Some(after) = cancel_after {
        tokio::time::sleep(after).await;
        println!("> cancel (admissible = {})", command.cancel_command().can_execute());
        command.cancel_command().execute();
    }

    // Earlier executions may still be unwinding; only the last one is reported.
    let mut last = None;
    for completion in completions {
        last = Some(completion.await);
    }
    match last {
        Some(Ok(())) => println!("last input finished"),
        Some(Err(CommandError::Cancelled)) => println!("last input cancelled"),
        Some(Err(err)) => println!("last input failed: {err}"),
        None => {}
    }

    let _ = done_tx.send(None);
    let _ = printer.await;
    Ok(())
}

/// Notification source tag and property, as seen by the demo printer.
type Note = (&'static str, Property);

fn build_search_command(
    name: &str,
    options: CommandOptions,
    work: Duration,
    note_tx: mpsc::UnboundedSender<Option<Note>>,
) -> AsyncCommand<String> {
    let cancel_tx = note_tx.clone();

    AsyncCommand::builder(move |query: String, signal: CancellationSignal| async move {
        tokio::select! {
            _ = signal.cancelled() => {
                debug!(%query, "search observed cancellation");
                Err(anyhow::Error::new(Cancelled))
            }
            _ = tokio::time::sleep(work) => {
                println!("  results for {query:?}");
                Ok(())
            }
        }
    })
    .name(name)
    .can_execute(|query: &String| !query.trim().is_empty())
    .options(options)
    .sink(Arc::new(move |p: Property| {
        let _ = note_tx.send(Some(("command", p)));
    }))
    .cancel_sink(Arc::new(move |p: Property| {
        let _ = cancel_tx.send(Some(("cancel", p)));
    }))
    .build()
}

/// Options from `--config` (if given) with CLI flags layered on top.
fn resolve_options(args: &CliArgs) -> Result<CommandOptions> {
    let mut options = match &args.config {
        Some(path) => {
            let cfg = load_and_validate(path)
                .with_context(|| format!("loading config {path}"))?;
            cfg.options_for(&args.command)
                .ok_or_else(|| errors::CmdflightError::CommandNotFound(args.command.clone()))?
        }
        None => CommandOptions::default(),
    };

    if let Some(delay) = &args.delay {
        options.delay = duration_arg("--delay", delay)?;
    }
    if args.cancel_previous {
        options.cancel_previous = true;
    }

    Ok(options)
}

fn duration_arg(flag: &str, value: &str) -> Result<Duration> {
    parse_duration(value).map_err(|e| anyhow::anyhow!("{flag}: {e}"))
}

fn print_dry_run(name: &str, options: &CommandOptions, keystrokes: &[String]) {
    println!("cmdflight dry-run");
    println!("  command = {name}");
    println!("  delay = {:?}", options.delay);
    println!("  cancel_previous = {}", options.cancel_previous);
    println!("  keystrokes ({}): {:?}", keystrokes.len(), keystrokes);

    debug!("dry-run complete (no execution)");
}
