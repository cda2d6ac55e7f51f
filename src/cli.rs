// src/cli.rs

//! CLI argument parsing for the `cmdflight` demo driver.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `cmdflight`.
///
/// The binary replays a burst of "keystrokes" against one command, the way
/// a search box bound to a debounced command would, and prints every
/// notification the command publishes.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cmdflight",
    version,
    about = "Drive a debounced, cancellable async command with simulated input.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to a TOML file with `[command.<name>]` option sets.
    ///
    /// Without it, options come from `--delay` and `--cancel-previous`.
    #[arg(long, value_name = "PATH")]
    pub config: Option<String>,

    /// Which `[command.<name>]` entry to drive.
    #[arg(long, value_name = "NAME", default_value = "search")]
    pub command: String,

    /// Debounce window, overriding the config (e.g. `250ms`).
    #[arg(long, value_name = "DURATION")]
    pub delay: Option<String>,

    /// Cancel the running execution before starting a new one.
    #[arg(long)]
    pub cancel_previous: bool,

    /// Comma-separated input snapshots, one per simulated keystroke.
    #[arg(long, value_name = "LIST", default_value = "r,ru,rus,rust")]
    pub input: String,

    /// Time between simulated keystrokes.
    #[arg(long, value_name = "DURATION", default_value = "50ms")]
    pub interval: String,

    /// How long each simulated search takes.
    #[arg(long, value_name = "DURATION", default_value = "200ms")]
    pub work: String,

    /// Press the cancel command this long after the last keystroke.
    #[arg(long, value_name = "DURATION")]
    pub cancel_after: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `CMDFLIGHT_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Resolve and print the command options, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Input snapshots in keystroke order.
    pub fn keystrokes(&self) -> Vec<String> {
        self.input
            .split(',')
            .map(|s| s.trim().to_string())
            .collect()
    }
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
