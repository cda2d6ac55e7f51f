// src/logging.rs

//! Logging setup for `cmdflight` using `tracing` + `tracing-subscriber`.
//!
//! The engine itself only emits `tracing` events; with no subscriber
//! installed they are discarded, so library users decide whether and where
//! logs go. This module is what the demo binary (and anyone who wants the
//! same defaults) uses.
//!
//! Filter priority:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `CMDFLIGHT_LOG` environment variable, any `EnvFilter` directive
//!    (e.g. `"debug"` or `"cmdflight::command=trace"`)
//! 3. default to `info`
//!
//! Logs go to STDERR so the demo's stdout only carries its own output.

use anyhow::{anyhow, Result};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "CMDFLIGHT_LOG";

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = match cli_level {
        Some(lvl) => EnvFilter::new(directive_for(lvl)),
        None => EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new("info")),
    };

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install tracing subscriber: {e}"))
}

fn directive_for(lvl: LogLevel) -> &'static str {
    match lvl {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
