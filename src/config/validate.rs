// src/config/validate.rs

use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::duration::parse_duration;
use crate::config::model::{CommandConfig, ConfigFile, DefaultSection, RawConfigFile};
use crate::errors::{CmdflightError, Result};
use crate::types::CommandOptions;

/// Longest debounce window accepted from configuration.
pub const MAX_DELAY: Duration = Duration::from_secs(60 * 60);

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = CmdflightError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_config(&raw)?;

        let defaults = resolve_defaults(&raw.default)?;
        let mut commands = BTreeMap::new();
        for (name, cmd) in raw.command.iter() {
            commands.insert(name.clone(), resolve_command(name, cmd, defaults)?);
        }

        Ok(ConfigFile::new_unchecked(commands))
    }
}

/// Structural checks that don't need durations resolved.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_commands(cfg)?;
    validate_command_names(cfg)?;
    Ok(())
}

fn ensure_has_commands(cfg: &RawConfigFile) -> Result<()> {
    if cfg.command.is_empty() {
        return Err(CmdflightError::ConfigError(
            "config must contain at least one [command.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_command_names(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.command.keys() {
        if name.trim().is_empty() {
            return Err(CmdflightError::ConfigError(
                "command names must not be empty".to_string(),
            ));
        }
        if name.chars().any(char::is_whitespace) {
            return Err(CmdflightError::ConfigError(format!(
                "command name '{}' must not contain whitespace",
                name
            )));
        }
    }
    Ok(())
}

fn resolve_defaults(default: &DefaultSection) -> Result<CommandOptions> {
    let delay = match &default.delay {
        Some(s) => parse_delay("[default]", s)?,
        None => Duration::ZERO,
    };
    Ok(CommandOptions {
        delay,
        cancel_previous: default.cancel_previous.unwrap_or(false),
    })
}

fn resolve_command(
    name: &str,
    cmd: &CommandConfig,
    defaults: CommandOptions,
) -> Result<CommandOptions> {
    let delay = match &cmd.delay {
        Some(s) => parse_delay(&format!("[command.{name}]"), s)?,
        None => defaults.delay,
    };
    Ok(CommandOptions {
        delay,
        cancel_previous: cmd.cancel_previous.unwrap_or(defaults.cancel_previous),
    })
}

fn parse_delay(section: &str, s: &str) -> Result<Duration> {
    let delay = parse_duration(s).map_err(|e| {
        CmdflightError::ConfigError(format!("{section}.delay: {e}"))
    })?;
    if delay > MAX_DELAY {
        return Err(CmdflightError::ConfigError(format!(
            "{section}.delay must be at most 1h (got {s})"
        )));
    }
    Ok(delay)
}
