// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::CommandOptions;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [default]
/// delay = "0ms"
/// cancel_previous = false
///
/// [command.search]
/// delay = "250ms"
/// cancel_previous = true
/// ```
///
/// All sections are optional at the parsing level; validation requires at
/// least one command.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    /// Defaults from `[default]`.
    #[serde(default)]
    pub default: DefaultSection,

    /// All commands from `[command.<name>]`.
    #[serde(default)]
    pub command: BTreeMap<String, CommandConfig>,
}

/// `[default]` section, applied to commands that omit a field.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DefaultSection {
    /// Duration string such as `"250ms"`; absent means no debounce.
    #[serde(default)]
    pub delay: Option<String>,

    #[serde(default)]
    pub cancel_previous: Option<bool>,
}

/// `[command.<name>]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct CommandConfig {
    /// Debounce window for this command, e.g. `"250ms"` or `"1s"`.
    #[serde(default)]
    pub delay: Option<String>,

    /// Cancel and await the running execution before starting a new one.
    #[serde(default)]
    pub cancel_previous: Option<bool>,
}

/// Validated configuration: every command resolved to concrete options.
///
/// Only constructed through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    commands: BTreeMap<String, CommandOptions>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(commands: BTreeMap<String, CommandOptions>) -> Self {
        Self { commands }
    }

    pub fn options_for(&self, name: &str) -> Option<CommandOptions> {
        self.commands.get(name).copied()
    }

    pub fn command_names(&self) -> impl Iterator<Item = &str> {
        self.commands.keys().map(String::as_str)
    }

    pub fn commands(&self) -> impl Iterator<Item = (&str, &CommandOptions)> {
        self.commands.iter().map(|(name, opts)| (name.as_str(), opts))
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}
