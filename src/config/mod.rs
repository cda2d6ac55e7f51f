// src/config/mod.rs

//! Command option sets loaded from TOML.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Resolve defaults and validate durations and names (`validate.rs`).

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use duration::parse_duration;
pub use loader::{load_and_validate, load_from_path, load_from_str};
pub use model::{CommandConfig, ConfigFile, DefaultSection, RawConfigFile};
pub use validate::{validate_config, MAX_DELAY};
