// tests/config_loading.rs

use std::io::Write;
use std::time::Duration;

use cmdflight::config::{load_and_validate, load_from_str, parse_duration, ConfigFile};
use cmdflight::errors::CmdflightError;
use cmdflight::CommandOptions;
use tempfile::NamedTempFile;

fn write_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[test]
fn test_defaults_apply_to_commands_that_omit_fields() {
    let file = write_config(
        r#"
[default]
delay = "250ms"
cancel_previous = true

[command.search]

[command.save]
delay = "0ms"
cancel_previous = false
"#,
    );

    let cfg = load_and_validate(file.path()).unwrap();

    assert_eq!(cfg.len(), 2);
    assert_eq!(cfg.command_names().collect::<Vec<_>>(), vec!["save", "search"]);
    assert_eq!(
        cfg.options_for("search"),
        Some(CommandOptions {
            delay: Duration::from_millis(250),
            cancel_previous: true,
        })
    );
    assert_eq!(cfg.options_for("save"), Some(CommandOptions::default()));
    assert_eq!(cfg.options_for("missing"), None);
}

#[test]
fn test_missing_default_section_means_plain_commands() {
    let raw = load_from_str(
        r#"
[command.refresh]
delay = "2s"
"#,
    )
    .unwrap();

    let cfg = ConfigFile::try_from(raw).unwrap();
    let options = cfg.options_for("refresh").unwrap();
    assert_eq!(options.delay, Duration::from_secs(2));
    assert!(!options.cancel_previous);
}

#[test]
fn test_empty_config_returns_config_error() {
    let file = write_config("[default]\ndelay = \"1s\"\n");

    match load_and_validate(file.path()) {
        Err(CmdflightError::ConfigError(msg)) => {
            assert!(msg.contains("at least one"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_whitespace_in_command_name_returns_config_error() {
    let file = write_config("[command.\"bad name\"]\ndelay = \"1s\"\n");

    match load_and_validate(file.path()) {
        Err(CmdflightError::ConfigError(msg)) => {
            assert!(msg.contains("bad name"));
            assert!(msg.contains("whitespace"));
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_malformed_delay_names_the_section() {
    let file = write_config("[command.search]\ndelay = \"soon\"\n");

    match load_and_validate(file.path()) {
        Err(CmdflightError::ConfigError(msg)) => {
            assert!(msg.contains("[command.search].delay"), "got: {msg}");
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_delay_above_limit_is_rejected() {
    let file = write_config("[default]\ndelay = \"2h\"\n\n[command.search]\n");

    match load_and_validate(file.path()) {
        Err(CmdflightError::ConfigError(msg)) => {
            assert!(msg.contains("[default].delay must be at most 1h"), "got: {msg}");
        }
        Err(e) => panic!("Expected ConfigError, got: {:?}", e),
        Ok(_) => panic!("Expected error, got Ok"),
    }
}

#[test]
fn test_invalid_toml_returns_toml_error() {
    let file = write_config("[command.search\n");

    assert!(matches!(
        load_and_validate(file.path()),
        Err(CmdflightError::TomlError(_))
    ));
}

#[test]
fn test_missing_file_returns_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Commands.toml");

    assert!(matches!(
        load_and_validate(&path),
        Err(CmdflightError::IoError(_))
    ));
}

#[test]
fn test_parse_duration_units() {
    assert_eq!(parse_duration("250ms").unwrap(), Duration::from_millis(250));
    assert_eq!(parse_duration(" 3s ").unwrap(), Duration::from_secs(3));
    assert_eq!(parse_duration("2m").unwrap(), Duration::from_secs(120));
    assert_eq!(parse_duration("1h").unwrap(), Duration::from_secs(3600));
    assert_eq!(parse_duration("0ms").unwrap(), Duration::ZERO);
}

#[test]
fn test_parse_duration_rejects_garbage() {
    assert!(parse_duration("").is_err());
    assert!(parse_duration("10").unwrap_err().contains("missing unit"));
    assert!(parse_duration("ms").unwrap_err().contains("start with a number"));
    assert!(parse_duration("5d").unwrap_err().contains("unsupported duration unit"));
    assert!(parse_duration("18446744073709551615h").unwrap_err().contains("too large"));
}
