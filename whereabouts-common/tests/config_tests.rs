//! Tests for bootstrap configuration loading
//!
//! Uses serial_test for the tests that touch WHEREABOUTS_CONFIG so they do
//! not race each other.

use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use whereabouts_common::config::{LocationGroupSource, TomlConfig, CONFIG_ENV_VAR};

#[test]
fn test_empty_file_uses_defaults() {
    let config = TomlConfig::from_toml_str("").unwrap();
    assert_eq!(config, TomlConfig::default());
    assert_eq!(config.port, 8082);
    assert_eq!(config.location_groups.source, LocationGroupSource::Properties);
    assert_eq!(config.health.timeout_ms, 1000);
    assert!(config.oauth.is_none());
}

#[test]
fn test_full_file() {
    let config = TomlConfig::from_toml_str(
        r#"
        port = 9000
        database_path = "/var/lib/whereabouts/data.db"

        [prison_api]
        url = "https://prison-api.example"

        [case_notes_api]
        url = "https://case-notes.example"

        [oauth]
        url = "https://auth.example/auth"
        client_id = "whereabouts"
        client_secret = "secret"

        [location_groups]
        source = "upstream"

        [health]
        timeout_ms = 250

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    assert_eq!(config.port, 9000);
    assert_eq!(config.database_path, PathBuf::from("/var/lib/whereabouts/data.db"));
    assert_eq!(config.prison_api.url, "https://prison-api.example");
    assert_eq!(config.oauth.as_ref().unwrap().client_id, "whereabouts");
    assert_eq!(config.location_groups.source, LocationGroupSource::Upstream);
    assert_eq!(config.location_groups.properties_file, PathBuf::from("groups.properties"));
    assert_eq!(config.health.timeout_ms, 250);
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_empty_upstream_url_rejected() {
    let result = TomlConfig::from_toml_str("[prison_api]\nurl = \"  \"\n");
    assert!(result.is_err());
}

#[test]
fn test_unknown_source_rejected() {
    let result = TomlConfig::from_toml_str("[location_groups]\nsource = \"ldap\"\n");
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_cli_path_takes_priority_over_env() {
    let mut cli_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(cli_file, "port = 7001").unwrap();
    let mut env_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(env_file, "port = 7002").unwrap();

    env::set_var(CONFIG_ENV_VAR, env_file.path());
    let config = TomlConfig::load(Some(cli_file.path())).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.port, 7001);
}

#[test]
#[serial]
fn test_env_path_used_without_cli() {
    let mut env_file = tempfile::NamedTempFile::new().unwrap();
    writeln!(env_file, "port = 7002").unwrap();

    env::set_var(CONFIG_ENV_VAR, env_file.path());
    let config = TomlConfig::load(None).unwrap();
    env::remove_var(CONFIG_ENV_VAR);

    assert_eq!(config.port, 7002);
}

#[test]
#[serial]
fn test_missing_explicit_file_is_an_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let result = TomlConfig::load(Some(std::path::Path::new("/nonexistent/whereabouts.toml")));
    assert!(result.is_err());
}
