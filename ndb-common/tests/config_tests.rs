//! Configuration loading and resolution
//!
//! Uses serial_test: tests that set or clear NDB_CONFIG are marked #[serial]
//! so they do not race each other.

use ndb_common::config::{load_config, resolve_config_path, SyncConfig, CONFIG_ENV_VAR};
use ndb_common::Visibility;
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

#[test]
#[serial]
fn test_cli_path_wins_over_env_var() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/from-env.toml");

    let resolved = resolve_config_path(Some(Path::new("/tmp/from-cli.toml")));
    assert_eq!(resolved, Some(PathBuf::from("/tmp/from-cli.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_var_names_config_file() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/ndb-env-config.toml");

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/ndb-env-config.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_blank_env_var_is_ignored() {
    env::set_var(CONFIG_ENV_VAR, "   ");

    let resolved = resolve_config_path(None);
    assert_ne!(resolved, Some(PathBuf::from("   ")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_missing_file_yields_defaults() {
    let dir = TempDir::new().unwrap();
    let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();
    assert_eq!(config, SyncConfig::default());

    assert_eq!(load_config(None).unwrap(), SyncConfig::default());
}

#[test]
fn test_file_values_are_loaded() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
        visibility = "do-not-share"
        tracing_chunk_count = 8
        prune_samples = true

        [stores]
        sample = "/srv/ndb/sample.db"

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    let config = load_config(Some(&path)).unwrap();
    assert_eq!(config.visibility, Visibility::DoNotShare);
    assert_eq!(config.tracing_chunk_count, 8);
    assert!(config.prune_samples);
    assert_eq!(config.stores.sample, PathBuf::from("/srv/ndb/sample.db"));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(config.node_batch_size, SyncConfig::default().node_batch_size);
}

#[test]
fn test_malformed_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "visibility = [not valid").unwrap();

    let err = load_config(Some(&path)).unwrap_err();
    assert!(err.to_string().contains("config.toml"), "unexpected error: {}", err);
}

#[test]
fn test_invalid_values_are_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "content_batch_size = 0").unwrap();

    assert!(load_config(Some(&path)).is_err());
}
