//! Tests for configuration loading and root folder resolution
//!
//! Tests that manipulate FMON_ROOT_FOLDER or FMON_CONFIG are marked with
//! #[serial] so they run sequentially.

use fmon_common::config::{
    load_config, resolve_root_folder, TomlConfig, CONFIG_PATH_ENV, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::{Path, PathBuf};

#[test]
fn test_empty_toml_uses_defaults() {
    let config = TomlConfig::from_toml_str("").unwrap();

    assert!(config.root_folder.is_none());
    assert_eq!(config.logging.level, "info");
    assert!(config.cache.enabled);
    assert!(config.cache.ttl_seconds.is_empty());
    assert_eq!(config.reportings.history_years, 1);
}

#[test]
fn test_full_toml_parses() {
    let config = TomlConfig::from_toml_str(
        r#"
        root_folder = "/srv/fmon"
        database_path = "/data/monitor.db"

        [logging]
        level = "debug"

        [cache]
        enabled = false

        [cache.ttl_seconds]
        species = 60
        fleet_segments = 0

        [reportings]
        history_years = 5
        "#,
    )
    .unwrap();

    assert_eq!(config.root_folder, Some(PathBuf::from("/srv/fmon")));
    assert_eq!(
        config.database_path(Path::new("/ignored")),
        PathBuf::from("/data/monitor.db")
    );
    assert_eq!(config.logging.level, "debug");
    assert!(!config.cache.enabled);
    assert_eq!(config.cache.ttl_seconds.get("species"), Some(&60));
    assert_eq!(config.cache.ttl_seconds.get("fleet_segments"), Some(&0));
    assert_eq!(config.reportings.history_years, 5);
}

#[test]
fn test_invalid_toml_is_config_error() {
    let result = TomlConfig::from_toml_str("root_folder = [");
    assert!(matches!(result, Err(fmon_common::Error::Config(_))));
}

#[test]
fn test_database_path_defaults_under_root_folder() {
    let config = TomlConfig::default();
    assert_eq!(
        config.database_path(Path::new("/srv/fmon")),
        PathBuf::from("/srv/fmon/fmon.db")
    );
}

#[test]
#[serial]
fn test_missing_config_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_PATH_ENV);
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    let config = load_config(Some(&missing)).unwrap();

    assert_eq!(config.logging.level, "info");
}

#[test]
#[serial]
fn test_config_path_from_env() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "[logging]\nlevel = \"warn\"\n").unwrap();
    env::set_var(CONFIG_PATH_ENV, &path);

    let config = load_config(None).unwrap();

    env::remove_var(CONFIG_PATH_ENV);
    assert_eq!(config.logging.level, "warn");
}

#[test]
#[serial]
fn test_root_folder_priority_order() {
    let config = TomlConfig {
        root_folder: Some(PathBuf::from("/from/toml")),
        ..TomlConfig::default()
    };

    env::set_var(ROOT_FOLDER_ENV, "/from/env");
    assert_eq!(
        resolve_root_folder(Some(Path::new("/from/cli")), &config),
        PathBuf::from("/from/cli")
    );
    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/from/env"));

    env::remove_var(ROOT_FOLDER_ENV);
    assert_eq!(resolve_root_folder(None, &config), PathBuf::from("/from/toml"));

    let fallback = resolve_root_folder(None, &TomlConfig::default());
    assert!(fallback.ends_with("fmon"));
}
