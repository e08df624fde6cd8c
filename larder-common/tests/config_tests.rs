//! Configuration and root folder resolution tests
//!
//! Tests that touch LARDER_ROOT_FOLDER are marked #[serial] so they never
//! race on the process environment.

use larder_common::config::{
    load_toml_config, load_toml_config_or_default, CompiledDefaults, LoggingConfig,
    RootFolderInitializer, RootFolderResolver, TomlConfig, ROOT_FOLDER_ENV,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_compiled_defaults_for_current_platform() {
    let defaults = CompiledDefaults::for_current_platform();
    assert!(!defaults.root_folder.as_os_str().is_empty());
    assert_eq!(defaults.log_level, "info");
    assert!(defaults.root_folder.to_string_lossy().contains("larder"));
}

#[test]
#[serial]
fn test_cli_arg_has_highest_priority() {
    env::set_var(ROOT_FOLDER_ENV, "/tmp/larder-from-env");

    let resolver = RootFolderResolver::new("test")
        .with_cli_arg(Some(PathBuf::from("/tmp/larder-from-cli")));
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/larder-from-cli"));

    env::remove_var(ROOT_FOLDER_ENV);
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("config.toml");
    std::fs::write(&config_path, "root_folder = \"/tmp/larder-from-toml\"\n").unwrap();

    env::set_var(ROOT_FOLDER_ENV, "/tmp/larder-from-env");
    let resolver = RootFolderResolver::new("test").with_config_path(Some(config_path.clone()));
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/larder-from-env"));

    env::remove_var(ROOT_FOLDER_ENV);
    let resolver = RootFolderResolver::new("test").with_config_path(Some(config_path));
    assert_eq!(resolver.resolve(), PathBuf::from("/tmp/larder-from-toml"));
}

#[test]
#[serial]
fn test_invalid_toml_falls_back_to_default() {
    env::remove_var(ROOT_FOLDER_ENV);
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("config.toml");
    std::fs::write(&config_path, "root_folder = [unterminated").unwrap();

    let resolver = RootFolderResolver::new("test").with_config_path(Some(config_path));
    assert_eq!(
        resolver.resolve(),
        CompiledDefaults::for_current_platform().root_folder
    );
}

#[test]
fn test_toml_config_parses_sections() {
    let temp = TempDir::new().unwrap();
    let config_path = temp.path().join("config.toml");
    std::fs::write(
        &config_path,
        r#"
root_folder = "/srv/larder"
spoonacular_api_key = "abc123"

[logging]
level = "debug"

[pipeline]
validate_quality = false
extract_timeout_secs = 30

[quality]
min_pass_rate = 0.9
"#,
    )
    .unwrap();

    let config = load_toml_config(&config_path).unwrap();
    assert_eq!(config.root_folder.as_deref(), Some("/srv/larder"));
    assert_eq!(config.spoonacular_api_key.as_deref(), Some("abc123"));
    assert_eq!(config.logging.level, "debug");
    assert_eq!(
        config.pipeline.get("validate_quality").and_then(|v| v.as_bool()),
        Some(false)
    );
    assert_eq!(
        config.quality.get("min_pass_rate").and_then(|v| v.as_float()),
        Some(0.9)
    );
}

#[test]
fn test_empty_toml_uses_defaults() {
    let config: TomlConfig = toml::from_str("").unwrap();
    assert!(config.root_folder.is_none());
    assert_eq!(config.logging, LoggingConfig::default());
    assert!(config.pipeline.is_empty());
}

#[test]
fn test_missing_config_file_degrades_to_defaults() {
    let temp = TempDir::new().unwrap();
    let config = load_toml_config_or_default(Some(&temp.path().join("absent.toml")));
    assert!(config.root_folder.is_none());
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_initializer_creates_layout() {
    let temp = TempDir::new().unwrap();
    let root = temp.path().join("nested").join("larder");

    let initializer = RootFolderInitializer::new(root.clone());
    initializer.ensure_directory_exists().unwrap();

    assert!(root.is_dir());
    assert!(initializer.data_dir().is_dir());
    assert_eq!(initializer.database_path(), root.join("larder.db"));
}
