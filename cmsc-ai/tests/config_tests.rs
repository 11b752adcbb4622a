//! Settings resolution tests
//!
//! Tests touching CMSC_* environment variables run under #[serial] so they
//! never observe each other's values.

use cmsc_ai::config::{CliOverrides, Settings, ENV_BUCKET, ENV_READ_KEY, ENV_WRITE_KEY};
use cmsc_ai::InstallError;
use cmsc_common::config::{load_toml_config, write_toml_config, TomlConfig, DEFAULT_API_URL, DEFAULT_MODEL};
use serial_test::serial;
use tempfile::TempDir;

fn clear_env() {
    for var in [ENV_BUCKET, ENV_READ_KEY, ENV_WRITE_KEY, "CMSC_API_URL", "CMSC_AI_URL"] {
        std::env::remove_var(var);
    }
}

fn toml_with_bucket(bucket: &str) -> TomlConfig {
    TomlConfig {
        bucket: Some(bucket.to_string()),
        write_key: Some("toml-write".to_string()),
        ..TomlConfig::default()
    }
}

#[test]
#[serial]
fn test_cli_overrides_env_and_toml() {
    clear_env();
    std::env::set_var(ENV_BUCKET, "env-bucket");

    let cli = CliOverrides {
        bucket: Some("cli-bucket".to_string()),
        ..CliOverrides::default()
    };
    let settings = Settings::resolve(&cli, &toml_with_bucket("toml-bucket"));

    assert_eq!(settings.bucket.as_deref(), Some("cli-bucket"));
    clear_env();
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    std::env::set_var(ENV_BUCKET, "env-bucket");
    std::env::set_var(ENV_WRITE_KEY, "env-write");

    let settings = Settings::resolve(&CliOverrides::default(), &toml_with_bucket("toml-bucket"));

    assert_eq!(settings.bucket.as_deref(), Some("env-bucket"));
    assert_eq!(settings.write_key.as_deref(), Some("env-write"));
    clear_env();
}

#[test]
#[serial]
fn test_toml_then_defaults() {
    clear_env();

    let settings = Settings::resolve(&CliOverrides::default(), &toml_with_bucket("toml-bucket"));

    assert_eq!(settings.bucket.as_deref(), Some("toml-bucket"));
    assert_eq!(settings.write_key.as_deref(), Some("toml-write"));
    assert_eq!(settings.read_key, None);
    assert_eq!(settings.api_url, DEFAULT_API_URL);
    assert_eq!(settings.model, DEFAULT_MODEL);
}

#[test]
#[serial]
fn test_whitespace_values_are_ignored() {
    clear_env();
    std::env::set_var(ENV_BUCKET, "   ");

    let settings = Settings::resolve(&CliOverrides::default(), &toml_with_bucket("toml-bucket"));

    assert_eq!(settings.bucket.as_deref(), Some("toml-bucket"));
    clear_env();
}

#[test]
#[serial]
fn test_missing_bucket_is_no_target() {
    clear_env();

    let settings = Settings::resolve(&CliOverrides::default(), &TomlConfig::default());

    assert!(matches!(settings.require_bucket(), Err(InstallError::NoTarget)));
    assert!(matches!(settings.gateway_settings(), Err(InstallError::NoTarget)));
}

#[test]
#[serial]
fn test_gateway_settings_carry_keys() {
    clear_env();
    std::env::set_var(ENV_READ_KEY, "env-read");

    let settings = Settings::resolve(&CliOverrides::default(), &toml_with_bucket("demo"));
    let gateway = settings.gateway_settings().unwrap();

    assert_eq!(gateway.bucket, "demo");
    assert_eq!(gateway.read_key.as_deref(), Some("env-read"));
    assert_eq!(gateway.write_key.as_deref(), Some("toml-write"));
    clear_env();
}

#[test]
#[serial]
fn test_settings_from_written_config_file() {
    clear_env();
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cmsc").join("config.toml");

    let config = TomlConfig {
        default_asset: Some("placeholder.png".to_string()),
        model: Some("custom-model".to_string()),
        ..toml_with_bucket("from-file")
    };
    write_toml_config(&config, &path).unwrap();

    let loaded = load_toml_config(&path).unwrap();
    let settings = Settings::resolve(&CliOverrides::default(), &loaded);

    assert_eq!(settings.bucket.as_deref(), Some("from-file"));
    assert_eq!(settings.model, "custom-model");
    assert_eq!(
        settings.install_settings().default_asset.as_deref(),
        Some("placeholder.png")
    );
}
