//! Configuration resolution tests
//!
//! Covers the priority order CLI > environment > TOML > default, and
//! graceful handling of missing or broken config files.
//!
//! Note: Uses serial_test to prevent ENV variable races. Tests that touch
//! RESUMO_* variables are marked #[serial].

use resumo_common::config::{
    default_root_folder, resolve_root_folder, ConfigOverrides, ServerConfig, TomlConfig,
    DEFAULT_HOST, DEFAULT_PORT, ENV_HOST, ENV_MEDIA_DIR, ENV_PORT, ENV_ROOT_FOLDER,
};
use serial_test::serial;
use std::env;
use std::path::PathBuf;

fn clear_env() {
    env::remove_var(ENV_ROOT_FOLDER);
    env::remove_var(ENV_HOST);
    env::remove_var(ENV_PORT);
    env::remove_var(ENV_MEDIA_DIR);
}

fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("config.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
#[serial]
fn test_resolver_with_no_overrides_uses_default() {
    clear_env();

    let root = resolve_root_folder(None, None);
    assert_eq!(root, default_root_folder());
}

#[test]
#[serial]
fn test_env_var_beats_toml() {
    clear_env();
    env::set_var(ENV_ROOT_FOLDER, "/tmp/resumo-env-root");

    let toml = TomlConfig {
        root_folder: Some(PathBuf::from("/tmp/resumo-toml-root")),
        ..Default::default()
    };
    let root = resolve_root_folder(None, Some(&toml));
    assert_eq!(root, PathBuf::from("/tmp/resumo-env-root"));

    clear_env();
}

#[test]
#[serial]
fn test_cli_beats_env() {
    clear_env();
    env::set_var(ENV_ROOT_FOLDER, "/tmp/resumo-env-root");

    let cli = PathBuf::from("/tmp/resumo-cli-root");
    let root = resolve_root_folder(Some(&cli), None);
    assert_eq!(root, cli);

    clear_env();
}

#[test]
#[serial]
fn test_toml_used_when_no_cli_or_env() {
    clear_env();

    let dir = tempfile::tempdir().unwrap();
    let config_file = write_config(
        &dir,
        "root_folder = \"/tmp/resumo-toml-root\"\nhost = \"0.0.0.0\"\nport = 6001\n",
    );

    let config = ServerConfig::resolve(&ConfigOverrides {
        config_file: Some(config_file),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(config.root_folder, PathBuf::from("/tmp/resumo-toml-root"));
    assert_eq!(config.host, "0.0.0.0");
    assert_eq!(config.port, 6001);
    assert_eq!(config.media_dir, PathBuf::from("/tmp/resumo-toml-root/media"));
    assert_eq!(
        config.database_path,
        PathBuf::from("/tmp/resumo-toml-root/resumo.db")
    );
}

#[test]
#[serial]
fn test_defaults_for_host_and_port() {
    clear_env();

    let config = ServerConfig::resolve(&ConfigOverrides {
        root_folder: Some(PathBuf::from("/tmp/resumo-defaults")),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(config.host, DEFAULT_HOST);
    assert_eq!(config.port, DEFAULT_PORT);
    assert_eq!(config.bind_address(), format!("{}:{}", DEFAULT_HOST, DEFAULT_PORT));
}

#[test]
#[serial]
fn test_env_port_and_media_dir() {
    clear_env();
    env::set_var(ENV_PORT, "7100");
    env::set_var(ENV_MEDIA_DIR, "/srv/resumo-media");

    let config = ServerConfig::resolve(&ConfigOverrides {
        root_folder: Some(PathBuf::from("/tmp/resumo-env")),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(config.port, 7100);
    assert_eq!(config.media_dir, PathBuf::from("/srv/resumo-media"));

    clear_env();
}

#[test]
#[serial]
fn test_invalid_env_port_is_config_error() {
    clear_env();
    env::set_var(ENV_PORT, "not-a-port");

    let result = ServerConfig::resolve(&ConfigOverrides {
        root_folder: Some(PathBuf::from("/tmp/resumo-env")),
        ..Default::default()
    });
    assert!(result.is_err());

    clear_env();
}

#[test]
#[serial]
fn test_explicit_broken_config_file_is_error() {
    clear_env();

    let dir = tempfile::tempdir().unwrap();
    let config_file = write_config(&dir, "port = \"not a number\"\n");

    let result = ServerConfig::resolve(&ConfigOverrides {
        config_file: Some(config_file),
        ..Default::default()
    });
    assert!(result.is_err());
}

#[test]
#[serial]
fn test_missing_explicit_config_file_is_error() {
    clear_env();

    let result = ServerConfig::resolve(&ConfigOverrides {
        config_file: Some(PathBuf::from("/nonexistent/resumo/config.toml")),
        ..Default::default()
    });
    assert!(result.is_err());
}
