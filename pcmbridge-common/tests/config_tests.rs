//! Integration tests for config file resolution and graceful degradation
//!
//! Note: Uses serial_test to prevent environment variable races. Tests that
//! set or clear PCMBRIDGE_CONFIG are marked #[serial].

use pcmbridge_common::config::{
    load_toml_config, ConfigResolver, ConfigSource, TomlConfig, CONFIG_ENV_VAR,
};
use pcmbridge_common::StreamFormat;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;

fn write_config(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("Failed to write temp config");
    file
}

#[test]
fn test_load_full_config_file() {
    let file = write_config(
        r#"
        [audio]
        sample_rate_hz = 22050
        channel_count = 1
        bytes_per_sample = 2
        buffer_quantum_bytes = 2048

        [logging]
        level = "pcmbridge_ap=trace"
        "#,
    );

    let config = load_toml_config(file.path()).unwrap();
    assert_eq!(
        config.audio.stream_format().unwrap(),
        StreamFormat::new(22_050, 1, 2).unwrap()
    );
    assert_eq!(config.audio.quantum_bytes().unwrap(), 2048);
    assert_eq!(config.logging.level, "pcmbridge_ap=trace");
}

#[test]
fn test_missing_file_is_io_error() {
    let result = load_toml_config(&PathBuf::from("/nonexistent/pcmbridge/config.toml"));
    assert!(matches!(result, Err(pcmbridge_common::Error::Io(_))));
}

#[test]
#[serial]
fn test_resolver_explicit_path_loads_file() {
    env::remove_var(CONFIG_ENV_VAR);
    let file = write_config("[audio]\nsample_rate_hz = 48000\n");

    let (config, source) = ConfigResolver::new(Some(file.path().to_path_buf())).load();
    assert_eq!(config.audio.sample_rate_hz, 48_000);
    assert_eq!(source, ConfigSource::File(file.path().to_path_buf()));
}

#[test]
#[serial]
fn test_resolver_env_var() {
    let file = write_config("[audio]\nchannel_count = 6\n");
    env::set_var(CONFIG_ENV_VAR, file.path());

    let resolver = ConfigResolver::new(None);
    assert_eq!(resolver.resolve_path(), Some(file.path().to_path_buf()));
    let (config, _) = resolver.load();
    assert_eq!(config.audio.channel_count, 6);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_resolver_cli_takes_precedence_over_env() {
    let env_file = write_config("[audio]\nchannel_count = 6\n");
    let cli_file = write_config("[audio]\nchannel_count = 1\n");
    env::set_var(CONFIG_ENV_VAR, env_file.path());

    let (config, _) = ConfigResolver::new(Some(cli_file.path().to_path_buf())).load();
    assert_eq!(config.audio.channel_count, 1);

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_invalid_file_degrades_to_defaults() {
    let file = write_config("[audio]\nsample_rate_hz = 0\n");

    let (config, source) = ConfigResolver::new(Some(file.path().to_path_buf())).load();
    assert_eq!(config, TomlConfig::default());
    assert_eq!(source, ConfigSource::Defaults);
}

#[test]
#[serial]
fn test_missing_explicit_file_degrades_to_defaults() {
    let (config, source) =
        ConfigResolver::new(Some(PathBuf::from("/nonexistent/pcmbridge.toml"))).load();
    assert_eq!(config, TomlConfig::default());
    assert_eq!(source, ConfigSource::Defaults);
}
