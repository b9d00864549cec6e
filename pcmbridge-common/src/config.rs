//! Configuration loading and config file resolution
//!
//! Config file location priority:
//! 1. Explicit path (command-line argument)
//! 2. `PCMBRIDGE_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/pcmbridge/config.toml`)
//! 4. Compiled defaults (no file)
//!
//! A missing or unreadable file is not fatal: a warning is logged and the
//! compiled defaults are used.

use crate::format::{DEFAULT_BYTES_PER_SAMPLE, DEFAULT_CHANNEL_COUNT, DEFAULT_SAMPLE_RATE_HZ};
use crate::{Error, Result, StreamFormat};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "PCMBRIDGE_CONFIG";

/// Default log filter when neither RUST_LOG nor the config sets one
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Contents of `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    /// Default stream format and quantum
    pub audio: AudioConfig,
    /// Log filter
    pub logging: LoggingConfig,
}

/// `[audio]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate_hz: u32,
    pub channel_count: u32,
    pub bytes_per_sample: u32,
    /// Overrides the half-second default quantum when set
    pub buffer_quantum_bytes: Option<u64>,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: DEFAULT_SAMPLE_RATE_HZ,
            channel_count: DEFAULT_CHANNEL_COUNT,
            bytes_per_sample: DEFAULT_BYTES_PER_SAMPLE,
            buffer_quantum_bytes: None,
        }
    }
}

impl AudioConfig {
    /// Validated stream format from this section
    pub fn stream_format(&self) -> Result<StreamFormat> {
        StreamFormat::new(self.sample_rate_hz, self.channel_count, self.bytes_per_sample)
            .map_err(|e| Error::Config(format!("[audio] {}", e)))
    }

    /// Effective quantum: the override if present, else half a second of audio
    pub fn quantum_bytes(&self) -> Result<u64> {
        match self.buffer_quantum_bytes {
            Some(0) => Err(Error::Config(
                "[audio] buffer_quantum_bytes must be positive".to_string(),
            )),
            Some(quantum) => Ok(quantum),
            None => Ok(self.stream_format()?.default_quantum_bytes()),
        }
    }
}

/// `[logging]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive string
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
        }
    }
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Loaded from this file
    File(PathBuf),
    /// No usable file; compiled defaults
    Defaults,
}

/// Resolves and loads the config file following the priority order above
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
    env_var_name: String,
}

impl ConfigResolver {
    /// Resolver honouring an optional explicit path and `PCMBRIDGE_CONFIG`
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self {
            cli_path,
            env_var_name: CONFIG_ENV_VAR.to_string(),
        }
    }

    /// Use a different environment variable (tests)
    pub fn with_env_var(mut self, name: &str) -> Self {
        self.env_var_name = name.to_string();
        self
    }

    /// Config file path to try, if any
    pub fn resolve_path(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory (only if it exists)
        default_config_path().filter(|p| p.exists())
    }

    /// Load the effective configuration
    ///
    /// Never fails: problems with the file are logged and defaults returned.
    /// Use [`load_toml_config`] directly to surface errors.
    pub fn load(&self) -> (TomlConfig, ConfigSource) {
        let Some(path) = self.resolve_path() else {
            debug!("No config file found, using compiled defaults");
            return (TomlConfig::default(), ConfigSource::Defaults);
        };

        match load_toml_config(&path) {
            Ok(config) => {
                debug!("Loaded config from {}", path.display());
                (config, ConfigSource::File(path))
            }
            Err(e) => {
                warn!(
                    "Ignoring config file {}: {} (using compiled defaults)",
                    path.display(),
                    e
                );
                (TomlConfig::default(), ConfigSource::Defaults)
            }
        }
    }
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)?;
    parse_toml_config(&content)
}

/// Parse TOML config text and validate the `[audio]` section
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    let config: TomlConfig = toml::from_str(content)?;
    config.audio.stream_format()?;
    config.audio.quantum_bytes()?;
    Ok(config)
}

/// `<platform config dir>/pcmbridge/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("pcmbridge").join("config.toml"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.audio.stream_format().unwrap(), StreamFormat::cd_quality());
        assert_eq!(config.audio.quantum_bytes().unwrap(), 88_200);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let config = parse_toml_config(
            r#"
            [audio]
            sample_rate_hz = 48000
            "#,
        )
        .unwrap();
        assert_eq!(config.audio.sample_rate_hz, 48_000);
        assert_eq!(config.audio.channel_count, 2);
        assert_eq!(config.audio.quantum_bytes().unwrap(), 96_000);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_quantum_override() {
        let config = parse_toml_config(
            r#"
            [audio]
            buffer_quantum_bytes = 4096
            "#,
        )
        .unwrap();
        assert_eq!(config.audio.quantum_bytes().unwrap(), 4096);
    }

    #[test]
    fn test_zero_fields_rejected() {
        assert!(matches!(
            parse_toml_config("[audio]\nchannel_count = 0\n"),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            parse_toml_config("[audio]\nbuffer_quantum_bytes = 0\n"),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            parse_toml_config("[audio\nsample_rate_hz = "),
            Err(Error::TomlParse(_))
        ));
    }

    #[test]
    fn test_explicit_path_wins() {
        let resolver = ConfigResolver::new(Some(PathBuf::from("/explicit/config.toml")))
            .with_env_var("PCMBRIDGE_TEST_UNUSED_VAR");
        assert_eq!(
            resolver.resolve_path(),
            Some(PathBuf::from("/explicit/config.toml"))
        );
    }
}
