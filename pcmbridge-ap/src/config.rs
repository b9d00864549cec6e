//! pcmbridge-ap specific configuration
//!
//! Resolution order for each audio setting: command line (or its environment
//! variable, handled by clap) > config file > compiled default.

use crate::error::{Error, Result};
use pcmbridge_common::config::{ConfigResolver, ConfigSource, TomlConfig};
use pcmbridge_common::StreamFormat;
use std::path::PathBuf;

/// Settings given on the command line; `None` defers to the config file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub config_path: Option<PathBuf>,
    pub sample_rate_hz: Option<u32>,
    pub channel_count: Option<u32>,
    pub bytes_per_sample: Option<u32>,
    pub quantum_bytes: Option<u64>,
}

/// Audio Player configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub format: StreamFormat,
    pub quantum_bytes: u64,
    pub log_level: String,
    pub source: ConfigSource,
}

impl Config {
    /// Resolve the config file and apply command-line overrides
    pub fn load(overrides: &Overrides) -> Result<Self> {
        let (toml_config, source) = ConfigResolver::new(overrides.config_path.clone()).load();
        Self::from_parts(toml_config, source, overrides)
    }

    /// Merge an already-loaded config file with overrides
    pub fn from_parts(
        toml_config: TomlConfig,
        source: ConfigSource,
        overrides: &Overrides,
    ) -> Result<Self> {
        let mut audio = toml_config.audio;
        if let Some(rate) = overrides.sample_rate_hz {
            audio.sample_rate_hz = rate;
        }
        if let Some(channels) = overrides.channel_count {
            audio.channel_count = channels;
        }
        if let Some(bytes) = overrides.bytes_per_sample {
            audio.bytes_per_sample = bytes;
        }
        if overrides.quantum_bytes.is_some() {
            audio.buffer_quantum_bytes = overrides.quantum_bytes;
        }

        let format = audio.stream_format()?;
        let quantum_bytes = audio.quantum_bytes()?;
        if quantum_bytes % format.bytes_per_frame() != 0 {
            return Err(Error::Config(format!(
                "quantum of {} bytes is not a whole number of {}-byte frames",
                quantum_bytes,
                format.bytes_per_frame()
            )));
        }

        Ok(Self {
            format,
            quantum_bytes,
            log_level: toml_config.logging.level,
            source,
        })
    }
}
