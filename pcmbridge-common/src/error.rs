//! Common error types for pcmbridge

use thiserror::Error;

/// Common result type for pcmbridge operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types shared by the pcmbridge crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML config file could not be parsed
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// Invalid caller input (zero sample rate, zero quantum, ...)
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
