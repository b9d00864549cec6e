//! Error types for pcmbridge-ap

use pcmbridge_common::PlayerId;
use thiserror::Error;

/// Main error type for pcmbridge-ap
#[derive(Error, Debug)]
pub enum Error {
    /// Errors from the common crate (format validation, config files)
    #[error(transparent)]
    Common(#[from] pcmbridge_common::Error),

    /// Operation on an id that was never issued or is already closed
    ///
    /// A caller bug: ids are never reused, so retrying cannot succeed.
    #[error("Player not found: {0}")]
    PlayerNotFound(PlayerId),

    /// Rejected stream format or quantum
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// Playback thread could not be spawned or panicked
    #[error("Playback thread error: {0}")]
    Thread(String),

    /// Configuration resolution errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience Result type using pcmbridge-ap Error
pub type Result<T> = std::result::Result<T, Error>;
