//! # pcmbridge Common Library
//!
//! Shared code for the pcmbridge audio output pipeline:
//! - Stream format and byte/time conversions
//! - Player event types and the event bus
//! - TOML configuration loading and resolution
//! - Error types

pub mod config;
pub mod error;
pub mod events;
pub mod format;
pub mod timing;

pub use error::{Error, Result};
pub use events::{EventBus, PlayerEvent, PlayerId};
pub use format::StreamFormat;
