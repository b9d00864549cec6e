//! # pcmbridge Audio Player Library (pcmbridge-ap)
//!
//! Bridges an application that produces PCM bytes on its own thread with a
//! paced playback clock running on one dedicated thread per player.
//!
//! **Architecture:**
//!
//! ```text
//! producer ── PlayerRegistry::write(id, bytes)
//!                  │  (blocks while the buffer holds a full quantum or is paused)
//!                  ▼
//!             PlayerBuffer ◄── PlaybackLoop thread: drain one quantum,
//!                  │                                 notify, sleep one period
//!                  ▼
//!             EventBus: QuantumDrained → producer tops the buffer up
//! ```
//!
//! Players are addressed by opaque [`PlayerId`]s handed out by the
//! [`PlayerRegistry`]; an [`AudioContext`] fixes the device-wide format and
//! owns the registry.

pub mod audio;
pub mod config;
pub mod error;
pub mod playback;

pub use audio::clock::{Pacer, PlaybackClock, SleepPacer, VirtualPacer};
pub use error::{Error, Result};
pub use pcmbridge_common::{EventBus, PlayerEvent, PlayerId, StreamFormat};
pub use playback::{
    AudioContext, AudioPlayer, DrainOutcome, Player, PlayerBuffer, PlayerRegistry, PlayerStats,
    WriteOutcome,
};
