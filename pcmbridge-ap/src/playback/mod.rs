//! Playback pipeline: per-player buffer, playback thread, registry

pub mod context;
pub mod playback_loop;
pub mod player;
pub mod player_buffer;
pub mod registry;

pub use context::AudioContext;
pub use playback_loop::PlaybackLoop;
pub use player::{AudioPlayer, Player};
pub use player_buffer::{DrainOutcome, PlayerBuffer, PlayerStats, WriteOutcome};
pub use registry::PlayerRegistry;
