//! Audio player handle
//!
//! [`AudioPlayer`] is the per-stream output interface; [`Player`] is its one
//! implementation, pairing a [`PlayerBuffer`] with its [`PlaybackLoop`] and
//! publishing lifecycle events.

use crate::audio::clock::Pacer;
use crate::error::Result;
use crate::playback::playback_loop::PlaybackLoop;
use crate::playback::player_buffer::{PlayerBuffer, PlayerStats, WriteOutcome};
use chrono::Utc;
use parking_lot::Mutex;
use pcmbridge_common::events::PlayerState;
use pcmbridge_common::{EventBus, PlayerEvent, PlayerId, StreamFormat};
use std::sync::Arc;
use tracing::{debug, info};

/// Output stream for one producer
pub trait AudioPlayer: Send + Sync {
    /// Stop consuming and stop accepting writes
    fn pause(&self);

    /// Resume after [`AudioPlayer::pause`]
    fn play(&self);

    /// Queue PCM bytes, blocking while the buffer holds a full quantum or is paused
    fn write(&self, data: &[u8]) -> WriteOutcome;

    /// Whether a write would proceed without blocking
    fn is_writable(&self) -> bool;

    /// Stop playback and join the playback thread
    ///
    /// Returns the bytes that were never played. Idempotent.
    fn close(&self, immediate: bool) -> Result<u64>;

    fn volume(&self) -> f64;

    fn set_volume(&self, volume: f64);

    /// Bytes written but not yet played
    fn unplayed_buffer_size(&self) -> u64;
}

/// A player and its playback thread
pub struct Player {
    id: PlayerId,
    buffer: Arc<PlayerBuffer>,
    playback: Mutex<Option<PlaybackLoop>>,
    events: EventBus,
}

impl std::fmt::Debug for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Player")
            .field("id", &self.id)
            .field("buffer", &self.buffer)
            .finish()
    }
}

impl Player {
    /// Create the buffer and start its playback thread
    ///
    /// Each drained quantum is published as [`PlayerEvent::QuantumDrained`].
    pub fn spawn(
        id: PlayerId,
        format: StreamFormat,
        quantum_bytes: u64,
        pacer: Arc<dyn Pacer>,
        events: EventBus,
    ) -> Result<Self> {
        let drain_events = events.clone();
        let buffer = Arc::new(PlayerBuffer::new(format, quantum_bytes).with_drain_callback(
            Box::new(move |pending_bytes| {
                drain_events.emit_lossy(PlayerEvent::QuantumDrained {
                    player_id: id,
                    bytes: quantum_bytes,
                    pending_bytes,
                    timestamp: Utc::now(),
                });
            }),
        ));

        let playback = PlaybackLoop::spawn(id, Arc::clone(&buffer), pacer)?;

        info!(
            "Created {} ({}, quantum {} bytes)",
            id, format, quantum_bytes
        );
        events.emit_lossy(PlayerEvent::PlayerCreated {
            player_id: id,
            format,
            quantum_bytes,
            timestamp: Utc::now(),
        });

        Ok(Self {
            id,
            buffer,
            playback: Mutex::new(Some(playback)),
            events,
        })
    }

    pub fn id(&self) -> PlayerId {
        self.id
    }

    pub fn format(&self) -> StreamFormat {
        self.buffer.format()
    }

    pub fn quantum_bytes(&self) -> u64 {
        self.buffer.quantum_bytes()
    }

    pub fn state(&self) -> PlayerState {
        self.buffer.state()
    }

    pub fn stats(&self) -> PlayerStats {
        self.buffer.stats()
    }

    /// Write a byte count without sample data
    pub fn write_len(&self, len: u64) -> WriteOutcome {
        self.buffer.write(len)
    }

    /// Shared buffer, for callers that wait on writability directly
    pub fn buffer(&self) -> &Arc<PlayerBuffer> {
        &self.buffer
    }

    fn emit_state_change(&self, old_state: PlayerState) {
        let new_state = self.buffer.state();
        if new_state != old_state {
            debug!("{} {} -> {}", self.id, old_state, new_state);
            self.events.emit_lossy(PlayerEvent::PlayerStateChanged {
                player_id: self.id,
                old_state,
                new_state,
                timestamp: Utc::now(),
            });
        }
    }
}

impl AudioPlayer for Player {
    fn pause(&self) {
        let old_state = self.buffer.pause();
        self.emit_state_change(old_state);
    }

    fn play(&self) {
        let old_state = self.buffer.resume();
        self.emit_state_change(old_state);
    }

    fn write(&self, data: &[u8]) -> WriteOutcome {
        self.buffer.write(data.len() as u64)
    }

    fn is_writable(&self) -> bool {
        self.buffer.is_writable()
    }

    fn close(&self, immediate: bool) -> Result<u64> {
        let unplayed_bytes = self.buffer.close(immediate);

        // Held across the join: a concurrent close waits here until the
        // thread has exited. The playback thread never takes this lock.
        let mut playback = self.playback.lock();
        let Some(running) = playback.take() else {
            return Ok(unplayed_bytes);
        };
        let joined = running.join();
        drop(playback);
        joined?;

        info!(
            "Closed {} (immediate={}, {} bytes unplayed)",
            self.id, immediate, unplayed_bytes
        );
        self.events.emit_lossy(PlayerEvent::PlayerClosed {
            player_id: self.id,
            immediate,
            unplayed_bytes,
            timestamp: Utc::now(),
        });
        Ok(unplayed_bytes)
    }

    fn volume(&self) -> f64 {
        self.buffer.volume()
    }

    fn set_volume(&self, volume: f64) {
        let before = self.buffer.volume();
        self.buffer.set_volume(volume);
        let after = self.buffer.volume();
        if after != before {
            self.events.emit_lossy(PlayerEvent::VolumeChanged {
                player_id: self.id,
                volume: after,
                timestamp: Utc::now(),
            });
        }
    }

    fn unplayed_buffer_size(&self) -> u64 {
        self.buffer.unplayed_buffer_size()
    }
}

impl Drop for Player {
    fn drop(&mut self) {
        // PlaybackLoop's own Drop closes and joins
        self.playback.get_mut().take();
    }
}
